//! Configuration module for oci-discovery.
//!
//! This module handles loading and validating configuration from:
//! - YAML configuration files (`oci-discovery.yaml`)
//! - Environment variables
//! - CLI arguments
//!
//! # Configuration File Format
//!
//! ```yaml
//! # oci-discovery.yaml
//!
//! # Export options
//! export:
//!   compartment_id: ${OCI_COMPARTMENT_ID}  # Environment variable expansion
//!   services:
//!     - core
//!     - load_balancer
//!   resource_types:
//!     - "oci_core_*"
//!   output_dir: ./generated
//!   generate_import_blocks: true
//!   continue_on_error: false
//!   validate_output: true
//!
//! # Retry policy applied by the client facade
//! retry:
//!   max_attempts: 3
//!   base_delay_ms: 500
//!   max_delay_ms: 8000
//!
//! # Output options
//! output:
//!   colored: true
//!   verbose: false
//!   pretty: true
//! ```

use crate::err;
use crate::error::{OciDiscoveryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default configuration file names, in lookup order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["oci-discovery.yaml", "oci-discovery.yml", ".oci-discovery.yaml"];

/// Export options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// OCID of the compartment to export.
    pub compartment_id: Option<String>,

    /// Export steps to run (empty = all).
    pub services: Vec<String>,

    /// Resource class glob patterns to render (empty = all).
    pub resource_types: Vec<String>,

    /// Directory the configuration files are written to.
    pub output_dir: PathBuf,

    /// Write `import.tf` with Terraform import blocks.
    pub generate_import_blocks: bool,

    /// Record failing associations and keep exporting.
    pub continue_on_error: bool,

    /// Parse every generated file back before writing it.
    #[serde(default = "default_true")]
    pub validate_output: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            compartment_id: None,
            services: Vec::new(),
            resource_types: Vec::new(),
            output_dir: PathBuf::from(default_output_dir()),
            generate_import_blocks: false,
            continue_on_error: false,
            validate_output: true,
        }
    }
}

/// Retry options for API calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Attempts per request, the first one included.
    pub max_attempts: u32,

    /// Delay before the first retry, doubled on every further attempt.
    pub base_delay_ms: u64,

    /// Upper bound of the delay between attempts.
    pub max_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Use colored output.
    #[serde(default = "default_true")]
    pub colored: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Pretty-print JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            colored: true,
            verbose: false,
            pretty: true,
        }
    }
}

/// Main configuration structure with nested sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Export options
    pub export: ExportOptions,

    /// Retry options
    pub retry: RetryOptions,

    /// Output options
    pub output: OutputOptions,
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> &'static str {
    "./generated"
}

impl Config {
    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self> {
        tracing::debug!("Parsing configuration from YAML");
        let expanded = expand_env_vars(content)?;

        let config: Self = serde_yaml::from_str(&expanded).map_err(|e| {
            OciDiscoveryError::config_parse(e.to_string(), Some(Box::new(e)), file!(), line!())
        })?;

        tracing::debug!(
            services = config.export.services.len(),
            resource_types = config.export.resource_types.len(),
            continue_on_error = config.export.continue_on_error,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load the configuration from `path`, or from the first default file
    /// found in the working directory, or the defaults.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Loading configuration from explicit path");
            let content = read_config_file(path)?;
            return Self::from_yaml(&content);
        }

        for candidate in DEFAULT_CONFIG_FILES {
            let path = std::path::Path::new(candidate);
            if path.exists() {
                tracing::debug!(path = %candidate, "Found configuration file");
                let content = read_config_file(path)?;
                return Self::from_yaml(&content);
            }
        }

        tracing::debug!("No configuration file found, using default configuration");
        Ok(Self::default())
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        if let Some(compartment_id) = &self.export.compartment_id {
            if !compartment_id.starts_with("ocid1.") {
                return Err(err!(ConfigValue {
                    key: "export.compartment_id".to_string(),
                    message: format!("'{compartment_id}' is not an OCID"),
                }));
            }
        }
        for pattern in &self.export.resource_types {
            glob::Pattern::new(pattern).map_err(|e| {
                err!(ConfigValue {
                    key: "export.resource_types".to_string(),
                    message: format!("invalid pattern '{pattern}': {e}"),
                })
            })?;
        }
        if self.retry.max_attempts == 0 {
            return Err(err!(ConfigValue {
                key: "retry.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            }));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(err!(ConfigValue {
                key: "retry.base_delay_ms".to_string(),
                message: format!("exceeds retry.max_delay_ms ({})", self.retry.max_delay_ms),
            }));
        }
        Ok(())
    }

    /// The compartment to export, or `ConfigMissing`.
    pub fn compartment_id(&self) -> Result<&str> {
        self.export
            .compartment_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                err!(ConfigMissing {
                    key: "export.compartment_id (or --compartment-id)".to_string(),
                })
            })
    }

    /// Generate an example YAML configuration.
    #[must_use]
    pub fn example_yaml() -> String {
        r#"# oci-discovery configuration file

# Export options
export:
  # Compartment to export (environment variables are expanded)
  # compartment_id: ${OCI_COMPARTMENT_ID}

  # Export steps to run (empty = all):
  # availability_domain, identity, core, database, load_balancer,
  # object_storage, containerengine, health_checks
  services: []

  # Resource classes to render, as glob patterns (empty = all).
  # Availability domains and the object storage namespace are always rendered.
  # resource_types:
  #   - "oci_core_*"

  # Directory the generated configuration is written to
  output_dir: ./generated

  # Write import.tf with Terraform import blocks
  generate_import_blocks: false

  # Keep exporting when a resource type fails
  continue_on_error: false

  # Parse the generated configuration back before writing it
  validate_output: true

# Retry policy for API calls
retry:
  max_attempts: 3
  base_delay_ms: 500
  max_delay_ms: 8000

# Output options
output:
  # Use colored output in terminal
  colored: true

  # Enable verbose output
  verbose: false

  # Pretty-print JSON output
  pretty: true
"#
        .to_string()
    }

    /// Merge CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &crate::cli::ExportArgs) {
        if let Some(compartment_id) = &args.compartment_id {
            self.export.compartment_id = Some(compartment_id.clone());
        }
        if !args.services.is_empty() {
            self.export.services.clone_from(&args.services);
        }
        if !args.resource_types.is_empty() {
            self.export.resource_types.clone_from(&args.resource_types);
        }
        if let Some(output_dir) = &args.output_dir {
            self.export.output_dir.clone_from(output_dir);
        }
        if args.import_blocks {
            self.export.generate_import_blocks = true;
        }
        if args.continue_on_error {
            self.export.continue_on_error = true;
        }
        if args.skip_validation {
            self.export.validate_output = false;
        }
        if let Some(attempts) = args.retry_attempts {
            self.retry.max_attempts = attempts;
        }
    }
}

fn read_config_file(path: &std::path::Path) -> Result<String> {
    if !path.exists() {
        return Err(err!(FileNotFound {
            path: path.to_path_buf(),
        }));
    }
    std::fs::read_to_string(path).map_err(|e| OciDiscoveryError::io(path, e, file!(), line!()))
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. Unset variables are left as is.
fn expand_env_vars(content: &str) -> Result<String> {
    let braced = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| OciDiscoveryError::internal(e.to_string(), file!(), line!()))?;
    let bare = regex::Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|e| OciDiscoveryError::internal(e.to_string(), file!(), line!()))?;

    let mut result = content.to_string();
    for cap in braced.captures_iter(content) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }
    let snapshot = result.clone();
    for cap in bare.captures_iter(&snapshot) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.export.validate_output);
        assert!(!config.export.generate_import_blocks);
        assert_eq!(config.export.output_dir, PathBuf::from("./generated"));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.output.colored);
    }

    #[test]
    fn test_config_from_yaml_nested() {
        let yaml = r#"
export:
  compartment_id: ocid1.compartment.oc1..aaa
  services: [core, load_balancer]
  resource_types:
    - "oci_core_*"
  continue_on_error: true
  validate_output: false
retry:
  max_attempts: 5
output:
  colored: false
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.compartment_id().unwrap(), "ocid1.compartment.oc1..aaa");
        assert_eq!(config.export.services, vec!["core", "load_balancer"]);
        assert_eq!(config.export.resource_types, vec!["oci_core_*"]);
        assert!(config.export.continue_on_error);
        assert!(!config.export.validate_output);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert!(!config.output.colored);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_expansion_keeps_unset_variables() {
        let content = "compartment_id: ${OCI_DISCOVERY_TEST_SURELY_UNSET}";
        let expanded = expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);

        for pattern in ["no vars here", "$NOTAVAR123", "${NESTED${VAR}}"] {
            assert!(expand_env_vars(pattern).is_ok());
        }
    }

    #[test]
    fn test_env_var_expansion_uses_environment() {
        let path = std::env::var("PATH").unwrap_or_default();
        let expanded = expand_env_vars("path: ${PATH}").unwrap();
        assert_eq!(expanded, format!("path: {path}"));
    }

    #[test]
    fn test_example_yaml_is_valid() {
        let config = Config::from_yaml(&Config::example_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.export.compartment_id.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.export.compartment_id = Some("not-an-ocid".to_string());
        assert!(matches!(config.validate(), Err(OciDiscoveryError::ConfigValue { .. })));

        let mut config = Config::default();
        config.export.resource_types = vec!["oci_[core".to_string()];
        assert!(matches!(config.validate(), Err(OciDiscoveryError::ConfigValue { .. })));

        let mut config = Config::default();
        config.retry.base_delay_ms = 10_000;
        assert!(matches!(config.validate(), Err(OciDiscoveryError::ConfigValue { .. })));
    }

    #[test]
    fn test_missing_compartment() {
        assert!(matches!(
            Config::default().compartment_id(),
            Err(OciDiscoveryError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Config::from_yaml("export: [unclosed"),
            Err(OciDiscoveryError::ConfigParse { .. })
        ));
    }
}
