//! Step and resource type selection.

use crate::config::ExportOptions;
use crate::err;
use crate::error::Result;

/// Step that runs whatever the service selection says.
pub const ALWAYS_RUN_STEP: &str = "availability_domain";

/// Which steps run and which classes are rendered.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    services: Vec<String>,
    patterns: Vec<glob::Pattern>,
}

impl ResourceFilter {
    pub fn new(options: &ExportOptions) -> Result<Self> {
        let patterns = options
            .resource_types
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|e| {
                    err!(ConfigValue {
                        key: "export.resource_types".to_string(),
                        message: format!("invalid pattern '{pattern}': {e}"),
                    })
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            services: options.services.clone(),
            patterns,
        })
    }

    /// Whether the step runs.
    #[must_use]
    pub fn includes_step(&self, step: &str) -> bool {
        step == ALWAYS_RUN_STEP || self.services.is_empty() || self.services.iter().any(|s| s == step)
    }

    /// Whether resources of `class` are rendered. Post-processing may
    /// reclassify a resource, so this is checked against its final class.
    #[must_use]
    pub fn renders(&self, class: &str, always_exportable: bool) -> bool {
        always_exportable || self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn filter(services: &[&str], types: &[&str]) -> ResourceFilter {
        let options = ExportOptions {
            services: services.iter().map(ToString::to_string).collect(),
            resource_types: types.iter().map(ToString::to_string).collect(),
            ..ExportOptions::default()
        };
        ResourceFilter::new(&options).unwrap()
    }

    #[test_case(&[], "core", true; "empty selection runs all")]
    #[test_case(&["core"], "core", true; "selected")]
    #[test_case(&["core"], "database", false; "not selected")]
    #[test_case(&["core"], "availability_domain", true; "availability domains always run")]
    fn test_includes_step(services: &[&str], step: &str, expected: bool) {
        assert_eq!(filter(services, &[]).includes_step(step), expected);
    }

    #[test]
    fn test_always_exportable_survives_type_filter() {
        let filter = filter(&[], &["oci_core_vcn"]);
        assert!(filter.renders("oci_core_vcn", false));
        assert!(!filter.renders("oci_core_subnet", false));
        assert!(filter.renders("oci_identity_availability_domain", true));
    }

    #[test]
    fn test_glob_patterns() {
        let filter = filter(&[], &["oci_load_balancer_*"]);
        assert!(filter.renders("oci_load_balancer_backend", false));
        assert!(!filter.renders("oci_core_vcn", false));
    }

    #[test_case("oci_core_security_list", "oci_core_security_list", true; "exact")]
    #[test_case("oci_core_security_list", "oci_core_default_security_list", false; "exact does not match default")]
    #[test_case("oci_core_default_security_list", "oci_core_security_list", false; "default does not match base")]
    #[test_case("oci_core_*security_list", "oci_core_default_security_list", true; "glob covers both")]
    fn test_default_classes_filtered_by_own_name(pattern: &str, class: &str, expected: bool) {
        assert_eq!(filter(&[], &[pattern]).renders(class, false), expected);
    }

    #[test]
    fn test_invalid_pattern() {
        let options = ExportOptions {
            resource_types: vec!["oci_[".to_string()],
            ..ExportOptions::default()
        };
        assert!(ResourceFilter::new(&options).is_err());
    }
}
