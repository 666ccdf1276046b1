//! # oci-discovery
//!
//! Discovers the resources of an Oracle Cloud Infrastructure compartment and
//! exports them as Terraform configuration.
//!
//! Discovery is driven by a registry of resource hints and per-service
//! association graphs. Each export step walks its graph from the compartment
//! root, runs the service specific post-processing hooks, registers every
//! resource in a reference map and renders HCL in which literal OCIDs are
//! replaced by references to the resources that produce them.
//!
//! ## Features
//!
//! - **Association graphs**: one step per service, walked depth-first
//! - **Service hooks**: filtering, composite ids and default resources
//! - **Reference resolution**: interpolations instead of literal OCIDs
//! - **Output**: one `.tf` file per step, `vars.tf` and optional
//!   `import.tf`, validated by parsing them back
//! - **Reports**: JSON and plain text export summaries
//!
//! ## Example
//!
//! ```rust,no_run
//! use oci_discovery::{Config, Exporter, ReportFormat};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.export.compartment_id = Some("ocid1.compartment.oc1..example".to_string());
//!
//!     let exporter = Exporter::from_snapshot(config, Path::new("tenancy.json"))?;
//!     let result = exporter.export().await?;
//!
//!     println!("{}", result.generate_report(ReportFormat::Text)?);
//!     Ok(())
//! }
//! ```

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod cli;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod graph;
pub mod reference;
pub mod registry;
pub mod render;
pub mod reporter;
pub mod resource;
pub mod services;
pub mod types;
pub mod value;

// Re-export commonly used types at crate root
pub use client::{OciClient, SnapshotClient};
pub use config::Config;
pub use error::{OciDiscoveryError, Result};
pub use registry::Registry;
pub use types::{ExportResult, ExportSummary, GraphFormat, ReportFormat, StepSummary};

use client::RetryingClient;
use export::{ExportSession, ResourceFilter, StepContext};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

/// Main export orchestrator.
///
/// The `Exporter` is the primary entry point for using oci-discovery as a
/// library. It owns the configuration, the registry and the client facade,
/// and runs every selected step of the registry against one compartment.
///
/// # Example
///
/// ```rust,no_run
/// use oci_discovery::{Config, Exporter, SnapshotClient};
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut config = Config::default();
///     config.export.compartment_id = Some("ocid1.compartment.oc1..example".to_string());
///
///     let client = SnapshotClient::from_file(Path::new("tenancy.yaml"))?;
///     let exporter = Exporter::new(config, client)?;
///     let result = exporter.export_to_disk().await?;
///
///     println!("Rendered {} resources", result.summary.total_rendered());
///     Ok(())
/// }
/// ```
pub struct Exporter<C> {
    config: Config,
    registry: Registry,
    client: RetryingClient<C>,
    show_progress: bool,
}

impl<C: OciClient> Exporter<C> {
    /// Create an exporter over the built-in registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in registry fails to freeze.
    pub fn new(config: Config, client: C) -> Result<Self> {
        Ok(Self::with_registry(config, Registry::builtin()?, client))
    }

    /// Create an exporter over a custom registry.
    #[must_use]
    pub fn with_registry(config: Config, registry: Registry, client: C) -> Self {
        Self {
            config,
            registry,
            client: RetryingClient::new(client),
            show_progress: false,
        }
    }

    /// Show a progress bar over the export steps.
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run every selected step and build the generated files.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration has no compartment or an invalid filter
    /// - Discovery or rendering fails and `continue_on_error` is not set
    /// - Validation of the generated files fails
    pub async fn export(&self) -> Result<ExportResult> {
        let options = &self.config.export;
        let compartment_id = self.config.compartment_id()?;
        let filter = ResourceFilter::new(options)?;

        let steps: Vec<_> = self
            .registry
            .steps()
            .iter()
            .filter(|step| filter.includes_step(&step.name))
            .collect();
        tracing::info!(
            compartment = %compartment_id,
            steps = steps.len(),
            "Starting export"
        );

        let progress = self.progress_bar(steps.len());
        let ctx = StepContext {
            client: &self.client,
            registry: &self.registry,
            retry: &self.config.retry,
            continue_on_error: options.continue_on_error,
        };

        let mut session = ExportSession::new(compartment_id, filter);
        let mut files = BTreeMap::new();
        let mut summaries = Vec::with_capacity(steps.len());
        for step in steps {
            progress.set_message(format!("Exporting {}", step.name));
            let output = session.run_step(&ctx, step).await?;
            if let Some(file) = &output.summary.file {
                files.insert(file.clone(), output.text);
            }
            summaries.push(output.summary);
            progress.inc(1);
        }

        let conflicts = session.references().conflicts().to_vec();
        let (resources, _, variables, unresolved) = session.into_parts();

        files.insert(export::VARIABLES_FILE.to_string(), export::render_variables(&variables));
        if options.generate_import_blocks {
            let imports = export::render_imports(&resources);
            if !imports.is_empty() {
                files.insert(export::IMPORT_FILE.to_string(), imports);
            }
        }

        if options.validate_output {
            let blocks = export::validate_files(&files)?;
            tracing::debug!(files = files.len(), blocks, "Validated generated configuration");
        }

        let summary = ExportSummary {
            compartment_id: compartment_id.to_string(),
            steps: summaries,
            reference_conflicts: conflicts,
            unresolved_references: unresolved,
            timestamp: Some(chrono::Utc::now()),
        };
        progress.finish_with_message(format!(
            "Exported {} resources ({} errors)",
            summary.total_rendered(),
            summary.error_count()
        ));

        if summary.has_errors() {
            tracing::warn!(errors = summary.error_count(), "Export finished with recorded failures");
        }
        tracing::info!(
            discovered = summary.total_discovered(),
            rendered = summary.total_rendered(),
            omitted = summary.total_omitted(),
            unresolved = summary.unresolved_references.len(),
            "Export complete"
        );

        Ok(ExportResult {
            files,
            variables,
            summary,
        })
    }

    /// Export and write the generated files to the configured output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the export fails or a file cannot be written.
    pub async fn export_to_disk(&self) -> Result<ExportResult> {
        let result = self.export().await?;
        export::write_files(&self.config.export.output_dir, &result.files).await?;
        Ok(result)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            progress.set_style(style.progress_chars("#>-"));
        }
        progress
    }
}

impl Exporter<SnapshotClient> {
    /// Create an exporter serving requests from a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or parsed.
    pub fn from_snapshot(config: Config, path: &Path) -> Result<Self> {
        Self::new(config, SnapshotClient::from_file(path)?)
    }
}
