//! Core data types used throughout oci-discovery.
//!
//! This module defines the data structures for representing:
//! - The outcome of an export (generated files, variables, summary)
//! - Per-step statistics and degraded references
//! - Report and graph output formats

use crate::reference::{ReferenceConflict, Variables};
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum ReportFormat {
    /// JSON format
    #[default]
    Json,
    /// Plain text format
    Text,
}

/// Graph output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum GraphFormat {
    /// DOT format (Graphviz)
    #[default]
    Dot,
    /// JSON format
    Json,
    /// Mermaid diagram format
    Mermaid,
}

/// A literal OCID that no reference resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    /// `<class>.<name>` of the resource the literal was written into
    pub resource: String,
    /// The literal value
    pub value: String,
}

/// Statistics of one export step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Step name (e.g. "core")
    pub name: String,

    /// Output file, when the step rendered anything
    pub file: Option<String>,

    /// Resources kept after lifecycle filtering and post-processing
    pub discovered: usize,

    /// Resources written to the output file
    pub rendered: usize,

    /// Resources discovered but excluded by the resource type filters
    pub omitted: usize,

    /// Failures recorded while `continue_on_error` was set
    pub errors: Vec<String>,
}

/// Summary of a whole export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Exported compartment
    pub compartment_id: String,

    /// Steps in the order they ran
    pub steps: Vec<StepSummary>,

    /// Reference registrations rejected because the key was taken
    pub reference_conflicts: Vec<ReferenceConflict>,

    /// Literal OCIDs left in the generated configuration
    pub unresolved_references: Vec<UnresolvedReference>,

    /// When the export finished
    pub timestamp: Option<DateTime<Utc>>,
}

impl ExportSummary {
    #[must_use]
    pub fn total_discovered(&self) -> usize {
        self.steps.iter().map(|s| s.discovered).sum()
    }

    #[must_use]
    pub fn total_rendered(&self) -> usize {
        self.steps.iter().map(|s| s.rendered).sum()
    }

    #[must_use]
    pub fn total_omitted(&self) -> usize {
        self.steps.iter().map(|s| s.omitted).sum()
    }

    /// Number of failures recorded across all steps.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.steps.iter().map(|s| s.errors.len()).sum()
    }

    /// Check if any step recorded a failure.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Result of an export: generated files and how they came about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportResult {
    /// File name → configuration text
    pub files: BTreeMap<String, String>,

    /// Synthesized input variables: name → default
    pub variables: Variables,

    /// Summary statistics
    pub summary: ExportSummary,
}

impl ExportResult {
    /// Generate a report in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    pub fn generate_report(&self, format: ReportFormat) -> crate::Result<String> {
        let config = crate::Config::default();
        let reporter = crate::reporter::Reporter::new(&config);
        reporter.generate(self, format)
    }
}

/// One row of the `types` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeInfo {
    pub resource_class: String,
    pub service: String,
    /// Step that discovers the class, if any
    pub step: Option<String>,
    pub datasource_class: String,
    pub always_exportable: bool,
    /// Custom strategies installed on the hint
    pub strategies: Vec<String>,
}

impl ResourceTypeInfo {
    /// Every registered class, ordered by name.
    #[must_use]
    pub fn from_registry(registry: &Registry) -> Vec<Self> {
        registry
            .hints()
            .map(|hint| {
                let mut strategies = Vec::new();
                if let Some(discoverer) = &hint.discoverer {
                    strategies.push(format!("discoverer:{}", discoverer.name()));
                }
                if let Some(processor) = &hint.post_processor {
                    strategies.push(format!("post_processor:{}", processor.name()));
                }
                if hint.id_generator.is_some() {
                    strategies.push("id_generator".to_string());
                }
                if let Some(renderer) = &hint.renderer {
                    strategies.push(format!("renderer:{}", renderer.name()));
                }

                Self {
                    resource_class: hint.resource_class.clone(),
                    service: hint.service.clone(),
                    step: registry.step_of(&hint.resource_class).map(|s| s.name.clone()),
                    datasource_class: hint.datasource_class.clone(),
                    always_exportable: hint.always_exportable,
                    strategies,
                }
            })
            .collect()
    }
}
