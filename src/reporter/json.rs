//! JSON report generator.

use crate::config::Config;
use crate::error::Result;
use crate::reference::ReferenceConflict;
use crate::reporter::ReportGenerator;
use crate::types::{ExportResult, StepSummary, UnresolvedReference};
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON report generator.
pub struct JsonReporter {
    /// Whether to pretty-print the output
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            pretty: config.output.pretty,
        }
    }
}

impl ReportGenerator for JsonReporter {
    fn generate(&self, result: &ExportResult) -> Result<String> {
        let report = JsonReport::from(result);

        let json = if self.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };

        json.map_err(|e| {
            crate::err!(ReportGeneration {
                message: format!("Failed to serialize JSON report: {e}"),
            })
        })
    }
}

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: ReportSummary,
    /// Per-step statistics
    pub steps: &'a [StepSummary],
    /// Generated file name → size in bytes
    pub files: BTreeMap<&'a str, usize>,
    /// Synthesized variables
    pub variables: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_empty")]
    pub reference_conflicts: &'a [ReferenceConflict],
    #[serde(skip_serializing_if = "is_empty")]
    pub unresolved_references: &'a [UnresolvedReference],
}

impl<'a> From<&'a ExportResult> for JsonReport<'a> {
    fn from(result: &'a ExportResult) -> Self {
        let summary = &result.summary;
        Self {
            metadata: ReportMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: summary
                    .timestamp
                    .unwrap_or_else(chrono::Utc::now)
                    .to_rfc3339(),
                compartment_id: summary.compartment_id.clone(),
            },
            summary: ReportSummary {
                total_discovered: summary.total_discovered(),
                total_rendered: summary.total_rendered(),
                total_omitted: summary.total_omitted(),
                total_errors: summary.error_count(),
                total_variables: result.variables.len(),
                has_errors: summary.has_errors(),
            },
            steps: &summary.steps,
            files: result
                .files
                .iter()
                .map(|(name, text)| (name.as_str(), text.len()))
                .collect(),
            variables: &result.variables,
            reference_conflicts: &summary.reference_conflicts,
            unresolved_references: &summary.unresolved_references,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

/// Report metadata.
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    /// oci-discovery version
    pub version: String,
    /// When the export finished
    pub timestamp: String,
    /// Exported compartment
    pub compartment_id: String,
}

/// Report summary.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub total_discovered: usize,
    pub total_rendered: usize,
    pub total_omitted: usize,
    pub total_errors: usize,
    pub total_variables: usize,
    /// Whether any step recorded a failure
    pub has_errors: bool,
}
