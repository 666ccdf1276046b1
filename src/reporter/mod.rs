//! Report generation module.
//!
//! This module provides export reports in multiple formats:
//! - JSON: Machine-readable structured output
//! - Text: Human-readable CLI output
//!
//! # Example
//!
//! ```rust,no_run
//! use oci_discovery::reporter::Reporter;
//! use oci_discovery::{Config, ExportResult, ReportFormat};
//!
//! let config = Config::default();
//! let reporter = Reporter::new(&config);
//!
//! let result = ExportResult::default();
//! let text = reporter.generate(&result, ReportFormat::Text).unwrap();
//! ```

mod json;
mod text;

use crate::config::Config;
use crate::error::Result;
use crate::types::{ExportResult, ReportFormat};

pub use json::{JsonReport, JsonReporter};
pub use text::{types_table, TextReporter};

/// Report generator that supports multiple output formats.
pub struct Reporter {
    config: Config,
}

impl Reporter {
    /// Create a new reporter with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Generate a report in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    pub fn generate(&self, result: &ExportResult, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => JsonReporter::new(&self.config).generate(result),
            ReportFormat::Text => TextReporter::new(&self.config).generate(result),
        }
    }
}

/// Trait for report generators.
pub trait ReportGenerator {
    /// Generate a report from an export result.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    fn generate(&self, result: &ExportResult) -> Result<String>;
}
