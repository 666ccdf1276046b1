//! Plain text report generator.

use crate::config::Config;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::types::{ExportResult, ResourceTypeInfo};
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

/// Text report generator for CLI output.
pub struct TextReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl TextReporter {
    /// Create a new text reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            use_colors: config.output.colored,
            verbose: config.output.verbose,
        }
    }
}

impl ReportGenerator for TextReporter {
    fn generate(&self, result: &ExportResult) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header(result));
        output.push('\n');

        output.push_str(&self.format_summary(result));
        output.push('\n');

        if !result.summary.steps.is_empty() {
            output.push_str(&self.format_steps(result));
            output.push('\n');
        }

        if result.summary.has_errors() {
            output.push_str(&self.format_errors(result));
            output.push('\n');
        }

        let references = self.format_references(result);
        if !references.is_empty() {
            output.push_str(&references);
            output.push('\n');
        }

        output.push_str(&self.format_footer(result));

        Ok(output)
    }
}

impl TextReporter {
    fn section(&self, title: &str) -> String {
        let title = if self.use_colors {
            title.bright_cyan().bold().to_string()
        } else {
            title.to_string()
        };
        format!("\n{title}\n{}\n", "-".repeat(80))
    }

    fn format_header(&self, result: &ExportResult) -> String {
        let title = "oci-discovery Export";
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        let timestamp = result
            .summary
            .timestamp
            .map_or_else(|| "not finished".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());

        if self.use_colors {
            format!(
                "\n{} {} {}\n{}\n",
                title.bright_white().bold(),
                version.dimmed(),
                format!("({timestamp})").dimmed(),
                "=".repeat(80).bright_blue(),
            )
        } else {
            format!("\n{title} {version} ({timestamp})\n{}\n", "=".repeat(80))
        }
    }

    fn format_summary(&self, result: &ExportResult) -> String {
        let summary = &result.summary;
        let mut output = self.section("Summary");

        output.push_str(&format!("  Compartment: {}\n", summary.compartment_id));
        let counts = format!(
            "  {} discovered | {} rendered | {} omitted | {} errors\n",
            summary.total_discovered(),
            summary.total_rendered(),
            summary.total_omitted(),
            summary.error_count()
        );
        if self.use_colors && summary.has_errors() {
            output.push_str(&counts.yellow().to_string());
        } else {
            output.push_str(&counts);
        }
        output.push_str(&format!(
            "  {} files | {} variables | {} unresolved references\n",
            result.files.len(),
            result.variables.len(),
            summary.unresolved_references.len()
        ));

        output
    }

    fn format_steps(&self, result: &ExportResult) -> String {
        let mut output = self.section("Steps");

        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Step", "File", "Discovered", "Rendered", "Omitted", "Errors"]);

        for step in &result.summary.steps {
            if !self.verbose && step.discovered == 0 && step.errors.is_empty() {
                continue;
            }
            let errors = Cell::new(step.errors.len());
            let errors = if self.use_colors && !step.errors.is_empty() {
                errors.fg(Color::Red)
            } else {
                errors
            };
            table.add_row(vec![
                Cell::new(&step.name),
                Cell::new(step.file.as_deref().unwrap_or("-")),
                Cell::new(step.discovered),
                Cell::new(step.rendered),
                Cell::new(step.omitted),
                errors,
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_errors(&self, result: &ExportResult) -> String {
        let mut output = self.section("Errors");
        for step in &result.summary.steps {
            for error in &step.errors {
                let label = if self.use_colors {
                    "ERROR".red().to_string()
                } else {
                    "ERROR".to_string()
                };
                output.push_str(&format!("  [{label}] {}: {error}\n", step.name));
            }
        }
        output
    }

    /// Conflicts always; unresolved references only in verbose mode.
    fn format_references(&self, result: &ExportResult) -> String {
        let summary = &result.summary;
        let show_unresolved = self.verbose && !summary.unresolved_references.is_empty();
        if summary.reference_conflicts.is_empty() && !show_unresolved {
            return String::new();
        }

        let mut output = self.section("References");
        for conflict in &summary.reference_conflicts {
            let line = format!(
                "  conflict: {} kept {} (rejected {})\n",
                conflict.key, conflict.kept, conflict.rejected
            );
            if self.use_colors {
                output.push_str(&line.yellow().to_string());
            } else {
                output.push_str(&line);
            }
        }
        if show_unresolved {
            for unresolved in &summary.unresolved_references {
                let line = format!("  unresolved: {} in {}\n", unresolved.value, unresolved.resource);
                if self.use_colors {
                    output.push_str(&line.dimmed().to_string());
                } else {
                    output.push_str(&line);
                }
            }
        }
        output
    }

    fn format_footer(&self, result: &ExportResult) -> String {
        let status = if result.summary.has_errors() {
            let text = format!("COMPLETED WITH ERRORS - {} failures recorded", result.summary.error_count());
            if self.use_colors {
                text.red().bold().to_string()
            } else {
                text
            }
        } else if self.use_colors {
            "EXPORT COMPLETE".green().bold().to_string()
        } else {
            "EXPORT COMPLETE".to_string()
        };

        format!("\n{status}\n\n")
    }
}

/// Table of resource types for the `types` command.
#[must_use]
pub fn types_table(types: &[ResourceTypeInfo]) -> String {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Resource", "Step", "Data source", "Strategies"]);

    for info in types {
        let resource = if info.always_exportable {
            format!("{} *", info.resource_class)
        } else {
            info.resource_class.clone()
        };
        table.add_row(vec![
            Cell::new(resource),
            Cell::new(info.step.as_deref().unwrap_or("-")),
            Cell::new(&info.datasource_class),
            Cell::new(info.strategies.join("\n")),
        ]);
    }
    table.to_string()
}
