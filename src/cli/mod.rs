//! Command-line interface module.
//!
//! This module defines the CLI structure using Clap, including
//! all commands, arguments, and options.
//!
//! # Commands
//!
//! - `export`: Export a compartment as Terraform configuration
//! - `graph`: Render the association graph of an export step
//! - `types`: List the supported resource types
//! - `init`: Create an example configuration file
//! - `validate`: Validate a configuration file
//!
//! # Example Usage
//!
//! ```bash
//! # Export a compartment from a tenancy snapshot
//! oci-discovery export --snapshot tenancy.json --compartment-id ocid1.compartment.oc1..aaaa
//!
//! # Only the core and load balancer steps, with import blocks
//! oci-discovery export -s tenancy.json --services core,load_balancer --import-blocks
//!
//! # Generate a Mermaid diagram of the core step
//! oci-discovery graph core --format mermaid
//!
//! # Initialize configuration
//! oci-discovery init
//!
//! # Validate configuration
//! oci-discovery validate oci-discovery.yaml
//! ```

use crate::types::{GraphFormat, ReportFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// oci-discovery - export OCI compartments as Terraform configuration.
#[derive(Parser, Debug)]
#[command(
    name = "oci-discovery",
    author,
    version,
    about = "Export Oracle Cloud Infrastructure compartments as Terraform configuration",
    long_about = "oci-discovery walks the resources of a compartment service by service, \
                  resolves references between them and writes Terraform configuration \
                  in which OCIDs are replaced by references to the resources that own them."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "OCI_DISCOVERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a compartment as Terraform configuration
    #[command(visible_alias = "e")]
    Export(ExportArgs),

    /// Render the association graph of an export step
    #[command(visible_alias = "g")]
    Graph(GraphArgs),

    /// List the supported resource types
    Types(TypesArgs),

    /// Create an example configuration file
    Init,

    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Arguments for the export command.
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Tenancy snapshot to serve requests from (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    pub snapshot: PathBuf,

    /// OCID of the compartment to export
    #[arg(long, env = "OCI_COMPARTMENT_ID", value_name = "OCID")]
    pub compartment_id: Option<String>,

    /// Export steps to run (comma separated, default: all)
    #[arg(long, value_name = "STEP", value_delimiter = ',')]
    pub services: Vec<String>,

    /// Resource class patterns to render (comma separated globs, default: all)
    #[arg(short = 't', long = "types", value_name = "PATTERN", value_delimiter = ',')]
    pub resource_types: Vec<String>,

    /// Directory to write the configuration to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: ReportFormat,

    /// Report file path (stdout if not specified)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Also write import blocks (import.tf)
    #[arg(long)]
    pub import_blocks: bool,

    /// Record failing associations and keep exporting
    #[arg(long)]
    pub continue_on_error: bool,

    /// Do not parse the generated files back
    #[arg(long)]
    pub skip_validation: bool,

    /// Maximum attempts per request
    #[arg(long, value_name = "N")]
    pub retry_attempts: Option<u32>,
}

/// Arguments for the graph command.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Export step to render
    #[arg(value_name = "STEP")]
    pub step: String,

    /// Output format for the graph
    #[arg(short, long, default_value = "dot", value_enum)]
    pub format: GraphFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for the types command.
#[derive(Args, Debug)]
pub struct TypesArgs {
    /// Only list the types of these steps (comma separated)
    #[arg(long, value_name = "STEP", value_delimiter = ',')]
    pub services: Vec<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(value_name = "FILE", default_value = "oci-discovery.yaml")]
    pub config: PathBuf,
}
