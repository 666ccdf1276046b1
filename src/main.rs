//! oci-discovery CLI entry point.
//!
//! This binary provides the command-line interface for oci-discovery.

use clap::Parser;
use oci_discovery::cli::{Cli, Commands, ExportArgs, GraphArgs, TypesArgs};
use oci_discovery::error::distinct_causes;
use oci_discovery::graph::{export_graph, AssociationGraph};
use oci_discovery::reporter::{types_table, Reporter};
use oci_discovery::types::ResourceTypeInfo;
use oci_discovery::{Config, Exporter, OciDiscoveryError, Registry};
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");

            eprintln!("Error: {e}");

            // Cause chain, minus causes the message already shows
            let root: &(dyn Error + 'static) = e.as_ref();
            let causes = distinct_causes(root);
            if !causes.is_empty() {
                eprintln!("\nCaused by:");
                for (i, cause) in causes.iter().enumerate() {
                    eprintln!("  {i}: {cause}");
                }
            }

            let code = e
                .downcast_ref::<OciDiscoveryError>()
                .map_or(1, OciDiscoveryError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let base_level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(format!("warn,oci_discovery={base_level}"))
        })
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::debug!("Loading configuration");
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!("Configuration loaded successfully");

    match cli.command {
        Commands::Export(args) => export(config, &args, cli.quiet).await,
        Commands::Graph(args) => graph(&args),
        Commands::Types(args) => types(&args),

        Commands::Init => {
            let config_path = Path::new("oci-discovery.yaml");
            if config_path.exists() {
                anyhow::bail!("Configuration file already exists: {}", config_path.display());
            }

            std::fs::write(config_path, Config::example_yaml())?;
            println!("Created example configuration: {}", config_path.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Validate(args) => {
            let config_content = std::fs::read_to_string(&args.config)?;
            match Config::from_yaml(&config_content).and_then(|config| config.validate()) {
                Ok(()) => {
                    println!("Configuration is valid: {}", args.config.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

async fn export(mut config: Config, args: &ExportArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    config.merge_cli_args(args);
    config.validate()?;

    let exporter = Exporter::from_snapshot(config.clone(), &args.snapshot)?.show_progress(!quiet);
    let result = exporter.export_to_disk().await?;
    tracing::info!(dir = %config.export.output_dir.display(), "Configuration written");

    let report = Reporter::new(&config).generate(&result, args.format)?;
    if let Some(report_path) = &args.report {
        std::fs::write(report_path, &report)?;
        tracing::info!(path = %report_path.display(), "Report written");
    } else if !quiet {
        println!("{report}");
    }

    Ok(if result.summary.has_errors() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn graph(args: &GraphArgs) -> anyhow::Result<ExitCode> {
    let registry = Registry::builtin()?;
    let step = registry.step(&args.step)?;
    let graph_output = export_graph(&AssociationGraph::from_step(step), args.format)?;

    if let Some(output_path) = &args.output {
        std::fs::write(output_path, &graph_output)?;
        tracing::info!(path = %output_path.display(), "Graph written");
    } else {
        println!("{graph_output}");
    }
    Ok(ExitCode::SUCCESS)
}

fn types(args: &TypesArgs) -> anyhow::Result<ExitCode> {
    let registry = Registry::builtin()?;
    let types: Vec<_> = ResourceTypeInfo::from_registry(&registry)
        .into_iter()
        .filter(|info| {
            args.services.is_empty()
                || info
                    .step
                    .as_ref()
                    .is_some_and(|step| args.services.contains(step))
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&types)?);
    } else {
        println!("{}", types_table(&types));
    }
    Ok(ExitCode::SUCCESS)
}
