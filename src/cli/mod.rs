//! CLI layer: argument parsing, logging setup and command dispatch.

pub mod args;

pub use args::*;

use clap::{Parser, Subcommand};

use xrefcheck::{scan_patch_targets, Assembly, Classification, Normalizer, RunOptions, XrefError};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Reconcile a metadata-derived call graph with the xref dump of a natively compiled build
#[derive(Parser, Debug)]
#[command(name = "xrefcheck", version, about, subcommand_negates_reqs = true, after_help = "\
Example: xrefcheck Assembly-CSharp.json xref_data.json -o xref_report.json")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub reconcile: ReconcileArgs,

    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// List methods targeted by [HarmonyPatch] attributes
    Patches(PatchesArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Some(Commands::Patches(args)) => cmd_patches(args),
        None => cmd_reconcile(cli.reconcile),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level {
        "error" => tracing::Level::ERROR,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::WARN,
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_reconcile(args: ReconcileArgs) -> Result<(), XrefError> {
    let (Some(metadata), Some(dump)) = (args.metadata, args.dump) else {
        return Err(XrefError::InvalidArgs(
            "usage: xrefcheck <METADATA> <DUMP> [-o <OUTPUT>]".to_string(),
        ));
    };
    let opts = RunOptions {
        metadata,
        dump,
        output: args.output,
        aliases: args.aliases,
    };
    let summary = xrefcheck::run_files(&opts)?;
    eprintln!("[reconcile] {}", summary);
    for classification in Classification::ALL {
        let n = summary.get(classification);
        if n > 0 {
            eprintln!("  {:<16} {}", classification, n);
        }
    }
    Ok(())
}

fn cmd_patches(args: PatchesArgs) -> Result<(), XrefError> {
    let normalizer = Normalizer::with_defaults()?;
    let assembly = Assembly::load(&args.metadata)?;
    let targets = scan_patch_targets(&assembly, &normalizer);
    eprintln!("[patches] {} patch targets in {}", targets.len(), args.metadata.display());
    println!("{}", serde_json::to_string_pretty(&targets)?);
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
