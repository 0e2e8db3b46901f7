//! CLI argument structs.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
pub struct ReconcileArgs {
    /// Metadata export of the debug-naming build (JSON)
    #[arg(required = true)]
    pub metadata: Option<PathBuf>,

    /// Xref dump of the natively compiled build (JSON)
    #[arg(required = true)]
    pub dump: Option<PathBuf>,

    /// Report output path
    #[arg(short, long, default_value = xrefcheck::DEFAULT_REPORT_NAME)]
    pub output: PathBuf,

    /// Extra type aliases: JSON object of full name → alias
    #[arg(long)]
    pub aliases: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PatchesArgs {
    /// Metadata export to scan for patch attributes (JSON)
    pub metadata: PathBuf,
}
