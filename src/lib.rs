//! # xrefcheck — call-graph reconciliation for ahead-of-time compiled builds
//!
//! Compares the call graph derived from full-fidelity assembly metadata with
//! the xref dump of the natively compiled build and classifies every method
//! as `matched`, `inlined`, `used-by-inline` or `stripped`.
//!
//! ## Library usage
//!
//! The crate is primarily a CLI tool, but the pipeline stages are exposed
//! for integration tests and benchmarks.

use std::path::{Path, PathBuf};

pub mod callgraph;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod patches;
pub mod reconcile;
pub mod report;
pub mod types;
pub mod xref;

#[cfg(test)]
pub(crate) mod test_utils;

pub use callgraph::{build_call_graph, BuildStats, CallGraph, CallGraphBuilder};
pub use error::XrefError;
pub use metadata::{Assembly, MetadataSource};
pub use normalize::{Normalizer, NormalizerConfig};
pub use patches::{scan_patch_targets, PatchTarget};
pub use reconcile::{reconcile, ReconcileSummary};
pub use report::Report;
pub use types::{Classification, MethodRecord, MethodTable, MethodTag};
pub use xref::{XrefDump, XrefEntry};

/// Default report file name, written to the working directory.
pub const DEFAULT_REPORT_NAME: &str = "xref_report.json";

/// Build the call graph for `source` and reconcile it against `dump`.
pub fn analyze<S: MetadataSource + ?Sized>(
    source: &S,
    dump: &XrefDump,
    normalizer: &Normalizer,
) -> (Report, ReconcileSummary) {
    let mut graph = build_call_graph(source, normalizer);
    let summary = reconcile(&mut graph.methods, dump, normalizer);
    (Report::from_table(graph.methods), summary)
}

/// Inputs for one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub metadata: PathBuf,
    pub dump: PathBuf,
    pub output: PathBuf,
    pub aliases: Option<PathBuf>,
}

/// Full run: validate inputs, load both sides, reconcile, write the report.
/// Nothing is written unless every earlier step succeeded.
pub fn run_files(opts: &RunOptions) -> Result<ReconcileSummary, XrefError> {
    for path in [&opts.metadata, &opts.dump] {
        require_file(path)?;
    }

    let mut config = NormalizerConfig::default();
    if let Some(aliases) = &opts.aliases {
        config = config.with_aliases_file(aliases)?;
    }
    let normalizer = Normalizer::new(&config)?;

    let assembly = Assembly::load(&opts.metadata)?;
    let dump = XrefDump::load(&opts.dump, &normalizer)?;
    let (report, summary) = analyze(&assembly, &dump, &normalizer);
    report.save(&opts.output)?;
    Ok(summary)
}

fn require_file(path: &Path) -> Result<(), XrefError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(XrefError::InputNotFound(path.display().to_string()))
    }
}
