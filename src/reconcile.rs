//! Reconciliation of the metadata-derived table against the xref dump.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::normalize::Normalizer;
use crate::types::{Classification, MethodRecord, MethodTable};
use crate::xref::{excluded_dump_prefix, XrefDump, XrefEntry};

/// Per-classification totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub stripped: usize,
    pub matched: usize,
    pub inlined: usize,
    pub used_by_inline: usize,
}

impl ReconcileSummary {
    fn count(&mut self, classification: Classification) {
        match classification {
            Classification::Stripped => self.stripped += 1,
            Classification::Matched => self.matched += 1,
            Classification::Inlined => self.inlined += 1,
            Classification::UsedByInline => self.used_by_inline += 1,
        }
    }

    pub fn get(&self, classification: Classification) -> usize {
        match classification {
            Classification::Stripped => self.stripped,
            Classification::Matched => self.matched,
            Classification::Inlined => self.inlined,
            Classification::UsedByInline => self.used_by_inline,
        }
    }

    pub fn total(&self) -> usize {
        self.stripped + self.matched + self.inlined + self.used_by_inline
    }
}

impl std::fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} methods: {} matched, {} inlined, {} used-by-inline, {} stripped",
            self.total(),
            self.matched,
            self.inlined,
            self.used_by_inline,
            self.stripped
        )
    }
}

/// Classify one record against its dump entry (if any) and copy the
/// external count and callers into it.
pub fn reconcile_record(record: &mut MethodRecord, entry: Option<&XrefEntry>, normalizer: &Normalizer) -> Classification {
    let Some(entry) = entry else {
        record.set_classification(Classification::Stripped);
        return Classification::Stripped;
    };

    record.external_call_count = entry.call_count;
    record.external_callers = entry.usages.clone();

    let classification = match entry.call_count.cmp(&record.internal_call_count) {
        std::cmp::Ordering::Less => Classification::Inlined,
        std::cmp::Ordering::Greater => Classification::UsedByInline,
        std::cmp::Ordering::Equal => {
            let internal: BTreeSet<String> = record
                .internal_callers
                .iter()
                .map(|c| normalizer.normalize_dump_key(c))
                .collect();
            let external: BTreeSet<String> = entry
                .usages
                .iter()
                .map(|c| normalizer.normalize_dump_key(c))
                .collect();
            // Same totals but shifted callers: some call sites were inlined.
            if internal == external {
                Classification::Matched
            } else {
                Classification::Inlined
            }
        }
    };
    record.set_classification(classification);
    classification
}

/// Reconcile every method in the table, in symbol order.
pub fn reconcile(methods: &mut MethodTable, dump: &XrefDump, normalizer: &Normalizer) -> ReconcileSummary {
    let mut symbols: Vec<String> = methods.keys().cloned().collect();
    symbols.sort();

    let mut summary = ReconcileSummary::default();
    for symbol in symbols {
        let Some(record) = methods.get_mut(&symbol) else { continue };
        let key = normalizer.normalize_dump_key(&symbol);
        let classification = reconcile_record(record, dump.lookup(&key), normalizer);
        debug!(symbol = %symbol, key = %key, classification = %classification, "reconciled");
        if classification == Classification::Stripped {
            if let Some(prefix) = excluded_dump_prefix(&key) {
                debug!(symbol = %symbol, prefix, "stripped method is in a namespace the dump never lists");
            }
        }
        summary.count(classification);
    }

    info!(
        total = summary.total(),
        matched = summary.matched,
        inlined = summary.inlined,
        used_by_inline = summary.used_by_inline,
        stripped = summary.stripped,
        "reconciliation done"
    );
    summary
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
