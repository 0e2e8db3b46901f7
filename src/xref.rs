//! Usage dump from the optimized build: symbol → { CallCount, Usages }.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::normalize::Normalizer;
use crate::XrefError;

/// Namespaces the disassembler script never writes to the dump. Methods
/// under these prefixes have no dump entry and come out `stripped`.
pub const EXCLUDED_DUMP_PREFIXES: &[&str] = &[
    "UnityEngine::", "Unity::", "UnityEngineInternal::", "Microsoft::VisualBasic",
    "System::", "Mono::", "MS::Internal", "Microsoft::Win32", "Interop::",
    "Epic::", "Sentry::", "Steamworks::", "Newtonsoft::Json:", "TMPro::",
    "PolyfillExtensions::", "Microsoft::CSharp", "Internal::", "Interop_SspiCli::",
    "std::",
];

/// The excluded namespace prefix `key` falls under, if any.
pub fn excluded_dump_prefix(key: &str) -> Option<&'static str> {
    EXCLUDED_DUMP_PREFIXES.iter().copied().find(|p| key.starts_with(p))
}

/// External call count plus callers, in the dump's own spelling.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct XrefEntry {
    #[serde(rename = "CallCount")]
    pub call_count: u64,
    #[serde(rename = "Usages", default)]
    pub usages: Vec<String>,
}

impl XrefEntry {
    /// Sum counts and append callers not seen yet, keeping first-seen order.
    fn merge(&mut self, other: &XrefEntry) {
        self.call_count += other.call_count;
        for caller in &other.usages {
            if !self.usages.contains(caller) {
                self.usages.push(caller.clone());
            }
        }
    }
}

/// The dump, keyed by normalized dump symbol, plus a secondary index that
/// groups generic instantiations under their collapsed form.
#[derive(Debug, Default)]
pub struct XrefDump {
    entries: HashMap<String, XrefEntry>,
    collapsed: HashMap<String, XrefEntry>,
}

impl XrefDump {
    /// Build both indexes. Raw keys are processed in sorted order; when two
    /// keys normalize to the same symbol the first one wins.
    pub fn from_entries(raw: BTreeMap<String, XrefEntry>, normalizer: &Normalizer) -> Self {
        let mut entries: HashMap<String, XrefEntry> = HashMap::with_capacity(raw.len());
        for (key, entry) in raw {
            let normalized = normalizer.normalize_dump_key(&key);
            if entries.contains_key(&normalized) {
                debug!(key = %key, normalized = %normalized, "duplicate dump key ignored");
                continue;
            }
            entries.insert(normalized, entry);
        }

        let mut collapsed: HashMap<String, XrefEntry> = HashMap::new();
        let mut generic_keys: Vec<&String> = entries.keys().filter(|k| k.contains('<')).collect();
        generic_keys.sort();
        for key in generic_keys {
            collapsed
                .entry(normalizer.collapse_generics(key))
                .or_default()
                .merge(&entries[key]);
        }

        Self { entries, collapsed }
    }

    pub fn from_json(json: &str, normalizer: &Normalizer) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, XrefEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(raw, normalizer))
    }

    /// Load a dump file. Any parse failure is fatal for the run.
    pub fn load(path: &Path, normalizer: &Normalizer) -> Result<Self, XrefError> {
        if !path.exists() {
            return Err(XrefError::InputNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let dump = Self::from_json(&text, normalizer).map_err(|source| XrefError::MalformedDump {
            path: path.display().to_string(),
            source,
        })?;
        info!(
            path = %path.display(),
            entries = dump.entries.len(),
            collapsed = dump.collapsed.len(),
            "xref dump loaded"
        );
        Ok(dump)
    }

    /// Look up a normalized dump key, falling back to the collapsed index.
    pub fn lookup(&self, key: &str) -> Option<&XrefEntry> {
        self.entries.get(key).or_else(|| self.collapsed.get(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn collapsed_len(&self) -> usize {
        self.collapsed.len()
    }
}
