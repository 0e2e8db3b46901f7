//! Core data types for the method table.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

// ─── Tags ────────────────────────────────────────────────────────────

/// Classification tags attached to a method record. The last four are
/// terminal: the reconciler assigns exactly one of them to every record.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum MethodTag {
    Generic,
    CompilerGenerated,
    Property,
    Stripped,
    Matched,
    Inlined,
    UsedByInline,
}

impl MethodTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::CompilerGenerated => "compiler-generated",
            Self::Property => "property",
            Self::Stripped => "stripped",
            Self::Matched => "matched",
            Self::Inlined => "inlined",
            Self::UsedByInline => "used-by-inline",
        }
    }

    pub fn classification(&self) -> Option<Classification> {
        match self {
            Self::Stripped => Some(Classification::Stripped),
            Self::Matched => Some(Classification::Matched),
            Self::Inlined => Some(Classification::Inlined),
            Self::UsedByInline => Some(Classification::UsedByInline),
            _ => None,
        }
    }
}

impl std::fmt::Display for MethodTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for MethodTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "compiler-generated" => Ok(Self::CompilerGenerated),
            "property" => Ok(Self::Property),
            "stripped" => Ok(Self::Stripped),
            "matched" => Ok(Self::Matched),
            "inlined" => Ok(Self::Inlined),
            "used-by-inline" => Ok(Self::UsedByInline),
            other => Err(format!("Unknown method tag: '{}'", other)),
        }
    }
}

/// Outcome of reconciling one method against the dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// No counterpart in either dump index.
    Stripped,
    /// Counts equal and caller sets equal.
    Matched,
    /// Fewer external calls, or equal counts with shifted callers.
    Inlined,
    /// More external calls than internal ones.
    UsedByInline,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Self::Stripped,
        Self::Matched,
        Self::Inlined,
        Self::UsedByInline,
    ];

    pub fn tag(&self) -> MethodTag {
        match self {
            Self::Stripped => MethodTag::Stripped,
            Self::Matched => MethodTag::Matched,
            Self::Inlined => MethodTag::Inlined,
            Self::UsedByInline => MethodTag::UsedByInline,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.tag().as_str())
    }
}

// ─── Method Record ───────────────────────────────────────────────────

/// One indexed method. Field names are part of the report format.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct MethodRecord {
    pub return_type: String,
    pub internal_call_count: u64,
    pub external_call_count: u64,
    pub tags: BTreeSet<MethodTag>,
    pub internal_callers: BTreeSet<String>,
    pub external_callers: Vec<String>,
}

impl MethodRecord {
    pub fn new(return_type: String) -> Self {
        Self { return_type, ..Default::default() }
    }

    pub fn add_tag(&mut self, tag: MethodTag) {
        self.tags.insert(tag);
    }

    pub fn has_tag(&self, tag: MethodTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn record_internal_call(&mut self, caller: &str) {
        self.internal_call_count += 1;
        self.internal_callers.insert(caller.to_string());
    }

    pub fn classification(&self) -> Option<Classification> {
        self.tags.iter().find_map(|t| t.classification())
    }

    /// Set the terminal tag, replacing any earlier one.
    pub fn set_classification(&mut self, classification: Classification) {
        self.tags.retain(|t| t.classification().is_none());
        self.tags.insert(classification.tag());
    }
}

/// Canonical symbol → record.
pub type MethodTable = HashMap<String, MethodRecord>;

/// Generated state-machine type → canonical symbol of the method that owns it.
pub type StateMachineMap = HashMap<String, String>;
