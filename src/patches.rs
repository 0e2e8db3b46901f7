//! Patch target scanner: lists the methods rewritten by `[HarmonyPatch]`
//! attributes. A pure attribute match, no graph work.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::metadata::{Attribute, MetadataSource};
use crate::normalize::Normalizer;

pub const HARMONY_PATCH_ATTRIBUTE: &str = "HarmonyLib.HarmonyPatch";

#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "PascalCase")]
pub struct PatchTarget {
    /// `Type::Method` of the patched method.
    pub target: String,
    /// Type that declares the patch.
    pub patch_type: String,
}

/// Partial target from one attribute; class-level attributes fill the gaps
/// left by method-level ones.
#[derive(Debug, Default, Clone)]
struct PatchSpec<'a> {
    target_type: Option<&'a str>,
    method: Option<&'a str>,
}

impl<'a> PatchSpec<'a> {
    fn from_attributes(attributes: &'a [Attribute]) -> Self {
        let mut spec = PatchSpec::default();
        for attr in attributes.iter().filter(|a| a.type_name == HARMONY_PATCH_ATTRIBUTE) {
            spec.target_type = spec.target_type.or(attr.type_argument());
            spec.method = spec.method.or(attr.string_argument());
        }
        spec
    }

    fn or(&self, fallback: &PatchSpec<'a>) -> PatchSpec<'a> {
        PatchSpec {
            target_type: self.target_type.or(fallback.target_type),
            method: self.method.or(fallback.method),
        }
    }

    fn has_patch(&self) -> bool {
        self.target_type.is_some() || self.method.is_some()
    }
}

/// Collect all patch targets, sorted and de-duplicated.
pub fn scan_patch_targets<S: MetadataSource + ?Sized>(source: &S, normalizer: &Normalizer) -> Vec<PatchTarget> {
    let mut targets = BTreeSet::new();
    for ty in source.types() {
        let class_spec = PatchSpec::from_attributes(&ty.attributes);
        let patch_type = normalizer.normalize(&ty.full_name);
        let mut push = |spec: &PatchSpec<'_>| {
            if let (Some(t), Some(m)) = (spec.target_type, spec.method) {
                targets.insert(PatchTarget {
                    target: format!("{}::{}", normalizer.open_type(t), normalizer.normalize(m)),
                    patch_type: patch_type.clone(),
                });
            }
        };

        let mut method_level = false;
        for method in &ty.methods {
            let spec = PatchSpec::from_attributes(&method.attributes);
            if spec.has_patch() {
                method_level = true;
                push(&spec.or(&class_spec));
            }
        }
        if !method_level {
            push(&class_spec);
        }
    }
    targets.into_iter().collect()
}
