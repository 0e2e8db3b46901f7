//! Metadata walker boundary: the assembly model the call-graph builder consumes.
//!
//! The metadata reader itself is external. It exports one assembly as JSON
//! (types, nested types, methods, custom attributes and instruction streams),
//! and this module deserializes that export into [`Assembly`]. Anything that
//! can hand out [`TypeDef`]s implements [`MetadataSource`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::XrefError;

// ─── Walker capability ───────────────────────────────────────────────

/// Source of declared types for one assembly.
pub trait MetadataSource {
    /// Top-level types only. Nested types hang off their declaring type.
    fn top_level_types(&self) -> &[TypeDef];

    /// Every type including nested ones, in declaration order (pre-order).
    fn types(&self) -> TypeWalker<'_> {
        TypeWalker::new(self.top_level_types())
    }
}

/// Pre-order walk over a type tree using an explicit stack, so deeply
/// nested generated types never hit a recursion limit.
pub struct TypeWalker<'a> {
    stack: Vec<&'a TypeDef>,
}

impl<'a> TypeWalker<'a> {
    pub fn new(roots: &'a [TypeDef]) -> Self {
        Self { stack: roots.iter().rev().collect() }
    }
}

impl<'a> Iterator for TypeWalker<'a> {
    type Item = &'a TypeDef;

    fn next(&mut self) -> Option<Self::Item> {
        let ty = self.stack.pop()?;
        self.stack.extend(ty.nested_types.iter().rev());
        Some(ty)
    }
}

// ─── Assembly model ──────────────────────────────────────────────────

/// One assembly as written by the metadata exporter.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

impl Assembly {
    /// Load a metadata export from disk.
    pub fn load(path: &Path) -> Result<Self, XrefError> {
        if !path.exists() {
            return Err(XrefError::InputNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| XrefError::MalformedMetadata {
            path: path.display().to_string(),
            source,
        })
    }
}

impl MetadataSource for Assembly {
    fn top_level_types(&self) -> &[TypeDef] {
        &self.types
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    /// Full name in metadata spelling, e.g. `Game.Player/<Run>d__4`.
    pub full_name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub nested_types: Vec<TypeDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MethodDef {
    pub name: String,
    /// Parameter type full names, in order.
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    /// Number of method-level generic parameters.
    #[serde(default)]
    pub generic_arity: u32,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub is_special_name: bool,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// `None` for abstract, extern and interface methods.
    #[serde(default)]
    pub body: Option<Vec<Instruction>>,
}

fn default_return_type() -> String {
    "System.Void".to_string()
}

impl MethodDef {
    pub fn is_generic(&self) -> bool {
        self.generic_arity > 0
    }

    /// Property accessor: special-named and starting with `get_`/`set_`.
    /// Only a leading prefix counts; `Reset_State` or `Target_get_X` are plain methods.
    pub fn is_property_accessor(&self) -> bool {
        self.is_special_name && (self.name.starts_with("get_") || self.name.starts_with("set_"))
    }
}

// ─── Attributes ──────────────────────────────────────────────────────

/// A custom attribute: its type plus constructor argument values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub arguments: Vec<AttributeArgument>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AttributeArgument {
    Type(String),
    String(String),
    Int(i64),
    Bool(bool),
}

impl Attribute {
    /// First `typeof(...)` constructor argument.
    pub fn type_argument(&self) -> Option<&str> {
        self.arguments.iter().find_map(|a| match a {
            AttributeArgument::Type(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// First string constructor argument.
    pub fn string_argument(&self) -> Option<&str> {
        self.arguments.iter().find_map(|a| match a {
            AttributeArgument::String(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

pub fn find_attribute<'a>(attributes: &'a [Attribute], type_name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.type_name == type_name)
}

pub fn has_attribute(attributes: &[Attribute], type_name: &str) -> bool {
    find_attribute(attributes, type_name).is_some()
}

// ─── Instructions ────────────────────────────────────────────────────

/// Opcode categories the graph builder cares about. Everything else is `Other`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OpCode {
    Call,
    Callvirt,
    Newobj,
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Instruction {
    pub opcode: OpCode,
    #[serde(default)]
    pub operand: Option<Operand>,
}

impl Instruction {
    /// The method operand, if the exporter could resolve one.
    pub fn method_operand(&self) -> Option<&MethodRef> {
        match &self.operand {
            Some(Operand::Method(m)) => Some(m),
            _ => None,
        }
    }
}

/// An instruction operand. Anything that is not a resolvable method
/// reference (field tokens, strings, unresolved cross-assembly refs)
/// lands in `Other`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Operand {
    Method(MethodRef),
    Other(serde_json::Value),
}

/// Resolved target of a call or construction instruction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}
