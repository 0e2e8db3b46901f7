//! Symbol normalization: canonical spelling shared by both naming dialects.
//!
//! Metadata names (`System.Collections.Generic.List`1`, `Outer/Inner`, `.ctor`)
//! and demangled dump names (`Outer::Inner::_ctor`) are rewritten into one
//! canonical `Type::Member(Params)` form. Every rewrite is a [`RewriteRule`]
//! applied in order, so each one can be tested on its own.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use regex::{Captures, Regex};

use crate::XrefError;

/// Well-known primitive full names and their short aliases.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("System.Boolean", "bool"),
    ("System.Byte", "byte"),
    ("System.SByte", "sbyte"),
    ("System.Char", "char"),
    ("System.Int16", "short"),
    ("System.UInt16", "ushort"),
    ("System.Int32", "int"),
    ("System.UInt32", "uint"),
    ("System.Int64", "long"),
    ("System.UInt64", "ulong"),
    ("System.Single", "float"),
    ("System.Double", "double"),
    ("System.Decimal", "decimal"),
    ("System.String", "string"),
    ("System.Object", "object"),
    ("System.Void", "void"),
    ("System.IntPtr", "nint"),
    ("System.UIntPtr", "nuint"),
];

/// Placeholder for an empty parameter list.
pub const VOID_PARAMS: &str = "void";

/// Tokens the structural rules emit. Alias keys may not contain them, or a
/// second normalization could alias text the first one produced.
const RESERVED_TOKENS: &[&str] = &["T", "_ctor", "_cctor"];

// ─── Configuration ───────────────────────────────────────────────────

/// Immutable configuration threaded into a [`Normalizer`].
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Full type name → alias. Checked by [`Normalizer::new`]: an alias may
    /// not reuse a word of any full name in the table.
    pub aliases: Vec<(String, String)>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(full, short)| (full.to_string(), short.to_string()))
                .collect(),
        }
    }
}

impl NormalizerConfig {
    /// Add aliases from a JSON object `{ "Full.Name": "alias" }`.
    /// Entries for names already in the table replace the existing alias.
    pub fn with_aliases_file(mut self, path: &Path) -> Result<Self, XrefError> {
        if !path.exists() {
            return Err(XrefError::InputNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let extra: BTreeMap<String, String> = serde_json::from_str(&text)?;
        for (full, short) in extra {
            match self.aliases.iter_mut().find(|(f, _)| *f == full) {
                Some(existing) => existing.1 = short,
                None => self.aliases.push((full, short)),
            }
        }
        Ok(self)
    }
}

// ─── Rewrite rules ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Replacement {
    /// `regex` replacement template (`$1` expands captures).
    Template(String),
    /// Dotted full name → alias, looked up per match.
    Lookup(HashMap<String, String>),
}

/// One ordered `(pattern, replacement)` rewrite.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub name: String,
    pattern: Regex,
    replacement: Replacement,
}

impl RewriteRule {
    pub fn new(name: &str, pattern: &str, replacement: &str) -> Result<Self, XrefError> {
        Ok(Self {
            name: name.to_string(),
            pattern: compile(pattern)?,
            replacement: Replacement::Template(replacement.to_string()),
        })
    }

    /// One rule for the whole alias table. Every full name is an alternative
    /// of a single regex, so an alias is never matched against the output of
    /// another alias.
    fn aliases(aliases: &[(String, String)]) -> Result<Self, XrefError> {
        let mut keys: Vec<&str> = aliases.iter().map(|(full, _)| full.as_str()).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let sep = r"(?:\.|::|/)";
        let alternatives: Vec<String> = keys
            .iter()
            .map(|full| full.split('.').map(regex::escape).collect::<Vec<_>>().join(sep))
            .collect();
        Ok(Self {
            name: "aliases".to_string(),
            pattern: compile(&format!(r"\b(?:{})\b", alternatives.join("|")))?,
            replacement: Replacement::Lookup(aliases.iter().cloned().collect()),
        })
    }

    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        match &self.replacement {
            Replacement::Template(template) => self.pattern.replace_all(input, template.as_str()),
            Replacement::Lookup(table) => self.pattern.replace_all(input, |caps: &Captures<'_>| {
                let matched = &caps[0];
                table
                    .get(&dotted(matched))
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            }),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, XrefError> {
    Regex::new(pattern).map_err(|source| XrefError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// `System::Int32` / `System/Int32` → `System.Int32`.
fn dotted(name: &str) -> String {
    name.replace("::", ".").replace('/', ".")
}

/// Maximal runs of word characters, the units `\b` sees.
fn word_tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '_')).filter(|t| !t.is_empty())
}

/// One left-to-right pass over `rules`.
fn apply_rules(rules: &[RewriteRule], input: &str) -> String {
    let mut current = input.to_string();
    for rule in rules {
        let rewritten = match rule.apply(&current) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(s) = rewritten {
            current = s;
        }
    }
    current
}

/// Repeat `rules` until the text stops changing. Only valid for rules that
/// strictly shrink their input.
fn apply_rules_until_stable(rules: &[RewriteRule], input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = apply_rules(rules, &current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Check the alias table and bring it into the form the alias rule matches:
/// dotted arity-free keys, values already in canonical spelling.
///
/// A value may not share a word with any key, and a key may not contain a
/// token the structural rules emit. Either would let a second normalization
/// rewrite what the first one produced.
fn prepare_aliases(
    aliases: &[(String, String)],
    arity: &RewriteRule,
    structural: &[RewriteRule],
) -> Result<Vec<(String, String)>, XrefError> {
    let mut prepared: Vec<(String, String)> = Vec::with_capacity(aliases.len());
    for (full, short) in aliases {
        let key = arity.apply(&dotted(full)).into_owned();
        if key.is_empty() || short.is_empty() {
            return Err(XrefError::InvalidArgs(format!("Empty alias entry: '{}' -> '{}'", full, short)));
        }
        if short.chars().any(char::is_whitespace) {
            return Err(XrefError::InvalidArgs(format!("Alias for '{}' contains whitespace: '{}'", full, short)));
        }
        if short.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(XrefError::InvalidArgs(format!("Alias for '{}' starts with a digit: '{}'", full, short)));
        }
        if let Some(token) = word_tokens(&key)
            .find(|t| RESERVED_TOKENS.contains(t) || t.ends_with("_ctor"))
        {
            return Err(XrefError::InvalidArgs(format!(
                "Alias key '{}' contains reserved name '{}'", full, token
            )));
        }
        let value = apply_rules(structural, &arity.apply(short));
        match prepared.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => prepared.push((key, value)),
        }
    }

    let key_tokens: HashSet<&str> = prepared.iter().flat_map(|(k, _)| word_tokens(k)).collect();
    for (key, value) in &prepared {
        if let Some(token) = word_tokens(value).find(|t| key_tokens.contains(t)) {
            return Err(XrefError::InvalidArgs(format!(
                "Alias '{}' -> '{}' would be aliased again: '{}' is part of an alias key",
                key, value, token
            )));
        }
    }
    Ok(prepared)
}

/// Index of the last space in `prefix` outside `<...>`.
fn last_top_level_space(prefix: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut last = None;
    for (i, c) in prefix.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ' ' if depth <= 0 => last = Some(i),
            _ => {}
        }
    }
    last
}

/// Drop the return type and calling convention a demangler puts before the
/// qualified name (`public: void __cdecl Game::Player::Update(void)`).
fn strip_declaration_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(first_scope) = trimmed.find("::") else {
        return trimmed;
    };
    match last_top_level_space(&trimmed[..first_scope]) {
        Some(space) => &trimmed[space + 1..],
        None => trimmed,
    }
}

// ─── Normalizer ──────────────────────────────────────────────────────

pub struct Normalizer {
    canonical_rules: Vec<RewriteRule>,
    dump_rules: Vec<RewriteRule>,
    array_out_param: RewriteRule,
    array_getter: Regex,
    whitespace: Regex,
    generic_method: Regex,
    generic_scope: Regex,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("canonical_rules", &self.canonical_rules.len())
            .field("dump_rules", &self.dump_rules.len())
            .finish()
    }
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self, XrefError> {
        let arity = RewriteRule::new("generic-arity", r"`\d+", "")?;
        let structural = vec![
            RewriteRule::new("static-ctor", r"\.cctor\b", "_cctor")?,
            RewriteRule::new("instance-ctor", r"\.ctor\b", "_ctor")?,
            RewriteRule::new("generic-enum", r"\bTEnum\b", "T")?,
            RewriteRule::new("scope-separator", r"[./]", "::")?,
        ];
        let aliases = prepare_aliases(&config.aliases, &arity, &structural)?;

        // Arity markers go first: `Sys`1tem.Int32` must reach the alias rule
        // as `System.Int32`.
        let mut canonical_rules = Vec::with_capacity(structural.len() + 2);
        canonical_rules.push(arity);
        if !aliases.is_empty() {
            canonical_rules.push(RewriteRule::aliases(&aliases)?);
        }
        canonical_rules.extend(structural);

        let dump_rules = vec![
            RewriteRule::new("empty-diamond", r"<>", "__")?,
            RewriteRule::new("iterator-state-machine", r"<(\w+)>d__", "_${1}_d__")?,
            RewriteRule::new("lambda-display-class", r"<(\w+)>b__", "_${1}_b__")?,
        ];

        Ok(Self {
            canonical_rules,
            dump_rules,
            array_out_param: RewriteRule::new("array-out-param", r"(?:\[\])?&", "[]&")?,
            array_getter: compile(r"TryGet.*Array")?,
            whitespace: compile(r"\s+")?,
            generic_method: compile(r"^(?P<prefix>[^(]*)<(?P<arg>[^<>()]+)>\((?P<params>.*)\)$")?,
            generic_scope: compile(r"<[^<>()]*>::")?,
        })
    }

    /// Normalizer with the default alias table.
    pub fn with_defaults() -> Result<Self, XrefError> {
        Self::new(&NormalizerConfig::default())
    }

    pub fn canonical_rules(&self) -> &[RewriteRule] {
        &self.canonical_rules
    }

    pub fn dump_rules(&self) -> &[RewriteRule] {
        &self.dump_rules
    }

    /// Canonical spelling of a raw symbol from either dialect. Idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        apply_rules(&self.canonical_rules, raw)
    }

    /// Like [`normalize`](Self::normalize), but normalizes each argument of a
    /// generic instance (`Base<A,B>`) on its own before rejoining.
    pub fn normalize_param_type(&self, raw: &str) -> String {
        let Some(open) = instantiation_start(raw) else {
            return self.normalize(raw);
        };
        let base = &raw[..open];
        let inner = &raw[open + 1..raw.len() - 1];
        let args: Vec<String> = split_top_level(inner)
            .into_iter()
            .map(|a| self.normalize_param_type(a.trim()))
            .collect();
        format!("{}<{}>", self.normalize(base), args.join(","))
    }

    /// Normalized type name with any trailing generic instantiation dropped,
    /// so `Outer/<Run>d__4`1<System.Int32>` and `Outer/<Run>d__4`1` agree.
    pub fn open_type(&self, raw: &str) -> String {
        let normalized = self.normalize(raw);
        match instantiation_start(&normalized) {
            Some(idx) => normalized[..idx].to_string(),
            None => normalized,
        }
    }

    /// Canonical method symbol: `Type::Name(P1,P2)` or `Type::Name(void)`.
    pub fn method_symbol<S: AsRef<str>>(&self, declaring_type: &str, name: &str, parameters: &[S]) -> String {
        let params = if parameters.is_empty() {
            VOID_PARAMS.to_string()
        } else {
            parameters
                .iter()
                .map(|p| self.normalize_param_type(p.as_ref()))
                .collect::<Vec<_>>()
                .join(",")
        };
        format!("{}::{}({})", self.open_type(declaring_type), self.normalize(name), params)
    }

    /// Spelling used by the optimized build's dump. Drops a demangler's
    /// return type and calling convention, removes whitespace, applies
    /// [`normalize`](Self::normalize) and then rewrites compiler-generated
    /// markers the native compiler spells differently. Idempotent.
    ///
    /// `TryGet...Array` out parameters are demangled as `T&`; they are
    /// rewritten to the `T[]&` the metadata declares.
    pub fn normalize_dump_key(&self, raw: &str) -> String {
        let declared = strip_declaration_prefix(raw);
        let compact = self.whitespace.replace_all(declared, "");
        let canonical = self.normalize(&compact);
        let spliced = splice_generated_member(&canonical);
        let key = apply_rules_until_stable(&self.dump_rules, &spliced);
        if self.array_getter.is_match(&key) {
            self.array_out_param.apply(&key).into_owned()
        } else {
            key
        }
    }

    /// Collapse a generic instantiation for cross-dialect matching.
    ///
    /// `Foo<Bar>(Bar,int)` → `Foo(T,int)`; `List<int>::Add(int)` → `List::Add(int)`.
    pub fn collapse_generics(&self, symbol: &str) -> String {
        if let Some(caps) = self.generic_method.captures(symbol) {
            let arg = &caps["arg"];
            return format!("{}({})", &caps["prefix"], caps["params"].replace(arg, "T"));
        }
        let mut current = symbol.to_string();
        loop {
            let next = self.generic_scope.replace_all(&current, "::");
            if next == current {
                return current;
            }
            current = next.into_owned();
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Split on commas that are not nested inside `<...>`.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Index of the `<` opening a trailing instantiation, if the name has one.
/// A bracket that starts a name segment (`<Module>`, `Outer::<Run>d__4`) is
/// part of a generated name, not an instantiation.
fn instantiation_start(name: &str) -> Option<usize> {
    if !name.ends_with('>') {
        return None;
    }
    let mut depth = 0i32;
    for (i, c) in name.char_indices().rev() {
        match c {
            '>' => depth += 1,
            '<' => {
                depth -= 1;
                if depth == 0 {
                    let prev = name[..i].chars().next_back()?;
                    return (prev.is_alphanumeric() || prev == '_' || prev == '`').then_some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Re-splice members of generated types (`<Run>d__4::Name`): the generated
/// suffix stays on the type and the remaining scopes of the member name are
/// flattened with underscores, the way the native compiler emits them.
fn splice_generated_member(symbol: &str) -> String {
    let Some(marker) = symbol.find(">d") else {
        return symbol.to_string();
    };
    let params_start = symbol.find('(').unwrap_or(symbol.len());
    let Some(rel) = symbol[marker..].find("::") else {
        return symbol.to_string();
    };
    let sep = marker + rel;
    if sep > params_start {
        return symbol.to_string();
    }
    let type_part = &symbol[..sep];
    let member = &symbol[sep + 2..params_start];
    let params = &symbol[params_start..];
    format!("{}::{}{}", type_part, member.replace("::", "_"), params)
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
