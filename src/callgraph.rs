//! Call graph construction from a method's instruction stream.
//!
//! Two passes over every declared type:
//! 1. index non-constructor methods and map each generated state-machine
//!    type to the iterator/async method that owns it;
//! 2. scan bodies for calls and constructions, crediting callees and
//!    attributing state-machine constructions to their owning method.

use tracing::{debug, info};

use crate::metadata::{find_attribute, has_attribute, MetadataSource, MethodDef, OpCode, TypeDef};
use crate::normalize::Normalizer;
use crate::types::{MethodRecord, MethodTable, MethodTag, StateMachineMap};

pub const COMPILER_GENERATED_ATTRIBUTE: &str = "System.Runtime.CompilerServices.CompilerGeneratedAttribute";

/// Attributes whose single `typeof(...)` argument names a generated state machine.
pub const STATE_MACHINE_ATTRIBUTES: &[&str] = &[
    "System.Runtime.CompilerServices.IteratorStateMachineAttribute",
    "System.Runtime.CompilerServices.AsyncStateMachineAttribute",
    "System.Runtime.CompilerServices.AsyncIteratorStateMachineAttribute",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildStats {
    pub types: usize,
    pub methods_indexed: usize,
    pub duplicates_ignored: usize,
    pub state_machines: usize,
    pub direct_calls: usize,
    pub state_machine_calls: usize,
    pub self_constructions_skipped: usize,
    pub unresolved_operands: usize,
}

/// Output of both passes: the method table plus the state-machine map.
#[derive(Debug, Default)]
pub struct CallGraph {
    pub methods: MethodTable,
    pub state_machines: StateMachineMap,
    pub stats: BuildStats,
}

pub struct CallGraphBuilder<'n> {
    normalizer: &'n Normalizer,
    graph: CallGraph,
}

impl<'n> CallGraphBuilder<'n> {
    pub fn new(normalizer: &'n Normalizer) -> Self {
        Self { normalizer, graph: CallGraph::default() }
    }

    fn symbol_of(&self, ty: &TypeDef, method: &MethodDef) -> String {
        self.normalizer.method_symbol(&ty.full_name, &method.name, &method.parameters)
    }

    /// Pass 1: index methods and record state-machine ownership.
    pub fn index<S: MetadataSource + ?Sized>(&mut self, source: &S) {
        for ty in source.types() {
            self.graph.stats.types += 1;
            let type_generated = has_attribute(&ty.attributes, COMPILER_GENERATED_ATTRIBUTE);

            for method in &ty.methods {
                let symbol = self.symbol_of(ty, method);

                for attr_name in STATE_MACHINE_ATTRIBUTES {
                    let Some(generated) = find_attribute(&method.attributes, attr_name)
                        .and_then(|a| a.type_argument())
                    else {
                        continue;
                    };
                    let key = self.normalizer.open_type(generated);
                    debug!(state_machine = %key, owner = %symbol, "state machine");
                    self.graph.state_machines.entry(key).or_insert_with(|| symbol.clone());
                }

                if method.is_constructor {
                    continue;
                }

                if self.graph.methods.contains_key(&symbol) {
                    debug!(symbol = %symbol, "duplicate symbol ignored");
                    self.graph.stats.duplicates_ignored += 1;
                    continue;
                }

                let mut record = MethodRecord::new(self.normalizer.normalize_param_type(&method.return_type));
                if method.is_generic() {
                    record.add_tag(MethodTag::Generic);
                }
                if type_generated || has_attribute(&method.attributes, COMPILER_GENERATED_ATTRIBUTE) {
                    record.add_tag(MethodTag::CompilerGenerated);
                }
                if method.is_property_accessor() {
                    record.add_tag(MethodTag::Property);
                }
                self.graph.methods.insert(symbol, record);
            }
        }
        self.graph.stats.methods_indexed = self.graph.methods.len();
        self.graph.stats.state_machines = self.graph.state_machines.len();
    }

    /// Pass 2: scan instruction streams. Requires [`index`](Self::index) first.
    pub fn scan_usages<S: MetadataSource + ?Sized>(&mut self, source: &S) {
        for ty in source.types() {
            for method in &ty.methods {
                let Some(body) = &method.body else { continue };
                let caller = self.symbol_of(ty, method);

                for instruction in body {
                    match instruction.opcode {
                        OpCode::Call | OpCode::Callvirt => {
                            let Some(target) = instruction.method_operand() else {
                                self.graph.stats.unresolved_operands += 1;
                                continue;
                            };
                            let callee = self.normalizer.method_symbol(
                                &target.declaring_type,
                                &target.name,
                                &target.parameters,
                            );
                            if let Some(record) = self.graph.methods.get_mut(&callee) {
                                record.record_internal_call(&caller);
                                self.graph.stats.direct_calls += 1;
                            }
                        }
                        OpCode::Newobj => {
                            let Some(target) = instruction.method_operand() else {
                                self.graph.stats.unresolved_operands += 1;
                                continue;
                            };
                            let generated = self.normalizer.open_type(&target.declaring_type);
                            let Some(owner) = self.graph.state_machines.get(&generated) else {
                                continue;
                            };
                            if *owner == caller {
                                self.graph.stats.self_constructions_skipped += 1;
                                continue;
                            }
                            if let Some(record) = self.graph.methods.get_mut(owner) {
                                record.record_internal_call(&caller);
                                self.graph.stats.state_machine_calls += 1;
                            }
                        }
                        OpCode::Other => {}
                    }
                }
            }
        }
    }

    pub fn finish(self) -> CallGraph {
        self.graph
    }
}

/// Run both passes over `source`.
pub fn build_call_graph<S: MetadataSource + ?Sized>(source: &S, normalizer: &Normalizer) -> CallGraph {
    let mut builder = CallGraphBuilder::new(normalizer);
    builder.index(source);
    builder.scan_usages(source);
    let graph = builder.finish();
    let s = &graph.stats;
    info!(
        types = s.types,
        methods = s.methods_indexed,
        duplicates = s.duplicates_ignored,
        state_machines = s.state_machines,
        direct_calls = s.direct_calls,
        state_machine_calls = s.state_machine_calls,
        unresolved = s.unresolved_operands,
        "call graph built"
    );
    graph
}

#[cfg(test)]
#[path = "callgraph_tests.rs"]
mod tests;
