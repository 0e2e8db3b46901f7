//! Tests for the two-pass call graph builder.

use super::*;
use crate::metadata::{Instruction, Operand};
use crate::test_utils::*;

fn build(asm: &crate::metadata::Assembly) -> CallGraph {
    let normalizer = Normalizer::with_defaults().unwrap();
    build_call_graph(asm, &normalizer)
}

#[test]
fn test_index_skips_constructors() {
    let asm = assembly(vec![ty("M", vec![ctor(vec![ret()]), method("F", vec![ret()])])]);
    let graph = build(&asm);
    assert_eq!(graph.methods.len(), 1);
    assert!(graph.methods.contains_key("M::F(void)"));
    assert!(!graph.methods.contains_key("M::_ctor(void)"));
}

#[test]
fn test_index_seeds_return_type_and_tags() {
    let mut getter = method("get_Health", vec![ret()]);
    getter.is_special_name = true;
    getter.return_type = "System.Int32".to_string();
    let mut generic = method("Spawn", vec![ret()]);
    generic.generic_arity = 1;
    let mut lambda = method("<Start>b__3_0", vec![ret()]);
    lambda.attributes.push(attribute(COMPILER_GENERATED_ATTRIBUTE, None, None));
    let mut substring = method("Target_get_X", vec![ret()]);
    substring.is_special_name = true;

    let asm = assembly(vec![ty("Game.Player", vec![getter, generic, lambda, substring])]);
    let graph = build(&asm);

    let rec = &graph.methods["Game::Player::get_Health(void)"];
    assert_eq!(rec.return_type, "int");
    assert!(rec.has_tag(MethodTag::Property));
    assert!(graph.methods["Game::Player::Spawn(void)"].has_tag(MethodTag::Generic));
    assert!(graph.methods["Game::Player::<Start>b__3_0(void)"].has_tag(MethodTag::CompilerGenerated));
    assert!(!graph.methods["Game::Player::Target_get_X(void)"].has_tag(MethodTag::Property));
}

#[test]
fn test_compiler_generated_declaring_type_tags_methods() {
    let mut generated = ty("Game.Player/<Run>d__4", vec![method("MoveNext", vec![ret()])]);
    generated.attributes.push(attribute(COMPILER_GENERATED_ATTRIBUTE, None, None));
    let mut player = ty("Game.Player", vec![]);
    player.nested_types.push(generated);
    let graph = build(&assembly(vec![player]));
    assert!(graph.methods["Game::Player::<Run>d__4::MoveNext(void)"].has_tag(MethodTag::CompilerGenerated));
}

#[test]
fn test_duplicate_symbol_first_wins() {
    let mut first = method("F", vec![ret()]);
    first.return_type = "System.Int32".to_string();
    let mut second = method("F", vec![ret()]);
    second.return_type = "System.String".to_string();
    // `F`1` and `F` collapse to the same symbol once arity is stripped.
    second.name = "F`1".to_string();

    let graph = build(&assembly(vec![ty("M", vec![first, second])]));
    assert_eq!(graph.methods.len(), 1);
    assert_eq!(graph.methods["M::F(void)"].return_type, "int");
    assert_eq!(graph.stats.duplicates_ignored, 1);
}

#[test]
fn test_direct_calls_counted_with_callers() {
    let asm = assembly(vec![ty(
        "M",
        vec![
            method("F", vec![ret()]),
            method("A", vec![call("M", "F"), call("M", "F"), ret()]),
            method("B", vec![call_with(OpCode::Callvirt, "M", "F", &[]), ret()]),
        ],
    )]);
    let graph = build(&asm);
    let f = &graph.methods["M::F(void)"];
    assert_eq!(f.internal_call_count, 3);
    let callers: Vec<&str> = f.internal_callers.iter().map(|s| s.as_str()).collect();
    assert_eq!(callers, vec!["M::A(void)", "M::B(void)"]);
    assert_eq!(graph.stats.direct_calls, 3);
}

#[test]
fn test_calls_from_constructors_are_counted() {
    let asm = assembly(vec![ty("M", vec![ctor(vec![call("M", "Init"), ret()]), method("Init", vec![ret()])])]);
    let graph = build(&asm);
    let init = &graph.methods["M::Init(void)"];
    assert_eq!(init.internal_call_count, 1);
    assert!(init.internal_callers.contains("M::_ctor(void)"));
}

#[test]
fn test_call_operand_matches_parameter_spelling() {
    let mut target = method("Move", vec![ret()]);
    target.parameters = vec!["System.Single".to_string()];
    let asm = assembly(vec![ty(
        "Game.Player",
        vec![target, method("Update", vec![call_with(OpCode::Call, "Game.Player", "Move", &["System.Single"])])],
    )]);
    let graph = build(&asm);
    assert_eq!(graph.methods["Game::Player::Move(float)"].internal_call_count, 1);
}

#[test]
fn test_call_on_generic_instance_resolves_open_type() {
    let asm = assembly(vec![ty(
        "Game.Pool`1",
        vec![
            method("Clear", vec![ret()]),
            method("Reset", vec![call("Game.Pool`1<Game.Enemy>", "Clear")]),
        ],
    )]);
    let graph = build(&asm);
    assert_eq!(graph.methods["Game::Pool::Clear(void)"].internal_call_count, 1);
}

#[test]
fn test_unknown_callee_is_ignored() {
    let asm = assembly(vec![ty("M", vec![method("F", vec![call("System.Console", "WriteLine"), ret()])])]);
    let graph = build(&asm);
    assert_eq!(graph.methods.len(), 1);
    assert_eq!(graph.methods["M::F(void)"].internal_call_count, 0);
    assert_eq!(graph.stats.unresolved_operands, 0);
}

#[test]
fn test_unresolved_operand_skipped() {
    let unresolved = Instruction {
        opcode: OpCode::Call,
        operand: Some(Operand::Other(serde_json::json!("0x0A000012"))),
    };
    let missing = Instruction { opcode: OpCode::Callvirt, operand: None };
    let asm = assembly(vec![ty(
        "M",
        vec![method("F", vec![ret()]), method("G", vec![unresolved, missing, call("M", "F")])],
    )]);
    let graph = build(&asm);
    assert_eq!(graph.stats.unresolved_operands, 2);
    assert_eq!(graph.methods["M::F(void)"].internal_call_count, 1);
}

#[test]
fn test_methods_without_body_are_indexed_not_scanned() {
    let mut abstract_method = method("Tick", vec![]);
    abstract_method.body = None;
    let graph = build(&assembly(vec![ty("M", vec![abstract_method])]));
    assert_eq!(graph.methods["M::Tick(void)"].internal_call_count, 0);
}

// ─── State machines ──────────────────────────────────────────────────

fn iterator_fixture(extra_caller_body: Vec<Instruction>) -> crate::metadata::Assembly {
    let mut run = method("Run", vec![newobj("Game.Player/<Run>d__4"), ret()]);
    run.attributes.push(iterator_attribute("Game.Player/<Run>d__4"));
    let state_machine = ty(
        "Game.Player/<Run>d__4",
        vec![ctor(vec![ret()]), method("MoveNext", vec![ret()])],
    );
    let mut player = ty("Game.Player", vec![run, method("Start", extra_caller_body)]);
    player.nested_types.push(state_machine);
    assembly(vec![player])
}

#[test]
fn test_state_machine_map_built() {
    let graph = build(&iterator_fixture(vec![ret()]));
    assert_eq!(
        graph.state_machines.get("Game::Player::<Run>d__4").map(|s| s.as_str()),
        Some("Game::Player::Run(void)")
    );
}

#[test]
fn test_self_construction_not_counted() {
    let graph = build(&iterator_fixture(vec![ret()]));
    let run = &graph.methods["Game::Player::Run(void)"];
    assert_eq!(run.internal_call_count, 0);
    assert!(run.internal_callers.is_empty());
    assert_eq!(graph.stats.self_constructions_skipped, 1);
}

#[test]
fn test_state_machine_construction_attributed_to_owner() {
    let graph = build(&iterator_fixture(vec![newobj("Game.Player/<Run>d__4"), ret()]));
    let run = &graph.methods["Game::Player::Run(void)"];
    assert_eq!(run.internal_call_count, 1);
    let callers: Vec<&str> = run.internal_callers.iter().map(|s| s.as_str()).collect();
    assert_eq!(callers, vec!["Game::Player::Start(void)"]);
    // Nothing is credited to the generated type itself.
    assert_eq!(graph.methods["Game::Player::<Run>d__4::MoveNext(void)"].internal_call_count, 0);
}

#[test]
fn test_generic_state_machine_instance_attributed() {
    let graph = build(&iterator_fixture(vec![newobj("Game.Player/<Run>d__4`1<System.Int32>"), ret()]));
    assert_eq!(graph.methods["Game::Player::Run(void)"].internal_call_count, 1);
}

#[test]
fn test_async_state_machine_attribute_recognized() {
    let mut load = method("LoadAsync", vec![newobj("Game.Loader/<LoadAsync>d__2"), ret()]);
    load.attributes.push(attribute(
        "System.Runtime.CompilerServices.AsyncStateMachineAttribute",
        Some("Game.Loader/<LoadAsync>d__2"),
        None,
    ));
    let graph = build(&assembly(vec![ty("Game.Loader", vec![load])]));
    assert_eq!(
        graph.state_machines.get("Game::Loader::<LoadAsync>d__2").map(|s| s.as_str()),
        Some("Game::Loader::LoadAsync(void)")
    );
}

#[test]
fn test_constructor_owned_state_machine_not_indexed() {
    // A constructor can carry the attribute but is never a graph node.
    let mut c = ctor(vec![ret()]);
    c.attributes.push(iterator_attribute("M/<_ctor>d__0"));
    let asm = assembly(vec![ty("M", vec![c, method("F", vec![newobj("M/<_ctor>d__0")])])]);
    let graph = build(&asm);
    assert_eq!(graph.state_machines.get("M::<_ctor>d__0").map(|s| s.as_str()), Some("M::_ctor(void)"));
    assert_eq!(graph.stats.state_machine_calls, 0);
    assert_eq!(graph.methods.len(), 1);
}
