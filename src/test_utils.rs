//! Shared fixtures for building small assemblies in tests.

use crate::metadata::{
    Assembly, Attribute, AttributeArgument, Instruction, MethodDef, MethodRef, OpCode, Operand, TypeDef,
};

pub(crate) fn ty(full_name: &str, methods: Vec<MethodDef>) -> TypeDef {
    TypeDef {
        full_name: full_name.to_string(),
        methods,
        ..Default::default()
    }
}

pub(crate) fn method(name: &str, body: Vec<Instruction>) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        parameters: vec![],
        return_type: "System.Void".to_string(),
        generic_arity: 0,
        is_constructor: false,
        is_special_name: false,
        attributes: vec![],
        body: Some(body),
    }
}

pub(crate) fn ctor(body: Vec<Instruction>) -> MethodDef {
    MethodDef {
        is_constructor: true,
        is_special_name: true,
        ..method(".ctor", body)
    }
}

pub(crate) fn call(declaring_type: &str, name: &str) -> Instruction {
    call_with(OpCode::Call, declaring_type, name, &[])
}

pub(crate) fn call_with(opcode: OpCode, declaring_type: &str, name: &str, params: &[&str]) -> Instruction {
    Instruction {
        opcode,
        operand: Some(Operand::Method(MethodRef {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            parameters: params.iter().map(|p| p.to_string()).collect(),
        })),
    }
}

pub(crate) fn newobj(declaring_type: &str) -> Instruction {
    call_with(OpCode::Newobj, declaring_type, ".ctor", &[])
}

pub(crate) fn ret() -> Instruction {
    Instruction { opcode: OpCode::Other, operand: None }
}

pub(crate) fn attribute(type_name: &str, type_arg: Option<&str>, string_arg: Option<&str>) -> Attribute {
    let mut arguments = Vec::new();
    if let Some(t) = type_arg {
        arguments.push(AttributeArgument::Type(t.to_string()));
    }
    if let Some(s) = string_arg {
        arguments.push(AttributeArgument::String(s.to_string()));
    }
    Attribute { type_name: type_name.to_string(), arguments }
}

pub(crate) fn iterator_attribute(state_machine: &str) -> Attribute {
    attribute(
        "System.Runtime.CompilerServices.IteratorStateMachineAttribute",
        Some(state_machine),
        None,
    )
}

pub(crate) fn assembly(types: Vec<TypeDef>) -> Assembly {
    Assembly { name: "Game".to_string(), types }
}
