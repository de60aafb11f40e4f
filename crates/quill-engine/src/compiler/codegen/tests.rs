// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use quill_macros::{assert_err, assert_ok};

use super::*;
use crate::ast::build::*;

fn options() -> CompilerOptions {
    CompilerOptions::default()
        .prelude(false)
        .report_diagnostics(false)
        .keep_last_value(false)
}

fn compile_with(options: CompilerOptions, body: Vec<Node>) -> Bytecode {
    let mut program = Program::new(body);
    assert_ok!(Compiler::with_options(options).compile(&mut program))
}

fn compile(body: Vec<Node>) -> Bytecode {
    compile_with(options(), body)
}

fn compile_err(body: Vec<Node>) -> SemanticErrorKind {
    let mut program = Program::new(body);
    assert_err!(Compiler::with_options(options()).compile(&mut program)).kind
}

fn ops(bytecode: &Bytecode) -> Vec<OpCode> {
    bytecode.opcodes().collect()
}

fn address(n: i64) -> Option<Operand> {
    Some(Operand::Address(n))
}

fn count(n: usize) -> Option<Operand> {
    Some(Operand::count(n))
}

fn invokes(bytecode: &Bytecode) -> Vec<&Instruction> {
    bytecode
        .instructions
        .iter()
        .filter(|instruction| matches!(instruction.opcode(), Some(OpCode::Invoke | OpCode::InvokeVirtual)))
        .collect()
}

fn links(bytecode: &Bytecode) -> Vec<Option<Operand>> {
    invokes(bytecode).iter().map(|instruction| instruction.third.clone()).collect()
}

fn add_function() -> Node {
    func(
        "add",
        vec![param("a", Datatype::INT), param("b", Datatype::INT)],
        Datatype::INT,
        vec![return_value(binary(BinaryOp::Add, ident("a"), ident("b")))],
    )
}

fn point_class() -> Node {
    class(
        "Point",
        vec![param("x0", Datatype::INT)],
        vec![
            annotation(Annotation::GETTER),
            var_decl("x", ident("x0")),
            func(
                "shift",
                vec![param("d", Datatype::INT)],
                Datatype::VOID,
                vec![assign(ident("x"), binary(BinaryOp::Add, ident("x"), ident("d")))],
            ),
        ],
    )
}

// ============================================================================
// Declarations and statements
// ============================================================================

#[test]
fn test_global_declaration() {
    let bytecode = compile(vec![let_decl("x", int(5))]);
    assert_eq!(ops(&bytecode), vec![OpCode::Push, OpCode::GStore, OpCode::Halt]);
    assert_eq!(bytecode.instructions[1].first, address(0));
}

#[test]
fn test_expression_statements_are_popped() {
    let body = || vec![var_decl("x", int(1)), ident("x")];

    let bytecode = compile(body());
    assert_eq!(
        ops(&bytecode),
        vec![OpCode::Push, OpCode::GStore, OpCode::GLoad, OpCode::Pop, OpCode::Halt]
    );

    let bytecode = compile_with(options().keep_last_value(true), body());
    assert_eq!(
        ops(&bytecode),
        vec![OpCode::Push, OpCode::GStore, OpCode::GLoad, OpCode::Halt]
    );
}

#[test]
fn test_unused_declaration_emits_nothing() {
    let bytecode = compile(vec![annotation(Annotation::UNUSED), let_decl("x", int(1))]);
    assert_eq!(ops(&bytecode), vec![OpCode::Halt]);
}

#[test]
fn test_redefinition_names_first_site() {
    let kind = compile_err(vec![
        let_decl("x", int(1)).at(1, 1),
        let_decl("x", int(2)).at(2, 1),
    ]);
    assert_eq!(
        kind,
        SemanticErrorKind::Redefinition {
            name: "x".into(),
            line: 1,
            column: 1,
        }
    );
}

#[test]
fn test_shadowing_in_function_is_allowed() {
    compile(vec![
        let_decl("x", int(1)),
        func(
            "f",
            vec![],
            Datatype::INT,
            vec![let_decl("x", int(2)), return_value(ident("x"))],
        ),
    ]);
}

#[test]
fn test_assignment_rules() {
    assert_eq!(
        compile_err(vec![let_decl("x", int(1)), assign(ident("x"), int(2))]),
        SemanticErrorKind::ImmutableAssignment { name: "x".into() }
    );
    assert_eq!(
        compile_err(vec![var_decl("x", int(1)), assign(ident("x"), float(2.0))]),
        SemanticErrorKind::TypeChange {
            expected: "int".into(),
            found: "float".into(),
        }
    );
    assert_eq!(
        compile_err(vec![assign(ident("y"), int(2))]),
        SemanticErrorKind::ImplicitDeclaration { name: "y".into() }
    );
}

#[test]
fn test_initializer_rules() {
    let void = func("v", vec![], Datatype::VOID, vec![]);
    assert_eq!(
        compile_err(vec![void, let_decl("x", call("v", vec![]))]),
        SemanticErrorKind::VoidInitializer
    );
    assert_eq!(
        compile_err(vec![add_function(), let_decl("g", ident("add"))]),
        SemanticErrorKind::FunctionInitializer
    );
    assert_eq!(
        compile_err(vec![add_function(), binary(BinaryOp::Add, ident("add"), int(1))]),
        SemanticErrorKind::FunctionAsValue { name: "add".into() }
    );
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_constant_folding_collapses_literals() {
    let bytecode = compile(vec![let_decl(
        "x",
        binary(BinaryOp::Mul, binary(BinaryOp::Add, int(2), int(3)), int(4)),
    )]);
    assert_eq!(ops(&bytecode), vec![OpCode::Push, OpCode::GStore, OpCode::Halt]);
    assert_eq!(bytecode.instructions[0].first, Some(Operand::Value(Value::Int(20))));

    let bytecode = compile(vec![let_decl("b", binary(BinaryOp::Lt, int(1), int(2)))]);
    assert_eq!(bytecode.instructions[0].first, Some(Operand::Value(Value::Bool(true))));
}

#[test]
fn test_constant_division_by_zero() {
    assert_eq!(
        compile_err(vec![binary(BinaryOp::Div, int(1), int(0))]),
        SemanticErrorKind::ConstantDivisionByZero
    );
}

#[test]
fn test_operand_mismatch() {
    assert_eq!(
        compile_err(vec![binary(BinaryOp::Add, int(1), float(1.0))]),
        SemanticErrorKind::OperandMismatch {
            op: "+".into(),
            left: "int".into(),
            right: "float".into(),
        }
    );
    assert_eq!(
        compile_err(vec![let_decl("b", boolean(true)), binary(BinaryOp::Add, ident("b"), ident("b"))]),
        SemanticErrorKind::OperandMismatch {
            op: "+".into(),
            left: "bool".into(),
            right: "bool".into(),
        }
    );
}

#[test]
fn test_string_comparison_lowering() {
    let bytecode = compile(vec![
        let_decl("s", string("a")),
        binary(BinaryOp::Ne, ident("s"), string("b")),
    ]);
    assert_eq!(
        ops(&bytecode),
        vec![
            OpCode::Push,
            OpCode::GStore,
            OpCode::GLoad,
            OpCode::Push,
            OpCode::ArrEq,
            OpCode::Not,
            OpCode::Pop,
            OpCode::Halt,
        ]
    );
}

#[test]
fn test_interpolation() {
    let bytecode = compile(vec![let_decl("n", int(3)), let_decl("s", string("n=$n"))]);
    assert_eq!(
        ops(&bytecode),
        vec![
            OpCode::Push,
            OpCode::GStore,
            OpCode::Push,
            OpCode::GLoad,
            OpCode::ToStr,
            OpCode::Append,
            OpCode::GStore,
            OpCode::Halt,
        ]
    );
    assert_eq!(
        compile_err(vec![string("hi $nobody")]),
        SemanticErrorKind::ImplicitDeclaration { name: "nobody".into() }
    );
}

#[test]
fn test_array_literals() {
    let bytecode = compile(vec![let_decl("a", array(vec![int(1), int(2), int(3)]))]);
    assert_eq!(bytecode.instructions[3].opcode(), Some(OpCode::Arr));
    assert_eq!(bytecode.instructions[3].first, count(3));

    let bytecode = compile(vec![let_decl("s", array(vec![character('o'), character('k')]))]);
    assert_eq!(bytecode.instructions[2].opcode(), Some(OpCode::Str));

    assert_eq!(
        compile_err(vec![array(vec![int(1), float(2.0)])]),
        SemanticErrorKind::MixedArray { element: 2 }
    );
    assert_eq!(
        compile_err(vec![array(vec![array(vec![int(1)])])]),
        SemanticErrorKind::MultidimensionalArray
    );
}

#[test]
fn test_static_bounds_check() {
    assert_eq!(
        compile_err(vec![
            let_decl("a", array(vec![int(1), int(2)])),
            subscript(ident("a"), int(5)),
        ]),
        SemanticErrorKind::IndexOutOfBounds { index: 5, size: 2 }
    );
    assert_eq!(
        compile_err(vec![subscript(array(vec![int(1), int(2), int(3)]), int(5))]),
        SemanticErrorKind::IndexOutOfBounds { index: 5, size: 3 }
    );
    assert_eq!(
        compile_err(vec![let_decl("a", array(vec![int(1)])), subscript(ident("a"), boolean(true))]),
        SemanticErrorKind::KeyNotInteger
    );
}

#[test]
fn test_mutable_arrays_are_not_bounds_checked() {
    let bytecode = compile(vec![
        var_decl("a", array(vec![int(1), int(2), int(3)])),
        subscript(ident("a"), int(5)),
    ]);
    assert_eq!(
        ops(&bytecode)[ops(&bytecode).len() - 5..],
        [OpCode::GLoad, OpCode::Push, OpCode::GetSub, OpCode::Pop, OpCode::Halt]
    );
}

#[test]
fn test_subscript_assignment() {
    let bytecode = compile(vec![
        var_decl("a", array(vec![int(1), int(2)])),
        assign(subscript(ident("a"), int(0)), int(9)),
    ]);
    assert_eq!(
        ops(&bytecode)[4..],
        [
            OpCode::Push,
            OpCode::GLoad,
            OpCode::Push,
            OpCode::SetSub,
            OpCode::GStore,
            OpCode::Halt,
        ]
    );
    assert_eq!(
        compile_err(vec![
            var_decl("a", array(vec![int(1)])),
            assign(subscript(ident("a"), int(0)), boolean(true)),
        ]),
        SemanticErrorKind::AssignmentValueMismatch {
            expected: "int".into(),
            found: "bool".into(),
        }
    );
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_else_jumps() {
    let bytecode = compile(vec![if_chain(vec![
        clause(boolean(true), vec![int(1)]),
        otherwise(vec![int(2)]),
    ])]);
    assert_eq!(
        ops(&bytecode),
        vec![
            OpCode::Push,
            OpCode::Jmpf,
            OpCode::Push,
            OpCode::Pop,
            OpCode::Jmp,
            OpCode::Push,
            OpCode::Pop,
            OpCode::Halt,
        ]
    );
    assert_eq!(bytecode.instructions[1].first, address(5));
    assert_eq!(bytecode.instructions[4].first, address(7));
}

#[test]
fn test_while_jumps_back_to_condition() {
    let bytecode = compile(vec![
        var_decl("i", int(0)),
        while_loop(
            binary(BinaryOp::Lt, ident("i"), int(3)),
            vec![assign(ident("i"), binary(BinaryOp::Add, ident("i"), int(1)))],
        ),
    ]);
    assert_eq!(bytecode.instructions[5].opcode(), Some(OpCode::Jmpf));
    assert_eq!(bytecode.instructions[5].first, address(11));
    assert_eq!(bytecode.instructions[10].opcode(), Some(OpCode::Jmp));
    assert_eq!(bytecode.instructions[10].first, address(2));
}

#[test]
fn test_condition_must_be_bool() {
    assert_eq!(
        compile_err(vec![if_chain(vec![clause(int(1), vec![])])]),
        SemanticErrorKind::ConditionNotBool { found: "int".into() }
    );
    assert_eq!(
        compile_err(vec![while_loop(string("yes"), vec![])]),
        SemanticErrorKind::ConditionNotBool {
            found: "string".into(),
        }
    );
}

// ============================================================================
// Functions and calls
// ============================================================================

#[test]
fn test_function_layout() {
    let bytecode = compile(vec![add_function()]);
    assert_eq!(
        ops(&bytecode),
        vec![
            OpCode::Jmp,
            OpCode::Reserve,
            OpCode::Load,
            OpCode::Load,
            OpCode::IAdd,
            OpCode::Ret,
            OpCode::Halt,
        ]
    );
    assert_eq!(bytecode.instructions[0].first, address(6));
    assert_eq!(bytecode.instructions[1].first, count(0));
    assert_eq!(bytecode.instructions[2].first, address(-2));
    assert_eq!(bytecode.instructions[3].first, address(-1));
}

#[test]
fn test_void_function_gets_implicit_return() {
    let bytecode = compile(vec![func("f", vec![], Datatype::VOID, vec![])]);
    assert_eq!(
        ops(&bytecode),
        vec![OpCode::Jmp, OpCode::Reserve, OpCode::Push, OpCode::Ret, OpCode::Halt]
    );
}

#[test]
fn test_call_pushes_arguments_then_invokes() {
    let bytecode = compile(vec![add_function(), call("add", vec![int(1), int(2)])]);
    let invoke = &bytecode.instructions[8];
    assert_eq!(invoke.opcode(), Some(OpCode::Invoke));
    assert_eq!(invoke.first, address(1));
    assert_eq!(invoke.second, count(2));
    assert_eq!(invoke.third, count(0));
    assert_eq!(bytecode.instructions[9].opcode(), Some(OpCode::Pop));
}

#[test]
fn test_recursion_and_forward_reference_to_self() {
    compile(vec![func(
        "fact",
        vec![param("n", Datatype::INT)],
        Datatype::INT,
        vec![
            var_decl("r", int(1)),
            if_chain(vec![clause(
                binary(BinaryOp::Gt, ident("n"), int(1)),
                vec![assign(
                    ident("r"),
                    binary(
                        BinaryOp::Mul,
                        ident("n"),
                        call("fact", vec![binary(BinaryOp::Sub, ident("n"), int(1))]),
                    ),
                )],
            )]),
            return_value(ident("r")),
        ],
    )]);
}

#[test]
fn test_frame_size_covers_nested_blocks() {
    let bytecode = compile(vec![func(
        "f",
        vec![],
        Datatype::VOID,
        vec![
            let_decl("a", int(1)),
            if_chain(vec![
                clause(boolean(true), vec![let_decl("b", int(2)), let_decl("c", int(3))]),
                otherwise(vec![let_decl("d", int(4))]),
            ]),
            while_loop(boolean(false), vec![let_decl("e", int(5))]),
        ],
    )]);
    assert_eq!(bytecode.instructions[1].opcode(), Some(OpCode::Reserve));
    assert_eq!(bytecode.instructions[1].first, count(3));
}

#[test]
fn test_upvalue_access() {
    let bytecode = compile(vec![func(
        "outer",
        vec![],
        Datatype::INT,
        vec![
            let_decl("x", int(1)),
            func("inner", vec![], Datatype::INT, vec![return_value(ident("x"))]),
            return_value(call("inner", vec![])),
        ],
    )]);
    let upval = bytecode
        .instructions
        .iter()
        .find(|instruction| instruction.opcode() == Some(OpCode::Upval))
        .expect("upval emitted");
    assert_eq!(upval.first, count(1));
    assert_eq!(upval.second, address(0));
}

#[test]
fn test_calls_link_to_the_declaring_scope() {
    let bytecode = compile(vec![
        func(
            "outer",
            vec![],
            Datatype::INT,
            vec![
                let_decl("x", int(41)),
                func("g", vec![], Datatype::INT, vec![return_value(ident("x"))]),
                func("h", vec![], Datatype::INT, vec![return_value(call("g", vec![]))]),
                func(
                    "down",
                    vec![param("n", Datatype::INT)],
                    Datatype::INT,
                    vec![return_value(call("down", vec![ident("n")]))],
                ),
                return_value(call("h", vec![])),
            ],
        ),
        call("outer", vec![]),
    ]);
    // g() from h and down() from down reach outer's frame in one hop.
    assert_eq!(links(&bytecode), vec![count(1), count(1), count(0), count(0)]);
}

#[test]
fn test_methods_link_past_the_class_scope() {
    let bytecode = compile(vec![
        func(
            "make",
            vec![],
            Datatype::INT,
            vec![
                let_decl("v", int(5)),
                class(
                    "C",
                    vec![],
                    vec![
                        func("get", vec![], Datatype::INT, vec![return_value(ident("v"))]),
                        func(
                            "twice",
                            vec![],
                            Datatype::INT,
                            vec![return_value(binary(
                                BinaryOp::Add,
                                call("get", vec![]),
                                call("get", vec![]),
                            ))],
                        ),
                    ],
                ),
                let_decl("c", call("C", vec![])),
                return_value(method(ident("c"), "twice", vec![])),
            ],
        ),
        call("make", vec![]),
    ]);
    let upval = bytecode
        .instructions
        .iter()
        .find(|instruction| instruction.opcode() == Some(OpCode::Upval))
        .expect("upval emitted");
    assert_eq!(upval.first, count(1));
    assert_eq!(links(&bytecode), vec![count(1), count(1), count(0), count(0), count(0)]);
}

#[test]
fn test_return_rules() {
    assert_eq!(
        compile_err(vec![func("f", vec![], Datatype::INT, vec![])]),
        SemanticErrorKind::MissingReturn { name: "f".into() }
    );
    assert_eq!(
        compile_err(vec![func("f", vec![], Datatype::VOID, vec![return_value(int(1))])]),
        SemanticErrorKind::VoidReturnsValue
    );
    assert_eq!(
        compile_err(vec![func("f", vec![], Datatype::INT, vec![return_void()])]),
        SemanticErrorKind::ReturnWithoutValue
    );
    assert_eq!(
        compile_err(vec![func(
            "f",
            vec![],
            Datatype::INT,
            vec![return_value(int(1)), int(2)],
        )]),
        SemanticErrorKind::ReturnBeforeEnd
    );
    assert_eq!(
        compile_err(vec![func("f", vec![], Datatype::INT, vec![return_value(boolean(true))])]),
        SemanticErrorKind::ReturnTypeMismatch {
            expected: "int".into(),
            found: "bool".into(),
        }
    );
    assert_eq!(
        compile_err(vec![return_value(int(1))]),
        SemanticErrorKind::ReturnOutsideFunction
    );
}

#[test]
fn test_call_checks() {
    assert_eq!(
        compile_err(vec![add_function(), call("add", vec![int(1)])]),
        SemanticErrorKind::TooFewArguments {
            name: "add".into(),
            expected: 2,
        }
    );
    assert_eq!(
        compile_err(vec![add_function(), call("add", vec![int(1), int(2), int(3)])]),
        SemanticErrorKind::TooManyArguments {
            name: "add".into(),
            expected: 2,
        }
    );
    assert_eq!(
        compile_err(vec![add_function(), call("add", vec![int(1), boolean(true)])]),
        SemanticErrorKind::ParameterMismatch {
            index: 2,
            found: "bool".into(),
            expected: "int".into(),
        }
    );
    assert_eq!(
        compile_err(vec![let_decl("x", int(1)), call("x", vec![])]),
        SemanticErrorKind::NotAFunction { name: "x".into() }
    );
    assert_eq!(
        compile_err(vec![call("nothing", vec![])]),
        SemanticErrorKind::ImplicitFunction {
            name: "nothing".into(),
        }
    );
}

#[test]
fn test_prelude_intrinsic_accepts_any_argument() {
    let bytecode = compile_with(
        options().prelude(true),
        vec![call("println", vec![array(vec![int(1)])])],
    );
    let syscall = bytecode
        .instructions
        .iter()
        .find(|instruction| instruction.opcode() == Some(OpCode::Syscall))
        .expect("syscall emitted");
    assert_eq!(syscall.first, Some(Operand::Value(Value::Int(1))));
    assert_eq!(syscall.second, count(1));
}

#[test]
fn test_value_methods() {
    let bytecode = compile(vec![let_decl("s", string("ab")), method(ident("s"), "length", vec![])]);
    assert_eq!(ops(&bytecode)[2..4], [OpCode::GLoad, OpCode::Len]);

    let bytecode = compile(vec![let_decl("f", float(2.5)), method(ident("f"), "to_c", vec![])]);
    assert_eq!(ops(&bytecode)[2..5], [OpCode::GLoad, OpCode::F2I, OpCode::I2C]);

    assert_eq!(
        compile_err(vec![let_decl("n", int(1)), method(ident("n"), "to_i", vec![])]),
        SemanticErrorKind::NoSuchMethod {
            method: "to_i".into(),
            ty: "int".into(),
        }
    );
    assert_eq!(
        compile_err(vec![let_decl("n", int(1)), method(ident("n"), "to_str", vec![int(2)])]),
        SemanticErrorKind::ExpectedNoArguments {
            method: "to_str".into(),
        }
    );
    assert_eq!(
        compile_err(vec![
            let_decl("s", string("ab")),
            method(ident("s"), "cons", vec![int(1)]),
        ]),
        SemanticErrorKind::ArgumentMismatch {
            method: "cons".into(),
            expected: "char".into(),
            found: "int".into(),
        }
    );
}

// ============================================================================
// Classes
// ============================================================================

#[test]
fn test_class_constructor_layout() {
    let bytecode = compile(vec![point_class()]);
    assert_eq!(
        ops(&bytecode)[..7],
        [
            OpCode::Jmp,
            OpCode::Reserve,
            OpCode::Class,
            OpCode::Load,
            OpCode::Store,
            OpCode::Load,
            OpCode::SetField,
        ]
    );
    assert_eq!(bytecode.instructions[1].first, count(1));
    assert_eq!(bytecode.instructions[2].first, count(1));
    assert_eq!(bytecode.instructions[3].first, address(-1));

    let last = bytecode.len() - 2;
    assert_eq!(bytecode.instructions[last].opcode(), Some(OpCode::Ret));
    assert_eq!(bytecode.instructions[0].first, address(last as i64 + 1));
}

#[test]
fn test_method_calls_thread_the_receiver() {
    let mut program = Program::new(vec![
        point_class(),
        let_decl("p", call("Point", vec![int(1)])),
        method(ident("p"), "shift", vec![int(2)]),
        method(ident("p"), "getX", vec![]),
    ]);
    let bytecode = assert_ok!(Compiler::with_options(options()).compile(&mut program));
    let opcodes = ops(&bytecode);

    for expected in [
        OpCode::InvokeVirtual,
        OpCode::RetVirtual,
        OpCode::LdArg0,
        OpCode::SetArg0,
        OpCode::GetField,
    ] {
        assert!(opcodes.contains(&expected), "missing {expected:?}");
    }
    // receiver, argument, call, receiver stored back, result popped
    assert_eq!(
        opcodes[opcodes.len() - 10..],
        [
            OpCode::GLoad,
            OpCode::Push,
            OpCode::InvokeVirtual,
            OpCode::GStore,
            OpCode::Pop,
            OpCode::GLoad,
            OpCode::InvokeVirtual,
            OpCode::GStore,
            OpCode::Pop,
            OpCode::Halt,
        ]
    );
    assert_eq!(program.classes.lookup("Point").map(|id| id.index()), Some(0));
}

#[test]
fn test_class_errors() {
    assert_eq!(
        compile_err(vec![class(
            "C",
            vec![],
            vec![let_decl("a", int(1)), let_decl("b", ident("a"))],
        )]),
        SemanticErrorKind::FieldAccessInConstructor { name: "a".into() }
    );
    assert_eq!(
        compile_err(vec![class("Node", vec![], vec![let_decl("next", call("Node", vec![]))])]),
        SemanticErrorKind::CircularReference {
            class: "Node".into(),
        }
    );
    assert_eq!(
        compile_err(vec![class("C", vec![], vec![int(1)])]),
        SemanticErrorKind::StatementInClassBody
    );
    assert_eq!(
        compile_err(vec![class(
            "C",
            vec![],
            vec![annotation(Annotation::SETTER), let_decl("a", int(1))],
        )]),
        SemanticErrorKind::SetterOnImmutable { name: "a".into() }
    );
    assert_eq!(
        compile_err(vec![class(
            "C",
            vec![],
            vec![
                annotation(Annotation::GETTER),
                annotation(Annotation::GETTER),
                var_decl("a", int(1)),
            ],
        )]),
        SemanticErrorKind::AnnotationAlreadySet {
            annotation: "@Getter",
        }
    );
    assert_eq!(
        compile_err(vec![class("C", vec![], vec![]), class("C", vec![], vec![])]),
        SemanticErrorKind::ClassAlreadyExists { name: "C".into() }
    );
    assert_eq!(
        compile_err(vec![class(
            "C",
            vec![param("a", Datatype::INT)],
            vec![func("f", vec![], Datatype::INT, vec![return_value(ident("a"))])],
        )]),
        SemanticErrorKind::ConstructorParameterAccess { name: "a".into() }
    );
    assert_eq!(
        compile_err(vec![point_class(), let_decl("p", call("Point", vec![int(1)])), method(ident("p"), "nope", vec![])]),
        SemanticErrorKind::NoSuchMember {
            member: "nope".into(),
            class: "Point".into(),
        }
    );
}

#[test]
fn test_annotation_outside_class() {
    assert_eq!(
        compile_err(vec![annotation(Annotation::GETTER), let_decl("x", int(1))]),
        SemanticErrorKind::AnnotationOutsideClass {
            annotation: "@Getter",
        }
    );
}

#[test]
fn test_member_access_outside_call() {
    let member = Node::new(
        NodeKind::Member {
            expr: Box::new(ident("p")),
            name: "x".into(),
        },
        Location::new(4, 2),
    );
    let mut program = Program::new(vec![member]);
    let err = assert_err!(Compiler::with_options(options()).compile(&mut program));
    assert_eq!(err.kind, SemanticErrorKind::ClassFieldAccess);
    assert_eq!(err.location, Location::new(4, 2));
}

#[test]
fn test_failed_compile_discards_state() {
    let mut compiler = Compiler::with_options(options());
    let mut bad = Program::new(vec![ident("nope")]);
    assert_err!(compiler.compile(&mut bad));
    assert!(compiler.bytecode.is_empty());

    let mut good = Program::new(vec![let_decl("nope", int(1))]);
    let bytecode = assert_ok!(compiler.compile(&mut good));
    assert_eq!(bytecode.len(), 3);
}

#[test]
fn test_diagnostic_format() {
    let mut program = Program::new(vec![ident("ghost").at(3, 7)]);
    let err = assert_err!(
        Compiler::with_options(options().source_name("main.ql".to_string())).compile(&mut program)
    );
    assert_eq!(
        err.to_string(),
        "main.ql:3:7 (Semantic): Implicit declaration of field 'ghost'"
    );
}
