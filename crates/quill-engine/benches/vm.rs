// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::hint::black_box;
use std::io;

use criterion::{Criterion, criterion_group, criterion_main};
use quill_engine::ast::build::*;
use quill_engine::ast::{BinaryOp, Datatype, Program};
use quill_engine::{Bytecode, Compiler, CompilerOptions, VM, VmConfig};

fn compile(program: &mut Program) -> Bytecode {
    let options = CompilerOptions::default().report_diagnostics(false);
    Compiler::with_options(options)
        .compile(program)
        .expect("benchmark program should compile")
}

fn quiet_vm() -> VM {
    VM::with_io(VmConfig::default(), Box::new(io::empty()), Box::new(io::sink()))
}

fn fib_program(n: i64) -> Program {
    let fib = func(
        "fib",
        vec![param("n", Datatype::INT)],
        Datatype::INT,
        vec![
            var_decl("r", ident("n")),
            if_chain(vec![clause(
                binary(BinaryOp::Ge, ident("n"), int(2)),
                vec![assign(
                    ident("r"),
                    binary(
                        BinaryOp::Add,
                        call("fib", vec![binary(BinaryOp::Sub, ident("n"), int(1))]),
                        call("fib", vec![binary(BinaryOp::Sub, ident("n"), int(2))]),
                    ),
                )],
            )]),
            return_value(ident("r")),
        ],
    );
    Program::new(vec![fib, call("fib", vec![int(n)])])
}

fn loop_program(iterations: i64) -> Program {
    Program::new(vec![
        var_decl("i", int(0)),
        var_decl("sum", int(0)),
        while_loop(
            binary(BinaryOp::Lt, ident("i"), int(iterations)),
            vec![
                assign(ident("sum"), binary(BinaryOp::Add, ident("sum"), ident("i"))),
                assign(ident("i"), binary(BinaryOp::Add, ident("i"), int(1))),
            ],
        ),
        ident("sum"),
    ])
}

fn bench_fib(c: &mut Criterion) {
    let bytecode = compile(&mut fib_program(20));
    let mut vm = quiet_vm();
    c.bench_function("fib_20", |b| b.iter(|| vm.execute(black_box(&bytecode))));
}

fn bench_loop(c: &mut Criterion) {
    let bytecode = compile(&mut loop_program(10_000));
    let mut vm = quiet_vm();
    c.bench_function("loop_10k", |b| b.iter(|| vm.execute(black_box(&bytecode))));
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_fib", |b| b.iter(|| compile(&mut fib_program(20))));
}

criterion_group!(benches, bench_fib, bench_loop, bench_compile);
criterion_main!(benches);
