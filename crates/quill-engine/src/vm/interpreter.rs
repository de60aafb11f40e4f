// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bytecode interpreter.

use std::cmp::Ordering;
use std::io::{self, BufRead, BufReader, Write};

use quill_macros::ensure;
use tracing::{debug, error, trace, warn};

use super::VmConfig;
use crate::builtins;
use crate::compiler::{Bytecode, Instruction, OpCode, Operand};
use crate::error::{Fault, RuntimeError};
use crate::runtime::{CallFrame, Instance, Value};

/// What the loop does after an instruction.
enum Flow {
    Continue,
    Halt,
}

fn mismatch(op: OpCode, expected: &'static str, found: &Value) -> Fault {
    Fault::TypeMismatch {
        op: op.mnemonic(),
        expected,
        found: found.type_name(),
    }
}

fn io_fault(err: io::Error) -> Fault {
    Fault::Io(err.to_string())
}

/// First operand as an integer.
fn first(instruction: &Instruction, op: OpCode) -> Result<i64, Fault> {
    instruction
        .first
        .as_ref()
        .and_then(Operand::as_int)
        .ok_or(Fault::MissingOperand(op.mnemonic()))
}

/// Second operand as an integer.
fn second(instruction: &Instruction, op: OpCode) -> Result<i64, Fault> {
    instruction
        .second
        .as_ref()
        .and_then(Operand::as_int)
        .ok_or(Fault::MissingOperand(op.mnemonic()))
}

/// Third operand as an integer.
fn third(instruction: &Instruction, op: OpCode) -> Result<i64, Fault> {
    instruction
        .third
        .as_ref()
        .and_then(Operand::as_int)
        .ok_or(Fault::MissingOperand(op.mnemonic()))
}

fn as_count(n: i64, op: OpCode) -> Result<usize, Fault> {
    usize::try_from(n).map_err(|_| Fault::MissingOperand(op.mnemonic()))
}

/// The virtual machine that executes bytecode.
pub struct VM {
    /// The operand stack
    stack: Vec<Value>,
    /// Parameters and locals of every active frame
    slots: Vec<Value>,
    /// Global variables
    globals: Vec<Value>,
    /// Saved caller state
    frames: Vec<CallFrame>,
    /// Instance the current method runs on
    receiver: Option<Value>,
    /// Frame pointer into `slots`
    fp: usize,
    /// Program counter
    pc: usize,
    config: VmConfig,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl VM {
    /// Creates a new VM reading stdin and writing stdout.
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Creates a new VM with the given limits.
    pub fn with_config(config: VmConfig) -> Self {
        Self::with_io(
            config,
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    /// Creates a new VM with injected I/O.
    pub fn with_io(config: VmConfig, input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            stack: Vec::with_capacity(256),
            slots: Vec::with_capacity(256),
            globals: Vec::new(),
            frames: Vec::with_capacity(64),
            receiver: None,
            fp: 0,
            pc: 0,
            config,
            input,
            output,
        }
    }

    /// The VM's configuration.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Global variable at `address`, if it has been stored.
    pub fn global(&self, address: usize) -> Option<&Value> {
        self.globals.get(address)
    }

    /// Executes bytecode from its first instruction.
    ///
    /// Returns the value left on top of the operand stack at halt.
    pub fn execute(&mut self, bytecode: &Bytecode) -> Result<Option<Value>, RuntimeError> {
        self.reset();
        debug!(instructions = bytecode.len(), "executing");

        while let Some(instruction) = bytecode.instructions.get(self.pc) {
            let at = self.pc;
            self.pc += 1;

            let Some(opcode) = instruction.opcode() else {
                warn!(pc = at, code = instruction.code(), "skipping unknown opcode");
                continue;
            };
            if self.config.trace {
                trace!(pc = at, %instruction, depth = self.stack.len(), "exec");
            }

            match self.step(opcode, instruction, bytecode.len()) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => break,
                Err(fault) => return Err(self.fail(at, fault)),
            }
        }

        let at = self.pc;
        self.output.flush().map_err(|err| self.fail(at, io_fault(err)))?;
        Ok(self.stack.pop())
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.slots.clear();
        self.globals.clear();
        self.frames.clear();
        self.receiver = None;
        self.fp = 0;
        self.pc = 0;
    }

    fn fail(&mut self, pc: usize, fault: Fault) -> RuntimeError {
        let err = RuntimeError { pc, fault };
        error!(%err, "execution failed");
        if self.config.report_faults {
            eprintln!("{}", err);
        }
        let _ = self.output.flush();
        err
    }

    fn step(&mut self, opcode: OpCode, instruction: &Instruction, len: usize) -> Result<Flow, Fault> {
        match opcode {
            OpCode::Halt => return Ok(Flow::Halt),

            OpCode::Push => match &instruction.first {
                Some(Operand::Value(value)) => self.push(value.clone())?,
                _ => return Err(Fault::MissingOperand(opcode.mnemonic())),
            },
            OpCode::Pop => {
                self.pop()?;
            }

            // Storage
            OpCode::Store => {
                let index = self.slot_index(self.fp, first(instruction, opcode)?)?;
                self.slots[index] = self.pop()?;
            }
            OpCode::Load => {
                let index = self.slot_index(self.fp, first(instruction, opcode)?)?;
                self.push(self.slots[index].clone())?;
            }
            OpCode::GStore => {
                let address = first(instruction, opcode)?;
                let index = usize::try_from(address).map_err(|_| Fault::InvalidAddress(address))?;
                let value = self.pop()?;
                if index >= self.globals.len() {
                    self.globals.resize(index + 1, Value::Null);
                }
                self.globals[index] = value;
            }
            OpCode::GLoad => {
                let address = first(instruction, opcode)?;
                let value = usize::try_from(address)
                    .ok()
                    .and_then(|index| self.globals.get(index))
                    .cloned()
                    .ok_or(Fault::InvalidAddress(address))?;
                self.push(value)?;
            }
            OpCode::Upval => {
                let fp = self.frame_pointer_at(first(instruction, opcode)?)?;
                let index = self.slot_index(fp, second(instruction, opcode)?)?;
                self.push(self.slots[index].clone())?;
            }
            OpCode::UpStore => {
                let fp = self.frame_pointer_at(first(instruction, opcode)?)?;
                let index = self.slot_index(fp, second(instruction, opcode)?)?;
                self.slots[index] = self.pop()?;
            }
            OpCode::LdArg0 => {
                let receiver = self.receiver.clone().ok_or(Fault::MissingReceiver)?;
                self.push(receiver)?;
            }
            OpCode::SetArg0 => {
                self.receiver = Some(self.pop()?);
            }

            // Integer arithmetic
            OpCode::IAdd => self.int_op(opcode, |a, b| Ok(a.wrapping_add(b)))?,
            OpCode::ISub => self.int_op(opcode, |a, b| Ok(a.wrapping_sub(b)))?,
            OpCode::IMul => self.int_op(opcode, |a, b| Ok(a.wrapping_mul(b)))?,
            OpCode::IDiv => self.int_op(opcode, |a, b| {
                if b == 0 {
                    Err(Fault::DivisionByZero)
                } else {
                    Ok(a.wrapping_div(b))
                }
            })?,
            OpCode::Mod => self.int_op(opcode, |a, b| {
                if b == 0 {
                    Err(Fault::DivisionByZero)
                } else {
                    Ok(a.wrapping_rem(b))
                }
            })?,
            OpCode::BitL => self.int_op(opcode, |a, b| Ok(a.wrapping_shl(b as u32)))?,
            OpCode::BitR => self.int_op(opcode, |a, b| Ok(a.wrapping_shr(b as u32)))?,
            OpCode::BitAnd => self.int_op(opcode, |a, b| Ok(a & b))?,
            OpCode::BitOr => self.int_op(opcode, |a, b| Ok(a | b))?,
            OpCode::BitXor => self.int_op(opcode, |a, b| Ok(a ^ b))?,
            OpCode::BitNot => {
                let n = self.pop_int(opcode)?;
                self.push(Value::Int(!n))?;
            }
            OpCode::IMinus => {
                let n = self.pop_int(opcode)?;
                self.push(Value::Int(n.wrapping_neg()))?;
            }

            // Float arithmetic
            OpCode::FAdd => self.float_op(opcode, |a, b| a + b)?,
            OpCode::FSub => self.float_op(opcode, |a, b| a - b)?,
            OpCode::FMul => self.float_op(opcode, |a, b| a * b)?,
            OpCode::FDiv => self.float_op(opcode, |a, b| a / b)?,
            OpCode::FMinus => {
                let n = self.pop_float(opcode)?;
                self.push(Value::Float(-n))?;
            }

            // Logic
            OpCode::Not => {
                let b = self.pop_bool(opcode)?;
                self.push(Value::Bool(!b))?;
            }
            OpCode::BAnd => self.bool_op(opcode, |a, b| a && b)?,
            OpCode::BOr => self.bool_op(opcode, |a, b| a || b)?,

            // Equality
            OpCode::BEq => self.bool_op(opcode, |a, b| a == b)?,
            OpCode::BNe => self.bool_op(opcode, |a, b| a != b)?,
            OpCode::IEq => self.int_compare(opcode, |a, b| a == b)?,
            OpCode::INe => self.int_compare(opcode, |a, b| a != b)?,
            OpCode::FEq => self.float_compare(opcode, |a, b| a == b)?,
            OpCode::FNe => self.float_compare(opcode, |a, b| a != b)?,
            OpCode::CEq => self.char_compare(opcode, |a, b| a == b)?,
            OpCode::CNe => self.char_compare(opcode, |a, b| a != b)?,
            OpCode::ArrEq => {
                let b = self.pop()?;
                let a = self.pop()?;
                if !matches!(a, Value::Str(_) | Value::Array(_)) {
                    return Err(mismatch(opcode, "sequence", &a));
                }
                self.push(Value::Bool(a == b))?;
            }

            // Ordering
            OpCode::Lt => self.compare_op(opcode, Ordering::is_lt)?,
            OpCode::Gt => self.compare_op(opcode, Ordering::is_gt)?,
            OpCode::Le => self.compare_op(opcode, Ordering::is_le)?,
            OpCode::Ge => self.compare_op(opcode, Ordering::is_ge)?,

            // Control flow
            OpCode::Jmp => {
                self.pc = Self::target(first(instruction, opcode)?, len)?;
            }
            OpCode::Jmpf => {
                let target = Self::target(first(instruction, opcode)?, len)?;
                if !self.pop_bool(opcode)? {
                    self.pc = target;
                }
            }

            // Calls
            OpCode::Syscall => {
                let call = first(instruction, opcode)?;
                let argc = as_count(second(instruction, opcode)?, opcode)?;
                let args = self.pop_n(argc)?;
                let result = builtins::dispatch(call, &args, self.input.as_mut(), self.output.as_mut())?;
                self.push(result)?;
            }
            OpCode::Invoke | OpCode::InvokeVirtual => {
                let entry = Self::target(first(instruction, opcode)?, len)?;
                let argc = as_count(second(instruction, opcode)?, opcode)?;
                let link = as_count(third(instruction, opcode)?, opcode)?;
                self.invoke(entry, argc, link, opcode == OpCode::InvokeVirtual)?;
            }
            OpCode::Reserve => {
                let size = as_count(first(instruction, opcode)?, opcode)?;
                self.slots.resize(self.fp + size, Value::Null);
            }
            OpCode::Ret => {
                let result = self.pop()?;
                self.ret()?;
                self.push(result)?;
            }
            OpCode::RetVirtual => {
                let result = self.pop()?;
                let receiver = self.receiver.take().ok_or(Fault::MissingReceiver)?;
                self.ret()?;
                self.push(result)?;
                self.push(receiver)?;
            }

            // Sequences
            OpCode::Arr => {
                let count = as_count(first(instruction, opcode)?, opcode)?;
                let elements = self.pop_n(count)?;
                self.push(Value::array(elements))?;
            }
            OpCode::Str => {
                let count = as_count(first(instruction, opcode)?, opcode)?;
                let text = self
                    .pop_n(count)?
                    .iter()
                    .map(|value| match value {
                        Value::Char(c) => Ok(*c),
                        other => Err(mismatch(opcode, "char", other)),
                    })
                    .collect::<Result<String, Fault>>()?;
                self.push(Value::Str(text))?;
            }
            OpCode::GetSub => {
                let key = self.pop_int(opcode)?;
                let sequence = self.pop()?;
                let element = match &sequence {
                    Value::Array(values) => {
                        let values = values.borrow();
                        let index = Self::index(key, values.len())?;
                        values[index].clone()
                    }
                    Value::Str(text) => {
                        let length = text.chars().count();
                        let index = Self::index(key, length)?;
                        text.chars().nth(index).map(Value::Char).unwrap_or(Value::Null)
                    }
                    other => return Err(mismatch(opcode, "sequence", other)),
                };
                self.push(element)?;
            }
            OpCode::SetSub => {
                let key = self.pop_int(opcode)?;
                let sequence = self.pop()?;
                let value = self.pop()?;
                let updated = match sequence {
                    Value::Array(values) => {
                        {
                            let mut elements = values.borrow_mut();
                            let index = Self::index(key, elements.len())?;
                            elements[index] = value;
                        }
                        Value::Array(values)
                    }
                    Value::Str(text) => {
                        let Value::Char(c) = value else {
                            return Err(mismatch(opcode, "char", &value));
                        };
                        let index = Self::index(key, text.chars().count())?;
                        Value::Str(
                            text.chars()
                                .enumerate()
                                .map(|(i, old)| if i == index { c } else { old })
                                .collect(),
                        )
                    }
                    other => return Err(mismatch(opcode, "sequence", &other)),
                };
                self.push(updated)?;
            }
            OpCode::Len => {
                let length = match self.pop()? {
                    Value::Array(values) => values.borrow().len(),
                    Value::Str(text) => text.chars().count(),
                    other => return Err(mismatch(opcode, "sequence", &other)),
                };
                self.push(Value::Int(length as i64))?;
            }
            OpCode::Append => {
                let b = self.pop()?;
                let a = self.pop()?;
                let joined = match (a, b) {
                    (Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
                    (Value::Array(a), Value::Array(b)) => {
                        let mut values = a.borrow().clone();
                        values.extend(b.borrow().iter().cloned());
                        Value::array(values)
                    }
                    (a, _) => return Err(mismatch(opcode, "sequence", &a)),
                };
                self.push(joined)?;
            }
            OpCode::Cons => {
                let element = self.pop()?;
                let sequence = self.pop()?;
                let extended = match (sequence, element) {
                    (Value::Str(mut text), Value::Char(c)) => {
                        text.push(c);
                        Value::Str(text)
                    }
                    (Value::Array(values), element) => {
                        let mut values = values.borrow().clone();
                        values.push(element);
                        Value::array(values)
                    }
                    (sequence, _) => return Err(mismatch(opcode, "sequence", &sequence)),
                };
                self.push(extended)?;
            }

            // Classes
            OpCode::Class => {
                let count = as_count(first(instruction, opcode)?, opcode)?;
                self.push(Value::instance(count))?;
            }
            OpCode::SetField => {
                let field = first(instruction, opcode)?;
                let value = self.pop()?;
                match self.stack.last() {
                    Some(Value::Instance(instance)) => {
                        let mut instance = instance.borrow_mut();
                        let slot = Self::field(&mut instance, field)?;
                        *slot = value;
                    }
                    Some(other) => return Err(mismatch(opcode, "instance", other)),
                    None => return Err(Fault::StackUnderflow),
                }
            }
            OpCode::GetField => {
                let field = first(instruction, opcode)?;
                let value = match self.pop()? {
                    Value::Instance(instance) => {
                        let mut instance = instance.borrow_mut();
                        Self::field(&mut instance, field)?.clone()
                    }
                    other => return Err(mismatch(opcode, "instance", &other)),
                };
                self.push(value)?;
            }

            // Conversions
            OpCode::ToStr => {
                let value = self.pop()?;
                self.push(Value::Str(value.to_string()))?;
            }
            OpCode::I2F => {
                let n = self.pop_int(opcode)?;
                self.push(Value::Float(n as f64))?;
            }
            OpCode::F2I => {
                let n = self.pop_float(opcode)?;
                self.push(Value::Int(n as i64))?;
            }
            OpCode::B2I => {
                let b = self.pop_bool(opcode)?;
                self.push(Value::Int(i64::from(b)))?;
            }
            OpCode::I2C => {
                let n = self.pop_int(opcode)?;
                let c = u32::try_from(n)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(Fault::InvalidChar(n))?;
                self.push(Value::Char(c))?;
            }
            OpCode::C2I => match self.pop()? {
                Value::Char(c) => self.push(Value::Int(i64::from(u32::from(c))))?,
                other => return Err(mismatch(opcode, "char", &other)),
            },
        }
        Ok(Flow::Continue)
    }

    // ========================================================================
    // Stack
    // ========================================================================

    fn push(&mut self, value: Value) -> Result<(), Fault> {
        ensure!(
            self.stack.len() < self.config.max_stack,
            Fault::StackOverflow(self.config.max_stack)
        );
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, Fault> {
        self.stack.pop().ok_or(Fault::StackUnderflow)
    }

    /// Pops `n` values, keeping their push order.
    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Fault> {
        let start = self.stack.len().checked_sub(n).ok_or(Fault::StackUnderflow)?;
        Ok(self.stack.split_off(start))
    }

    fn pop_int(&mut self, op: OpCode) -> Result<i64, Fault> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            other => Err(mismatch(op, "int", &other)),
        }
    }

    fn pop_float(&mut self, op: OpCode) -> Result<f64, Fault> {
        match self.pop()? {
            Value::Float(n) => Ok(n),
            other => Err(mismatch(op, "float", &other)),
        }
    }

    fn pop_bool(&mut self, op: OpCode) -> Result<bool, Fault> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(op, "bool", &other)),
        }
    }

    fn pop_char(&mut self, op: OpCode) -> Result<char, Fault> {
        match self.pop()? {
            Value::Char(c) => Ok(c),
            other => Err(mismatch(op, "char", &other)),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn int_op<F>(&mut self, op: OpCode, f: F) -> Result<(), Fault>
    where
        F: Fn(i64, i64) -> Result<i64, Fault>,
    {
        let b = self.pop_int(op)?;
        let a = self.pop_int(op)?;
        self.push(Value::Int(f(a, b)?))
    }

    fn float_op<F>(&mut self, op: OpCode, f: F) -> Result<(), Fault>
    where
        F: Fn(f64, f64) -> f64,
    {
        let b = self.pop_float(op)?;
        let a = self.pop_float(op)?;
        self.push(Value::Float(f(a, b)))
    }

    fn bool_op<F>(&mut self, op: OpCode, f: F) -> Result<(), Fault>
    where
        F: Fn(bool, bool) -> bool,
    {
        let b = self.pop_bool(op)?;
        let a = self.pop_bool(op)?;
        self.push(Value::Bool(f(a, b)))
    }

    fn int_compare<F>(&mut self, op: OpCode, f: F) -> Result<(), Fault>
    where
        F: Fn(i64, i64) -> bool,
    {
        let b = self.pop_int(op)?;
        let a = self.pop_int(op)?;
        self.push(Value::Bool(f(a, b)))
    }

    fn float_compare<F>(&mut self, op: OpCode, f: F) -> Result<(), Fault>
    where
        F: Fn(f64, f64) -> bool,
    {
        let b = self.pop_float(op)?;
        let a = self.pop_float(op)?;
        self.push(Value::Bool(f(a, b)))
    }

    fn char_compare<F>(&mut self, op: OpCode, f: F) -> Result<(), Fault>
    where
        F: Fn(char, char) -> bool,
    {
        let b = self.pop_char(op)?;
        let a = self.pop_char(op)?;
        self.push(Value::Bool(f(a, b)))
    }

    /// Orders two ints, floats or chars. Unordered floats compare false.
    fn compare_op<F>(&mut self, op: OpCode, f: F) -> Result<(), Fault>
    where
        F: Fn(Ordering) -> bool,
    {
        let b = self.pop()?;
        let a = self.pop()?;
        let ordering = match (&a, &b) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_) | Value::Char(_), other) => {
                return Err(mismatch(op, a.type_name(), other));
            }
            (other, _) => return Err(mismatch(op, "int, float or char", other)),
        };
        self.push(Value::Bool(ordering.is_some_and(f)))
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Enters the function at `entry` with the top `argc` values as
    /// arguments. Virtual calls also pop the receiver below them.
    ///
    /// The callee's static link is the activation `link` lexical hops out
    /// from the caller's.
    fn invoke(&mut self, entry: usize, argc: usize, link: usize, is_virtual: bool) -> Result<(), Fault> {
        ensure!(
            self.frames.len() < self.config.max_call_depth,
            Fault::CallDepthExceeded(self.config.max_call_depth)
        );
        let static_link = self.enclosing(link)?;
        let args = self.pop_n(argc)?;
        let saved_receiver = if is_virtual {
            let receiver = self.pop()?;
            if !matches!(receiver, Value::Instance(_)) {
                return Err(mismatch(OpCode::InvokeVirtual, "instance", &receiver));
            }
            self.receiver.replace(receiver)
        } else {
            self.receiver.clone()
        };

        let slot_base = self.slots.len();
        self.slots.extend(args);
        self.frames.push(CallFrame {
            frame_pointer: self.slots.len(),
            static_link,
            return_pc: self.pc,
            saved_fp: self.fp,
            slot_base,
            stack_base: self.stack.len(),
            saved_receiver,
        });
        self.fp = self.slots.len();
        self.pc = entry;
        Ok(())
    }

    /// Leaves the current frame, discarding its slots and stray operands.
    fn ret(&mut self) -> Result<(), Fault> {
        let frame = self.frames.pop().ok_or(Fault::ReturnOutsideCall)?;
        self.stack.truncate(frame.stack_base);
        self.slots.truncate(frame.slot_base);
        self.fp = frame.saved_fp;
        self.pc = frame.return_pc;
        self.receiver = frame.saved_receiver;
        Ok(())
    }

    /// Follows `hops` static links out from the running activation.
    ///
    /// `None` is the top level, which has no frame and no link.
    fn enclosing(&self, hops: usize) -> Result<Option<usize>, Fault> {
        let mut cursor = self.frames.len().checked_sub(1);
        for _ in 0..hops {
            let index = cursor.ok_or(Fault::InvalidDepth(hops as i64))?;
            cursor = self.frames[index].static_link;
        }
        Ok(cursor)
    }

    /// Frame pointer of the activation `depth` lexical scopes out.
    fn frame_pointer_at(&self, depth: i64) -> Result<usize, Fault> {
        let hops = usize::try_from(depth).map_err(|_| Fault::InvalidDepth(depth))?;
        if hops == 0 {
            return Ok(self.fp);
        }
        self.enclosing(hops)?
            .map(|index| self.frames[index].frame_pointer)
            .ok_or(Fault::InvalidDepth(depth))
    }

    fn slot_index(&self, fp: usize, address: i64) -> Result<usize, Fault> {
        let index = fp as i64 + address;
        ensure!(
            index >= 0 && (index as usize) < self.slots.len(),
            Fault::InvalidAddress(address)
        );
        Ok(index as usize)
    }

    fn target(address: i64, len: usize) -> Result<usize, Fault> {
        match usize::try_from(address) {
            Ok(target) if target <= len => Ok(target),
            _ => Err(Fault::InvalidTarget(address)),
        }
    }

    fn index(key: i64, length: usize) -> Result<usize, Fault> {
        match usize::try_from(key) {
            Ok(index) if index < length => Ok(index),
            _ => Err(Fault::IndexOutOfBounds { index: key, length }),
        }
    }

    fn field(instance: &mut Instance, field: i64) -> Result<&mut Value, Fault> {
        usize::try_from(field)
            .ok()
            .and_then(|index| instance.fields.get_mut(index))
            .ok_or(Fault::InvalidField(field))
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}
