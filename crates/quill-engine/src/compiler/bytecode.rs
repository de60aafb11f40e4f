// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bytecode definitions.

use std::fmt;

use quill_macros::opcodes;

use crate::runtime::value::Value;

/// A compiled instruction buffer.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    unpatched: usize,
}

impl Bytecode {
    /// Creates a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Adds an instruction without operands.
    pub fn emit_op(&mut self, opcode: OpCode) -> usize {
        self.emit(Instruction::simple(opcode))
    }

    /// Adds a `push` of an immediate value.
    pub fn emit_push(&mut self, value: Value) -> usize {
        self.emit(Instruction::with_operand(OpCode::Push, Operand::Value(value)))
    }

    /// Adds an instruction whose first operand is filled in later.
    ///
    /// The returned handle must be passed to [`Bytecode::patch`] or
    /// [`Bytecode::patch_count`] before the buffer is finished.
    pub fn emit_placeholder(&mut self, opcode: OpCode) -> PatchHandle {
        self.unpatched += 1;
        let index = self.emit(Instruction::simple(opcode));
        PatchHandle { index }
    }

    /// Fills a placeholder with a jump target.
    pub fn patch(&mut self, handle: PatchHandle, target: usize) {
        self.fill(handle, Operand::Address(target as i64));
    }

    /// Fills a placeholder with a count.
    pub fn patch_count(&mut self, handle: PatchHandle, count: usize) {
        self.fill(handle, Operand::count(count));
    }

    fn fill(&mut self, handle: PatchHandle, operand: Operand) {
        self.instructions[handle.index].first = Some(operand);
        self.unpatched -= 1;
    }

    /// Placeholders emitted but not yet filled.
    pub fn unpatched(&self) -> usize {
        self.unpatched
    }

    /// The most recently emitted instruction.
    pub fn last(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// Iterates the decoded opcodes, skipping unknown codes.
    pub fn opcodes(&self) -> impl Iterator<Item = OpCode> + '_ {
        self.instructions.iter().filter_map(Instruction::opcode)
    }
}

impl PartialEq for Bytecode {
    fn eq(&self, other: &Self) -> bool {
        self.instructions == other.instructions
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{:04}: {}", index, instruction)?;
        }
        Ok(())
    }
}

/// Index of an instruction awaiting its operand.
///
/// Consumed by patching, so a placeholder is filled at most once.
#[must_use = "placeholders must be patched"]
#[derive(Debug, PartialEq, Eq)]
pub struct PatchHandle {
    index: usize,
}

impl PatchHandle {
    /// The placeholder's instruction index.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A single bytecode instruction.
///
/// The operation code is stored raw so that buffers with unknown codes can
/// still be represented and skipped by the VM.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    code: u8,
    /// First operand
    pub first: Option<Operand>,
    /// Second operand
    pub second: Option<Operand>,
    /// Third operand; only calls carry one
    pub third: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            code: opcode as u8,
            first: None,
            second: None,
            third: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            code: opcode as u8,
            first: Some(operand),
            second: None,
            third: None,
        }
    }

    /// Creates a new instruction with two operands.
    pub fn with_operands(opcode: OpCode, first: Operand, second: Operand) -> Self {
        Self {
            code: opcode as u8,
            first: Some(first),
            second: Some(second),
            third: None,
        }
    }

    /// Creates an `invoke` or `invokevirtual`.
    ///
    /// `link` is the number of lexical frames between the caller and the
    /// scope the callee was declared in.
    pub fn call(opcode: OpCode, entry: i64, argc: usize, link: usize) -> Self {
        Self {
            code: opcode as u8,
            first: Some(Operand::Address(entry)),
            second: Some(Operand::count(argc)),
            third: Some(Operand::count(link)),
        }
    }

    /// Creates an instruction from a raw operation code.
    pub fn raw(code: u8) -> Self {
        Self {
            code,
            first: None,
            second: None,
            third: None,
        }
    }

    /// The raw operation code.
    pub fn code(&self) -> u8 {
        self.code
    }

    /// The decoded operation code, or `None` if it is unknown.
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::try_from(self.code).ok()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Some(opcode) => write!(f, "{}", opcode.mnemonic())?,
            None => write!(f, "<unknown 0x{:02x}>", self.code)?,
        }
        if let Some(first) = &self.first {
            write!(f, " {}", first)?;
        }
        if let Some(second) = &self.second {
            write!(f, ", {}", second)?;
        }
        if let Some(third) = &self.third {
            write!(f, ", {}", third)?;
        }
        Ok(())
    }
}

/// Instruction operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Immediate runtime value; counts are immediate integers
    Value(Value),
    /// Instruction index, or slot address relative to a frame or the globals
    Address(i64),
}

impl Operand {
    /// An immediate count.
    pub fn count(n: usize) -> Self {
        Operand::Value(Value::Int(n as i64))
    }

    /// The integer carried by either variant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Operand::Value(Value::Int(n)) | Operand::Address(n) => Some(*n),
            Operand::Value(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(Value::Str(s)) => write!(f, "{:?}", s),
            Operand::Value(value) => write!(f, "{}", value),
            Operand::Address(address) => write!(f, "@{}", address),
        }
    }
}

opcodes! {
    /// Operation codes for the VM.
    pub enum OpCode: u8 {
        // Stack and storage
        /// Push the immediate operand
        Push = 0x00 => "push",
        /// Pop the top value
        Pop = 0x01 => "pop",
        /// Stop execution
        Halt = 0x02 => "hlt",
        /// Pop into a frame slot
        Store = 0x03 => "store",
        /// Push a frame slot
        Load = 0x04 => "load",
        /// Pop into a global slot
        GStore = 0x05 => "gstore",
        /// Push a global slot
        GLoad = 0x06 => "gload",
        /// Push the current receiver
        LdArg0 = 0x07 => "ldarg0",
        /// Pop into the current receiver
        SetArg0 = 0x08 => "setarg0",

        // Integer arithmetic
        /// Integer addition
        IAdd = 0x10 => "iadd",
        /// Integer subtraction
        ISub = 0x11 => "isub",
        /// Integer multiplication
        IMul = 0x12 => "imul",
        /// Integer division
        IDiv = 0x13 => "idiv",
        /// Integer remainder
        Mod = 0x14 => "mod",
        /// Shift left
        BitL = 0x15 => "bitl",
        /// Arithmetic shift right
        BitR = 0x16 => "bitr",
        /// Bitwise and
        BitAnd = 0x17 => "bitand",
        /// Bitwise or
        BitOr = 0x18 => "bitor",
        /// Bitwise xor
        BitXor = 0x19 => "bitxor",
        /// Bitwise complement
        BitNot = 0x1a => "bitnot",
        /// Integer negation
        IMinus = 0x1b => "iminus",

        // Float arithmetic
        /// Float addition
        FAdd = 0x20 => "fadd",
        /// Float subtraction
        FSub = 0x21 => "fsub",
        /// Float multiplication
        FMul = 0x22 => "fmul",
        /// Float division
        FDiv = 0x23 => "fdiv",
        /// Float negation
        FMinus = 0x24 => "fminus",

        /// Boolean negation
        Not = 0x28 => "not",

        // Calls and control flow
        /// Call a host intrinsic
        Syscall = 0x30 => "syscall",
        /// Call a function: entry, argument count, static link depth
        Invoke = 0x31 => "invoke",
        /// Call a method on a receiver: entry, argument count, static link depth
        InvokeVirtual = 0x32 => "invokevirtual",
        /// Size the current frame
        Reserve = 0x33 => "reserve",
        /// Return from a function
        Ret = 0x34 => "ret",
        /// Return from a method, handing the receiver back
        RetVirtual = 0x35 => "retvirtual",
        /// Unconditional jump
        Jmp = 0x36 => "jmp",
        /// Jump if false
        Jmpf = 0x37 => "jmpf",

        // Sequence construction
        /// Build an array from the top values
        Arr = 0x38 => "arr",
        /// Build a string from the top characters
        Str = 0x39 => "str",

        // Comparison
        /// Bool equality
        BEq = 0x40 => "beq",
        /// Integer equality
        IEq = 0x41 => "ieq",
        /// Float equality
        FEq = 0x42 => "feq",
        /// Char equality
        CEq = 0x43 => "ceq",
        /// Array and string equality
        ArrEq = 0x44 => "arreq",
        /// Bool inequality
        BNe = 0x45 => "bne",
        /// Integer inequality
        INe = 0x46 => "ine",
        /// Float inequality
        FNe = 0x47 => "fne",
        /// Char inequality
        CNe = 0x48 => "cne",
        /// Less than
        Lt = 0x49 => "lt",
        /// Greater than
        Gt = 0x4a => "gt",
        /// Less or equal
        Le = 0x4b => "le",
        /// Greater or equal
        Ge = 0x4c => "ge",
        /// Logical and
        BAnd = 0x4d => "band",
        /// Logical or
        BOr = 0x4e => "bor",

        // Sequences
        /// Index read
        GetSub = 0x50 => "getsub",
        /// Index write
        SetSub = 0x51 => "setsub",
        /// Sequence length
        Len = 0x52 => "len",
        /// Concatenate two sequences
        Append = 0x53 => "append",
        /// Append one element
        Cons = 0x54 => "cons",

        // Enclosing frames
        /// Push a slot of a lexically enclosing frame
        Upval = 0x58 => "upval",
        /// Pop into a slot of a lexically enclosing frame
        UpStore = 0x59 => "upstore",

        // Classes
        /// Allocate an instance
        Class = 0x60 => "class",
        /// Pop into a field of the instance below
        SetField = 0x61 => "setfield",
        /// Replace an instance with one of its fields
        GetField = 0x62 => "getfield",

        // Conversions
        /// Render any value as a string
        ToStr = 0x68 => "tostr",
        /// Integer or char to float
        I2F = 0x69 => "i2f",
        /// Float to integer
        F2I = 0x6a => "f2i",
        /// Bool to integer
        B2I = 0x6b => "b2i",
        /// Integer to char
        I2C = 0x6c => "i2c",
        /// Char to integer
        C2I = 0x6d => "c2i",
    }
}
