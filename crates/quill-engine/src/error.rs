// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for compilation and execution.

use thiserror::Error;

use crate::ast::Location;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the engine facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Semantic analysis rejected the program
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// Execution stopped on a fault
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A semantic diagnostic tied to a source position.
///
/// Renders as `<source>:<line>:<column> (Semantic): <message>`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{source_name}:{}:{} (Semantic): {kind}", .location.line, .location.column)]
pub struct SemanticError {
    /// Name of the compiled source
    pub source_name: String,
    /// Offending node's position
    pub location: Location,
    /// What went wrong
    pub kind: SemanticErrorKind,
}

/// Every way a program can be rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticErrorKind {
    // ========================================================================
    // Declarations
    // ========================================================================
    /// Name already declared in the same scope
    #[error("Redefinition of symbol '{name}' (previous definition at line {line} column {column})")]
    Redefinition {
        /// Symbol name
        name: String,
        /// Line of the earlier declaration
        line: u32,
        /// Column of the earlier declaration
        column: u32,
    },

    /// Initializer produced no value
    #[error("Variable initializer is of type VOID")]
    VoidInitializer,

    /// Initializer is a statement
    #[error("Variable initializer is NULL")]
    NullInitializer,

    /// Initializer names a function
    #[error("Trying to assign a function to a value")]
    FunctionInitializer,

    /// Function name used where a value is needed
    #[error("Function '{name}' cannot be used as a value")]
    FunctionAsValue {
        /// Function name
        name: String,
    },

    /// A class field of the class's own type
    #[error("Circular reference: class '{class}' cannot contain a field of its own type")]
    CircularReference {
        /// Class name
        class: String,
    },

    /// Class name declared twice in the same scope
    #[error("Class '{name}' already exists")]
    ClassAlreadyExists {
        /// Class name
        name: String,
    },

    // ========================================================================
    // Names and assignment
    // ========================================================================
    /// Unknown variable
    #[error("Implicit declaration of field '{name}'")]
    ImplicitDeclaration {
        /// Variable name
        name: String,
    },

    /// Unknown function
    #[error("Implicit declaration of function '{name}'")]
    ImplicitFunction {
        /// Function name
        name: String,
    },

    /// Assignment to a `let` binding
    #[error("Invalid statement, trying to modify an immutable variable '{name}'")]
    ImmutableAssignment {
        /// Variable name
        name: String,
    },

    /// Assignment to something that is not a variable
    #[error("Left hand side value must be a variable ('{name}')")]
    NotAssignable {
        /// Target name
        name: String,
    },

    /// Assigned value does not match the variable type
    #[error("Change of types is not permitted (expected '{expected}', found '{found}')")]
    TypeChange {
        /// Variable type
        expected: String,
        /// Value type
        found: String,
    },

    /// Subscript assignment on an expression
    #[error("Identifier for index access expected")]
    IndexTargetNotIdentifier,

    /// Subscript assignment on a function or class
    #[error("Subscripts are only allowed for variables ('{name}')")]
    SubscriptNotVariable {
        /// Target name
        name: String,
    },

    /// Subscript assignment on an immutable sequence
    #[error("The field '{name}' is immutable")]
    ImmutableField {
        /// Variable name
        name: String,
    },

    /// Stored element does not match the sequence element type
    #[error("Assignment value has the wrong type (expected '{expected}', found '{found}')")]
    AssignmentValueMismatch {
        /// Element type
        expected: String,
        /// Value type
        found: String,
    },

    /// Assignment target is neither a variable nor a subscript
    #[error("Unknown assignment operation")]
    UnknownAssignment,

    // ========================================================================
    // Calls
    // ========================================================================
    /// Callee names a variable
    #[error("Identifier '{name}' is not a function")]
    NotAFunction {
        /// Callee name
        name: String,
    },

    /// Callee is neither a name nor a member access
    #[error("Callee has to be an identifier or a method access")]
    InvalidCallee,

    /// Too many arguments
    #[error("Too many arguments for function '{name}'. Expected: {expected}")]
    TooManyArguments {
        /// Callee name
        name: String,
        /// Declared parameter count
        expected: usize,
    },

    /// Too few arguments
    #[error("Too few arguments for function '{name}'. Expected: {expected}")]
    TooFewArguments {
        /// Callee name
        name: String,
        /// Declared parameter count
        expected: usize,
    },

    /// Argument not accepted by its parameter
    #[error("Parameter {index} has the wrong type (found: {found}, expected: {expected})")]
    ParameterMismatch {
        /// 1-based parameter position
        index: usize,
        /// Argument type
        found: String,
        /// Parameter type
        expected: String,
    },

    /// Value method called with arguments
    #[error("Expected zero arguments for '{method}'")]
    ExpectedNoArguments {
        /// Method name
        method: String,
    },

    /// Value method called without exactly one argument
    #[error("Expected exactly one argument for '{method}'")]
    ExpectedOneArgument {
        /// Method name
        method: String,
    },

    /// Value method argument of the wrong type
    #[error("Argument of '{method}' has the wrong type (expected '{expected}', found '{found}')")]
    ArgumentMismatch {
        /// Method name
        method: String,
        /// Accepted type
        expected: String,
        /// Argument type
        found: String,
    },

    /// Value method does not exist for the receiver type
    #[error("No such function '{method}' for type '{ty}'")]
    NoSuchMethod {
        /// Method name
        method: String,
        /// Receiver type
        ty: String,
    },

    /// Class member does not exist
    #[error("Class field '{member}' does not exist in class '{class}'")]
    NoSuchMember {
        /// Member name
        member: String,
        /// Class name
        class: String,
    },

    /// Class type without a visible declaration
    #[error("Class '{name}' does not exist")]
    UnknownClass {
        /// Class name
        name: String,
    },

    // ========================================================================
    // Operators and indexing
    // ========================================================================
    /// Operator not defined on the operand types
    #[error("Cannot perform operation '{op}' on the types '{left}' and '{right}'")]
    OperandMismatch {
        /// Operator
        op: String,
        /// Left operand type
        left: String,
        /// Right operand type
        right: String,
    },

    /// Constant integer expression with a non-integer operator
    #[error("Invalid operator '{op}'. Operator might not be available for integers")]
    InvalidIntOperator {
        /// Operator
        op: String,
    },

    /// Constant float expression with a non-float operator
    #[error("Invalid operator '{op}'. Operator might not be available for floats")]
    InvalidFloatOperator {
        /// Operator
        op: String,
    },

    /// Constant integer division by zero
    #[error("Division by zero in constant expression")]
    ConstantDivisionByZero,

    /// Unary operator not defined on the operand type
    #[error("Invalid unary operator '{op}' for type '{ty}'")]
    InvalidUnary {
        /// Operator
        op: String,
        /// Operand type
        ty: String,
    },

    /// Condition is not a bool
    #[error("Condition must be of type bool, found '{found}'")]
    ConditionNotBool {
        /// Condition type
        found: String,
    },

    /// Subscript on a class instance, or member access outside a call
    #[error("Field access of classes is not permitted")]
    ClassFieldAccess,

    /// Non-integer subscript key
    #[error("Key must be of type integer")]
    KeyNotInteger,

    /// Subscript on a type that cannot be indexed
    #[error("Invalid subscript operation on type '{ty}'")]
    InvalidSubscript {
        /// Indexed type
        ty: String,
    },

    /// Constant index outside a statically known size
    #[error("Array index {index} out of bounds (size {size})")]
    IndexOutOfBounds {
        /// Constant index
        index: i64,
        /// Known size
        size: usize,
    },

    /// Array literal of statements or void values
    #[error("Invalid: Array is composed of NULL elements")]
    NullArray,

    /// Array literal of arrays
    #[error("Multidimensional arrays are not permitted")]
    MultidimensionalArray,

    /// Array literal with differently typed elements
    #[error("An array can only hold one type of elements (@element {element})")]
    MixedArray {
        /// 1-based position of the first mismatching element
        element: usize,
    },

    // ========================================================================
    // Functions
    // ========================================================================
    /// Return before the last statement of a body
    #[error("Return statement declared before end was reached")]
    ReturnBeforeEnd,

    /// Void function returning a value
    #[error("Functions with type void do not return a value")]
    VoidReturnsValue,

    /// Bare return in a non-void function
    #[error("Return statement without a value")]
    ReturnWithoutValue,

    /// Non-void function without a final return
    #[error("Function '{name}' without return statement")]
    MissingReturn {
        /// Function name
        name: String,
    },

    /// Return at top level
    #[error("Return statement is not within a function")]
    ReturnOutsideFunction,

    /// Returned value does not match the declared type
    #[error("Return value doesn't match the return type (expected '{expected}', found '{found}')")]
    ReturnTypeMismatch {
        /// Declared type
        expected: String,
        /// Returned type
        found: String,
    },

    // ========================================================================
    // Classes and annotations
    // ========================================================================
    /// Field read inside the constructor body
    #[error("Accessing class fields within the constructor is not permitted ('{name}')")]
    FieldAccessInConstructor {
        /// Field name
        name: String,
    },

    /// Constructor parameter read from a method
    #[error("Trying to access a constructor parameter ('{name}')")]
    ConstructorParameterAccess {
        /// Parameter name
        name: String,
    },

    /// Expression or control flow directly in a class body
    #[error("Statements are not allowed as a direct field of a class")]
    StatementInClassBody,

    /// Same annotation twice before one declaration
    #[error("Annotation flag {annotation} is already set")]
    AnnotationAlreadySet {
        /// Annotation
        annotation: &'static str,
    },

    /// Accessor annotation outside a class
    #[error("Annotations can only be used within classes ({annotation})")]
    AnnotationOutsideClass {
        /// Annotation
        annotation: &'static str,
    },

    /// `@Setter` on a `let` field
    #[error("Setters are only valid for mutable variables ('{name}')")]
    SetterOnImmutable {
        /// Field name
        name: String,
    },
}

/// Conditions that stop the VM.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    /// Pop from an empty operand stack
    #[error("Stack underflow")]
    StackUnderflow,

    /// Operand stack grew past its limit
    #[error("Stack overflow (limit {0})")]
    StackOverflow(usize),

    /// Call nesting grew past its limit
    #[error("Call depth exceeded (limit {0})")]
    CallDepthExceeded(usize),

    /// Integer division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Operand of the wrong runtime type
    #[error("Type mismatch in '{op}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Instruction mnemonic
        op: &'static str,
        /// Accepted type
        expected: &'static str,
        /// Actual type
        found: &'static str,
    },

    /// Instruction is missing an operand
    #[error("Missing operand for '{0}'")]
    MissingOperand(&'static str),

    /// Slot address outside the frame or globals
    #[error("Invalid address {0}")]
    InvalidAddress(i64),

    /// Enclosing frame does not exist
    #[error("No enclosing frame at depth {0}")]
    InvalidDepth(i64),

    /// Sequence index outside its bounds
    #[error("Index {index} out of bounds (length {length})")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Sequence length
        length: usize,
    },

    /// Field index outside the instance
    #[error("Field {0} does not exist")]
    InvalidField(i64),

    /// Receiver access without a receiver
    #[error("No receiver bound")]
    MissingReceiver,

    /// Return without a matching invocation
    #[error("Return outside of a call")]
    ReturnOutsideCall,

    /// Jump or call target outside the buffer
    #[error("Invalid jump target {0}")]
    InvalidTarget(i64),

    /// Syscall index without an intrinsic
    #[error("Unknown intrinsic {0}")]
    UnknownIntrinsic(i64),

    /// Integer is not a valid character
    #[error("Invalid character code {0}")]
    InvalidChar(i64),

    /// Host I/O failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// A fault together with the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{pc} (Runtime): {fault}")]
pub struct RuntimeError {
    /// Index of the faulting instruction
    pub pc: usize,
    /// What went wrong
    pub fault: Fault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_error_format() {
        let err = SemanticError {
            source_name: "main.gs".to_string(),
            location: Location::new(4, 9),
            kind: SemanticErrorKind::KeyNotInteger,
        };
        assert_eq!(err.to_string(), "main.gs:4:9 (Semantic): Key must be of type integer");
    }

    #[test]
    fn test_redefinition_message() {
        let kind = SemanticErrorKind::Redefinition {
            name: "x".to_string(),
            line: 1,
            column: 5,
        };
        assert_eq!(
            kind.to_string(),
            "Redefinition of symbol 'x' (previous definition at line 1 column 5)"
        );
    }

    #[test]
    fn test_runtime_error_format() {
        let err = RuntimeError {
            pc: 7,
            fault: Fault::DivisionByZero,
        };
        assert_eq!(err.to_string(), "7 (Runtime): Division by zero");
        let wrapped: Error = err.into();
        assert!(matches!(wrapped, Error::Runtime(_)));
    }
}
