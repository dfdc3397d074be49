use std::fmt::Display;

use thiserror::Error;

use crate::Position;

/// The user-facing error taxonomy. Every `ErrorImpl` belongs to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TypeError,
    ScopeError,
    SymbolLookupError,
    ArgumentError,
    ValueError,
    ParseError,
    InternalError,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ScopeError => "ScopeError",
            ErrorKind::SymbolLookupError => "SymbolLookupError",
            ErrorKind::ArgumentError => "ArgumentError",
            ErrorKind::ValueError => "ValueError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    /// Shorthand for compiler invariant violations.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::new(
            ErrorImpl::InternalError {
                message: message.into(),
            },
            Position::null(),
        )
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_kind(&self) -> ErrorKind {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. }
            | ErrorImpl::UnexpectedToken { .. }
            | ErrorImpl::UnexpectedTokenDetailed { .. }
            | ErrorImpl::NumberParseError { .. }
            | ErrorImpl::UnterminatedString
            | ErrorImpl::InconsistentDedent => ErrorKind::ParseError,

            ErrorImpl::UnknownType { .. }
            | ErrorImpl::TypeMatchError { .. }
            | ErrorImpl::ArgumentTypeMatchError { .. }
            | ErrorImpl::OperatorTypeError { .. }
            | ErrorImpl::UnaryOperatorTypeError { .. }
            | ErrorImpl::ConditionTypeError { .. }
            | ErrorImpl::NoneTypedVariable { .. }
            | ErrorImpl::NotAnObject { .. }
            | ErrorImpl::NotCallable { .. }
            | ErrorImpl::NotIndexable { .. }
            | ErrorImpl::ConstructorReturnType { .. }
            | ErrorImpl::InvalidReceiver { .. }
            | ErrorImpl::ReturnTypeMismatch { .. }
            | ErrorImpl::MissingReturn { .. } => ErrorKind::TypeError,

            ErrorImpl::FunctionNotInScope { .. }
            | ErrorImpl::MemberNotFound { .. }
            | ErrorImpl::MethodNotFound { .. }
            | ErrorImpl::GlobalNotFound { .. }
            | ErrorImpl::DuplicateDeclaration { .. }
            | ErrorImpl::MethodRedefined { .. }
            | ErrorImpl::MisplacedDeclaration { .. }
            | ErrorImpl::ReturnOutsideFunction => ErrorKind::ScopeError,

            ErrorImpl::VariableNotDeclared { .. } => ErrorKind::SymbolLookupError,

            ErrorImpl::ArgumentCountMismatch { .. }
            | ErrorImpl::ConstructorArguments { .. }
            | ErrorImpl::InvalidConstructorSignature { .. }
            | ErrorImpl::MissingReceiver { .. }
            | ErrorImpl::StaleCall { .. } => ErrorKind::ArgumentError,

            ErrorImpl::IndexOutOfRange { .. }
            | ErrorImpl::ZeroSliceStep
            | ErrorImpl::NoneReceiver
            | ErrorImpl::MemoryOutOfBounds { .. }
            | ErrorImpl::OutOfMemory { .. }
            | ErrorImpl::GlobalRegionExhausted { .. }
            | ErrorImpl::RecursionLimit { .. }
            | ErrorImpl::DivisionByZero => ErrorKind::ValueError,

            ErrorImpl::InternalError { .. } => ErrorKind::InternalError,
        }
    }

    pub fn get_error_name(&self) -> &str {
        self.get_kind().name()
    }

    pub fn get_message(&self) -> String {
        self.internal_error.to_string()
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnexpectedToken { token } if token == "INDENT" => {
                ErrorTip::Suggestion(String::from("Unexpected indentation"))
            }
            ErrorImpl::NumberParseError { .. } => ErrorTip::Suggestion(String::from(
                "Integers must fit in a signed 64-bit word",
            )),
            ErrorImpl::UnknownType { .. } => ErrorTip::Suggestion(String::from(
                "Valid types are int, bool, str, None or a declared class",
            )),
            ErrorImpl::OperatorTypeError { operator, .. } if operator == "is" => {
                ErrorTip::Suggestion(String::from(
                    "`is` compares an object or None against None",
                ))
            }
            ErrorImpl::VariableNotDeclared { variable } => ErrorTip::Suggestion(format!(
                "Declare `{}` with a type annotation first, e.g. `{}: int = 0`",
                variable, variable
            )),
            ErrorImpl::ConstructorArguments { .. } => ErrorTip::Suggestion(String::from(
                "Construct the object first and initialise it with a method call",
            )),
            ErrorImpl::NoneTypedVariable { .. } => ErrorTip::Suggestion(String::from(
                "Use a class type to hold an optional value",
            )),
            ErrorImpl::MissingReturn { .. } => ErrorTip::Suggestion(String::from(
                "Add a return statement to every branch",
            )),
            ErrorImpl::StaleCall { .. } => ErrorTip::Suggestion(String::from(
                "Redefine the calling function too so it matches the new signature",
            )),
            ErrorImpl::InternalError { .. } => ErrorTip::Suggestion(String::from(
                "Please report this bug to the compiler developers",
            )),
            _ => ErrorTip::None,
        }
    }

    /// Renders the offending source line (and the one before it) with the
    /// failing span underlined, followed by `<ErrorKind>: <message>`.
    pub fn render(&self, source: &str) -> String {
        let mut lines = vec![];
        let line = self.position.line as usize;

        if line > 0 {
            let source_lines = source.split('\n').collect::<Vec<&str>>();

            if line >= 2 {
                if let Some(previous) = source_lines.get(line - 2) {
                    lines.push(format!("{:>4}| {}", line - 1, previous.trim_end_matches('\r')));
                }
            }

            if let Some(current) = source_lines.get(line - 1) {
                lines.push(format!("{:>4}| {}", line, current.trim_end_matches('\r')));
                let padding = self.position.col as usize + 6;
                let carets = self.position.len.max(1) as usize;
                lines.push(format!("{}{}", " ".repeat(padding), "^".repeat(carets)));
            }
        }

        lines.push(self.to_string());
        lines.join("\n")
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.get_error_name(), self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    // Front end
    #[error("unrecognised token `{token}`")]
    UnrecognisedToken { token: String },
    #[error("unexpected token `{token}`")]
    UnexpectedToken { token: String },
    #[error("unexpected token `{token}`, {message}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("invalid integer literal `{token}`")]
    NumberParseError { token: String },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unindent does not match any outer indentation level")]
    InconsistentDedent,

    // Types
    #[error("unknown type `{type_}`")]
    UnknownType { type_: String },
    #[error("value of type {received} assigned to `{name}` which is of type {expected}")]
    TypeMatchError {
        name: String,
        expected: String,
        received: String,
    },
    #[error("argument {index} is of type {expected}, {received} provided")]
    ArgumentTypeMatchError {
        index: usize,
        expected: String,
        received: String,
    },
    #[error("operator `{operator}` cannot be applied to {left} and {right}")]
    OperatorTypeError {
        operator: String,
        left: String,
        right: String,
    },
    #[error("cannot use unary operator `{operator}` with {operand}")]
    UnaryOperatorTypeError { operator: String, operand: String },
    #[error("{construct} condition expected bool, found {received}")]
    ConditionTypeError { construct: String, received: String },
    #[error("variable `{variable}` cannot be of type None")]
    NoneTypedVariable { variable: String },
    #[error("cannot access member `{member}` on a value of type {received}")]
    NotAnObject { member: String, received: String },
    #[error("expression of type {received} cannot be called")]
    NotCallable { received: String },
    #[error("cannot index into a value of type {received}")]
    NotIndexable { received: String },
    #[error("constructor of `{class}` cannot have an explicit return type")]
    ConstructorReturnType { class: String },
    #[error("first parameter of `{method}` must be of type {expected}, found {received}")]
    InvalidReceiver {
        method: String,
        expected: String,
        received: String,
    },
    #[error("`{function}` returns {expected}, found a value of type {received}")]
    ReturnTypeMismatch {
        function: String,
        expected: String,
        received: String,
    },
    #[error("`{function}` must return a value of type {expected} on every path")]
    MissingReturn { function: String, expected: String },

    // Scopes
    #[error("function not in scope: `{function}`")]
    FunctionNotInScope { function: String },
    #[error("`{member}` is not a member of class `{class}`")]
    MemberNotFound { class: String, member: String },
    #[error("`{method}()` is not a method of class `{class}`")]
    MethodNotFound { class: String, method: String },
    #[error("global `{variable}` is not declared")]
    GlobalNotFound { variable: String },
    #[error("`{name}` is already declared in this scope")]
    DuplicateDeclaration { name: String },
    #[error("method `{method}` redefined in class `{class}`, first defined at line {first_line}")]
    MethodRedefined {
        class: String,
        method: String,
        first_line: u32,
    },
    #[error("{construct} is not allowed here")]
    MisplacedDeclaration { construct: String },
    #[error("`return` outside of a function")]
    ReturnOutsideFunction,

    // Symbols
    #[error("cannot find value `{variable}` in current scope")]
    VariableNotDeclared { variable: String },

    // Arguments
    #[error("`{function}()` needs {expected} arguments, {received} provided")]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("`{function}` now takes {found} argument(s), but this call was compiled for {expected}")]
    StaleCall {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("constructor for `{class}` takes exactly 0 arguments, {received} provided")]
    ConstructorArguments { class: String, received: usize },
    #[error("constructor of `{class}` should only take `self`, found {received} parameters")]
    InvalidConstructorSignature { class: String, received: usize },
    #[error("method `{method}` must take the receiver `self` as its first parameter")]
    MissingReceiver { method: String },

    // Runtime values
    #[error("string index {index} out of range for length {length}")]
    IndexOutOfRange { index: i64, length: usize },
    #[error("slice step cannot be zero")]
    ZeroSliceStep,
    #[error("operation on None")]
    NoneReceiver,
    #[error("memory access at {address} out of bounds")]
    MemoryOutOfBounds { address: u64 },
    #[error("cannot allocate {requested} bytes, memory exhausted")]
    OutOfMemory { requested: u64 },
    #[error("too many globals, at most {limit} may be declared")]
    GlobalRegionExhausted { limit: u32 },
    #[error("maximum call depth of {limit} exceeded")]
    RecursionLimit { limit: usize },
    #[error("integer division or modulo by zero")]
    DivisionByZero,

    #[error("an internal function ran into an invalid state ({message})")]
    InternalError { message: String },
}
