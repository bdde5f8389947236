//=====================================================
// File: interpreter/errors.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime error taxonomy and driver-facing error codes
// Objective: Classify lexer, parser, runtime, ledger and fatal failures
//            into stable E-codes for the CLI
//=====================================================

use thiserror::Error;

use crate::ast::TemporalOpKind;
use crate::diagnostics::FatalError;
use crate::parser::{ParseError, ParseFailure};
use crate::source::SourceLocation;
use crate::temporal::LedgerError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("Cannot reassign static variable '{0}'")]
    ImmutableViolation(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("{0} by zero")]
    DivisionByZero(&'static str),
    #[error("Integer overflow in {0}")]
    IntegerOverflow(&'static str),
    #[error("Argument error: {0}")]
    ArgumentError(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("{kind} exceeded the iteration limit of {limit}")]
    IterationLimit { kind: TemporalOpKind, limit: usize },
    #[error("Maximum evaluation depth of {0} exceeded")]
    DepthExceeded(usize),
    #[error("{0}")]
    Custom(String),
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        runtime_error_code(self).as_str()
    }

    /// Fatal errors unwind past `Interpreter::interpret`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RuntimeError::DepthExceeded(_))
    }
}

/// A runtime error tied to the node that raised it.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{error}")]
pub struct RuntimeFault {
    pub error: RuntimeError,
    pub location: SourceLocation,
}

impl RuntimeFault {
    pub fn new(error: impl Into<RuntimeError>, location: &SourceLocation) -> Self {
        Self {
            error: error.into(),
            location: location.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    UndefinedVariable,
    TypeMismatch,
    InvalidOperation,
    Temporal,
    Fatal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::UndefinedVariable => "E002",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::Temporal => "E005",
            ErrorCode::Fatal => "E006",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("[{}] {message}", .code.as_str())]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        ScriptError::new(ErrorCode::Syntax, value.to_string())
    }
}

impl From<ParseFailure> for ScriptError {
    fn from(value: ParseFailure) -> Self {
        match value.errors.into_iter().next() {
            Some(first) => first.into(),
            None => ScriptError::new(
                ErrorCode::Syntax,
                format!("{} lexical error(s)", value.lexical_errors),
            ),
        }
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(runtime_error_code(&value), value.to_string())
    }
}

impl From<RuntimeFault> for ScriptError {
    fn from(value: RuntimeFault) -> Self {
        value.error.into()
    }
}

impl From<FatalError> for ScriptError {
    fn from(value: FatalError) -> Self {
        ScriptError::new(ErrorCode::Fatal, value.message)
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::UndefinedVariable(_) => ErrorCode::UndefinedVariable,
        RuntimeError::TypeError(_) => ErrorCode::TypeMismatch,
        RuntimeError::ImmutableViolation(_)
        | RuntimeError::DivisionByZero(_)
        | RuntimeError::IntegerOverflow(_)
        | RuntimeError::ArgumentError(_)
        | RuntimeError::Custom(_) => ErrorCode::InvalidOperation,
        RuntimeError::Ledger(_) | RuntimeError::IterationLimit { .. } => ErrorCode::Temporal,
        RuntimeError::DepthExceeded(_) => ErrorCode::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::Resource;

    #[test]
    fn test_codes() {
        assert_eq!(RuntimeError::UndefinedVariable("x".into()).code(), "E002");
        assert_eq!(RuntimeError::TypeError("bad".into()).code(), "E003");
        assert_eq!(RuntimeError::DivisionByZero("Modulo").code(), "E004");
        let ledger = LedgerError::InsufficientResource {
            resource: Resource::Aethel,
            requested: 5.0,
            available: 1.0,
        };
        assert_eq!(RuntimeError::from(ledger).code(), "E005");
        assert!(RuntimeError::DepthExceeded(8).is_fatal());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RuntimeError::DivisionByZero("Division").to_string(),
            "Division by zero"
        );
        assert_eq!(
            RuntimeError::ImmutableViolation("x".into()).to_string(),
            "Cannot reassign static variable 'x'"
        );
        let script: ScriptError = RuntimeError::TypeError("nope".into()).into();
        assert_eq!(script.to_string(), "[E003] Type error: nope");
    }
}

//==================================================
// End of file
//==================================================
