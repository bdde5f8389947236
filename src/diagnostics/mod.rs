//=====================================================
// File: diagnostics/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Collect lexer, parser, and runtime diagnostics
// Objective: Provide a shared, append-only error sink that the driver owns
//            and hands to every pipeline stage
//=====================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use crate::source::SourceLocation;

//=====================================================
//            Section 1: Severity & Diagnostic
//=====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: SourceLocation,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(location: SourceLocation, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            location,
            message: message.into(),
            severity,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let location = if self.location.is_valid() {
            json!({
                "file": self.location.source_name(),
                "line": self.location.line,
                "column": self.location.column,
            })
        } else {
            JsonValue::Null
        };
        json!({
            "severity": self.severity.label(),
            "message": self.message,
            "location": location,
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_valid() {
            write!(f, "{} at {}: {}", self.severity, self.location, self.message)
        } else {
            write!(f, "{}: {}", self.severity, self.message)
        }
    }
}

//=============================================/*
//  Rendering follows "<severity> at <file:line:col>: <message>".
//============================================*/
//=====================================================
//            Section 2: Fatal Error
//=====================================================

/// Unrecoverable condition. Already recorded in the sink when produced.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct FatalError {
    pub message: String,
    pub location: SourceLocation,
}

//=====================================================
//            Section 3: Error Sink
//=====================================================

/// Cloneable handle onto one shared diagnostics list.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    entries: Rc<RefCell<Vec<Diagnostic>>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, location: SourceLocation, message: impl Into<String>, severity: Severity) {
        let diagnostic = Diagnostic::new(location, message, severity);
        tracing::debug!(target: "chronoscript::diagnostics", "{}", diagnostic);
        self.entries.borrow_mut().push(diagnostic);
    }

    pub fn report_warning(&self, location: SourceLocation, message: impl Into<String>) {
        self.report(location, message, Severity::Warning);
    }

    pub fn report_error(&self, location: SourceLocation, message: impl Into<String>) {
        self.report(location, message, Severity::Error);
    }

    //Function: report_fatal
    //Purpose: Record a fatal diagnostic and hand back the error to unwind with
    //Inputs: location, message
    //Returns: FatalError
    #[must_use]
    pub fn report_fatal(&self, location: SourceLocation, message: impl Into<String>) -> FatalError {
        let message = message.into();
        self.report(location.clone(), message.clone(), Severity::Fatal);
        FatalError { message, location }
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| entry.severity != Severity::Warning)
    }

    pub fn has_warnings(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| entry.severity == Severity::Warning)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn to_json(&self) -> JsonValue {
        let entries: Vec<JsonValue> = self.entries.borrow().iter().map(Diagnostic::to_json).collect();
        json!({ "diagnostics": entries })
    }
}

//=====================================================
//            Section 4: Unit Tests
//=====================================================


//=====================================================
// End of file
//=====================================================
