//==============================================
// File: runtime/mod.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared runtime helpers for ChronoScript
// Objective: Run sources end to end for the driver, and execute .chs
//            fixtures with consistent assertions for tests
//==============================================

//==============================================
// Import & Modules
//==============================================

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::ast::Program;
use crate::config::RuntimeConfig;
use crate::diagnostics::{Diagnostic, ErrorSink, Severity};
use crate::interpreter::{Interpreter, ScriptError, Value};
use crate::parser::Parser;
use crate::source::{SourceError, SourceFile};

//==============================================
// Section 1.0 - Run Reports
//==============================================

/// Everything one run of a source produced.
#[derive(Debug)]
pub struct RunReport {
    /// Parsed program; partial when parsing failed.
    pub program: Program,
    /// Set when evaluation ran and did not fail.
    pub value: Option<Value>,
    /// First failure, classified for the driver.
    pub error: Option<ScriptError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity != Severity::Warning)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Warning)
    }
}

//==============================================
// Section 2.0 - Execution
//==============================================

//Function: run_source
//Purpose: Parse `source` and, when it parses cleanly, interpret it
//Inputs: interpreter: shared state across runs (REPL), source
//Returns: RunReport with the diagnostics this run added to the sink
pub fn run_source(interpreter: &mut Interpreter, source: Rc<SourceFile>) -> RunReport {
    let sink = interpreter.sink().clone();
    let already_reported = sink.len();
    tracing::debug!(source = source.name(), bytes = source.len(), "running source");

    let (program, value, error) = match Parser::from_source(source, sink.clone()).parse() {
        Err(failure) => {
            let program = failure.program.clone();
            (program, None, Some(ScriptError::from(failure)))
        }
        Ok(program) => match interpreter.interpret(&program) {
            Err(fatal) => (program, None, Some(ScriptError::from(fatal))),
            Ok(value) => {
                let error = interpreter.last_error().cloned().map(ScriptError::from);
                let value = if error.is_some() { None } else { Some(value) };
                (program, value, error)
            }
        },
    };

    let diagnostics = sink.diagnostics().into_iter().skip(already_reported).collect();
    RunReport {
        program,
        value,
        error,
        diagnostics,
    }
}

pub fn run_str(text: &str, name: &str, config: RuntimeConfig) -> RunReport {
    let mut interpreter = Interpreter::with_config(config, ErrorSink::new());
    run_source(&mut interpreter, Rc::new(SourceFile::from_string(text, name)))
}

pub fn run_file(path: impl AsRef<Path>, config: RuntimeConfig) -> Result<RunReport, SourceError> {
    let source = Rc::new(SourceFile::from_path(path)?);
    let mut interpreter = Interpreter::with_config(config, ErrorSink::new());
    Ok(run_source(&mut interpreter, source))
}

//==============================================
// Section 3.0 - CHS Test Harness
//==============================================
// Run a .chs script relative to the crate root and assert it returns TRUE.
pub fn run_chs_test(relative_path: &str) {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let script_path = manifest_dir.join(relative_path);

    let start = Instant::now();
    let report = run_file(&script_path, RuntimeConfig::default())
        .unwrap_or_else(|err| panic!("read {} failed: {}", script_path.display(), err));
    let elapsed = start.elapsed();
    if elapsed > Duration::from_secs(5) {
        panic!(
            "CHS test {} timed out after {:?}",
            script_path.display(),
            elapsed
        );
    }

    if report.has_errors() {
        let rendered: Vec<String> = report.diagnostics.iter().map(ToString::to_string).collect();
        panic!(
            "CHS test {} reported errors:\n{}",
            script_path.display(),
            rendered.join("\n")
        );
    }
    match report.value {
        Some(value) if value == Value::bool(true) => {}
        other => panic!(
            "CHS test {} failed: expected TRUE, got {other:?}",
            script_path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ErrorCode;

    #[test]
    fn test_run_str_success() {
        let report = run_str("DECLARE CONF x : INT = 2; x * 21;", "ok.chs", RuntimeConfig::default());
        assert!(!report.has_errors());
        assert_eq!(report.value, Some(Value::int(42)));
        assert!(report.error.is_none());
    }

    #[test]
    fn test_run_str_parse_failure_keeps_partial_program() {
        let report = run_str("x = ; y = 1;", "bad.chs", RuntimeConfig::default());
        assert!(report.has_errors());
        assert_eq!(report.program.statements.len(), 1);
        assert_eq!(report.error.map(|e| e.code), Some(ErrorCode::Syntax));
        assert!(report.value.is_none());
    }

    #[test]
    fn test_run_str_runtime_error_code() {
        let report = run_str("missing + 1;", "rt.chs", RuntimeConfig::default());
        assert_eq!(
            report.error.as_ref().map(ScriptError::code_str),
            Some("E002")
        );
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_run_source_reports_only_new_diagnostics() {
        let sink = ErrorSink::new();
        let mut interpreter = Interpreter::new(sink.clone());
        let first = run_source(
            &mut interpreter,
            Rc::new(SourceFile::from_string("nope;", "<repl>")),
        );
        assert_eq!(first.diagnostics.len(), 1);
        let second = run_source(
            &mut interpreter,
            Rc::new(SourceFile::from_string("1;", "<repl>")),
        );
        assert!(second.diagnostics.is_empty());
        assert_eq!(second.value, Some(Value::int(1)));
    }
}

//==============================================
// End of file
//==============================================
