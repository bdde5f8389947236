//=====================================================
// File: interpreter/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tree-walking evaluator for ChronoScript
// Objective: Execute parsed programs against a scope chain and a
//            temporal ledger, reporting faults through the error sink
//=====================================================

pub mod builtins;
pub mod environment;
pub mod errors;
mod timeline;
pub mod value;

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp, VariableDecl};
use crate::config::{InterpreterConfig, RuntimeConfig};
use crate::diagnostics::{ErrorSink, FatalError};
use crate::source::SourceLocation;
use crate::temporal::TemporalLedger;

pub use environment::{Environment, SharedEnvironment};
pub use errors::{ErrorCode, RuntimeError, RuntimeFault, ScriptError};
pub use value::{Distribution, NativeArity, NativeFunction, Value, ValueKind};

use timeline::PendingTimeline;

pub type Exec<T> = Result<T, RuntimeFault>;

//=====================================================
//            Section 1: Interpreter State
//=====================================================

pub struct Interpreter {
    globals: SharedEnvironment,
    environment: SharedEnvironment,
    ledger: TemporalLedger,
    sink: ErrorSink,
    config: InterpreterConfig,
    last_value: Value,
    depth: usize,
    timelines: Vec<PendingTimeline>,
    last_error: Option<RuntimeError>,
    rng: StdRng,
}

impl Interpreter {
    pub fn new(sink: ErrorSink) -> Self {
        Self::with_config(RuntimeConfig::default(), sink)
    }

    //Function: with_config
    //Purpose: Build an interpreter with globals and native functions installed
    //Inputs: config: RuntimeConfig, sink: ErrorSink
    //Returns: Self
    pub fn with_config(config: RuntimeConfig, sink: ErrorSink) -> Self {
        let globals = Environment::new().into_shared();
        builtins::install(&mut globals.borrow_mut());
        Self {
            environment: Rc::clone(&globals),
            globals,
            ledger: TemporalLedger::new(config.ledger),
            sink,
            config: config.interpreter,
            last_value: Value::nil(),
            depth: 0,
            timelines: Vec::new(),
            last_error: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Makes `collapse` and other sampling reproducible.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn globals(&self) -> &SharedEnvironment {
        &self.globals
    }

    pub fn environment(&self) -> &SharedEnvironment {
        &self.environment
    }

    pub fn ledger(&self) -> &TemporalLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut TemporalLedger {
        &mut self.ledger
    }

    pub fn sink(&self) -> &ErrorSink {
        &self.sink
    }

    pub fn last_value(&self) -> &Value {
        &self.last_value
    }

    pub fn pending_timelines(&self) -> usize {
        self.timelines.len()
    }

    /// The runtime error that stopped the most recent `interpret` call.
    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Global binding lookup, for embedders and tests.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).ok()
    }

    //=====================================================
    //            Section 2: Entry Point
    //=====================================================

    //Function: interpret
    //Purpose: Run every top-level statement in order
    //Inputs: program: &Program
    //Returns: value of the last expression statement, or nil after a reported
    //         runtime error; Err only for fatal conditions
    pub fn interpret(&mut self, program: &Program) -> Result<Value, FatalError> {
        self.last_value = Value::nil();
        self.last_error = None;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            program
                .statements
                .iter()
                .try_for_each(|stmt| self.execute(stmt))
        }));
        match outcome {
            Ok(Ok(())) => Ok(self.last_value.clone()),
            Ok(Err(fault)) if fault.error.is_fatal() => {
                self.reset_after_abort();
                self.last_error = Some(fault.error.clone());
                tracing::error!(error = %fault.error, "fatal runtime error");
                Err(self
                    .sink
                    .report_fatal(fault.location, fault.error.to_string()))
            }
            Ok(Err(fault)) => {
                tracing::debug!(code = fault.error.code(), error = %fault.error, "runtime error");
                self.sink
                    .report_error(fault.location, fault.error.to_string());
                self.last_error = Some(fault.error);
                Ok(Value::nil())
            }
            Err(payload) => {
                self.reset_after_abort();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(%message, "interpreter panicked");
                self.sink.report_error(
                    program.location.clone(),
                    format!("Internal error: {}", message),
                );
                Ok(Value::nil())
            }
        }
    }

    fn reset_after_abort(&mut self) {
        self.environment = Rc::clone(&self.globals);
        self.depth = 0;
    }

    //=====================================================
    //            Section 3: Statements
    //=====================================================

    pub fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        self.enter(stmt.location())?;
        let result = self.execute_inner(stmt);
        self.depth -= 1;
        result
    }

    fn execute_inner(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.last_value = self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Block(block) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(&block.statements, scope.into_shared())
            }
            Stmt::VariableDecl(decl) => self.declare(decl),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.as_boolean() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::TemporalOp {
                kind,
                arguments,
                body,
                location,
            } => self.execute_temporal(*kind, arguments, body, location),
        }
    }

    /// Runs `statements` with `environment` as the current scope, restoring
    /// the previous scope afterwards whether or not execution failed.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: SharedEnvironment) -> Exec<()> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;
        result
    }

    fn declare(&mut self, decl: &VariableDecl) -> Exec<()> {
        let mut value = match &decl.initializer {
            Some(initializer) => self.evaluate(initializer)?,
            None => Value::nil(),
        };
        value.stamp(decl.modifier, decl.flags);
        tracing::trace!(name = %decl.name, modifier = %decl.modifier, "declare");
        self.environment.borrow_mut().define(decl.name.clone(), value);
        Ok(())
    }

    //=====================================================
    //            Section 4: Expressions
    //=====================================================

    pub fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        self.enter(expr.location())?;
        let result = self.evaluate_inner(expr);
        self.depth -= 1;
        result
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(Value::from_literal(value)),
            Expr::Variable { name, location } => self
                .environment
                .borrow()
                .get(name)
                .map_err(|err| RuntimeFault::new(err, location)),
            Expr::Grouping { inner, .. } => self.evaluate(inner),
            Expr::Unary {
                operator,
                operand,
                location,
            } => {
                let operand = self.evaluate(operand)?;
                match operator {
                    UnaryOp::Negate => operand
                        .negate()
                        .map_err(|err| RuntimeFault::new(err, location)),
                    UnaryOp::Not => Ok(operand.logical_not()),
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
                location,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(*operator, &left, &right, location)
            }
            Expr::Assign {
                name,
                operator,
                value,
                location,
            } => {
                let mut value = self.evaluate(value)?;
                if let Some(op) = operator.binary_op() {
                    let current = self
                        .environment
                        .borrow()
                        .get(name)
                        .map_err(|err| RuntimeFault::new(err, location))?;
                    value = self.binary(op, &current, &value, location)?;
                }
                self.environment
                    .borrow_mut()
                    .assign(name, value)
                    .map_err(|err| RuntimeFault::new(err, location))
            }
            Expr::Call {
                callee,
                arguments,
                location,
            } => self.call(callee, arguments, location),
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        location: &SourceLocation,
    ) -> Exec<Value> {
        let result = match op {
            BinaryOp::Add => left.add(right),
            BinaryOp::Subtract => left.subtract(right),
            BinaryOp::Multiply => left.multiply(right),
            BinaryOp::Divide => left.divide(right),
            BinaryOp::Modulo => left.modulo(right),
            BinaryOp::Equal => Ok(Value::bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::bool(left != right)),
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                left.compare(op, right)
            }
            BinaryOp::And => Ok(if left.as_boolean() {
                Value::bool(right.as_boolean())
            } else {
                left.clone()
            }),
            BinaryOp::Or => Ok(if left.as_boolean() {
                left.clone()
            } else {
                Value::bool(right.as_boolean())
            }),
        };
        let value = result.map_err(|err| RuntimeFault::new(err, location))?;
        // Only operations that completed count towards paradox.
        if left.modifier != right.modifier {
            let amount = if op.is_arithmetic() {
                self.config.arithmetic_paradox
            } else {
                self.config.mixed_paradox
            };
            self.ledger.increase_paradox_level(amount);
            self.flush_ledger_warnings(location);
        }
        Ok(value)
    }

    fn call(&mut self, callee: &Expr, arguments: &[Expr], location: &SourceLocation) -> Exec<Value> {
        let callee = self.evaluate(callee)?;
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }
        match &callee.kind {
            ValueKind::NativeFunction(native) => {
                let native = Rc::clone(native);
                native
                    .check_arity(args.len())
                    .and_then(|()| (native.func)(self, &args))
                    .map_err(|err| RuntimeFault::new(err, location))
            }
            ValueKind::UserFunction(function) => {
                self.sink.report_warning(
                    location.clone(),
                    format!("Calling script function '{}' is not supported", function.name),
                );
                Ok(Value::nil())
            }
            _ => {
                self.sink.report_warning(
                    location.clone(),
                    format!("Value of type {} is not callable", callee.type_name()),
                );
                Ok(Value::nil())
            }
        }
    }

    //=====================================================
    //            Section 5: Helpers
    //=====================================================

    fn enter(&mut self, location: &SourceLocation) -> Exec<()> {
        if self.depth >= self.config.max_depth {
            return Err(RuntimeFault::new(
                RuntimeError::DepthExceeded(self.config.max_depth),
                location,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Surfaces a pending paradox high-water crossing as a warning.
    pub(crate) fn flush_ledger_warnings(&mut self, location: &SourceLocation) {
        if self.ledger.take_high_water_crossing() {
            self.sink.report_warning(
                location.clone(),
                format!(
                    "Paradox level {} exceeded the safe threshold of {}",
                    self.ledger.paradox_level(),
                    self.ledger.high_water_mark()
                ),
            );
        }
    }
}

//=====================================================
//            Section 6: Unit Tests
//=====================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Flag, Modifier};
    use crate::diagnostics::Severity;
    use crate::parser::parse_str;

    fn run(text: &str) -> (Interpreter, Value) {
        let sink = ErrorSink::new();
        let program = parse_str(text, "test.chs", &sink).unwrap();
        let mut interpreter = Interpreter::new(sink);
        let value = interpreter.interpret(&program).unwrap();
        (interpreter, value)
    }

    #[test]
    fn test_expression_value() {
        let (_, value) = run("1 + 2 * 3;");
        assert_eq!(value, Value::int(7));
        let (_, value) = run("\"a\" + 1;");
        assert_eq!(value.to_string(), "a1");
    }

    #[test]
    fn test_declarations_and_assignment() {
        let (interpreter, value) = run("DECLARE CONF x : INT = 10; x += 5; x;");
        assert_eq!(value, Value::int(15));
        assert_eq!(interpreter.global("x"), Some(Value::int(15)));
    }

    #[test]
    fn test_declaration_without_initializer_is_nil() {
        let (interpreter, value) = run("DECLARE REB y : FLOAT; y;");
        assert!(value.is_nil());
        assert_eq!(interpreter.global("y").map(|v| v.modifier), Some(Modifier::Reb));
    }

    #[test]
    fn test_block_scoping() {
        let (interpreter, _) = run("DECLARE CONF x : INT = 1; { DECLARE CONF x : INT = 2; x = 3; } x;");
        assert_eq!(interpreter.global("x"), Some(Value::int(1)));
        assert!(Rc::ptr_eq(interpreter.environment(), interpreter.globals()));
    }

    #[test]
    fn test_if_else() {
        let (_, value) = run("DECLARE CONF x : INT = 0; IF (x) { 1; } ELSE { 2; }");
        assert_eq!(value, Value::int(1));
        let (_, value) = run("IF (FALSE) { 1; }");
        assert!(value.is_nil());
    }

    #[test]
    fn test_logical_operators() {
        let (_, value) = run("FALSE && 1;");
        assert_eq!(value, Value::bool(false));
        let (_, value) = run("1 || FALSE;");
        assert_eq!(value, Value::int(1));
        let (_, value) = run("TRUE && 0;");
        assert_eq!(value, Value::bool(true));
    }

    #[test]
    fn test_runtime_error_is_reported_and_stops() {
        let sink = ErrorSink::new();
        let program = parse_str("DECLARE CONF a : INT = 1; 1 / 0; a = 2;", "t.chs", &sink).unwrap();
        let mut interpreter = Interpreter::new(sink.clone());
        let value = interpreter.interpret(&program).unwrap();
        assert!(value.is_nil());
        assert_eq!(interpreter.global("a"), Some(Value::int(1)));
        let diagnostics = sink.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].message, "Division by zero");
        assert_eq!(diagnostics[0].location.line, 1);
        assert_eq!(interpreter.last_error().map(RuntimeError::code), Some("E004"));
    }

    #[test]
    fn test_static_violation_reported() {
        let sink = ErrorSink::new();
        let program = parse_str(
            "DECLARE CONF k : INT ::STATIC = 1; k = 2;",
            "t.chs",
            &sink,
        )
        .unwrap();
        let mut interpreter = Interpreter::new(sink.clone());
        interpreter.interpret(&program).unwrap();
        assert_eq!(
            sink.diagnostics()[0].message,
            "Cannot reassign static variable 'k'"
        );
    }

    #[test]
    fn test_mixed_modifiers_raise_paradox() {
        let (interpreter, _) = run(
            "DECLARE CONF a : INT = 1; DECLARE REB b : INT = 2; a + b; a < b; a + a;",
        );
        assert_eq!(interpreter.ledger().paradox_level(), 3);
    }

    #[test]
    fn test_failed_mixed_operation_adds_no_paradox() {
        let (interpreter, _) = run("DECLARE CONF a : INT = 1; DECLARE REB b : INT = 0; a / b;");
        assert_eq!(interpreter.sink().diagnostics()[0].message, "Division by zero");
        assert_eq!(interpreter.ledger().paradox_level(), 0);
    }

    #[test]
    fn test_high_water_warning() {
        let sink = ErrorSink::new();
        let mut config = RuntimeConfig::default();
        config.ledger.paradox_high_water = 3;
        let program = parse_str(
            "DECLARE CONF a : INT = 1; DECLARE REB b : INT = 2; a + b; a + b; a + b;",
            "t.chs",
            &sink,
        )
        .unwrap();
        let mut interpreter = Interpreter::with_config(config, sink.clone());
        interpreter.interpret(&program).unwrap();
        let warnings: Vec<_> = sink
            .diagnostics()
            .into_iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("safe threshold"));
    }

    #[test]
    fn test_depth_limit_is_fatal() {
        let sink = ErrorSink::new();
        let mut config = RuntimeConfig::default();
        config.interpreter.max_depth = 4;
        let program = parse_str("((((((1))))));", "t.chs", &sink).unwrap();
        let mut interpreter = Interpreter::with_config(config, sink.clone());
        let err = interpreter.interpret(&program).unwrap_err();
        assert!(err.message.contains("depth"));
        assert_eq!(sink.diagnostics()[0].severity, Severity::Fatal);
    }

    #[test]
    fn test_non_callable_warns() {
        let sink = ErrorSink::new();
        let program = parse_str("DECLARE CONF n : INT = 3; n(1);", "t.chs", &sink).unwrap();
        let mut interpreter = Interpreter::new(sink.clone());
        let value = interpreter.interpret(&program).unwrap();
        assert!(value.is_nil());
        assert!(sink.has_warnings());
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_echo_flag_through_script() {
        let (interpreter, _) = run("DECLARE CONF e : INT ::ECHO = 1; e = 2; e = 3;");
        let e = interpreter.global("e").unwrap();
        assert!(e.has_flag(Flag::Echo));
        assert_eq!(e.history, vec![Value::int(1), Value::int(2)]);
    }
}

//=====================================================
// End of file
//=====================================================
