//=====================================================
// File: interpreter/timeline.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Temporal operation execution
// Objective: FOR_CHRONON, WHILE_EVENT, REWIND_FLOW, BRANCH_TIMELINE,
//            MERGE_TIMELINES and TEMPORAL_ECHO_LOOP over the scope chain
//            and the ledger
//=====================================================

use std::collections::HashMap;
use std::rc::Rc;

use super::environment::{Environment, SharedEnvironment};
use super::errors::{RuntimeError, RuntimeFault};
use super::value::{Value, ValueKind};
use super::{Exec, Interpreter};
use crate::ast::{Block, Expr, TemporalOpKind};
use crate::source::SourceLocation;

/// A branch waiting for MERGE_TIMELINES.
#[derive(Debug)]
pub(crate) struct PendingTimeline {
    snapshot_id: String,
    origin: HashMap<String, Value>,
    bindings: HashMap<String, Value>,
}

impl Interpreter {
    pub(crate) fn execute_temporal(
        &mut self,
        kind: TemporalOpKind,
        arguments: &[Expr],
        body: &Block,
        location: &SourceLocation,
    ) -> Exec<()> {
        tracing::trace!(op = %kind, line = location.line, "temporal operation");
        match kind {
            TemporalOpKind::ForChronon => self.for_chronon(arguments, body, location),
            TemporalOpKind::WhileEvent => self.while_event(arguments, body, location),
            TemporalOpKind::RewindFlow => self.rewind_flow(arguments, body, location),
            TemporalOpKind::BranchTimeline => self.branch_timeline(arguments, body, location),
            TemporalOpKind::MergeTimelines => self.merge_timelines(arguments, body, location),
            TemporalOpKind::TemporalEchoLoop => self.echo_loop(arguments, body, location),
        }
    }

    //=====================================================
    //            Section 1: Loops
    //=====================================================

    //Function: for_chronon
    //Purpose: Run the body `count` times with the index bound in a fresh scope
    //Inputs: (count) or (name, count)
    //Returns: Exec<()>
    fn for_chronon(&mut self, arguments: &[Expr], body: &Block, location: &SourceLocation) -> Exec<()> {
        let (name, count) =
            self.loop_arguments(TemporalOpKind::ForChronon, arguments, "chronon", location)?;
        for index in 0..count {
            self.spend_iteration(location)?;
            self.run_iteration(body, &name, Value::int(index))?;
        }
        Ok(())
    }

    fn while_event(&mut self, arguments: &[Expr], body: &Block, location: &SourceLocation) -> Exec<()> {
        let [condition] = arguments else {
            return Err(argument_error(
                location,
                "WHILE_EVENT expects exactly one condition",
            ));
        };
        let limit = self.config.max_loop_iterations;
        let mut iterations = 0usize;
        while self.evaluate(condition)?.as_boolean() {
            if iterations >= limit {
                return Err(RuntimeFault::new(
                    RuntimeError::IterationLimit {
                        kind: TemporalOpKind::WhileEvent,
                        limit,
                    },
                    location,
                ));
            }
            iterations += 1;
            self.spend_iteration(location)?;
            let scope = Environment::with_enclosing(Rc::clone(&self.environment));
            self.execute_block(&body.statements, scope.into_shared())?;
        }
        Ok(())
    }

    /// Like FOR_CHRONON, but the bound value is the previous iteration's
    /// last expression value (nil on the first pass).
    fn echo_loop(&mut self, arguments: &[Expr], body: &Block, location: &SourceLocation) -> Exec<()> {
        let (name, count) =
            self.loop_arguments(TemporalOpKind::TemporalEchoLoop, arguments, "echo", location)?;
        self.last_value = Value::nil();
        let mut echo = Value::nil();
        for _ in 0..count {
            self.spend_iteration(location)?;
            self.run_iteration(body, &name, echo)?;
            echo = self.last_value.clone();
        }
        Ok(())
    }

    fn run_iteration(&mut self, body: &Block, name: &str, bound: Value) -> Exec<()> {
        let mut scope = Environment::with_enclosing(Rc::clone(&self.environment));
        scope.define(name, bound);
        self.execute_block(&body.statements, scope.into_shared())
    }

    fn spend_iteration(&mut self, location: &SourceLocation) -> Exec<()> {
        let cost = self.config.chronons_per_iteration;
        self.ledger
            .consume_chronons(cost)
            .map_err(|err| RuntimeFault::new(err, location))
    }

    fn loop_arguments(
        &mut self,
        kind: TemporalOpKind,
        arguments: &[Expr],
        default_name: &str,
        location: &SourceLocation,
    ) -> Exec<(String, i64)> {
        let (name, count_expr) = match arguments {
            [count] => (default_name.to_string(), count),
            [Expr::Variable { name, .. }, count] => (name.clone(), count),
            _ => {
                return Err(argument_error(
                    location,
                    &format!("{} expects (count) or (name, count)", kind),
                ));
            }
        };
        let count = self.count_argument(kind, count_expr, location)?;
        let limit = self.config.max_loop_iterations;
        if usize::try_from(count).map_or(true, |count| count > limit) {
            return Err(RuntimeFault::new(
                RuntimeError::IterationLimit { kind, limit },
                location,
            ));
        }
        Ok((name, count))
    }

    fn count_argument(
        &mut self,
        kind: TemporalOpKind,
        expr: &Expr,
        location: &SourceLocation,
    ) -> Exec<i64> {
        let value = self.evaluate(expr)?;
        match value.kind {
            ValueKind::Int(count) if count >= 0 => Ok(count),
            _ => Err(argument_error(
                location,
                &format!(
                    "{} count must be a non-negative integer, got {}",
                    kind,
                    value.type_name()
                ),
            )),
        }
    }

    //=====================================================
    //            Section 2: Rewind
    //=====================================================

    //Function: rewind_flow
    //Purpose: Run the body, then roll bindings back to the state before it
    //         and charge the rewind. ANCHOR bindings keep their new values;
    //         resources spent in the body stay spent.
    //Inputs: () and a body
    //Returns: Exec<()>
    fn rewind_flow(&mut self, arguments: &[Expr], body: &Block, location: &SourceLocation) -> Exec<()> {
        expect_no_arguments(TemporalOpKind::RewindFlow, arguments, location)?;
        let snapshot_id = self
            .ledger
            .create_timeline_snapshot()
            .map_err(|err| RuntimeFault::new(err, location))?;
        self.flush_ledger_warnings(location);

        let saved: Vec<(SharedEnvironment, HashMap<String, Value>)> =
            Environment::chain(&self.environment)
                .into_iter()
                .map(|scope| {
                    let bindings = scope.borrow().snapshot_bindings();
                    (scope, bindings)
                })
                .collect();

        let scope = Environment::with_enclosing(Rc::clone(&self.environment));
        let result = self.execute_block(&body.statements, scope.into_shared());
        for (scope, bindings) in saved {
            scope.borrow_mut().restore_bindings(bindings);
        }
        if let Err(fault) = result {
            self.ledger.discard_snapshot(&snapshot_id);
            return Err(fault);
        }

        let rewound = self.ledger.rewind_to_snapshot(&snapshot_id);
        self.ledger.discard_snapshot(&snapshot_id);
        rewound.map_err(|err| RuntimeFault::new(err, location))?;
        self.flush_ledger_warnings(location);
        Ok(())
    }

    //=====================================================
    //            Section 3: Branch & Merge
    //=====================================================

    fn branch_timeline(
        &mut self,
        arguments: &[Expr],
        body: &Block,
        location: &SourceLocation,
    ) -> Exec<()> {
        let count = match arguments {
            [] => 1,
            [count] => self.count_argument(TemporalOpKind::BranchTimeline, count, location)?,
            _ => {
                return Err(argument_error(
                    location,
                    "BRANCH_TIMELINE expects () or (count)",
                ));
            }
        };
        for _ in 0..count {
            let snapshot_id = self
                .ledger
                .create_timeline_snapshot()
                .map_err(|err| RuntimeFault::new(err, location))?;
            self.flush_ledger_warnings(location);

            let origin = Environment::visible_bindings(&self.environment);
            let fork = Environment::fork_chain(&self.environment);
            if let Err(fault) = self.execute_block(&body.statements, Rc::clone(&fork)) {
                self.ledger.discard_snapshot(&snapshot_id);
                return Err(fault);
            }
            let bindings = Environment::visible_bindings(&fork);
            tracing::debug!(snapshot = %snapshot_id, "timeline branched");
            self.timelines.push(PendingTimeline {
                snapshot_id,
                origin,
                bindings,
            });
        }
        Ok(())
    }

    //Function: merge_timelines
    //Purpose: Fold every pending branch back into the current scope chain,
    //         then run the body. Later branches win on conflicts.
    //Inputs: () and a body
    //Returns: Exec<()>
    fn merge_timelines(
        &mut self,
        arguments: &[Expr],
        body: &Block,
        location: &SourceLocation,
    ) -> Exec<()> {
        expect_no_arguments(TemporalOpKind::MergeTimelines, arguments, location)?;
        let timelines = std::mem::take(&mut self.timelines);
        let ids: Vec<String> = timelines
            .iter()
            .map(|timeline| timeline.snapshot_id.clone())
            .collect();
        if let Err(err) = self.ledger.merge_timelines(&ids) {
            self.timelines = timelines;
            return Err(RuntimeFault::new(err, location));
        }
        self.flush_ledger_warnings(location);

        for timeline in timelines {
            let mut changed: Vec<(String, Value)> = timeline
                .bindings
                .into_iter()
                .filter(|(name, value)| {
                    timeline
                        .origin
                        .get(name)
                        .is_some_and(|original| original != value)
                })
                .collect();
            changed.sort_by(|a, b| a.0.cmp(&b.0));
            for (name, value) in changed {
                if let Some(scope) = Environment::environment_where(&self.environment, &name) {
                    let merged = scope
                        .borrow_mut()
                        .merge(&name, value)
                        .map_err(|err| RuntimeFault::new(err, location))?;
                    tracing::trace!(%name, merged, "merge binding");
                }
            }
        }

        let scope = Environment::with_enclosing(Rc::clone(&self.environment));
        self.execute_block(&body.statements, scope.into_shared())
    }
}

fn expect_no_arguments(kind: TemporalOpKind, arguments: &[Expr], location: &SourceLocation) -> Exec<()> {
    if arguments.is_empty() {
        Ok(())
    } else {
        Err(argument_error(
            location,
            &format!("{} takes no arguments", kind),
        ))
    }
}

fn argument_error(location: &SourceLocation, message: &str) -> RuntimeFault {
    RuntimeFault::new(RuntimeError::ArgumentError(message.to_string()), location)
}

#[cfg(test)]
mod tests {
    use crate::ast::Flag;
    use crate::diagnostics::ErrorSink;
    use crate::interpreter::{Interpreter, Value};
    use crate::parser::parse_str;

    fn run(text: &str) -> (Interpreter, ErrorSink) {
        let sink = ErrorSink::new();
        let program = parse_str(text, "timeline.chs", &sink).unwrap();
        let mut interpreter = Interpreter::new(sink.clone());
        interpreter.interpret(&program).unwrap();
        (interpreter, sink)
    }

    #[test]
    fn test_for_chronon_binds_index() {
        let (interpreter, sink) = run(
            "DECLARE CONF total : INT = 0; FOR_CHRONON(4) { total += chronon; }",
        );
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert_eq!(interpreter.global("total"), Some(Value::int(6)));
        assert_eq!(interpreter.ledger().chronons(), 996.0);
        assert!(interpreter.global("chronon").is_none());
    }

    #[test]
    fn test_for_chronon_named_binding() {
        let (interpreter, _) =
            run("DECLARE CONF total : INT = 0; FOR_CHRONON(i, 3) { total = total * 10 + i; }");
        assert_eq!(interpreter.global("total"), Some(Value::int(12)));
    }

    #[test]
    fn test_for_chronon_rejects_bad_count() {
        let (_, sink) = run("FOR_CHRONON(\"x\") { 1; }");
        assert!(sink.diagnostics()[0].message.contains("non-negative integer"));
    }

    #[test]
    fn test_while_event() {
        let (interpreter, _) =
            run("DECLARE CONF n : INT = 0; WHILE_EVENT(n < 5) { n += 1; }");
        assert_eq!(interpreter.global("n"), Some(Value::int(5)));
    }

    #[test]
    fn test_echo_loop_sees_previous_value() {
        let (interpreter, _) = run(
            "DECLARE CONF seen : INT = 0; TEMPORAL_ECHO_LOOP(3) { IF (echo) { seen += 1; } 10; }",
        );
        assert_eq!(interpreter.global("seen"), Some(Value::int(2)));
        assert_eq!(interpreter.last_value(), &Value::int(10));
    }

    #[test]
    fn test_rewind_restores_bindings_except_anchor() {
        let (interpreter, sink) = run(
            "DECLARE CONF x : INT = 1; DECLARE CONF a : INT ::ANCHOR = 1; \
             REWIND_FLOW() { x = 99; a = 99; DECLARE CONF t : INT = 5; x; }",
        );
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert_eq!(interpreter.global("x"), Some(Value::int(1)));
        assert_eq!(interpreter.global("a"), Some(Value::int(99)));
        assert_eq!(interpreter.last_value(), &Value::int(99));
        assert_eq!(interpreter.ledger().aethel(), 90.0);
        assert_eq!(interpreter.ledger().paradox_level(), 4);
        assert_eq!(interpreter.ledger().snapshot_count(), 0);
    }

    #[test]
    fn test_rewind_never_refunds_paradox_or_chronons() {
        let (interpreter, sink) = run(
            "DECLARE CONF a : INT = 1; DECLARE REB b : INT = 2; \
             REWIND_FLOW() { a + b; a + b; a + b; a + b; a + b; FOR_CHRONON(500) { } }",
        );
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        let ledger = interpreter.ledger();
        // snapshot 1, five mixed additions at 2 each, rewind 3
        assert_eq!(ledger.paradox_level(), 1 + 10 + 3);
        assert_eq!(ledger.chronons(), 1000.0 - 5.0 - 500.0);
        assert_eq!(ledger.aethel(), 90.0);
    }

    #[test]
    fn test_rewind_in_loop_releases_snapshots() {
        let (interpreter, sink) = run("FOR_CHRONON(5) { REWIND_FLOW() { } }");
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert_eq!(interpreter.ledger().snapshot_count(), 0);
    }

    #[test]
    fn test_failed_rewind_body_releases_snapshot() {
        let (interpreter, sink) = run("REWIND_FLOW() { missing; }");
        assert!(sink.has_errors());
        assert_eq!(interpreter.ledger().snapshot_count(), 0);
    }

    #[test]
    fn test_branch_inside_block_leaves_outer_bindings() {
        let (interpreter, sink) =
            run("DECLARE CONF g : INT = 1; { BRANCH_TIMELINE() { g = 99; } }");
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert_eq!(interpreter.global("g"), Some(Value::int(1)));
        assert_eq!(interpreter.pending_timelines(), 1);
    }

    #[test]
    fn test_branch_from_block_merges_outer_binding() {
        let (interpreter, sink) = run(
            "DECLARE CONF g : INT = 1; { BRANCH_TIMELINE() { g = 99; } } MERGE_TIMELINES() { }",
        );
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert_eq!(interpreter.global("g"), Some(Value::int(99)));
        assert_eq!(interpreter.ledger().snapshot_count(), 0);
    }

    #[test]
    fn test_branch_and_merge() {
        let (interpreter, sink) = run(
            "DECLARE CONF x : INT = 1; DECLARE CONF p : INT ::ANCHOR = 1; \
             BRANCH_TIMELINE() { x = 2; p = 2; } \
             x; \
             MERGE_TIMELINES() { x; }",
        );
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        assert_eq!(interpreter.global("x"), Some(Value::int(2)));
        assert_eq!(interpreter.global("p"), Some(Value::int(1)));
        assert_eq!(interpreter.last_value(), &Value::int(2));
        assert_eq!(interpreter.pending_timelines(), 0);
        assert_eq!(interpreter.ledger().snapshot_count(), 0);
    }

    #[test]
    fn test_branch_is_isolated_until_merge() {
        let (interpreter, _) =
            run("DECLARE CONF x : INT = 1; BRANCH_TIMELINE(2) { x = x + 5; }");
        assert_eq!(interpreter.global("x"), Some(Value::int(1)));
        assert_eq!(interpreter.pending_timelines(), 2);
    }

    #[test]
    fn test_merge_keeps_echo_history() {
        let (interpreter, _) = run(
            "DECLARE CONF e : INT ::ECHO = 1; BRANCH_TIMELINE() { e = 2; } MERGE_TIMELINES() { }",
        );
        let e = interpreter.global("e").unwrap();
        assert_eq!(e, Value::int(2));
        assert!(e.has_flag(Flag::Echo));
        assert_eq!(e.history, vec![Value::int(1)]);
    }

    #[test]
    fn test_iterations_exhaust_chronons() {
        let sink = ErrorSink::new();
        let mut config = crate::config::RuntimeConfig::default();
        config.ledger.initial_chronons = 3.0;
        let program = parse_str(
            "DECLARE CONF n : INT = 0; FOR_CHRONON(10) { n += 1; }",
            "t.chs",
            &sink,
        )
        .unwrap();
        let mut interpreter = Interpreter::with_config(config, sink.clone());
        interpreter.interpret(&program).unwrap();
        assert_eq!(interpreter.global("n"), Some(Value::int(3)));
        assert!(sink.diagnostics()[0].message.contains("Insufficient chronons"));
    }

    #[test]
    fn test_while_event_iteration_limit() {
        let sink = ErrorSink::new();
        let mut config = crate::config::RuntimeConfig::default();
        config.interpreter.max_loop_iterations = 5;
        let program = parse_str("WHILE_EVENT(TRUE) { }", "t.chs", &sink).unwrap();
        let mut interpreter = Interpreter::with_config(config, sink.clone());
        interpreter.interpret(&program).unwrap();
        assert_eq!(
            sink.diagnostics()[0].message,
            "WHILE_EVENT exceeded the iteration limit of 5"
        );
    }
}

//=====================================================
// End of file
//=====================================================
