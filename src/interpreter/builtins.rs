//=====================================================
// File: interpreter/builtins.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Native functions available to every script
// Objective: Output, clock, ledger inspection, value inspection and
//            probabilistic weaving/collapse
//=====================================================

use std::io::Write;

use chrono::Utc;

use super::Interpreter;
use super::environment::Environment;
use super::errors::RuntimeError;
use super::value::{Distribution, NativeArity, NativeFn, Value, ValueKind};
use crate::ast::{Flag, Modifier};

const NATIVES: &[(&str, NativeArity, NativeFn)] = &[
    ("print", NativeArity::Variadic, native_print),
    ("clock", NativeArity::Exact(0), native_clock),
    ("paradox_level", NativeArity::Exact(0), native_paradox_level),
    ("aethel", NativeArity::Exact(0), native_aethel),
    ("chronons", NativeArity::Exact(0), native_chronons),
    ("array", NativeArity::Variadic, native_array),
    ("len", NativeArity::Exact(1), native_len),
    ("type_of", NativeArity::Exact(1), native_type_of),
    ("history", NativeArity::Exact(1), native_history),
    ("uncertainty", NativeArity::Exact(1), native_uncertainty),
    ("weave", NativeArity::Exact(2), native_weave),
    ("collapse", NativeArity::Exact(1), native_collapse),
];

/// Defines every native function in `globals`.
pub fn install(globals: &mut Environment) {
    for (name, arity, func) in NATIVES {
        globals.define(*name, Value::native(*name, *arity, *func));
    }
}

pub fn names() -> impl Iterator<Item = &'static str> {
    NATIVES.iter().map(|(name, _, _)| *name)
}

//=====================================================
//            Section 1: Output & Clock
//=====================================================

fn native_print(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)
        .map_err(|err| RuntimeError::Custom(format!("print failed: {}", err)))?;
    Ok(Value::nil())
}

fn native_clock(_: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    let millis = Utc::now().timestamp_millis();
    Ok(Value::float(millis as f64 / 1000.0))
}

//=====================================================
//            Section 2: Ledger Inspection
//=====================================================

fn native_paradox_level(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::int(i64::from(interpreter.ledger().paradox_level())))
}

fn native_aethel(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::float(interpreter.ledger().aethel()))
}

fn native_chronons(interpreter: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::float(interpreter.ledger().chronons()))
}

//=====================================================
//            Section 3: Values
//=====================================================

fn native_array(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::array(args.iter().map(Value::bare).collect()))
}

fn native_len(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let len = match &args[0].kind {
        ValueKind::String(s) => s.chars().count(),
        ValueKind::Array(items) => items.borrow().len(),
        ValueKind::Map(entries) => entries.borrow().len(),
        _ => {
            return Err(RuntimeError::TypeError(format!(
                "len() expects a string, array or map, got {}",
                args[0].type_name()
            )));
        }
    };
    i64::try_from(len)
        .map(Value::int)
        .map_err(|_| RuntimeError::IntegerOverflow("len"))
}

fn native_type_of(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::string(args[0].type_name()))
}

fn native_history(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::array(args[0].history.clone()))
}

fn native_uncertainty(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::float(args[0].uncertainty))
}

//=====================================================
//            Section 4: Weaving
//=====================================================

//Function: native_weave
//Purpose: Build a REB value spread across several outcomes
//Inputs: values: array, weights: array of non-negative numbers (same length)
//Returns: the heaviest outcome, WEAVER-flagged, carrying the distribution
fn native_weave(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let (ValueKind::Array(values), ValueKind::Array(weights)) = (&args[0].kind, &args[1].kind)
    else {
        return Err(RuntimeError::ArgumentError(
            "weave() expects two arrays".to_string(),
        ));
    };
    let values = values.borrow();
    let weights = weights.borrow();
    if values.len() != weights.len() {
        return Err(RuntimeError::ArgumentError(format!(
            "weave() got {} values but {} weights",
            values.len(),
            weights.len()
        )));
    }

    let mut distribution = Distribution::new();
    for (value, weight) in values.iter().zip(weights.iter()) {
        let weight = weight
            .as_f64()
            .filter(|w| w.is_finite() && *w >= 0.0)
            .ok_or_else(|| {
                RuntimeError::ArgumentError(format!(
                    "weave() weights must be non-negative numbers, got {}",
                    weight
                ))
            })?;
        distribution.insert(value.clone(), weight);
    }

    let total = distribution.total_weight();
    if !total.is_finite() {
        return Err(RuntimeError::ArgumentError(
            "weave() weights are too large to sum".to_string(),
        ));
    }
    let Some(top) = distribution.most_likely().cloned() else {
        return Err(RuntimeError::ArgumentError(
            "weave() needs at least one outcome".to_string(),
        ));
    };
    let mut woven = top.bare();
    if total > 0.0 {
        let top_weight = distribution.weight_of(&top).unwrap_or(0.0);
        woven.uncertainty = 1.0 - top_weight / total;
    }
    woven.modifier = Modifier::Reb;
    woven.flags.insert(Flag::Weaver);
    Ok(woven.with_distribution(distribution))
}

fn native_collapse(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(args[0].resolve_with(interpreter.rng()).bare())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorSink;
    use crate::parser::parse_str;

    fn eval(text: &str) -> (Interpreter, ErrorSink, Value) {
        let sink = ErrorSink::new();
        let program = parse_str(text, "natives.chs", &sink).unwrap();
        let mut interpreter = Interpreter::new(sink.clone());
        interpreter.set_seed(11);
        let value = interpreter.interpret(&program).unwrap();
        (interpreter, sink, value)
    }

    #[test]
    fn test_natives_installed() {
        let (interpreter, _, _) = eval("1;");
        for name in names() {
            let value = interpreter.global(name).unwrap();
            assert_eq!(value.to_string(), format!("<native function {}>", name));
        }
    }

    #[test]
    fn test_arity_checked() {
        let (_, sink, value) = eval("clock(1);");
        assert!(value.is_nil());
        assert_eq!(
            sink.diagnostics()[0].message,
            "Argument error: clock() expects 0 argument(s), got 1"
        );
    }

    #[test]
    fn test_ledger_inspection() {
        let (_, _, value) = eval("paradox_level();");
        assert_eq!(value, Value::int(0));
        let (_, _, value) = eval("aethel();");
        assert_eq!(value, Value::float(100.0));
    }

    #[test]
    fn test_clock_is_recent() {
        let (_, _, value) = eval("clock();");
        assert!(value.as_f64().is_some_and(|secs| secs > 1_600_000_000.0));
    }

    #[test]
    fn test_array_len_and_type_of() {
        let (_, _, value) = eval("len(array(1, 2, 3));");
        assert_eq!(value, Value::int(3));
        let (_, _, value) = eval("type_of(1.5);");
        assert_eq!(value, Value::string("float"));
        let (_, sink, _) = eval("len(4);");
        assert!(sink.diagnostics()[0].message.contains("len() expects"));
    }

    #[test]
    fn test_history_native() {
        let (_, _, value) = eval("DECLARE CONF e : INT ::ECHO = 1; e = 2; history(e);");
        assert_eq!(value.to_string(), "[1]");
    }

    #[test]
    fn test_weave_and_collapse() {
        let (interpreter, sink, value) = eval(
            "DECLARE REB w : STRING ::WEAVER = weave(array(\"a\", \"b\"), array(1, 3)); \
             collapse(w);",
        );
        assert!(sink.is_empty(), "{:?}", sink.diagnostics());
        let woven = interpreter.global("w").unwrap();
        assert_eq!(woven, Value::string("b"));
        assert!((woven.uncertainty - 0.25).abs() < 1e-9);
        assert!(woven.has_flag(Flag::Weaver));
        assert_eq!(woven.modifier, Modifier::Reb);
        assert!(value == Value::string("a") || value == Value::string("b"));
        assert!(value.distribution.is_none());
    }

    #[test]
    fn test_weave_rejects_bad_weights() {
        let (_, sink, _) = eval("weave(array(1, 2), array(1));");
        assert!(sink.diagnostics()[0].message.contains("2 values but 1 weights"));
        let (_, sink, _) = eval("weave(array(1), array(\"x\"));");
        assert!(sink.diagnostics()[0].message.contains("non-negative numbers"));
    }

    #[test]
    fn test_weave_rejects_overflowing_weights() {
        let (interpreter, sink, value) = eval("weave(array(1, 2), array(1e308, 1e308));");
        assert!(value.is_nil());
        let diagnostics = sink.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "weave() weights are too large to sum");
        assert_eq!(interpreter.last_error().map(RuntimeError::code), Some("E004"));
    }

    #[test]
    fn test_collapse_plain_value() {
        let (_, _, value) = eval("collapse(42);");
        assert_eq!(value, Value::int(42));
    }
}

//=====================================================
// End of file
//=====================================================
