//=====================================================
// File: interpreter/value.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: ChronoScript runtime values
// Objective: Tagged payloads with temporal side state, arithmetic with
//            numeric promotion, rendering, and distribution sampling
//=====================================================

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rand::Rng;

use super::Interpreter;
use super::errors::RuntimeError;
use crate::ast::{Block, BinaryOp, Flag, FlagSet, Literal, Modifier};

//=====================================================
//            Section 1: Callables
//=====================================================

pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeArity {
    Exact(usize),
    Variadic,
}

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: NativeArity,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn check_arity(&self, given: usize) -> Result<(), RuntimeError> {
        match self.arity {
            NativeArity::Exact(expected) if expected != given => {
                Err(RuntimeError::ArgumentError(format!(
                    "{}() expects {} argument(s), got {}",
                    self.name, expected, given
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native function {}>", self.name)
    }
}

/// Reserved slot for script-defined functions. Nothing can call one yet.
#[derive(Debug)]
pub struct UserFunction {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Block,
}

//=====================================================
//            Section 2: Value Payloads
//=====================================================

#[derive(Debug, Clone)]
pub enum ValueKind {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    NativeFunction(Rc<NativeFunction>),
    UserFunction(Rc<UserFunction>),
}

impl ValueKind {
    fn rank(&self) -> u8 {
        match self {
            ValueKind::Nil => 0,
            ValueKind::Bool(_) => 1,
            ValueKind::Int(_) => 2,
            ValueKind::Float(_) => 3,
            ValueKind::String(_) => 4,
            ValueKind::Array(_) => 5,
            ValueKind::Map(_) => 6,
            ValueKind::NativeFunction(_) => 7,
            ValueKind::UserFunction(_) => 8,
        }
    }
}

/// A runtime value: payload plus temporal side state.
///
/// Equality and ordering look only at `kind`; modifier, flags,
/// uncertainty, history and distribution never take part.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub modifier: Modifier,
    pub flags: FlagSet,
    pub uncertainty: f64,
    pub history: Vec<Value>,
    pub distribution: Option<Distribution>,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            modifier: Modifier::Conf,
            flags: FlagSet::empty(),
            uncertainty: 0.0,
            history: Vec::new(),
            distribution: None,
        }
    }

    pub fn nil() -> Self {
        Self::new(ValueKind::Nil)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(Rc::new(RefCell::new(items))))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Self::new(ValueKind::Map(Rc::new(RefCell::new(entries))))
    }

    pub fn native(name: &'static str, arity: NativeArity, func: NativeFn) -> Self {
        Self::new(ValueKind::NativeFunction(Rc::new(NativeFunction {
            name,
            arity,
            func,
        })))
    }

    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(n) => Value::int(*n),
            Literal::Float(n) => Value::float(*n),
            Literal::String(s) => Value::string(s.clone()),
            Literal::Boolean(b) => Value::bool(*b),
        }
    }

    //=====================================================
    //            Section 3: Inspection
    //=====================================================

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Nil => "nil",
            ValueKind::Bool(_) => "boolean",
            ValueKind::Int(_) => "int",
            ValueKind::Float(_) => "float",
            ValueKind::String(_) => "string",
            ValueKind::Array(_) => "array",
            ValueKind::Map(_) => "map",
            ValueKind::NativeFunction(_) => "native function",
            ValueKind::UserFunction(_) => "function",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind, ValueKind::Nil)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, ValueKind::Int(_) | ValueKind::Float(_))
    }

    /// False only for nil and boolean false.
    pub fn as_boolean(&self) -> bool {
        !matches!(self.kind, ValueKind::Nil | ValueKind::Bool(false))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Int(n) => Some(n as f64),
            ValueKind::Float(n) => Some(n),
            _ => None,
        }
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Apply a declaration's modifier and flags.
    pub fn stamp(&mut self, modifier: Modifier, flags: FlagSet) {
        self.modifier = modifier;
        self.flags = self.flags.union(flags);
    }

    /// Becomes the successor of `previous`: its history followed by itself.
    pub fn inherit_history(&mut self, mut previous: Value) {
        let mut history = std::mem::take(&mut previous.history);
        history.push(previous);
        self.history = history;
    }

    /// Payload only, without temporal side state.
    pub fn bare(&self) -> Value {
        Value::new(self.kind.clone())
    }

    //=============================================/*
    //  Truthiness: only nil and false are falsy; 0 is truthy.
    //============================================*/
    //=====================================================
    //            Section 4: Arithmetic
    //=====================================================

    pub fn add(&self, other: &Value) -> Result<Value, RuntimeError> {
        if matches!(self.kind, ValueKind::String(_)) || matches!(other.kind, ValueKind::String(_))
        {
            return Ok(Value::string(format!("{}{}", self, other)));
        }
        self.numeric(other, "add", |a, b| a.checked_add(b), |a, b| a + b)
    }

    pub fn subtract(&self, other: &Value) -> Result<Value, RuntimeError> {
        self.numeric(other, "subtract", |a, b| a.checked_sub(b), |a, b| a - b)
    }

    pub fn multiply(&self, other: &Value) -> Result<Value, RuntimeError> {
        self.numeric(other, "multiply", |a, b| a.checked_mul(b), |a, b| a * b)
    }

    /// Always yields a float.
    pub fn divide(&self, other: &Value) -> Result<Value, RuntimeError> {
        let (a, b) = self.numeric_pair(other, "divide")?;
        if b == 0.0 {
            return Err(RuntimeError::DivisionByZero("Division"));
        }
        Ok(Value::float(a / b))
    }

    pub fn modulo(&self, other: &Value) -> Result<Value, RuntimeError> {
        self.numeric_pair(other, "take the modulo of")?;
        if other.as_f64() == Some(0.0) {
            return Err(RuntimeError::DivisionByZero("Modulo"));
        }
        self.numeric(other, "take the modulo of", |a, b| a.checked_rem(b), |a, b| a % b)
    }

    pub fn negate(&self) -> Result<Value, RuntimeError> {
        match self.kind {
            ValueKind::Int(n) => n
                .checked_neg()
                .map(Value::int)
                .ok_or(RuntimeError::IntegerOverflow("negation")),
            ValueKind::Float(n) => Ok(Value::float(-n)),
            _ => Err(RuntimeError::TypeError(format!(
                "Cannot negate a non-numeric value of type {}",
                self.type_name()
            ))),
        }
    }

    pub fn logical_not(&self) -> Value {
        Value::bool(!self.as_boolean())
    }

    /// Ordering comparison; both operands must be numeric.
    pub fn compare(&self, op: BinaryOp, other: &Value) -> Result<Value, RuntimeError> {
        let ordering = match (&self.kind, &other.kind) {
            (ValueKind::Int(a), ValueKind::Int(b)) => Some(a.cmp(b)),
            _ => {
                let (a, b) = self.numeric_pair(other, "compare")?;
                a.partial_cmp(&b)
            }
        };
        let result = match (op, ordering) {
            (_, None) => false,
            (BinaryOp::Less, Some(ord)) => ord == Ordering::Less,
            (BinaryOp::LessEqual, Some(ord)) => ord != Ordering::Greater,
            (BinaryOp::Greater, Some(ord)) => ord == Ordering::Greater,
            (BinaryOp::GreaterEqual, Some(ord)) => ord != Ordering::Less,
            (other_op, _) => {
                return Err(RuntimeError::TypeError(format!(
                    "'{}' is not a comparison operator",
                    other_op.symbol()
                )));
            }
        };
        Ok(Value::bool(result))
    }

    fn numeric_pair(&self, other: &Value, verb: &str) -> Result<(f64, f64), RuntimeError> {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(RuntimeError::TypeError(format!(
                "Cannot {} {} and {}",
                verb,
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    fn numeric(
        &self,
        other: &Value,
        verb: &'static str,
        ints: impl Fn(i64, i64) -> Option<i64>,
        floats: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, RuntimeError> {
        if let (ValueKind::Int(a), ValueKind::Int(b)) = (&self.kind, &other.kind) {
            return ints(*a, *b)
                .map(Value::int)
                .ok_or(RuntimeError::IntegerOverflow(verb));
        }
        let (a, b) = self.numeric_pair(other, verb)?;
        Ok(Value::float(floats(a, b)))
    }

    //=====================================================
    //            Section 5: Ordering
    //=====================================================

    /// Total order over all payloads: by tag first, then by payload.
    /// Floats use IEEE total ordering; functions compare by identity.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (&self.kind, &other.kind) {
            (ValueKind::Nil, ValueKind::Nil) => Ordering::Equal,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a.cmp(b),
            (ValueKind::Int(a), ValueKind::Int(b)) => a.cmp(b),
            (ValueKind::Float(a), ValueKind::Float(b)) => a.total_cmp(b),
            (ValueKind::String(a), ValueKind::String(b)) => a.cmp(b),
            (ValueKind::Array(a), ValueKind::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ordering::Equal;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| x.total_cmp(y))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or_else(|| a.len().cmp(&b.len()))
            }
            (ValueKind::Map(a), ValueKind::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ordering::Equal;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.iter()
                    .zip(b.iter())
                    .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.total_cmp(vb)))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or_else(|| a.len().cmp(&b.len()))
            }
            (ValueKind::NativeFunction(a), ValueKind::NativeFunction(b)) => {
                Rc::as_ptr(a).cast::<()>().cmp(&Rc::as_ptr(b).cast::<()>())
            }
            (ValueKind::UserFunction(a), ValueKind::UserFunction(b)) => {
                Rc::as_ptr(a).cast::<()>().cmp(&Rc::as_ptr(b).cast::<()>())
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    //=====================================================
    //            Section 6: Distributions
    //=====================================================

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = Some(distribution);
        self
    }

    /// Collapse to one concrete value using thread-local randomness.
    pub fn resolve(&self) -> Value {
        self.resolve_with(&mut rand::thread_rng())
    }

    //Function: resolve_with
    //Purpose: Weighted sampling over the distribution, or self when absent
    //Inputs: rng: random source
    //Returns: Value
    pub fn resolve_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        self.distribution
            .as_ref()
            .and_then(|distribution| distribution.sample(rng))
            .unwrap_or_else(|| self.clone())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Nil, ValueKind::Nil) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::Array(a), ValueKind::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (ValueKind::Map(a), ValueKind::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (ValueKind::NativeFunction(a), ValueKind::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (ValueKind::UserFunction(a), ValueKind::UserFunction(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Nil => write!(f, "nil"),
            ValueKind::Bool(b) => write!(f, "{}", b),
            ValueKind::Int(n) => write!(f, "{}", n),
            ValueKind::Float(n) => write!(f, "{:.6}", n),
            ValueKind::String(s) => write!(f, "{}", s),
            ValueKind::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ValueKind::Map(entries) => {
                // BTreeMap iteration is already sorted by key.
                write!(f, "{{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            ValueKind::NativeFunction(native) => write!(f, "<native function {}>", native.name),
            ValueKind::UserFunction(function) => write!(f, "<function {}>", function.name),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

//=============================================/*
//  Payload equality is structural for arrays and maps, identity for functions.
//============================================*/
//=====================================================
//            Section 7: Probability Distribution
//=====================================================

/// Map key wrapper ordering values with `Value::total_cmp`.
#[derive(Debug, Clone)]
pub struct OrderedValue(pub Value);

impl PartialEq for OrderedValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for OrderedValue {}

impl PartialOrd for OrderedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Weighted outcomes of a multi-timeline value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    weights: BTreeMap<OrderedValue, f64>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` to `value`'s entry. Non-finite or negative weights are ignored.
    pub fn insert(&mut self, value: Value, weight: f64) {
        if !weight.is_finite() || weight < 0.0 {
            return;
        }
        *self.weights.entry(OrderedValue(value.bare())).or_insert(0.0) += weight;
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn weight_of(&self, value: &Value) -> Option<f64> {
        self.weights.get(&OrderedValue(value.bare())).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, f64)> {
        self.weights.iter().map(|(key, weight)| (&key.0, *weight))
    }

    /// Heaviest outcome; ties go to the smallest value.
    pub fn most_likely(&self) -> Option<&Value> {
        let mut best: Option<(&Value, f64)> = None;
        for (value, weight) in self.iter() {
            if best.is_none_or(|(_, top)| weight > top) {
                best = Some((value, weight));
            }
        }
        best.map(|(value, _)| value)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Value> {
        let total = self.total_weight();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        let target = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        let mut fallback = None;
        for (value, weight) in self.iter() {
            if weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            if target < cumulative {
                return Some(value.clone());
            }
            fallback = Some(value);
        }
        fallback.cloned()
    }
}

impl FromIterator<(Value, f64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (Value, f64)>>(iter: I) -> Self {
        let mut distribution = Distribution::new();
        for (value, weight) in iter {
            distribution.insert(value, weight);
        }
        distribution
    }
}

//=====================================================
//            Section 8: Unit Tests
//=====================================================


//=====================================================
// End of file
//=====================================================
