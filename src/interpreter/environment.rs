//=====================================================
// File: interpreter/environment.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lexical scopes for the ChronoScript interpreter
// Objective: Scope chain with flag-aware assignment, echo history,
//            and snapshot/restore used by timeline operations
//=====================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::errors::RuntimeError;
use super::value::Value;
use crate::ast::Flag;

pub type SharedEnvironment = Rc<RefCell<Environment>>;

/// One scope: its own bindings plus an optional enclosing scope.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<SharedEnvironment>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: SharedEnvironment) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_shared(self) -> SharedEnvironment {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<SharedEnvironment> {
        self.enclosing.clone()
    }

    /// Creates or overwrites a binding in this scope.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    pub fn get_local(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
            || self
                .enclosing
                .as_ref()
                .is_some_and(|enclosing| enclosing.borrow().contains(name))
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    //Function: assign
    //Purpose: Update the nearest binding of `name`
    //Inputs: name, value
    //Returns: the value as stored, with the binding's modifier, flags and history
    pub fn assign(&mut self, name: &str, value: Value) -> Result<Value, RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            return store(name, slot, value);
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    /// Like `assign`, but anchored and already-set static bindings are
    /// skipped instead of failing. Returns whether the binding changed.
    pub fn merge(&mut self, name: &str, value: Value) -> Result<bool, RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            if slot.has_flag(Flag::Anchor) || (slot.has_flag(Flag::Static) && !slot.is_nil()) {
                return Ok(false);
            }
            store(name, slot, value)?;
            return Ok(true);
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().merge(name, value),
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    /// The scope in `environment`'s chain that binds `name`.
    pub fn environment_where(
        environment: &SharedEnvironment,
        name: &str,
    ) -> Option<SharedEnvironment> {
        let mut current = Some(Rc::clone(environment));
        while let Some(scope) = current {
            if scope.borrow().contains_local(name) {
                return Some(scope);
            }
            current = scope.borrow().enclosing();
        }
        None
    }

    /// Every scope from `environment` outward to the global scope.
    pub fn chain(environment: &SharedEnvironment) -> Vec<SharedEnvironment> {
        let mut scopes = Vec::new();
        let mut current = Some(Rc::clone(environment));
        while let Some(scope) = current {
            current = scope.borrow().enclosing();
            scopes.push(scope);
        }
        scopes
    }

    /// Copies this scope's bindings; the enclosing scope is shared, not copied.
    pub fn clone_scope(&self) -> Environment {
        Self {
            values: self.values.clone(),
            enclosing: self.enclosing.clone(),
        }
    }

    /// Copies every scope in the chain and links the copies together, so
    /// writes through the fork never reach the original scopes.
    pub fn fork_chain(environment: &SharedEnvironment) -> SharedEnvironment {
        let mut forked: Option<SharedEnvironment> = None;
        for scope in Self::chain(environment).into_iter().rev() {
            let mut copy = scope.borrow().clone_scope();
            copy.enclosing = forked.take();
            forked = Some(copy.into_shared());
        }
        forked.unwrap_or_else(|| Self::new().into_shared())
    }

    /// Name to value for everything visible from `environment`; inner
    /// scopes shadow outer ones.
    pub fn visible_bindings(environment: &SharedEnvironment) -> HashMap<String, Value> {
        let mut visible = HashMap::new();
        for scope in Self::chain(environment).into_iter().rev() {
            for (name, value) in scope.borrow().bindings() {
                visible.insert(name.clone(), value.clone());
            }
        }
        visible
    }

    pub fn snapshot_bindings(&self) -> HashMap<String, Value> {
        self.values.clone()
    }

    /// Replaces this scope's bindings with `saved`. Anchored bindings keep
    /// their current value, including ones created after the snapshot.
    pub fn restore_bindings(&mut self, mut saved: HashMap<String, Value>) {
        for (name, value) in self.values.drain() {
            if value.has_flag(Flag::Anchor) {
                saved.insert(name, value);
            }
        }
        self.values = saved;
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn store(name: &str, slot: &mut Value, mut value: Value) -> Result<Value, RuntimeError> {
    if slot.has_flag(Flag::Static) && !slot.is_nil() {
        return Err(RuntimeError::ImmutableViolation(name.to_string()));
    }
    value.modifier = slot.modifier;
    value.flags = value.flags.union(slot.flags);
    if slot.has_flag(Flag::Echo) {
        let previous = std::mem::replace(slot, Value::nil());
        value.inherit_history(previous);
    }
    *slot = value.clone();
    Ok(value)
}


//=====================================================
// End of file
//=====================================================
