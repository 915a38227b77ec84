//! Runtime scopes.
//!
//! An [`Environment`] maps names to slots and points at its enclosing scope.
//! Scopes are shared through [`EnvRef`] because any number of closures may
//! capture the same one; a write through one alias is seen by all.
//!
//! The parent chain only ever points outward, from the scope being created
//! to one that already exists, so it never loops back on itself. The one
//! shared‑ownership cycle that does occur is a function value stored in the
//! very scope it closes over (every named function does this, to allow
//! recursion); those scopes live until the interpreter is dropped.

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.
pub type EnvRef = Rc<RefCell<Environment>>;

/// Contents of one binding.
#[derive(Debug, Clone)]
pub enum Slot {
    /// Declared by `var x;` and not assigned yet.
    Uninitialized,
    Initialized(Value),
}

#[derive(Debug, Clone)]
struct Binding {
    slot: Slot,
    is_const: bool,
}

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Binding>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A root scope (the globals).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a new child of `enclosing` in a shared handle.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self::with_enclosing(Rc::clone(enclosing))))
    }

    /// Bind `name` in this scope, replacing any previous binding.
    pub fn declare(&mut self, name: &str, value: Option<Value>, is_const: bool) {
        let slot = match value {
            Some(v) => Slot::Initialized(v),
            None => Slot::Uninitialized,
        };

        self.values
            .insert(name.to_string(), Binding { slot, is_const });
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Look `name` up, walking outward.
    pub fn get(&self, name: &Token) -> Result<Value> {
        match self.values.get(&name.lexeme) {
            Some(binding) => read(binding, name),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(undefined(name)),
            },
        }
    }

    /// Assign to an existing binding, walking outward. Fails with a `Name`
    /// error if the name is never found and a `Type` error if it is const.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        match self.values.get_mut(&name.lexeme) {
            Some(binding) => write(binding, name, value),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow_mut().assign(name, value),
                None => Err(undefined(name)),
            },
        }
    }

    /// The scope `distance` hops out from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = Rc::clone(current.borrow().enclosing.as_ref()?);
            current = next;
        }

        Some(current)
    }

    /// Read `name` from exactly the scope `distance` hops out. No fallback
    /// walk: the resolver guarantees the binding lives there.
    pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value> {
        debug!("get_at '{}' distance {}", name.lexeme, distance);

        let scope: EnvRef = Self::ancestor(env, distance).ok_or_else(|| unresolved(name))?;
        let scope = scope.borrow();

        match scope.values.get(&name.lexeme) {
            Some(binding) => read(binding, name),
            None => Err(unresolved(name)),
        }
    }

    /// Write `name` in exactly the scope `distance` hops out.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) -> Result<()> {
        debug!("assign_at '{}' distance {}", name.lexeme, distance);

        let scope: EnvRef = Self::ancestor(env, distance).ok_or_else(|| unresolved(name))?;
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(&name.lexeme) {
            Some(binding) => write(binding, name, value),
            None => Err(unresolved(name)),
        }
    }
}

fn read(binding: &Binding, name: &Token) -> Result<Value> {
    match &binding.slot {
        Slot::Initialized(value) => Ok(value.clone()),
        Slot::Uninitialized => Err(LoxError::runtime(
            name,
            format!("Variable \"{}\" is not initialized", name.lexeme),
        )),
    }
}

fn write(binding: &mut Binding, name: &Token, value: Value) -> Result<()> {
    if binding.is_const {
        return Err(LoxError::type_error(
            name,
            format!(
                "Variable \"{}\" is declared const, and cannot be modified",
                name.lexeme
            ),
        ));
    }

    binding.slot = Slot::Initialized(value);

    Ok(())
}

fn undefined(name: &Token) -> LoxError {
    LoxError::name(name, format!("Undefined variable \"{}\"", name.lexeme))
}

/// The environment chain disagrees with the resolver's distance table.
fn unresolved(name: &Token) -> LoxError {
    LoxError::runtime(
        name,
        format!("Internal error: \"{}\" is not bound at its resolved scope", name.lexeme),
    )
}
