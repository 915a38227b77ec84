//! The run‑time call surface: native functions, user functions, arrow
//! functions and classes, plus the instances classes construct.
//!
//! A class does not pose as an instance of a metaclass. It carries its own
//! static method table and field table, which gives `Cls.method()` and
//! `Cls.x = 1` without an instance‑of‑itself construction.
//!
//! `Debug` is written by hand for everything here: closures, instance fields
//! and class fields can all reach back to the value being printed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{ArrowDecl, FunctionDecl};
use crate::environment::{EnvRef, Environment};
use crate::natives::NativeFunction;
use crate::value::Value;

/// Name of the method promoted to constructor.
pub const INITIALIZER: &str = "init";

#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Arrow(Rc<ArrowFunction>),
    Class(Rc<LoxClass>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) => function.arity(),
            Callable::Arrow(arrow) => arrow.decl.params.len(),
            Callable::Class(class) => class.arity(),
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Arrow(a), Callable::Arrow(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(native) => write!(f, "<native function {}>", native.name),
            Callable::Function(function) => write!(f, "<function {}>", function.name()),
            Callable::Arrow(_) => write!(f, "<arrow function>"),
            Callable::Class(class) => write!(f, "<class {}>", class.name),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User functions
// ─────────────────────────────────────────────────────────────────────────────

/// A named function or method paired with the scope it was declared in.
pub struct LoxFunction {
    pub decl: Rc<FunctionDecl>,
    pub closure: EnvRef,

    /// `init` methods always hand back `this`.
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(decl: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    pub fn name(&self) -> &str {
        &self.decl.name.lexeme
    }

    /// A copy of this method whose closure is a fresh scope binding `this`
    /// (and `super`, for derived instances) on top of the class's scope.
    pub fn bind(&self, instance: &Rc<Instance>) -> LoxFunction {
        let env: EnvRef = Environment::child_of(&self.closure);

        {
            let mut scope = env.borrow_mut();

            scope.declare("this", Some(Value::Instance(Rc::clone(instance))), true);

            if let Some(base) = &instance.base {
                scope.declare("super", Some(Value::Instance(Rc::clone(base))), true);
            }
        }

        LoxFunction {
            decl: Rc::clone(&self.decl),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name())
    }
}

/// An anonymous `(params) => body` closure.
pub struct ArrowFunction {
    pub decl: Rc<ArrowDecl>,
    pub closure: EnvRef,
}

impl fmt::Debug for ArrowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<arrow function/{}>", self.decl.params.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

pub struct LoxClass {
    pub name: String,
    pub base: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
    pub getters: HashMap<String, Rc<LoxFunction>>,
    pub statics: HashMap<String, Rc<LoxFunction>>,

    /// Fields set on the class value itself (`Cls.x = 1`).
    pub fields: RefCell<HashMap<String, Value>>,
}

impl LoxClass {
    pub fn initializer(&self) -> Option<&Rc<LoxFunction>> {
        self.methods.get(INITIALIZER)
    }

    /// Own `init` arity, else the inherited constructor's, else zero.
    pub fn arity(&self) -> usize {
        match self.initializer() {
            Some(init) => init.arity(),
            None => self.base.as_ref().map_or(0, |base| base.arity()),
        }
    }

    /// Class‑level attribute: own fields, then statics, then the base class.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Some(value.clone());
        }

        if let Some(method) = self.statics.get(name) {
            return Some(Value::Callable(Callable::Function(Rc::clone(method))));
        }

        self.base.as_ref().and_then(|base| base.lookup(name))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

/// What an instance attribute resolved to.
pub enum Attribute {
    Value(Value),

    /// A bound getter; the caller must invoke it.
    Getter(LoxFunction),
}

pub struct Instance {
    pub class: Rc<LoxClass>,
    pub fields: RefCell<HashMap<String, Value>>,

    /// The portion of this object that belongs to the base class.
    pub base: Option<Rc<Instance>>,
}

impl Instance {
    /// Allocate an instance of `class` together with its chain of base
    /// portions. No initializer runs.
    pub fn build(class: &Rc<LoxClass>) -> Rc<Instance> {
        let base: Option<Rc<Instance>> = class.base.as_ref().map(Instance::build);

        Rc::new(Instance {
            class: Rc::clone(class),
            fields: RefCell::new(HashMap::new()),
            base,
        })
    }

    /// Fields, getters, methods, class fields, statics, then the base portion.
    pub fn lookup(self: &Rc<Self>, name: &str) -> Option<Attribute> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Some(Attribute::Value(value.clone()));
        }

        if let Some(getter) = self.class.getters.get(name) {
            return Some(Attribute::Getter(getter.bind(self)));
        }

        if let Some(method) = self.class.methods.get(name) {
            let bound = Rc::new(method.bind(self));
            return Some(Attribute::Value(Value::Callable(Callable::Function(bound))));
        }

        if let Some(value) = self.class.fields.borrow().get(name) {
            return Some(Attribute::Value(value.clone()));
        }

        if let Some(method) = self.class.statics.get(name) {
            return Some(Attribute::Value(Value::Callable(Callable::Function(
                Rc::clone(method),
            ))));
        }

        self.base.as_ref().and_then(|base| base.lookup(name))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}
