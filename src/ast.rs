//! Abstract syntax tree produced by [`crate::parser::Parser`].
//!
//! Nodes own their tokens so a tree (and every closure built from it) can
//! outlive the source of a single REPL line. Nodes are never mutated after
//! construction; declarations that runtime values keep hold of
//! (functions, arrows, classes) sit behind an `Rc`.
//!
//! Variable-like expressions carry an [`ExprId`]. The resolver keys its
//! distance table on it and the interpreter looks it up again at run time.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::{Number, Token};

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of a single expression node.
///
/// Ids come from a process-wide counter, so trees parsed from different
/// REPL lines never collide in the interpreter's distance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integer or floating point, exactly as the scanner decoded it.
    Number(Number),

    /// String literal without surrounding quotes.
    Str(String),

    True,
    False,
    Nil,
}

/// Every kind of *expression* in the language.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix operator: `!`, `not`, `-` or `typeof`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix operator, including the comma operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `condition ? then : otherwise`
    Ternary {
        condition: Box<Expr>,
        question: Token,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Variable {
        id: ExprId,
        name: Token,
    },

    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,

        /// The closing `)` token, kept for error locations.
        paren: Token,

        arguments: Vec<Expr>,
    },

    /// object.property
    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// `(a, b) => expr` or `(a, b) => { ... }`
    Arrow(Rc<ArrowDecl>),
}

/// Parameters and body of an anonymous arrow function. An expression body
/// is stored as a single `return` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowDecl {
    /// The `=>` token.
    pub arrow: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// A named function, method, static method or getter.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255). Always empty for getters.
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Token,

    /// The expression after `<`; a `Variable` in practice.
    pub base: Option<Expr>,

    pub methods: Vec<Rc<FunctionDecl>>,
    pub static_methods: Vec<Rc<FunctionDecl>>,
    pub getters: Vec<Rc<FunctionDecl>>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*. A program is a sequence of
/// these nodes returned by [`crate::parser::Parser::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// Writes the value without a trailing newline.
    Print(Expr),

    /// Writes the value followed by a newline.
    Println(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Always has an initializer.
    Const {
        name: Token,
        initializer: Expr,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// `for init; cond; update { ... }`. The update runs after the body and
    /// after every `continue`.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },

    Break {
        keyword: Token,
    },

    Continue {
        keyword: Token,
    },

    /// `assert expr ("," message)? ;`
    Assert {
        keyword: Token,
        condition: Expr,
        message: Option<Expr>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class(Rc<ClassDecl>),
}

impl Expr {
    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }

    pub fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign {
            id: ExprId::fresh(),
            name,
            value: Box::new(value),
        }
    }
}
