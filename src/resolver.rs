//! Static resolver pass.
//!
//! One AST walk that:
//! 1. Builds lexical scopes (a stack of `HashMap<String, IdentifierState>`),
//!    with `scopes[0]` standing for the global scope and pre‑seeded with the
//!    native function names.
//! 2. Reports static errors (undefined names, redeclaration, reads in an own
//!    initializer, reads before any assignment, const reassignment, misplaced
//!    `return`/`break`/`continue`/`this`/`super`) and optional lint warnings.
//! 3. Records, for every `Variable`/`Assign`/`This`/`Super` node, how many
//!    scopes out its binding lives. There is no global fallback: a name not
//!    found in any scope is an error.
//!
//! The scope shape built here must match the environment chain the
//! interpreter builds at run time, block for block.
//!
//! Errors do not abort the walk, so one pass reports every problem and the
//! scope stack always unwinds cleanly.

use crate::ast::{ClassDecl, Expr, ExprId, Stmt};
use crate::config::Flags;
use crate::diagnostics::{Level, Reporter};
use crate::error::LoxError;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Which kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum IdentifierKind {
    Variable,
    Constant,
    Parameter,
    Function,
    Class,
}

impl IdentifierKind {
    fn describe(self) -> &'static str {
        match self {
            IdentifierKind::Variable => "variable",
            IdentifierKind::Constant => "const",
            IdentifierKind::Parameter => "parameter",
            IdentifierKind::Function => "function",
            IdentifierKind::Class => "class",
        }
    }
}

/// What the resolver knows about one name in one scope.
#[derive(Clone, Debug)]
pub struct IdentifierState {
    pub is_mutable: bool,

    /// Has a value been stored (initializer or an earlier assignment)?
    pub is_initialized: bool,

    /// `false` between `declare` and `define`, i.e. inside its initializer.
    pub is_defined: bool,

    pub is_used: bool,

    /// Declaration site; `None` for natives and `this`/`super`.
    pub token: Option<Token>,

    kind: IdentifierKind,
}

impl IdentifierState {
    /// A name that is usable everywhere and never warned about.
    fn builtin(kind: IdentifierKind) -> Self {
        Self {
            is_mutable: false,
            is_initialized: true,
            is_defined: true,
            is_used: true,
            token: None,
            kind,
        }
    }
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances for the interpreter.
pub struct Resolver {
    scopes: Vec<HashMap<String, IdentifierState>>,
    locals: HashMap<ExprId, usize>,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    flags: Flags,
    had_error: bool,
}

impl Resolver {
    /// Create a resolver whose global scope already holds `globals`.
    pub fn new<'n>(globals: impl IntoIterator<Item = &'n str>, flags: Flags) -> Self {
        let seeded: HashMap<String, IdentifierState> = globals
            .into_iter()
            .map(|name| {
                (
                    name.to_string(),
                    IdentifierState::builtin(IdentifierKind::Function),
                )
            })
            .collect();

        info!("Resolver instantiated with {} global(s)", seeded.len());

        Resolver {
            scopes: vec![seeded],
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            flags,
            had_error: false,
        }
    }

    /// Walk all top‑level statements. Returns the distance table, or `None`
    /// if an error was reported; in that case the global scope is restored
    /// to what it was before the call.
    pub fn resolve(
        &mut self,
        statements: &[Stmt],
        reporter: &mut Reporter,
    ) -> Option<HashMap<ExprId, usize>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        let snapshot: HashMap<String, IdentifierState> = self.scopes[0].clone();
        self.had_error = false;
        self.locals.clear();

        for stmt in statements {
            self.resolve_stmt(stmt, reporter);
        }

        if self.had_error {
            info!("Resolve failed; rolling back global scope");

            self.scopes[0] = snapshot;
            self.locals.clear();

            return None;
        }

        Some(std::mem::take(&mut self.locals))
    }

    /// Names currently bound in the global scope.
    pub fn globals(&self) -> impl Iterator<Item = &str> {
        self.scopes[0].keys().map(String::as_str)
    }

    /// Drop every global for which `keep` returns `false`. Used after a
    /// run‑time failure, when declarations past the failing statement were
    /// resolved but never executed.
    pub fn retain_globals(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.scopes[0].retain(|name, _| {
            let kept = keep(name);
            if !kept {
                debug!("Forgetting unexecuted global '{}'", name);
            }
            kept
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reporting
    // ─────────────────────────────────────────────────────────────────────────

    fn error(&mut self, reporter: &mut Reporter, error: LoxError) {
        self.had_error = true;
        reporter.report_error(&error);
    }

    fn warn(&self, reporter: &mut Reporter, message: String, token: Option<&Token>) {
        let message = match token {
            Some(t) => format!("[line {}] Warning: {}", t.line, message),
            None => format!("Warning: {}", message),
        };

        reporter.report(Level::Warn, message, token);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt, reporter: &mut Reporter) {
        match stmt {
            Stmt::Class(decl) => self.resolve_class(decl, reporter),

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s, reporter);
                }
                self.end_scope(reporter);
            }

            Stmt::Var { name, initializer } => {
                self.declare(name, IdentifierKind::Variable, reporter);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr, reporter);
                    self.mark_initialized(name);
                }

                self.define(name);
            }

            Stmt::Const { name, initializer } => {
                self.declare(name, IdentifierKind::Constant, reporter);
                self.resolve_expr(initializer, reporter);
                self.mark_initialized(name);
                self.define(name);
            }

            Stmt::Function(decl) => {
                // The name is visible inside its own body, so recursion works.
                self.declare(&decl.name, IdentifierKind::Function, reporter);
                self.mark_initialized(&decl.name);
                self.define(&decl.name);

                self.resolve_function(&decl.params, &decl.body, FunctionType::Function, reporter);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) | Stmt::Println(expr) => {
                self.resolve_expr(expr, reporter);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition, reporter);
                self.resolve_stmt(then_branch, reporter);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb, reporter);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition, reporter);

                self.loop_depth += 1;
                self.resolve_stmt(body, reporter);
                self.loop_depth -= 1;
            }

            Stmt::For {
                initializer,
                condition,
                update,
                body,
            } => {
                // Loop scope holds the initializer; the body block opens its own.
                self.begin_scope();

                if let Some(init) = initializer {
                    self.resolve_stmt(init, reporter);
                }
                if let Some(cond) = condition {
                    self.resolve_expr(cond, reporter);
                }
                if let Some(upd) = update {
                    self.resolve_expr(upd, reporter);
                }

                self.loop_depth += 1;
                self.resolve_stmt(body, reporter);
                self.loop_depth -= 1;

                self.end_scope(reporter);
            }

            Stmt::Break { keyword } | Stmt::Continue { keyword } => {
                if self.loop_depth == 0 {
                    let message = format!("\"{}\" statement outside a loop", keyword.lexeme);
                    self.error(reporter, LoxError::parse(keyword, message));
                }
            }

            Stmt::Assert {
                condition, message, ..
            } => {
                self.resolve_expr(condition, reporter);
                if let Some(m) = message {
                    self.resolve_expr(m, reporter);
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(
                        reporter,
                        LoxError::parse(keyword, "\"return\" statement outside a function"),
                    );
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(
                            reporter,
                            LoxError::parse(keyword, "Cannot return a value inside a constructor"),
                        );
                    }

                    self.resolve_expr(expr, reporter);
                }
            }
        }
    }

    fn resolve_class(&mut self, decl: &ClassDecl, reporter: &mut Reporter) {
        let enclosing: ClassType = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&decl.name, IdentifierKind::Class, reporter);
        self.mark_initialized(&decl.name);
        self.define(&decl.name);

        if let Some(base) = &decl.base {
            if let Expr::Variable { name, .. } = base {
                if name.lexeme == decl.name.lexeme {
                    let message = format!("class {} inherits from itself", decl.name.lexeme);
                    self.error(reporter, LoxError::parse(&decl.name, message));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(base, reporter);
        }

        // Statics live outside the `this`/`super` scope.
        for method in &decl.static_methods {
            if method.name.lexeme == "init" {
                self.error(
                    reporter,
                    LoxError::parse(&method.name, "init method cannot be static"),
                );
            }

            self.resolve_function(&method.params, &method.body, FunctionType::Method, reporter);
        }

        self.begin_scope();

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                "this".to_string(),
                IdentifierState::builtin(IdentifierKind::Constant),
            );

            if decl.base.is_some() {
                scope.insert(
                    "super".to_string(),
                    IdentifierState::builtin(IdentifierKind::Constant),
                );
            }
        }

        for method in &decl.methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(&method.params, &method.body, kind, reporter);
        }

        for getter in &decl.getters {
            if getter.name.lexeme == "init" {
                self.error(
                    reporter,
                    LoxError::parse(&getter.name, "init method cannot be a getter"),
                );
            }

            self.resolve_function(&getter.params, &getter.body, FunctionType::Method, reporter);
        }

        self.end_scope(reporter);

        self.current_class = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr, reporter: &mut Reporter) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner, reporter),

            Expr::Unary { right, .. } => self.resolve_expr(right, reporter),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left, reporter);
                self.resolve_expr(right, reporter);
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.resolve_expr(condition, reporter);
                self.resolve_expr(then_branch, reporter);
                self.resolve_expr(else_branch, reporter);
            }

            Expr::Variable { id, name } => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    .is_some_and(|state| !state.is_defined);

                if in_own_initializer {
                    let message = format!(
                        "Variable \"{}\" is being used in its own initializer",
                        name.lexeme
                    );
                    self.error(reporter, LoxError::resolve(name, message));

                    return;
                }

                self.resolve_local(*id, name, Access::Read, reporter);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value, reporter);
                self.resolve_local(*id, name, Access::Write, reporter);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee, reporter);
                for arg in arguments {
                    self.resolve_expr(arg, reporter);
                }
            }

            // Property names are looked up dynamically.
            Expr::Get { object, .. } => self.resolve_expr(object, reporter),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value, reporter);
                self.resolve_expr(object, reporter);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(
                        reporter,
                        LoxError::parse(keyword, "\"this\" expression outside a class"),
                    );
                    return;
                }

                self.resolve_local(*id, keyword, Access::Keyword, reporter);
            }

            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => self.error(
                    reporter,
                    LoxError::parse(keyword, "\"super\" expression outside a class"),
                ),

                ClassType::Class => self.error(
                    reporter,
                    LoxError::parse(
                        keyword,
                        "\"super\" expression inside class that does not have a base class",
                    ),
                ),

                ClassType::Subclass => {
                    self.resolve_local(*id, keyword, Access::Keyword, reporter)
                }
            },

            Expr::Arrow(decl) => {
                self.resolve_function(&decl.params, &decl.body, FunctionType::Function, reporter)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope holding only the (initialized, mutable) parameters,
    /// then resolve the body directly inside it.
    fn resolve_function(
        &mut self,
        params: &[Token],
        body: &[Stmt],
        kind: FunctionType,
        reporter: &mut Reporter,
    ) {
        let enclosing_function: FunctionType = self.current_function;
        let enclosing_loops: usize = self.loop_depth;

        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();

        for param in params {
            self.declare(param, IdentifierKind::Parameter, reporter);
            self.mark_initialized(param);
            self.define(param);
        }

        for stmt in body {
            self.resolve_stmt(stmt, reporter);
        }

        self.end_scope(reporter);

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loops;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, warning about names nobody used.
    fn end_scope(&mut self, reporter: &mut Reporter) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };

        if !self.flags.warn_unused {
            return;
        }

        let mut unused: Vec<(&String, &IdentifierState)> = scope
            .iter()
            .filter(|(_, state)| !state.is_used && state.token.is_some())
            .collect();
        unused.sort_by_key(|(_, state)| state.token.as_ref().map(|t| t.span.start));

        for (name, state) in unused {
            let message = format!("-Wunused: Unused {} \"{}\"", state.kind.describe(), name);
            self.warn(reporter, message, state.token.as_ref());
        }
    }

    fn declare(&mut self, name: &Token, kind: IdentifierKind, reporter: &mut Reporter) {
        let depth: usize = self.scopes.len() - 1;

        if let Some(existing) = self.scopes[depth].get(&name.lexeme) {
            let message = format!(
                "{} \"{}\" has already been declared in this scope",
                kind.describe(),
                name.lexeme
            );
            debug!("Redeclaration of '{}' (was {:?})", name.lexeme, existing.kind);

            self.error(reporter, LoxError::resolve(name, message));
        } else if self.flags.warn_shadow {
            let shadowed: Option<Option<Token>> = self.scopes[..depth]
                .iter()
                .rev()
                .find_map(|scope| scope.get(&name.lexeme))
                .map(|state| state.token.clone());

            if let Some(previous) = shadowed {
                self.warn(
                    reporter,
                    format!(
                        "-Wshadow: Declaration of \"{}\" shadows previous declaration",
                        name.lexeme
                    ),
                    Some(name),
                );

                if let Some(previous) = previous {
                    self.warn(
                        reporter,
                        format!("-Wshadow: \"{}\" previously declared here", name.lexeme),
                        Some(&previous),
                    );
                }
            }
        }

        self.scopes[depth].insert(
            name.lexeme.clone(),
            IdentifierState {
                is_mutable: matches!(kind, IdentifierKind::Variable | IdentifierKind::Parameter),
                is_initialized: false,
                is_defined: false,
                is_used: false,
                token: Some(name.clone()),
                kind,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(state) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            state.is_defined = true;
        }
    }

    fn mark_initialized(&mut self, name: &Token) {
        if let Some(state) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            state.is_initialized = true;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Find the innermost scope binding `name`, check the access against its
    /// state, and record `hops` for node `id`.
    fn resolve_local(&mut self, id: ExprId, name: &Token, access: Access, reporter: &mut Reporter) {
        let depth: usize = self.scopes.len() - 1;

        let found = self
            .scopes
            .iter_mut()
            .enumerate()
            .rev()
            .find_map(|(i, scope)| scope.get_mut(&name.lexeme).map(|state| (i, state)));

        let Some((index, state)) = found else {
            let message = format!(
                "Access of undefined variable. \"{}\" was not found in current scope",
                name.lexeme
            );
            self.error(reporter, LoxError::resolve(name, message));

            return;
        };

        let problem: Option<String> = match access {
            Access::Read if !state.is_initialized => {
                Some(format!("Variable \"{}\" is not initialized", name.lexeme))
            }
            Access::Write if !state.is_mutable => Some(match state.kind {
                IdentifierKind::Constant => format!(
                    "Variable \"{}\" is declared const, and cannot be modified",
                    name.lexeme
                ),
                kind => format!(
                    "{} \"{}\" cannot be assigned to",
                    kind.describe(),
                    name.lexeme
                ),
            }),
            _ => None,
        };

        state.is_initialized = true;
        state.is_used = true;

        let hops: usize = depth - index;
        debug!("Resolved '{}' at distance {}", name.lexeme, hops);

        self.locals.insert(id, hops);

        if let Some(message) = problem {
            self.error(reporter, LoxError::resolve(name, message));
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Access {
    Read,
    Write,
    Keyword,
}
