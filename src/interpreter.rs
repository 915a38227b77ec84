//! Tree‑walking evaluator.
//!
//! Statements return a [`Signal`] so `break`, `continue` and `return` travel
//! up to the loop or call that handles them without touching the error
//! path. Errors (`LoxError`) are reserved for real failures and stop the run.
//!
//! The environment chain built here mirrors the resolver's scopes exactly:
//!
//! | Construct        | New scope                                        |
//! |------------------|--------------------------------------------------|
//! | block            | one per execution of the block                   |
//! | `for`            | one for the clauses; the body block adds its own |
//! | call             | one holding the parameters; body runs inside it  |
//! | bound method     | one holding `this` (and `super`) under the class |

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{
    ArrowFunction, Attribute, Callable, Instance, LoxClass, LoxFunction, INITIALIZER,
};
use crate::diagnostics::Reporter;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::natives::{IoProvider, NativeFunction};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Deepest chain of nested user calls before the run is stopped.
pub const MAX_CALL_DEPTH: usize = 1000;

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Signal {
    Completed,
    Broke,
    Continued,
    Returned(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,

    /// Resolver output: hops from the use site to the binding scope.
    locals: HashMap<ExprId, usize>,

    /// User functions, arrows and initializers currently on the call stack.
    call_depth: usize,

    io: Box<dyn IoProvider>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Creates an interpreter whose globals hold `natives`. Program output
    /// goes to `out`; `clock`/`input` go through `io`.
    pub fn new(
        natives: Vec<NativeFunction>,
        io: Box<dyn IoProvider>,
        out: Box<dyn Write>,
    ) -> Self {
        info!("Initializing Interpreter with {} native(s)", natives.len());

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        for native in natives {
            debug!("Defining native function '{}'", native.name);

            let name = native.name;
            let value = Value::Callable(Callable::Native(Rc::new(native)));

            globals.borrow_mut().declare(name, Some(value), true);
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            call_depth: 0,
            io,
            out,
        }
    }

    /// Whether `name` is bound in the global scope.
    pub fn is_global(&self, name: &str) -> bool {
        self.globals.borrow().is_declared(name)
    }

    /// Merge a distance table produced by the resolver. Entries are never
    /// dropped: functions declared on earlier REPL lines keep evaluating
    /// their own expressions, so their distances must stay available.
    pub fn note_locals(&mut self, locals: HashMap<ExprId, usize>) {
        debug!("Recording {} resolved binding(s)", locals.len());

        self.locals.extend(locals);
    }

    /// Executes a program. The first run‑time error is reported and stops
    /// execution; returns `false` in that case.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut Reporter) -> bool {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                reporter.report_error(&e);
                self.environment = Rc::clone(&self.globals);

                info!("Interpretation stopped by an error");
                return false;
            }
        }

        if let Err(e) = self.out.flush() {
            reporter.report_error(&LoxError::Io(e));
            return false;
        }

        info!("Interpretation completed successfully");
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                write!(self.out, "{}", value)?;
                self.out.flush()?;
            }

            Stmt::Println(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                self.out.flush()?;
            }

            Stmt::Var { name, initializer } => {
                let value: Option<Value> = match initializer {
                    Some(expr) => Some(self.evaluate(expr)?),
                    None => None,
                };

                debug!("Defining variable '{}'", name.lexeme);
                self.environment
                    .borrow_mut()
                    .declare(&name.lexeme, value, false);
            }

            Stmt::Const { name, initializer } => {
                let value = self.evaluate(initializer)?;
                self.environment
                    .borrow_mut()
                    .declare(&name.lexeme, Some(value), true);
            }

            Stmt::Block(statements) => {
                let scope = Environment::child_of(&self.environment);
                return self.execute_block(statements, scope);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_stmt) = else_branch {
                    return self.execute(else_stmt);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Signal::Broke => break,
                        Signal::Returned(value) => return Ok(Signal::Returned(value)),
                        Signal::Completed | Signal::Continued => {}
                    }
                }
            }

            Stmt::For {
                initializer,
                condition,
                update,
                body,
            } => {
                let scope = Environment::child_of(&self.environment);
                let previous = std::mem::replace(&mut self.environment, scope);

                let result = self.run_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    update.as_ref(),
                    body,
                );

                self.environment = previous;
                return result;
            }

            Stmt::Break { .. } => return Ok(Signal::Broke),

            Stmt::Continue { .. } => return Ok(Signal::Continued),

            Stmt::Assert {
                keyword,
                condition,
                message,
            } => {
                if !self.evaluate(condition)?.is_truthy() {
                    let text: String = match message {
                        Some(expr) => self.evaluate(expr)?.to_string(),
                        None => String::new(),
                    };

                    return Err(LoxError::runtime(
                        keyword,
                        format!("Assertion Error: {}", text),
                    ));
                }
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                let value = Value::Callable(Callable::Function(Rc::new(function)));

                self.environment
                    .borrow_mut()
                    .declare(&decl.name.lexeme, Some(value), true);
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                return Ok(Signal::Returned(value));
            }

            Stmt::Class(decl) => self.declare_class(decl)?,
        }

        Ok(Signal::Completed)
    }

    /// Run `statements` inside `scope`, restoring the current scope after,
    /// whatever the outcome.
    pub fn execute_block(&mut self, statements: &[Stmt], scope: EnvRef) -> Result<Signal> {
        let previous = std::mem::replace(&mut self.environment, scope);
        let result = self.run_statements(statements);
        self.environment = previous;

        result
    }

    fn run_statements(&mut self, statements: &[Stmt]) -> Result<Signal> {
        for stmt in statements {
            match self.execute(stmt)? {
                Signal::Completed => {}
                signal => return Ok(signal),
            }
        }

        Ok(Signal::Completed)
    }

    /// Body of a `for`, already inside the loop's own scope.
    fn run_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> Result<Signal> {
        if let Some(init) = initializer {
            self.execute(init)?;
        }

        loop {
            if let Some(cond) = condition {
                if !self.evaluate(cond)?.is_truthy() {
                    break;
                }
            }

            match self.execute(body)? {
                Signal::Broke => break,
                Signal::Returned(value) => return Ok(Signal::Returned(value)),
                // `continue` still runs the update.
                Signal::Completed | Signal::Continued => {}
            }

            if let Some(upd) = update {
                self.evaluate(upd)?;
            }
        }

        Ok(Signal::Completed)
    }

    fn declare_class(&mut self, decl: &ClassDecl) -> Result<()> {
        debug!("Defining class '{}'", decl.name.lexeme);

        let base: Option<Rc<LoxClass>> = match &decl.base {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    let token: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => &decl.name,
                    };

                    return Err(LoxError::runtime(
                        token,
                        format!("Base class \"{}\" is expected to be a class", token.lexeme),
                    ));
                }
            },
            None => None,
        };

        let closure: &EnvRef = &self.environment;
        let table = |decls: &[Rc<FunctionDecl>], initializers: bool| {
            decls
                .iter()
                .map(|d| {
                    let is_init = initializers && d.name.lexeme == INITIALIZER;
                    let function = LoxFunction::new(Rc::clone(d), Rc::clone(closure), is_init);

                    (d.name.lexeme.clone(), Rc::new(function))
                })
                .collect::<HashMap<_, _>>()
        };

        let class = LoxClass {
            name: decl.name.lexeme.clone(),
            base,
            methods: table(&decl.methods[..], true),
            getters: table(&decl.getters[..], false),
            statics: table(&decl.static_methods[..], false),
            fields: Default::default(),
        };

        let value = Value::Callable(Callable::Class(Rc::new(class)));
        self.environment
            .borrow_mut()
            .declare(&decl.name.lexeme, Some(value), true);

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::from(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;
                let short_circuit = match operator.token_type {
                    TokenType::OR => left_val.is_truthy(),
                    _ => !left_val.is_truthy(),
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(callee_val, paren, arg_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => match instance.lookup(&name.lexeme) {
                    Some(attribute) => self.attribute_value(attribute, name),
                    None => Err(LoxError::runtime(
                        name,
                        format!(
                            "There is no attribute \"{}\" on an instance of class \"{}\"",
                            name.lexeme, instance.class.name
                        ),
                    )),
                },

                Value::Callable(Callable::Class(class)) => {
                    class.lookup(&name.lexeme).ok_or_else(|| {
                        LoxError::runtime(
                            name,
                            format!(
                                "There is no attribute \"{}\" on class \"{}\"",
                                name.lexeme, class.name
                            ),
                        )
                    })
                }

                other => Err(LoxError::type_error(
                    name,
                    format!("Only instances and classes have attributes, got {}", other.type_name()),
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(&name.lexeme, value.clone());

                    Ok(value)
                }

                Value::Callable(Callable::Class(class)) => {
                    let value = self.evaluate(value)?;
                    class.set(&name.lexeme, value.clone());

                    Ok(value)
                }

                other => Err(LoxError::type_error(
                    name,
                    format!("Only instances and classes have fields, got {}", other.type_name()),
                )),
            },

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => {
                let base = match self.look_up_variable(*id, keyword)? {
                    Value::Instance(base) => base,
                    other => {
                        return Err(LoxError::type_error(
                            keyword,
                            format!("\"super\" is bound to {}, not an instance", other.type_name()),
                        ))
                    }
                };

                match base.lookup(&method.lexeme) {
                    Some(attribute) => self.attribute_value(attribute, method),
                    None => Err(LoxError::runtime(
                        method,
                        format!(
                            "There is no attribute \"{}\" on base class \"{}\"",
                            method.lexeme, base.class.name
                        ),
                    )),
                }
            }

            Expr::Arrow(decl) => {
                let arrow = ArrowFunction {
                    decl: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                };

                Ok(Value::Callable(Callable::Arrow(Rc::new(arrow))))
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// Getters run on access; everything else is already a value.
    fn attribute_value(&mut self, attribute: Attribute, name: &Token) -> Result<Value> {
        match attribute {
            Attribute::Value(value) => Ok(value),
            Attribute::Getter(getter) => self.call_function(&getter, Vec::new(), name),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Int(n) => Ok(n
                    .checked_neg()
                    .map_or(Value::Float(-(n as f64)), Value::Int)),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(LoxError::type_error(
                    operator,
                    format!("Invalid operand for unary \"-\": {}", other.type_name()),
                )),
            },

            TokenType::BANG | TokenType::NOT => Ok(Value::Bool(!value.is_truthy())),

            TokenType::TYPEOF => Ok(Value::from(value.type_name())),

            _ => Err(LoxError::runtime(
                operator,
                format!("Invalid unary operator \"{}\"", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        if operator.token_type == TokenType::COMMA {
            self.evaluate(left)?;
            return self.evaluate(right);
        }

        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left_val.equals(&right_val))),
            TokenType::BANG_EQUAL => return Ok(Value::Bool(!left_val.equals(&right_val))),
            _ => {}
        }

        if !left_val.same_type(&right_val) {
            return Err(LoxError::type_error(
                operator,
                format!(
                    "Operator \"{}\" not supported between {} and {}",
                    operator.lexeme,
                    left_val.type_name(),
                    right_val.type_name()
                ),
            ));
        }

        match operator.token_type {
            TokenType::PLUS => match (&left_val, &right_val) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::from(format!("{}{}", a, b))),
                _ => arithmetic(operator, &left_val, &right_val),
            },

            TokenType::MINUS | TokenType::STAR | TokenType::SLASH | TokenType::PERCENTAGE => {
                arithmetic(operator, &left_val, &right_val)
            }

            TokenType::GREATER
            | TokenType::GREATER_EQUAL
            | TokenType::LESS
            | TokenType::LESS_EQUAL => {
                let ordering = compare(operator, &left_val, &right_val)?;

                Ok(Value::Bool(match operator.token_type {
                    TokenType::GREATER => ordering == Some(Ordering::Greater),
                    TokenType::GREATER_EQUAL => {
                        matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                    }
                    TokenType::LESS => ordering == Some(Ordering::Less),
                    _ => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                }))
            }

            _ => Err(LoxError::runtime(
                operator,
                format!("Invalid binary operator \"{}\"", operator.lexeme),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Invokes anything callable after checking the argument count.
    fn invoke_callable(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> Result<Value> {
        let callable: Callable = match callee {
            Value::Callable(callable) => callable,
            other => {
                return Err(LoxError::type_error(
                    paren,
                    format!("\"{}\" is not callable; only functions and classes are", other),
                ))
            }
        };

        let arity: usize = callable.arity();
        if args.len() != arity {
            let which = if args.len() < arity { "few" } else { "many" };

            return Err(LoxError::runtime(
                paren,
                format!(
                    "Too {} arguments in call to {} (expected {}, got {})",
                    which,
                    callable,
                    arity,
                    args.len()
                ),
            ));
        }

        debug!("Calling {}", callable);

        match callable {
            Callable::Native(native) => {
                (native.func)(self.io.as_mut(), &args).map_err(|msg| LoxError::runtime(paren, msg))
            }

            Callable::Function(function) => self.call_function(&function, args, paren),

            Callable::Arrow(arrow) => {
                let scope = Environment::child_of(&arrow.closure);
                bind_parameters(&scope, &arrow.decl.params, args);

                self.enter_call(paren)?;
                let signal = self.execute_block(&arrow.decl.body, scope);
                self.call_depth -= 1;

                match signal? {
                    Signal::Returned(value) => Ok(value),
                    _ => Ok(Value::Nil),
                }
            }

            Callable::Class(class) => {
                let instance = Instance::build(&class);
                self.initialize(&instance, args, paren)?;

                Ok(Value::Instance(instance))
            }
        }
    }

    /// Count one more frame, failing once the depth limit is reached.
    fn enter_call(&mut self, at: &Token) -> Result<()> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(at, "Maximum recursion depth exceeded"));
        }

        self.call_depth += 1;
        Ok(())
    }

    /// Each call gets one new scope, parented at the function's closure.
    fn call_function(
        &mut self,
        function: &LoxFunction,
        args: Vec<Value>,
        at: &Token,
    ) -> Result<Value> {
        let scope = Environment::child_of(&function.closure);
        bind_parameters(&scope, &function.decl.params, args);

        self.enter_call(at)?;
        let signal = self.execute_block(&function.decl.body, scope);
        self.call_depth -= 1;
        let signal = signal?;

        if function.is_initializer {
            let this = Token::synthetic(TokenType::THIS, "this", &function.decl.name);
            return Environment::get_at(&function.closure, 0, &this);
        }

        match signal {
            Signal::Returned(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }

    /// Run the most derived `init`. A class without one inherits its base
    /// class's constructor, which then receives the arguments.
    fn initialize(&mut self, instance: &Rc<Instance>, args: Vec<Value>, at: &Token) -> Result<()> {
        if let Some(init) = instance.class.initializer() {
            let bound = init.bind(instance);
            self.call_function(&bound, args, at)?;
        } else if let Some(base) = &instance.base {
            self.initialize(base, args, at)?;
        }

        Ok(())
    }
}

fn bind_parameters(scope: &EnvRef, params: &[Token], args: Vec<Value>) {
    let mut scope = scope.borrow_mut();

    for (param, arg) in params.iter().zip(args) {
        scope.declare(&param.lexeme, Some(arg), false);
    }
}

/// `+ - * / %` on two numerics. Integer results that overflow become floats;
/// `/` is always true division.
fn arithmetic(operator: &Token, left: &Value, right: &Value) -> Result<Value> {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(LoxError::type_error(
            operator,
            format!(
                "Operator \"{}\" not valid between {} operands",
                operator.lexeme,
                left.type_name()
            ),
        ));
    };

    let zero_divisor = b == 0.0;

    match operator.token_type {
        TokenType::SLASH if zero_divisor => {
            return Err(LoxError::runtime(operator, "Division by zero"));
        }
        TokenType::PERCENTAGE if zero_divisor => {
            return Err(LoxError::runtime(operator, "Modulo by zero"));
        }
        TokenType::SLASH => return Ok(Value::Float(a / b)),
        _ => {}
    }

    if let (Value::Int(x), Value::Int(y)) = (left, right) {
        let exact = match operator.token_type {
            TokenType::PLUS => x.checked_add(*y),
            TokenType::MINUS => x.checked_sub(*y),
            TokenType::STAR => x.checked_mul(*y),
            _ => x.checked_rem(*y).map(|r| floor_adjust(r, *y)),
        };

        if let Some(n) = exact {
            return Ok(Value::Int(n));
        }
    }

    Ok(Value::Float(match operator.token_type {
        TokenType::PLUS => a + b,
        TokenType::MINUS => a - b,
        TokenType::STAR => a * b,
        _ => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
    }))
}

/// Shift a truncated remainder so it takes the divisor's sign.
fn floor_adjust(r: i64, divisor: i64) -> i64 {
    if r != 0 && (r < 0) != (divisor < 0) {
        r + divisor
    } else {
        r
    }
}

/// Ordering of two numerics or two strings; `None` for NaN.
fn compare(operator: &Token, left: &Value, right: &Value) -> Result<Option<Ordering>> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
            _ => Err(LoxError::type_error(
                operator,
                format!(
                    "Operator \"{}\" not supported for {} operands",
                    operator.lexeme,
                    left.type_name()
                ),
            )),
        },
    }
}
