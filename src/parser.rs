/*!
Recursive‑descent parser producing the [`crate::ast`] tree.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Recovery (`synchronize`)     | `debug`| Where the parser resumes after an error.  |

### Error policy

Grammar violations abort the current declaration with `Err`; the top level
records the error and calls `synchronize()`. Problems that leave the tree
well formed (too many parameters, invalid assignment target) are recorded
and parsing continues. Either way `parse` returns `None`.

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | constDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" member* "}" ;
member         → "class" function | function | IDENT block ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
constDecl      → "const" IDENT "=" expression ";" ;
statement      → exprStmt | printStmt | printlnStmt | ifStmt | whileStmt
               | forStmt | breakStmt | continueStmt | assertStmt
               | returnStmt | block ;
ifStmt         → "if" expression statement ( "else" statement )? ;
whileStmt      → "while" expression statement ;
forStmt        → "for" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? block ;
assertStmt     → "assert" assignment ( "," expression )? ";" ;
block          → "{" declaration* "}" ;
expression     → assignment ( "," assignment )* ;
assignment     → ( call "." )? IDENT ( "=" | "+=" | "-=" | "*=" | "/=" | "%=" )
                 assignment | ternary ;
ternary        → logic_or ( "?" expression ":" ternary )? ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "not" | "-" | "typeof" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → assignment ( "," assignment )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | "super" "." IDENT | IDENT | arrow | "(" expression ")" ;
arrow          → "(" parameters? ")" "=>" ( block | assignment ) ;
```
*/

use std::rc::Rc;

use crate::ast::{ArrowDecl, ClassDecl, Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::diagnostics::Reporter;
use crate::error::{LoxError, Result};
use crate::token::{Number, Token, TokenType};

use log::{debug, info};

/// Upper bound on parameters and call arguments.
pub const MAX_ARGUMENTS: usize = 255;

/// Top‑level parser over an immutable slice of tokens ending in `EOF`.
pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    loop_depth: usize,
    had_error: bool,

    /// Errors not yet handed to the reporter.
    errors: Vec<LoxError>,
}

impl<'a> Parser<'a> {
    /// Construct a new parser. `tokens` must end with an `EOF` token, which
    /// [`crate::scanner::Scanner::process`] guarantees.
    pub fn new(tokens: &'a [Token]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            had_error: false,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program. Returns `None` iff a syntax error was
    /// reported.
    pub fn parse(&mut self, reporter: &mut Reporter) -> Option<Vec<Stmt>> {
        self.run(reporter, false)
    }

    /// Like [`Parser::parse`], but a declaration that fails is retried as a
    /// bare expression and wrapped in a `println`.
    pub fn parse_repl(&mut self, reporter: &mut Reporter) -> Option<Vec<Stmt>> {
        self.run(reporter, true)
    }

    fn run(&mut self, reporter: &mut Reporter, repl: bool) -> Option<Vec<Stmt>> {
        info!("Beginning parse phase (repl: {})", repl);

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            let result = if repl {
                self.repl_declaration()
            } else {
                self.declaration()
            };

            match result {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.record(e);
                    self.loop_depth = 0;
                    self.synchronize();
                }
            }
        }

        for error in self.errors.drain(..) {
            reporter.report_error(&error);
        }

        info!(
            "Parse finished: {} statement(s), error: {}",
            statements.len(),
            self.had_error
        );

        if self.had_error {
            None
        } else {
            Some(statements)
        }
    }

    /// One REPL declaration. If it fails, the same tokens are tried as an
    /// expression; only the declaration's error survives when both fail.
    fn repl_declaration(&mut self) -> Result<Stmt> {
        let start: usize = self.current;
        let mark: usize = self.errors.len();

        let error = match self.declaration() {
            Ok(stmt) => return Ok(stmt),
            Err(e) => e,
        };

        let failed_at: usize = self.current;
        let deferred: Vec<LoxError> = self.errors.split_off(mark);
        let had_error: bool = self.had_error;

        self.current = start;
        self.loop_depth = 0;

        match self.expression() {
            Ok(expr) => {
                debug!("REPL input re-parsed as an expression");

                self.matches(TokenType::SEMICOLON);

                Ok(Stmt::Println(expr))
            }
            Err(_) => {
                self.errors.truncate(mark);
                self.errors.extend(deferred);
                self.had_error = had_error;
                self.current = failed_at;

                Err(error)
            }
        }
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            Ok(Stmt::Function(Rc::new(self.function("function")?)))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else if self.matches(TokenType::CONST) {
            self.const_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected class name")?
            .clone();

        let base: Option<Expr> = if self.matches(TokenType::LESS) {
            let base_name = self.consume(TokenType::IDENTIFIER, "Expected base class name after '<'")?;

            Some(Expr::variable(base_name.clone()))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut static_methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut getters: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::CLASS) {
                static_methods.push(Rc::new(self.function("static method")?));
            } else if self.check_next(TokenType::LEFT_BRACE) {
                getters.push(Rc::new(self.getter()?));
            } else {
                methods.push(Rc::new(self.function("method")?));
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::Class(Rc::new(ClassDecl {
            name,
            base,
            methods,
            static_methods,
            getters,
        })))
    }

    /// `IDENT "(" parameters? ")" block` for functions, methods and statics.
    fn function(&mut self, kind: &str) -> Result<FunctionDecl> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, &format!("Expected {} name", kind))?
            .clone();

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name", kind),
        )?;

        let params: Vec<Token> = self.parameters()?;

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;
        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body", kind),
        )?;

        let body: Vec<Stmt> = self.function_body()?;

        Ok(FunctionDecl { name, params, body })
    }

    /// A method without a parameter list, run on property access.
    fn getter(&mut self) -> Result<FunctionDecl> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected getter name")?
            .clone();

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before getter body")?;

        let body: Vec<Stmt> = self.function_body()?;

        Ok(FunctionDecl {
            name,
            params: Vec::new(),
            body,
        })
    }

    fn parameters(&mut self) -> Result<Vec<Token>> {
        let mut params: Vec<Token> = Vec::new();

        if self.check(TokenType::RIGHT_PAREN) {
            return Ok(params);
        }

        loop {
            if params.len() == MAX_ARGUMENTS {
                let err = LoxError::parse(
                    self.peek(),
                    format!("Cannot have more than {} parameters", MAX_ARGUMENTS),
                );
                self.record(err);
            }

            params.push(
                self.consume(TokenType::IDENTIFIER, "Expected parameter name")?
                    .clone(),
            );

            if !self.matches(TokenType::COMMA) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse a block that belongs to a function; loops outside it do not
    /// count for `break`/`continue`.
    fn function_body(&mut self) -> Result<Vec<Stmt>> {
        let enclosing: usize = self.loop_depth;
        self.loop_depth = 0;

        let body = self.block();

        self.loop_depth = enclosing;

        body
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name after var")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn const_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name after const")?
            .clone();

        self.consume(
            TokenType::EQUAL,
            "Expected initializer after const declaration",
        )?;

        let initializer: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after const declaration")?;

        Ok(Stmt::Const { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement at line {}", self.peek().line);

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::BREAK) {
            self.break_statement()
        } else if self.matches(TokenType::CONTINUE) {
            self.continue_statement()
        } else if self.matches(TokenType::ASSERT) {
            self.assert_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            let value: Expr = self.expression()?;
            self.consume(TokenType::SEMICOLON, "Expected ';' after value")?;

            Ok(Stmt::Print(value))
        } else if self.matches(TokenType::PRINTLN) {
            let value: Expr = self.expression()?;
            self.consume(TokenType::SEMICOLON, "Expected ';' after value")?;

            Ok(Stmt::Println(value))
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let initializer: Option<Box<Stmt>> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition: Option<Expr> = if self.matches(TokenType::SEMICOLON) {
            None
        } else {
            let condition = self.expression()?;
            self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

            Some(condition)
        };

        let update: Option<Expr> = if self.check(TokenType::LEFT_BRACE) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' block after for clauses")?;

        let body: Vec<Stmt> = self.loop_body(|p| p.block())?;

        Ok(Stmt::For {
            initializer,
            condition,
            update,
            body: Box::new(Stmt::Block(body)),
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;

        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let condition: Expr = self.expression()?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let condition: Expr = self.expression()?;
        let body: Box<Stmt> = Box::new(self.loop_body(|p| p.statement())?);

        Ok(Stmt::While { condition, body })
    }

    /// Run `parse` with the loop depth raised by one.
    fn loop_body<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.loop_depth += 1;
        let body = parse(self);
        self.loop_depth -= 1;

        body
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.loop_depth == 0 {
            return Err(LoxError::parse(&keyword, "'break' outside loop"));
        }

        self.consume(TokenType::SEMICOLON, "Expected ';' after break statement")?;

        Ok(Stmt::Break { keyword })
    }

    fn continue_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.loop_depth == 0 {
            return Err(LoxError::parse(&keyword, "'continue' outside loop"));
        }

        self.consume(TokenType::SEMICOLON, "Expected ';' after continue statement")?;

        Ok(Stmt::Continue { keyword })
    }

    fn assert_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let condition: Expr = self.assignment()?;

        let message: Option<Expr> = if self.matches(TokenType::COMMA) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after assert statement")?;

        Ok(Stmt::Assert {
            keyword,
            condition,
            message,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.assignment()?;

        while self.matches(TokenType::COMMA) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.assignment()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.ternary()?;

        if !self.match_any(&[
            TokenType::EQUAL,
            TokenType::PLUS_EQUAL,
            TokenType::MINUS_EQUAL,
            TokenType::STAR_EQUAL,
            TokenType::SLASH_EQUAL,
            TokenType::PERCENTAGE_EQUAL,
        ]) {
            return Ok(expr);
        }

        let equals: Token = self.previous().clone();
        let value: Expr = self.assignment()?;

        // `a op= b` becomes `a = a op b`.
        let operator: Option<Token> = match equals.token_type {
            TokenType::PLUS_EQUAL => Some(Token::synthetic(TokenType::PLUS, "+", &equals)),
            TokenType::MINUS_EQUAL => Some(Token::synthetic(TokenType::MINUS, "-", &equals)),
            TokenType::STAR_EQUAL => Some(Token::synthetic(TokenType::STAR, "*", &equals)),
            TokenType::SLASH_EQUAL => Some(Token::synthetic(TokenType::SLASH, "/", &equals)),
            TokenType::PERCENTAGE_EQUAL => {
                Some(Token::synthetic(TokenType::PERCENTAGE, "%", &equals))
            }
            _ => None,
        };

        let combine = |target: Expr, value: Expr| match &operator {
            Some(op) => Expr::Binary {
                left: Box::new(target),
                operator: op.clone(),
                right: Box::new(value),
            },
            None => value,
        };

        match expr {
            Expr::Variable { name, .. } => {
                let value = combine(Expr::variable(name.clone()), value);

                Ok(Expr::assign(name, value))
            }

            Expr::Get { object, name } => {
                let current = Expr::Get {
                    object: object.clone(),
                    name: name.clone(),
                };

                Ok(Expr::Set {
                    object,
                    name,
                    value: Box::new(combine(current, value)),
                })
            }

            other => {
                self.record(LoxError::parse(&equals, "Invalid assignment target"));

                Ok(other)
            }
        }
    }

    fn ternary(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if !self.matches(TokenType::QUESTION_MARK) {
            return Ok(expr);
        }

        let question: Token = self.previous().clone();
        let then_branch: Expr = self.expression()?;

        self.consume(
            TokenType::COLON,
            "Expected ':' after then branch of ternary expression",
        )?;

        let else_branch: Expr = self.ternary()?;

        Ok(Expr::Ternary {
            condition: Box::new(expr),
            question,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR)
            || self.matches(TokenType::SLASH)
            || self.matches(TokenType::PERCENTAGE)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG)
            || self.matches(TokenType::NOT)
            || self.matches(TokenType::MINUS)
            || self.matches(TokenType::TYPEOF)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expected property name after '.'")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() == MAX_ARGUMENTS {
                    let err = LoxError::parse(
                        self.peek(),
                        format!("Cannot have more than {} arguments", MAX_ARGUMENTS),
                    );
                    self.record(err);
                }

                arguments.push(self.assignment()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.matches(TokenType::NUMBER(Number::Int(0))) {
            if let TokenType::NUMBER(n) = self.previous().token_type {
                return Ok(Expr::Literal(LiteralValue::Number(n)));
            }
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Str(s.clone())));
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: ExprId::fresh(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expected '.' after 'super'")?;
            let method: Token = self
                .consume(TokenType::IDENTIFIER, "Expected base class method name")?
                .clone();

            return Ok(Expr::Super {
                id: ExprId::fresh(),
                keyword,
                method,
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            if let Some(params) = self.arrow_params() {
                return self.arrow(params);
            }

            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        // ── error productions: binary operator without a left operand ──
        if self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            self.equality()?;
            return Err(LoxError::parse(&operator, "Left hand operand missing"));
        }

        if self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            self.comparison()?;
            return Err(LoxError::parse(&operator, "Left hand operand missing"));
        }

        if self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            self.term()?;
            return Err(LoxError::parse(&operator, "Left hand operand missing"));
        }

        if self.matches(TokenType::STAR)
            || self.matches(TokenType::SLASH)
            || self.matches(TokenType::PERCENTAGE)
        {
            let operator: Token = self.previous().clone();
            self.factor()?;
            return Err(LoxError::parse(&operator, "Left hand operand missing"));
        }

        Err(self.error_here("Expected expression"))
    }

    /// Speculatively read `IDENT ("," IDENT)* ")" "=>"` right after a `(`.
    /// On any mismatch the cursor is restored and nothing is reported.
    fn arrow_params(&mut self) -> Option<Vec<Token>> {
        let start: usize = self.current;
        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if !self.check(TokenType::IDENTIFIER) {
                    self.current = start;
                    return None;
                }

                params.push(self.advance().clone());

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        if self.matches(TokenType::RIGHT_PAREN) && self.matches(TokenType::ARROW) {
            Some(params)
        } else {
            self.current = start;
            None
        }
    }

    /// Parse the body after `=>`. An expression body becomes `return expr;`.
    fn arrow(&mut self, params: Vec<Token>) -> Result<Expr> {
        let arrow: Token = self.previous().clone();

        if params.len() > MAX_ARGUMENTS {
            self.record(LoxError::parse(
                &arrow,
                format!("Cannot have more than {} parameters", MAX_ARGUMENTS),
            ));
        }

        let body: Vec<Stmt> = if self.matches(TokenType::LEFT_BRACE) {
            self.function_body()?
        } else {
            let value: Expr = self.assignment()?;

            vec![Stmt::Return {
                keyword: Token::synthetic(TokenType::RETURN, "return", &arrow),
                value: Some(value),
            }]
        };

        Ok(Expr::Arrow(Rc::new(ArrowDecl {
            arrow,
            params,
            body,
        })))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Keep a non‑fatal error and mark the parse as failed.
    fn record(&mut self, error: LoxError) {
        self.had_error = true;
        self.errors.push(error);
    }

    /// A parse error located at the current token, or at the last real
    /// token when the input is exhausted.
    fn error_here(&self, message: &str) -> LoxError {
        let token: &Token = if self.is_at_end() && self.current > 0 {
            self.previous()
        } else {
            self.peek()
        };

        LoxError::parse(token, message)
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    fn match_any(&mut self, ttypes: &[TokenType]) -> bool {
        for ttype in ttypes {
            if self.matches(ttype.clone()) {
                return true;
            }
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        debug!("consume failed at '{}': {}", self.peek().lexeme, message);

        Err(self.error_here(message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    /// Like [`Parser::check`], one token further ahead.
    fn check_next(&self, ttype: TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.token_type == ttype,
            None => false,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token {
        &self.tokens[self.current - 1]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                break;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::CONST
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::PRINTLN
                | TokenType::RETURN => break,
                _ => {}
            }

            self.advance();
        }

        debug!("Synchronized at token {}", self.current);
    }
}
