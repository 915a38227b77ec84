use crate::ast::{ClassDecl, Expr, FunctionDecl, LiteralValue, Stmt};

/// Renders trees in a parenthesised prefix form, e.g. `(+ 1 (group 2))`.
/// Used by the `parse` subcommand.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => format!("\"{}\"", s),

                LiteralValue::Number(n) => n.to_string(),
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => format!(
                "(?: {} {} {})",
                Self::print(condition),
                Self::print(then_branch),
                Self::print(else_branch)
            ),

            // ── names ───────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            // ── calls and attributes ───────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Arrow(decl) => format!(
                "(=> ({}) {})",
                params(&decl.params),
                Self::print_block(&decl.body)
            ),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Println(expr) => format!("(println {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Const { name, initializer } => {
                format!("(const {} {})", name.lexeme, Self::print(initializer))
            }

            Stmt::Block(statements) => Self::print_block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(other) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(other)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", Self::print(condition), Self::print_stmt(body))
            }

            Stmt::For {
                initializer,
                condition,
                update,
                body,
            } => {
                let init = initializer
                    .as_deref()
                    .map_or_else(|| "_".to_string(), Self::print_stmt);
                let cond = condition.as_ref().map_or_else(|| "_".to_string(), Self::print);
                let upd = update.as_ref().map_or_else(|| "_".to_string(), Self::print);

                format!("(for {} {} {} {})", init, cond, upd, Self::print_stmt(body))
            }

            Stmt::Break { .. } => "(break)".into(),

            Stmt::Continue { .. } => "(continue)".into(),

            Stmt::Assert {
                condition, message, ..
            } => match message {
                Some(msg) => format!("(assert {} {})", Self::print(condition), Self::print(msg)),
                None => format!("(assert {})", Self::print(condition)),
            },

            Stmt::Function(decl) => Self::print_function("fun", decl),

            Stmt::Return { value, .. } => match value {
                Some(v) => format!("(return {})", Self::print(v)),
                None => "(return)".into(),
            },

            Stmt::Class(decl) => Self::print_class(decl),
        }
    }

    fn print_block(statements: &[Stmt]) -> String {
        let mut s = String::from("{");
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push_str(" }");
        s
    }

    fn print_function(kind: &str, decl: &FunctionDecl) -> String {
        format!(
            "({} {} ({}) {})",
            kind,
            decl.name.lexeme,
            params(&decl.params),
            Self::print_block(&decl.body)
        )
    }

    fn print_class(decl: &ClassDecl) -> String {
        let mut s = format!("(class {}", decl.name.lexeme);

        if let Some(base) = &decl.base {
            s.push_str(&format!(" < {}", Self::print(base)));
        }

        let members = decl
            .methods
            .iter()
            .map(|m| Self::print_function("method", m))
            .chain(decl.static_methods.iter().map(|m| Self::print_function("static", m)))
            .chain(decl.getters.iter().map(|m| Self::print_function("getter", m)));

        for member in members {
            s.push(' ');
            s.push_str(&member);
        }

        s.push(')');
        s
    }
}

fn params(tokens: &[crate::token::Token]) -> String {
    tokens
        .iter()
        .map(|t| t.lexeme.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
