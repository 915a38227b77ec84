//! Centralised error hierarchy for the interpreter.
//!
//! Every pass (scanner, parser, resolver, interpreter) converts its failure
//! modes into one of the variants defined here. Each core variant keeps the
//! offending [`Token`] so a pretty-printer can slice its byte span from the
//! source text.
//!
//! The module **does not** print diagnostics itself; see
//! [`crate::diagnostics::Reporter`].

use std::io;
use thiserror::Error;

use log::info;

use crate::token::Token;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Malformed literal, unterminated string/comment or invalid character.
    #[error("[line {line}] Syntax Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,

        /// The malformed run of source, tagged `UNKNOWN`.
        token: Box<Token>,
    },

    /// Grammar violation reported by the parser.
    #[error("[line {line}] Syntax Error: {message}")]
    Parse {
        message: String,
        line: usize,
        token: Box<Token>,
    },

    /// Static‑analysis failure (undefined names, const reassignment, misplaced
    /// `return`/`break`/`this`, ...).
    #[error("[line {line}] Name Error: {message}")]
    Resolve {
        message: String,
        line: usize,
        token: Box<Token>,
    },

    /// Operands or callees of the wrong type.
    #[error("[line {line}] Type Error: {message}")]
    Type {
        message: String,
        line: usize,
        token: Box<Token>,
    },

    /// A name missing from the environment at run time.
    #[error("[line {line}] Name Error: {message}")]
    Name {
        message: String,
        line: usize,
        token: Box<Token>,
    },

    /// Any other evaluation failure (division by zero, arity, assertions).
    #[error("[line {line}] Runtime Error: {message}")]
    Runtime {
        message: String,
        line: usize,
        token: Box<Token>,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(token: Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", token.line, message);

        LoxError::Lex {
            message,
            line: token.line,
            token: Box::new(token),
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            token: Box::new(token.clone()),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            token: Box::new(token.clone()),
        }
    }

    pub fn type_error<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Type error: line={}, msg={}", token.line, message);

        LoxError::Type {
            message,
            line: token.line,
            token: Box::new(token.clone()),
        }
    }

    pub fn name<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Name error: line={}, msg={}", token.line, message);

        LoxError::Name {
            message,
            line: token.line,
            token: Box::new(token.clone()),
        }
    }

    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        LoxError::Runtime {
            message,
            line: token.line,
            token: Box::new(token.clone()),
        }
    }

    /// The token the error points at, if any.
    pub fn token(&self) -> Option<&Token> {
        match self {
            LoxError::Lex { token, .. }
            | LoxError::Parse { token, .. }
            | LoxError::Resolve { token, .. }
            | LoxError::Type { token, .. }
            | LoxError::Name { token, .. }
            | LoxError::Runtime { token, .. } => Some(token),
            LoxError::Io(_) => None,
        }
    }

    /// The bare message, without the `[line N]` prefix.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. }
            | LoxError::Type { message, .. }
            | LoxError::Name { message, .. }
            | LoxError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
