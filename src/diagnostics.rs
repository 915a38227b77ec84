//! The reporting collaborator shared by every pass.
//!
//! Passes never print. They hand `(level, message, token)` triples to a
//! [`Reporter`], which the caller inspects (and renders) once a run ends.

use std::fmt;

use log::debug;

use crate::config::MAX_ERRORS;
use crate::error::LoxError;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Warn => f.write_str("warning"),
            Level::Error => f.write_str("error"),
            Level::Fatal => f.write_str("fatal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub token: Option<Token>,
}

impl Diagnostic {
    /// Format the message followed by the offending source line and a caret
    /// underline, when the token's span can be sliced out of `source`.
    pub fn render(&self, source: &str) -> String {
        let mut out = self.message.clone();

        let Some(token) = &self.token else {
            return out;
        };

        let span = &token.span;
        if span.start >= span.end || span.end > source.len() {
            return out;
        }

        let line_start = source[..span.start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[span.end..]
            .find('\n')
            .map_or(source.len(), |i| span.end + i);

        let gutter = token.line.to_string();
        let pad = " ".repeat(gutter.len());
        let offset = source[line_start..span.start].chars().count();
        let width = source[span.start..span.end]
            .split('\n')
            .next()
            .map_or(1, |s| s.chars().count().max(1));

        out.push_str(&format!(
            "\n    {} | {}\n    {}   {}{}",
            gutter,
            &source[line_start..line_end],
            pad,
            " ".repeat(offset),
            "^".repeat(width)
        ));

        out
    }
}

/// Accumulates diagnostics and tracks whether any error or warning was seen.
#[derive(Debug)]
pub struct Reporter {
    messages: Vec<Diagnostic>,
    is_error: bool,
    is_warn: bool,
    max_errors: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(MAX_ERRORS)
    }
}

impl Reporter {
    pub fn new(max_errors: usize) -> Self {
        Self {
            messages: Vec::new(),
            is_error: false,
            is_warn: false,
            max_errors,
        }
    }

    pub fn report<S: Into<String>>(&mut self, level: Level, message: S, token: Option<&Token>) {
        let message = message.into();

        debug!("Reporting {}: {}", level, message);

        match level {
            Level::Error | Level::Fatal => self.is_error = true,
            Level::Warn => self.is_warn = true,
        }

        // Past the cap only the flags move; one fatal note marks the cut.
        if self.too_many_errors() {
            return;
        }

        if self.messages.len() == self.max_errors {
            self.messages.push(Diagnostic {
                level: Level::Fatal,
                message: format!(
                    "Too many errors ({}), further diagnostics suppressed",
                    self.max_errors
                ),
                token: None,
            });
            return;
        }

        self.messages.push(Diagnostic {
            level,
            message,
            token: token.cloned(),
        });
    }

    /// Record `error` at `Error` level, keeping its token for highlighting.
    pub fn report_error(&mut self, error: &LoxError) {
        self.report(Level::Error, error.to_string(), error.token());
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn is_warn(&self) -> bool {
        self.is_warn
    }

    /// Whether the cap was hit and later diagnostics are being dropped.
    pub fn too_many_errors(&self) -> bool {
        self.messages.len() > self.max_errors
    }

    pub fn messages(&self) -> &[Diagnostic] {
        &self.messages
    }

    /// Number of recorded diagnostics at exactly `level`.
    pub fn count(&self, level: Level) -> usize {
        self.messages.iter().filter(|d| d.level == level).count()
    }

    /// Forget everything; the REPL calls this between lines.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.is_error = false;
        self.is_warn = false;
    }
}
