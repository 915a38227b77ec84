//! A running session: scanner → parser → resolver → interpreter over one
//! persistent set of globals.
//!
//! Script mode runs a whole file once. REPL mode feeds one line at a time;
//! the resolver's global scope and the interpreter's globals survive between
//! lines, while diagnostics are cleared before each line.

use std::io::{self, Write};

use log::info;

use crate::config::Flags;
use crate::diagnostics::{Diagnostic, Reporter};
use crate::interpreter::Interpreter;
use crate::natives::{self, IoProvider, SystemIo};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

pub struct Lox {
    interpreter: Interpreter,
    resolver: Resolver,
    reporter: Reporter,
}

impl Lox {
    /// A session wired to the real clock, stdin and stdout.
    pub fn new(flags: Flags) -> Self {
        Self::with_io(flags, Box::new(SystemIo), Box::new(io::stdout()))
    }

    /// A session with injected host services and output sink.
    pub fn with_io(flags: Flags, io: Box<dyn IoProvider>, out: Box<dyn Write>) -> Self {
        let natives = natives::standard();
        let names: Vec<&'static str> = natives.iter().map(|n| n.name).collect();

        let reporter = Reporter::new(flags.max_errors);
        let resolver = Resolver::new(names, flags);
        let interpreter = Interpreter::new(natives, io, out);

        info!("Lox session ready");

        Self {
            interpreter,
            resolver,
            reporter,
        }
    }

    /// Run a complete program. Returns `true` when no error was reported.
    pub fn run(&mut self, source: &str) -> bool {
        self.execute(source, false)
    }

    /// Run one REPL line. A bare expression is printed.
    pub fn run_line(&mut self, line: &str) -> bool {
        self.reporter.reset();
        self.execute(line, true)
    }

    fn execute(&mut self, source: &str, repl: bool) -> bool {
        let tokens = Scanner::new(source).process(&mut self.reporter);

        // Dropped tokens would only produce follow‑on syntax errors.
        if self.reporter.is_error() {
            return false;
        }

        let mut parser = Parser::new(&tokens);
        let parsed = if repl {
            parser.parse_repl(&mut self.reporter)
        } else {
            parser.parse(&mut self.reporter)
        };

        let Some(statements) = parsed else {
            return false;
        };

        let Some(locals) = self.resolver.resolve(&statements, &mut self.reporter) else {
            return false;
        };

        self.interpreter.note_locals(locals);

        if self.interpreter.interpret(&statements, &mut self.reporter) {
            return true;
        }

        // Keep the resolver's globals in line with what actually ran.
        let interpreter = &self.interpreter;
        self.resolver.retain_globals(|name| interpreter.is_global(name));

        false
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.reporter.messages()
    }

    pub fn had_error(&self) -> bool {
        self.reporter.is_error()
    }

    /// 0 on success, 1 if any error‑or‑worse diagnostic was recorded.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.reporter.is_error())
    }
}
