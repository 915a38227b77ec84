//! Module `scanner` implements a one‑pass, streaming lexer.
//!
//! It transforms source text into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input buffer.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, LoxError>` on each `.next()`. After an `Err` the
//!   scanner has already skipped to the next newline or brace, so a malformed
//!   run produces exactly one error.
//!
//! - `Scanner::process(self, &mut Reporter) -> Vec<Token>`
//!   Drain the iterator, routing errors to the reporter. The returned vector
//!   always ends in `EOF`.
//!
//! # Token Recognition
//!
//! - Greedy longest match for two‑character operators
//!   (`==`, `!=`, `<=`, `>=`, `+=`, `-=`, `*=`, `/=`, `%=`, `=>`).
//! - `//` line comments and `/* ... */` block comments (must be closed).
//! - Multi‑line string literals; `\"` does not terminate a string and the
//!   contents are passed through raw.
//! - Decimal literals with optional fraction and exponent, plus `0x`, `0b`
//!   and `0o` integer forms. A letter, `_` or `.` glued to a literal is an
//!   error.
//! - Identifiers/keywords resolved via a perfect‑hash `KEYWORDS` map.
//!
//! # Example
//!
//! ```rust
//! use rox::diagnostics::Reporter;
//! use rox::scanner::Scanner;
//!
//! let mut reporter = Reporter::default();
//! let tokens = Scanner::new("print 0xFF; // example").process(&mut reporter);
//! assert_eq!(tokens.len(), 4);
//! assert!(!reporter.is_error());
//! ```

use crate::diagnostics::Reporter;
use crate::error::{LoxError, Result};
use crate::token::{Number, Token, TokenType};
use log::{debug, info};
use memchr::{memchr, memchr_iter, memmem};
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"assert"   => TokenType::ASSERT,
    b"break"    => TokenType::BREAK,
    b"class"    => TokenType::CLASS,
    b"const"    => TokenType::CONST,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"fun"      => TokenType::FUN,
    b"for"      => TokenType::FOR,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"not"      => TokenType::NOT,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"println"  => TokenType::PRINTLN,
    b"return"   => TokenType::RETURN,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"typeof"   => TokenType::TYPEOF,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.
pub struct Scanner<'a> {
    src: &'a str,               // entire source text
    bytes: &'a [u8],            // same text, byte view
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
    finished: bool,             // EOF already emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
            finished: false,
        }
    }

    /// Scan the whole input. Lexical errors go to `reporter`; the returned
    /// tokens always end with `EOF`.
    pub fn process(self, reporter: &mut Reporter) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => reporter.report_error(&e),
            }
        }

        info!("Scanned {} token(s)", tokens.len());

        tokens
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    /// Return the length of the input slice.
    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  *Panics* if called at EOF – higher‑level
    /// code always guards with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` if past EOF
    /// to avoid branching at call‑site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.bytes[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Pick `double` if the next byte is `second`, otherwise `single`.
    #[inline(always)]
    fn either(&mut self, second: u8, double: TokenType, single: TokenType) -> TokenType {
        if self.match_byte(second) {
            double
        } else {
            single
        }
    }

    /// Build a lexical error covering the current lexeme (at least one char).
    fn error(&self, message: String) -> LoxError {
        let mut end = self.curr.max(self.start + 1).min(self.len());
        while end < self.len() && !self.src.is_char_boundary(end) {
            end += 1;
        }

        let lexeme = self.src.get(self.start..end).unwrap_or_default();
        let token = Token::new(TokenType::UNKNOWN, lexeme, self.line, self.start..end);

        LoxError::lex(token, message)
    }

    /// Skip to the next newline or brace so one malformed run yields one error.
    fn synchronize(&mut self) {
        while !self.is_at_end() && !matches!(self.peek(), b'\n' | b'{' | b'}') {
            self.advance();
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        let tt = match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b';' => TokenType::SEMICOLON,
            b':' => TokenType::COLON,
            b'?' => TokenType::QUESTION_MARK,

            // ── operators with an optional second character ──────────────
            b'-' => self.either(b'=', TokenType::MINUS_EQUAL, TokenType::MINUS),
            b'+' => self.either(b'=', TokenType::PLUS_EQUAL, TokenType::PLUS),
            b'*' => self.either(b'=', TokenType::STAR_EQUAL, TokenType::STAR),
            b'%' => self.either(b'=', TokenType::PERCENTAGE_EQUAL, TokenType::PERCENTAGE),
            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),
            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else if self.match_byte(b'>') {
                    TokenType::ARROW
                } else {
                    TokenType::EQUAL
                }
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            // ── comments, '/' and '/=' ───────────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Stop *before* the newline so the line counter sees it.
                    self.curr = match memchr(b'\n', &self.bytes[self.curr..]) {
                        Some(pos) => self.curr + pos,
                        None => self.len(),
                    };

                    return Ok(());
                }

                if self.match_byte(b'*') {
                    return self.block_comment();
                }

                self.either(b'=', TokenType::SLASH_EQUAL, TokenType::SLASH)
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => return self.parse_string(),

            // ── number literal (digit‑leading) ───────────────────────────
            b'0'..=b'9' => return self.parse_number(b),

            // ── identifiers / keywords (alpha or underscore‑leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();

                return Ok(());
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                while !self.src.is_char_boundary(self.curr) {
                    self.curr += 1;
                }

                let ch = self.src[self.start..].chars().next().unwrap_or('?');

                return Err(self.error(format!("Invalid character '{}'", ch)));
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    /// Skip a `/* ... */` comment; `self.curr` sits just after the opener.
    fn block_comment(&mut self) -> Result<()> {
        let rest: &[u8] = &self.bytes[self.curr..];

        match memmem::find(rest, b"*/") {
            Some(pos) => {
                self.line += memchr_iter(b'\n', &rest[..pos]).count();
                self.curr += pos + 2;

                Ok(())
            }
            None => {
                self.line += memchr_iter(b'\n', rest).count();
                self.curr = self.len();

                Err(self.error("Unterminated block comment".to_string()))
            }
        }
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            match self.advance() {
                b'\n' => self.line += 1,
                b'\\' if self.peek() == b'"' => {
                    self.advance();
                }
                _ => {}
            }
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string literal".to_string()));
        }

        self.advance(); // consume closing quote

        // Slice excluding the surrounding quotes.
        let s: &str = &self.src[self.start + 1..self.curr - 1];

        self.pending = Some(TokenType::STRING(s.to_owned()));

        Ok(())
    }

    /// Parse a numeric literal; `first` is the already consumed leading digit.
    fn parse_number(&mut self, first: u8) -> Result<()> {
        if first == b'0' {
            match self.peek() {
                b'x' | b'X' => return self.parse_radix(16, "hexadecimal"),
                b'b' | b'B' => return self.parse_radix(2, "binary"),
                b'o' | b'O' => return self.parse_radix(8, "octal"),
                _ => {}
            }
        }

        let mut is_float = false;

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Optional exponent with optional sign.
        if matches!(self.peek(), b'e' | b'E') {
            is_float = true;
            self.advance();

            if matches!(self.peek(), b'+' | b'-') {
                self.advance();
            }

            if !self.peek().is_ascii_digit() {
                return Err(self.error(
                    "Invalid numeric literal, no number following 'e'".to_string(),
                ));
            }

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.reject_glued("decimal")?;

        let lexeme: &str = &self.src[self.start..self.curr];
        let parsed = if is_float {
            lexeme.parse::<f64>().ok().map(Number::Float)
        } else {
            // Out‑of‑range integers degrade to floats.
            lexeme
                .parse::<i64>()
                .map(Number::Int)
                .or_else(|_| lexeme.parse::<f64>().map(Number::Float))
                .ok()
        };

        match parsed {
            Some(n) => {
                self.pending = Some(TokenType::NUMBER(n));

                Ok(())
            }
            None => Err(self.error(format!("Invalid numeric literal '{}'", lexeme))),
        }
    }

    /// Parse the digits of a `0x` / `0b` / `0o` literal. `self.curr` points at
    /// the base marker.
    fn parse_radix(&mut self, radix: u32, kind: &str) -> Result<()> {
        self.advance(); // base marker

        while (self.peek() as char).is_digit(radix) {
            self.advance();
        }

        self.reject_glued(kind)?;

        let digits: &str = &self.src[self.start + 2..self.curr];
        if digits.is_empty() {
            let prefix = &self.src[self.start..self.curr];
            return Err(self.error(format!("Incomplete {} literal {}", kind, prefix)));
        }

        let value = match u64::from_str_radix(digits, radix) {
            Ok(v) if v <= i64::MAX as u64 => Number::Int(v as i64),
            _ => Number::Float(digits.chars().fold(0.0, |acc, c| {
                acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64
            })),
        };

        self.pending = Some(TokenType::NUMBER(value));

        Ok(())
    }

    /// A letter, digit (for non‑decimal bases), `_` or `.` may not directly
    /// follow a numeric literal.
    fn reject_glued(&self, kind: &str) -> Result<()> {
        let c = self.peek();

        if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
            return Err(self.error(format!(
                "Invalid character in {} literal '{}'",
                kind, c as char
            )));
        }

        Ok(())
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.bytes[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        // Loop until we either emit a token, hit EOF, or see an error.
        loop {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.is_at_end() {
                self.finished = true;
                let end = self.len();

                return Some(Ok(Token::new(TokenType::EOF, "", self.line, end..end)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.pending = None;

            // 3. Attempt to scan a token; resynchronise before surfacing errors.
            if let Err(e) = self.scan_token() {
                self.synchronize();

                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lex: &str = &self.src[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, lex, self.line, self.start..self.curr)));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
