use serde::Serialize;
use std::fmt;
use std::mem;
use std::ops::Range;

/// Decoded value of a numeric literal.
///
/// Literals that fit in an `i64` and carry no fraction or exponent stay
/// integral; everything else is stored as `f64`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }
            Number::Float(n) => write!(f, "{:?}", n),
        }
    }
}

/// The different kinds of tokens recognized by the scanner.
///
/// Variants without data represent punctuators or keywords.
/// `STRING(String)` and `NUMBER(Number)` carry their decoded literal values.
/// `UNKNOWN` only appears on diagnostics for malformed input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// ':'
    COLON,

    /// '?'
    QUESTION_MARK,

    /// '-'
    MINUS,

    /// '-='
    MINUS_EQUAL,

    /// '+'
    PLUS,

    /// '+='
    PLUS_EQUAL,

    /// ';'
    SEMICOLON,

    /// '/'
    SLASH,

    /// '/='
    SLASH_EQUAL,

    /// '*'
    STAR,

    /// '*='
    STAR_EQUAL,

    /// '%'
    PERCENTAGE,

    /// '%='
    PERCENTAGE_EQUAL,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '=>'
    ARROW,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes)
    STRING(String),

    /// A numeric literal
    #[serde(rename = "NUMBER")]
    NUMBER(Number),

    AND,
    ASSERT,
    BREAK,
    CLASS,
    CONST,
    CONTINUE,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    NOT,
    OR,
    PRINT,
    PRINTLN,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    TYPEOF,
    VAR,
    WHILE,

    /// Malformed input; never emitted into the token stream.
    UNKNOWN,

    /// End‑of‑file marker
    EOF,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl TokenType {
    /// Variant name without payload, as printed by the `tokenize` command.
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::COLON => "COLON",
            TokenType::QUESTION_MARK => "QUESTION_MARK",
            TokenType::MINUS => "MINUS",
            TokenType::MINUS_EQUAL => "MINUS_EQUAL",
            TokenType::PLUS => "PLUS",
            TokenType::PLUS_EQUAL => "PLUS_EQUAL",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::SLASH => "SLASH",
            TokenType::SLASH_EQUAL => "SLASH_EQUAL",
            TokenType::STAR => "STAR",
            TokenType::STAR_EQUAL => "STAR_EQUAL",
            TokenType::PERCENTAGE => "PERCENTAGE",
            TokenType::PERCENTAGE_EQUAL => "PERCENTAGE_EQUAL",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::ARROW => "ARROW",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::STRING(_) => "STRING",
            TokenType::NUMBER(_) => "NUMBER",
            TokenType::AND => "AND",
            TokenType::ASSERT => "ASSERT",
            TokenType::BREAK => "BREAK",
            TokenType::CLASS => "CLASS",
            TokenType::CONST => "CONST",
            TokenType::CONTINUE => "CONTINUE",
            TokenType::ELSE => "ELSE",
            TokenType::FALSE => "FALSE",
            TokenType::FUN => "FUN",
            TokenType::FOR => "FOR",
            TokenType::IF => "IF",
            TokenType::NIL => "NIL",
            TokenType::NOT => "NOT",
            TokenType::OR => "OR",
            TokenType::PRINT => "PRINT",
            TokenType::PRINTLN => "PRINTLN",
            TokenType::RETURN => "RETURN",
            TokenType::SUPER => "SUPER",
            TokenType::THIS => "THIS",
            TokenType::TRUE => "TRUE",
            TokenType::TYPEOF => "TYPEOF",
            TokenType::VAR => "VAR",
            TokenType::WHILE => "WHILE",
            TokenType::UNKNOWN => "UNKNOWN",
            TokenType::EOF => "EOF",
        }
    }
}

/// A scanned token: its kind, the exact source slice it came from, the
/// line it was found on, and its byte range in the source text.
///
/// Tokens own their lexeme so the AST (and closures built from it) can
/// outlive the source buffer of a single REPL line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    /// 1‑based line number in the source.
    pub line: usize,

    /// Byte offsets `[start, end)` into the source.
    pub span: Range<usize>,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: &str, line: usize, span: Range<usize>) -> Self {
        Self {
            token_type,
            lexeme: lexeme.to_owned(),
            line,
            span,
        }
    }

    /// A token that does not come from any source text, e.g. the desugared
    /// operator of a compound assignment.
    pub fn synthetic(token_type: TokenType, lexeme: &str, like: &Token) -> Self {
        Self::new(token_type, lexeme, like.line, like.span.clone())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = self.token_type.name();

        match &self.token_type {
            TokenType::STRING(s) => write!(f, "{} {} {}", variant, self.lexeme, s),
            TokenType::NUMBER(n) => write!(f, "{} {} {}", variant, self.lexeme, n),
            _ => write!(f, "{} {} null", variant, self.lexeme),
        }
    }
}
