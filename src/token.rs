//! Token definitions for cipr
//!
//! Tokens are the flat, immutable output of the lexer.

use std::fmt;

/// Location in source code for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }
}

/// Token types in cipr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Dot,          // .
    Semicolon,    // ;

    // Operators
    Minus, // -
    Plus,  // +
    Slash, // /
    Star,  // *

    // One or two character
    Bang,         // !
    BangEqual,    // !=
    Equal,        // =
    EqualEqual,   // ==
    Greater,      // >
    GreaterEqual, // >=
    Less,         // <
    LessEqual,    // <=

    // Literals
    Ident,
    String,
    Number,

    // Keywords
    And,
    Class,
    Echo,
    Else,
    False,
    Fn,
    For,
    If,
    Let,
    Null,
    Or,
    Return,
    Super,
    This,
    True,
    While,

    Eof,
}

impl TokenKind {
    /// Keywords that begin a new declaration or statement.
    ///
    /// The parser resynchronizes on these after a syntax error.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Fn
                | TokenKind::Let
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Echo
                | TokenKind::Return
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Minus => "-",
            TokenKind::Plus => "+",
            TokenKind::Slash => "/",
            TokenKind::Star => "*",
            TokenKind::Bang => "!",
            TokenKind::BangEqual => "!=",
            TokenKind::Equal => "=",
            TokenKind::EqualEqual => "==",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Ident => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::And => "and",
            TokenKind::Class => "class",
            TokenKind::Echo => "echo",
            TokenKind::Else => "else",
            TokenKind::False => "false",
            TokenKind::Fn => "fn",
            TokenKind::For => "for",
            TokenKind::If => "if",
            TokenKind::Let => "let",
            TokenKind::Null => "null",
            TokenKind::Or => "or",
            TokenKind::Return => "return",
            TokenKind::Super => "super",
            TokenKind::This => "this",
            TokenKind::True => "true",
            TokenKind::While => "while",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// Literal payload carried by number and string tokens
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
}

/// A token with its kind, source text and location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, literal: Option<Literal>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            literal,
            span,
        }
    }

    /// A token that does not come from any source text.
    ///
    /// Used for names the host binds (natives) and for nodes built without
    /// a meaningful operator.
    pub fn synthetic(kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Self::new(kind, lexeme, None, Span::default())
    }

    pub fn line(&self) -> usize {
        self.span.line
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Some(Literal::Number(n)) => write!(f, "{} {} {}", self.kind, self.lexeme, n),
            Some(Literal::String(s)) => write!(f, "{} {} {}", self.kind, self.lexeme, s),
            None => write!(f, "{} {}", self.kind, self.lexeme),
        }
    }
}

/// Check if a string is a keyword and return the corresponding token kind
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    match ident {
        "and" => Some(TokenKind::And),
        "class" => Some(TokenKind::Class),
        "echo" => Some(TokenKind::Echo),
        "else" => Some(TokenKind::Else),
        "false" => Some(TokenKind::False),
        "fn" => Some(TokenKind::Fn),
        "for" => Some(TokenKind::For),
        "if" => Some(TokenKind::If),
        "let" => Some(TokenKind::Let),
        "null" => Some(TokenKind::Null),
        "or" => Some(TokenKind::Or),
        "return" => Some(TokenKind::Return),
        "super" => Some(TokenKind::Super),
        "this" => Some(TokenKind::This),
        "true" => Some(TokenKind::True),
        "while" => Some(TokenKind::While),
        _ => None,
    }
}
