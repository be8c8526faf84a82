//! Lexer for cipr
//!
//! Converts source code into a flat stream of tokens in a single pass.
//! Lexical errors are collected and scanning carries on, so the parser
//! always receives every valid token.

use crate::error::{CiprError, ErrorKind};
use crate::token::{lookup_keyword, Literal, Span, Token, TokenKind};

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
    errors: Vec<CiprError>,
}

/// Scan `source` into tokens, returning the lexical errors alongside.
pub fn scan(source: &str) -> (Vec<Token>, Vec<CiprError>) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    (tokens, lexer.take_errors())
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source. Always ends with an `Eof` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token() {
            tokens.push(token);
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            "",
            None,
            Span::new(self.current_pos, self.current_pos, self.line, self.column),
        ));

        tracing::trace!(tokens = tokens.len(), errors = self.errors.len(), "scanned source");
        tokens
    }

    pub fn take_errors(&mut self) -> Vec<CiprError> {
        std::mem::take(&mut self.errors)
    }

    /// Get the next token, skipping over anything that produces none
    fn next_token(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace_and_comments();

            let &(start_pos, ch) = self.chars.peek()?;
            let start_line = self.line;
            let start_column = self.column;

            let scanned = match ch {
                '(' => self.single(TokenKind::LeftParen),
                ')' => self.single(TokenKind::RightParen),
                '{' => self.single(TokenKind::LeftBrace),
                '}' => self.single(TokenKind::RightBrace),
                '[' => self.single(TokenKind::LeftBracket),
                ']' => self.single(TokenKind::RightBracket),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                ';' => self.single(TokenKind::Semicolon),
                '-' => self.single(TokenKind::Minus),
                '+' => self.single(TokenKind::Plus),
                '*' => self.single(TokenKind::Star),
                // Comments were consumed above, so this is division
                '/' => self.single(TokenKind::Slash),

                '!' => self.one_or_two('=', TokenKind::BangEqual, TokenKind::Bang),
                '=' => self.one_or_two('=', TokenKind::EqualEqual, TokenKind::Equal),
                '<' => self.one_or_two('=', TokenKind::LessEqual, TokenKind::Less),
                '>' => self.one_or_two('=', TokenKind::GreaterEqual, TokenKind::Greater),

                '"' => self.scan_string(),
                c if c.is_ascii_digit() => Some(self.scan_number()),
                c if c.is_ascii_alphabetic() || c == '_' => Some(self.scan_identifier()),

                _ => {
                    self.advance();
                    self.errors.push(CiprError::new(
                        ErrorKind::UnexpectedCharacter(ch),
                        Some(Span::new(start_pos, self.current_pos, start_line, start_column)),
                    ));
                    None
                }
            };

            let Some((kind, literal)) = scanned else {
                continue;
            };

            let lexeme = &self.source[start_pos..self.current_pos];
            return Some(Token::new(
                kind,
                lexeme,
                literal,
                Span::new(start_pos, self.current_pos, start_line, start_column),
            ));
        }
    }

    fn single(&mut self, kind: TokenKind) -> Option<(TokenKind, Option<Literal>)> {
        self.advance();
        Some((kind, None))
    }

    fn one_or_two(
        &mut self,
        second: char,
        two: TokenKind,
        one: TokenKind,
    ) -> Option<(TokenKind, Option<Literal>)> {
        self.advance();
        if self.peek_char() == Some(second) {
            self.advance();
            Some((two, None))
        } else {
            Some((one, None))
        }
    }

    /// Advance and return the current character
    fn advance(&mut self) -> Option<char> {
        let (pos, ch) = self.chars.next()?;
        self.current_pos = pos + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    /// The character after the next one
    fn peek_second(&self) -> Option<char> {
        let mut rest = self.source[self.current_pos..].chars();
        rest.next();
        rest.next()
    }

    /// Skip whitespace, newlines and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.source[self.current_pos..].starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scan a string literal. Newlines are allowed inside.
    fn scan_string(&mut self) -> Option<(TokenKind, Option<Literal>)> {
        // Opening quote
        self.advance();
        let content_start = self.current_pos;

        loop {
            match self.peek_char() {
                Some('"') => {
                    let value = self.source[content_start..self.current_pos].to_string();
                    self.advance();
                    return Some((TokenKind::String, Some(Literal::String(value))));
                }
                Some(_) => {
                    self.advance();
                }
                None => break,
            }
        }

        // Reported where scanning stopped: the end of input
        self.errors.push(CiprError::new(
            ErrorKind::UnterminatedString,
            Some(Span::new(self.current_pos, self.current_pos, self.line, self.column)),
        ));
        None
    }

    /// Scan a number literal
    fn scan_number(&mut self) -> (TokenKind, Option<Literal>) {
        let start = self.current_pos;

        self.consume_digits();

        // A dot is only part of the number when a digit follows it
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.consume_digits();
        }

        let text = &self.source[start..self.current_pos];
        // Digits with at most one interior dot always parse
        let value = text.parse::<f64>().unwrap_or_default();
        (TokenKind::Number, Some(Literal::Number(value)))
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> (TokenKind, Option<Literal>) {
        let start = self.current_pos;

        while self.peek_char().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = &self.source[start..self.current_pos];
        (lookup_keyword(text).unwrap_or(TokenKind::Ident), None)
    }
}
