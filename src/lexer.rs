use std::{iter::Peekable, str::Chars};

use crate::token::{lookup_ident, Span, Token, TokenKind};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// Lexes the whole source, returning every token up to (and including) the
/// first [`TokenKind::Eof`].
pub fn lex(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY.min(src.len() + 1));
    let mut lexer = Lexer::new(src);
    loop {
        let token = lexer.next_token();
        tokens.push(token);
        if token.is_eof() {
            break tokens;
        }
    }
}

/// The pull-based lexer. Tokens are produced on demand by [`Lexer::next_token`].
///
/// The lexer never fails: malformed input is represented by
/// [`TokenKind::Illegal`] tokens, which are left for the parser to report.
pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    line: u32,
    line_start: usize,
    current_line: u32,
    current_column: u32,
}

impl<'src> Lexer<'src> {
    /// Constructs a new lexer with the default state.
    pub fn new(src: &'src str) -> Lexer<'src> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            line: 1,
            line_start: 0,
            current_line: 1,
            current_column: 1,
        }
    }

    /// Scans the next token. Once the input is exhausted, an EOF token is
    /// returned on every call.
    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        let kind = self.scan_token_kind();
        self.produce(kind)
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.mark_advance() {
            '\0' if self.current_lo == self.src.len() => Eof,
            '+' => Plus,
            '-' => match self.peek() {
                '>' => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => Star,
            '/' => Slash,
            '^' => Caret,
            '%' => Percent,
            '<' => match self.peek() {
                '=' => self.advance_with(LessEq),
                _ => Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(GreaterEq),
                _ => Greater,
            },
            '=' => match self.peek() {
                '=' => self.advance_with(EqEq),
                _ => Assign,
            },
            // There is no standalone `!` operator.
            '!' => match self.peek() {
                '=' => self.advance_with(NotEq),
                _ => Illegal,
            },
            ':' => Colon,
            ';' => Semicolon,
            ',' => Comma,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            _ => Illegal,
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        lookup_ident(self.substr())
    }

    /// Scans a run of digits with at most one dot. Zero dots make an integer,
    /// one dot a float.
    fn number(&mut self) -> TokenKind {
        let mut dots = 0;
        loop {
            match self.peek() {
                '0'..='9' => {
                    self.advance();
                }
                '.' => {
                    self.advance();
                    dots += 1;
                    if dots > 1 {
                        return self.malformed_number();
                    }
                }
                _ => break,
            }
        }
        if dots == 0 {
            TokenKind::Int
        } else {
            TokenKind::Float
        }
    }

    /// A second dot poisons the whole run, up to the next whitespace.
    fn malformed_number(&mut self) -> TokenKind {
        while !matches!(self.peek(), ' ' | '\t' | '\n' | '\r' | '\0') {
            self.advance();
        }
        TokenKind::Illegal
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\n' | '\r') {
            if self.advance() == '\n' {
                self.line += 1;
                self.line_start = self.cursor;
            }
        }
    }
}

impl<'src> Lexer<'src> {
    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.current_line = self.line;
        self.current_column = u32::try_from(self.cursor - self.line_start + 1).unwrap_or(u32::MAX);
        self.advance()
    }

    /// Returns the next char and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next char without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new(
            self.current_lo,
            self.cursor,
            self.current_line,
            self.current_column,
        )
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &'src str {
        &self.src[self.current_lo..self.cursor]
    }

    /// Produces a token using the marked bounds.
    fn produce(&self, kind: TokenKind) -> Token<'src> {
        Token::new(kind, self.substr(), self.span())
    }
}

/// Yields every token, EOF included, forever. Pair it with
/// [`up_to`](crate::util::BreakableIteratorExt::up_to) to stop after EOF.
impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_token())
    }
}
