use std::fmt;

use crate::types::Ty;

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// The scanned source text. For illegal tokens this is the offending run.
    pub text: &'src str,
    pub span: Span,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, text: &'src str, span: Span) -> Token<'src> {
        Token { kind, text, span }
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({:?}, {:?}, {}:{})",
            self.kind, self.text, self.span.line, self.span.column
        )
    }
}

/// A region of the source. Besides the byte bounds, the span remembers the
/// (1-based) line and column where it starts.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub lo: usize,
    pub len: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(lo: usize, hi: usize, line: u32, column: u32) -> Span {
        debug_assert!(hi >= lo);
        let len = u32::try_from(hi - lo).unwrap_or(u32::MAX);
        Span {
            lo,
            len,
            line,
            column,
        }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span that starts at `self` and ends where `other` ends.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.lo, other.hi().max(self.lo), self.line, self.column)
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, at {}:{})", self.line, self.column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Illegal,

    Identifier,
    Int,
    Float,

    Plus,
    Minus,
    Star,
    Slash,
    /// `^`, parsed but not lowered.
    Caret,
    Percent,

    /// `=`
    Assign,

    Less,
    Greater,
    EqEq,
    NotEq,
    LessEq,
    GreaterEq,

    Colon,
    Semicolon,
    Comma,
    LParen,
    RParen,
    /// `->`
    Arrow,
    LBrace,
    RBrace,

    Let,
    Def,
    Return,
    If,
    Do,
    Else,
    True,
    False,

    /// One of the primitive type names, see [`TYPE_NAMES`].
    Type,
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "let" => TokenKind::Let,
    "def" => TokenKind::Def,
    "return" => TokenKind::Return,
    "if" => TokenKind::If,
    "do" => TokenKind::Do,
    "else" => TokenKind::Else,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
};

pub static TYPE_NAMES: phf::Map<&'static str, Ty> = phf::phf_map! {
    "int" => Ty::Int,
    "float" => Ty::Float,
    "bool" => Ty::Bool,
};

/// Classifies an identifier-like word: keyword first, then type name, and
/// plain identifier otherwise.
pub fn lookup_ident(word: &str) -> TokenKind {
    if let Some(keyword) = KEYWORDS.get(word) {
        *keyword
    } else if TYPE_NAMES.contains_key(word) {
        TokenKind::Type
    } else {
        TokenKind::Identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ident() {
        assert_eq!(lookup_ident("let"), TokenKind::Let);
        assert_eq!(lookup_ident("do"), TokenKind::Do);
        assert_eq!(lookup_ident("float"), TokenKind::Type);
        assert_eq!(lookup_ident("Let"), TokenKind::Identifier);
        assert_eq!(lookup_ident("integer"), TokenKind::Identifier);
    }

    #[test]
    fn test_span_to() {
        let a = Span::new(4, 6, 2, 3);
        let b = Span::new(10, 13, 2, 9);
        let joined = a.to(b);
        assert_eq!(joined.lo, 4);
        assert_eq!(joined.hi(), 13);
        assert_eq!((joined.line, joined.column), (2, 3));
        assert_eq!(joined.to_string(), "4..13");
    }
}
