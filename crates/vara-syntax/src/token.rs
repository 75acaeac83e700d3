use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Comment,
    Keyword,
    RelationalOp,
    BooleanLiteral,
    AdditiveOp,
    MultiplicativeOp,
    UnaryOp,
    Identifier,
    BinaryLiteral,
    OctalLiteral,
    HexLiteral,
    RealLiteral,
    Punctuation,
    IntegerLiteral,
    Unknown,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Comment => "COMMENT",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::RelationalOp => "RELATIONAL_OP",
            TokenKind::BooleanLiteral => "BOOLEAN_LITERAL",
            TokenKind::AdditiveOp => "ADDITIVE_OP",
            TokenKind::MultiplicativeOp => "MULTIPLICATIVE_OP",
            TokenKind::UnaryOp => "UNARY_OP",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::BinaryLiteral => "BINARY_LITERAL",
            TokenKind::OctalLiteral => "OCTAL_LITERAL",
            TokenKind::HexLiteral => "HEX_LITERAL",
            TokenKind::RealLiteral => "REAL_LITERAL",
            TokenKind::Punctuation => "PUNCTUATION",
            TokenKind::IntegerLiteral => "INTEGER_LITERAL",
            TokenKind::Unknown => "UNKNOWN",
        }
    }

    /// Operators that may join two operands of an expression chain.
    pub fn is_binary_op(self) -> bool {
        matches!(
            self,
            TokenKind::RelationalOp | TokenKind::AdditiveOp | TokenKind::MultiplicativeOp
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified slice of source text.
///
/// `text` is the matched text verbatim, except for real literals which carry
/// the canonical rendering of their floating value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenKind::Keyword, text)
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.is(TokenKind::Punctuation, text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?})", self.kind, self.text)
    }
}
