//! Tokenization in two layers.
//!
//! [`classify`] tries every lexical category in a fixed priority order at one
//! offset and reports the first that matches there. [`Lexer`] drives it over a
//! whole program and tracks whether it is inside the `var` section, so that an
//! identifier is known to be either a declaration or a use.

use std::collections::HashSet;
use std::sync::LazyLock;

use miette::SourceSpan;
use regex::Regex;

use crate::error::LexError;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Token(TokenKind),
    Whitespace,
}

struct Rule {
    category: Category,
    pattern: Regex,
    /// The pattern opens with a word boundary, which depends on the character
    /// before the offset and so cannot be checked on the remaining text alone.
    word_start: bool,
}

/// Order matters: keywords and operator words also match the identifier
/// pattern, and the last rule matches any character.
const RULES: [(Category, &str, bool); 16] = [
    (Category::Token(TokenKind::Comment), r"^\{[^}]*\}", false),
    (
        Category::Token(TokenKind::Keyword),
        r"^(?:program|var|begin|end|integer|real|boolean|if|then|else|for|to|do|while|read|write|as)\b",
        true,
    ),
    (
        Category::Token(TokenKind::RelationalOp),
        r"^(?:NE|EQ|LT|LE|GT|GE)\b",
        true,
    ),
    (
        Category::Token(TokenKind::BooleanLiteral),
        r"^(?:true|false)\b",
        true,
    ),
    (
        Category::Token(TokenKind::AdditiveOp),
        r"^(?:plus|min|or)\b",
        true,
    ),
    (
        Category::Token(TokenKind::MultiplicativeOp),
        r"^(?:mult|div|and)\b",
        true,
    ),
    (Category::Token(TokenKind::UnaryOp), r"^~", false),
    (
        Category::Token(TokenKind::Identifier),
        r"^[A-Za-z][A-Za-z0-9]*\b",
        true,
    ),
    (Category::Token(TokenKind::BinaryLiteral), r"^[01]+[Bb]\b", true),
    (Category::Token(TokenKind::OctalLiteral), r"^[0-7]+[Oo]\b", true),
    (
        Category::Token(TokenKind::HexLiteral),
        r"^[0-9A-Fa-f]+[Hh]\b",
        true,
    ),
    (
        Category::Token(TokenKind::RealLiteral),
        r"^[0-9]+\.[0-9]+(?:[Ee][+-]?[0-9]+)?\b",
        true,
    ),
    (Category::Token(TokenKind::Punctuation), r"^[;:.(),\[\]]", false),
    (Category::Token(TokenKind::IntegerLiteral), r"^[0-9]+[Dd]?\b", true),
    (Category::Whitespace, r"^\s+", false),
    (Category::Token(TokenKind::Unknown), r"^(?s).", false),
];

static TABLE: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|&(category, pattern, word_start)| Rule {
            category,
            pattern: Regex::new(pattern).expect("token patterns are valid"),
            word_start,
        })
        .collect()
});

static REAL_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9]+\.[0-9]+(?:[Ee][+-]?[0-9]+)?\b").expect("real pattern is valid")
});

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// A category that matched at some offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'s> {
    pub category: Category,
    pub text: &'s str,
    /// Byte offset just past the match.
    pub end: usize,
}

/// Classify the text starting exactly at `offset`.
///
/// Returns `None` at the end of input or when `offset` is not a char boundary.
pub fn classify(source: &str, offset: usize) -> Option<Match<'_>> {
    let rest = source.get(offset..)?;
    if rest.is_empty() {
        return None;
    }
    let after_word = source[..offset].chars().next_back().is_some_and(is_word_char);

    TABLE.iter().find_map(|rule| {
        if rule.word_start && after_word {
            return None;
        }
        let found = rule.pattern.find(rest)?;
        Some(Match {
            category: rule.category,
            text: found.as_str(),
            end: offset + found.end(),
        })
    })
}

/// Whether `text` has the shape of an identifier, declared or not.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric())
}

/// The first real literal in `source` that normalizes to `normalized`.
pub fn written_real<'s>(source: &'s str, normalized: &str) -> Option<&'s str> {
    REAL_LITERAL
        .find_iter(source)
        .map(|found| found.as_str())
        .find(|text| normalize_real(text).as_deref() == Some(normalized))
}

/// Re-render a real literal through its floating value.
pub fn normalize_real(text: &str) -> Option<String> {
    let value: f64 = text.parse().ok()?;
    Some(format!("{value:?}"))
}

/// Tokenizer that knows whether it is inside the declaration section.
///
/// One instance serves one program text. Uses of names that were never
/// declared are recorded and come out as [`TokenKind::Unknown`].
#[derive(Debug, Clone)]
pub struct Lexer<'s> {
    source: &'s str,
    offset: usize,
    in_declaration_section: bool,
    /// Set by `begin`; a later `var` no longer opens a declaration section.
    in_body: bool,
    declared: HashSet<String>,
    undeclared: Vec<String>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Lexer {
            source,
            offset: 0,
            in_declaration_section: false,
            in_body: false,
            declared: HashSet::new(),
            undeclared: Vec::new(),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        self.by_ref().collect()
    }

    /// Whether an undeclared name was used.
    pub fn has_error(&self) -> bool {
        !self.undeclared.is_empty()
    }

    /// Undeclared names, one entry per use, in source order.
    pub fn undeclared(&self) -> &[String] {
        &self.undeclared
    }

    pub fn declared_names(&self) -> &HashSet<String> {
        &self.declared
    }

    pub fn in_declaration_section(&self) -> bool {
        self.in_declaration_section
    }

    fn track(&mut self, kind: TokenKind, text: &str, start: usize) -> Result<Token, LexError> {
        match kind {
            TokenKind::Keyword if text == "var" && !self.in_body => {
                tracing::debug!("entering declaration section");
                self.in_declaration_section = true;
            }
            TokenKind::Keyword if text == "begin" => {
                tracing::debug!("leaving declaration section");
                self.in_declaration_section = false;
                self.in_body = true;
            }
            TokenKind::RealLiteral => {
                let normalized = normalize_real(text).ok_or_else(|| LexError::MalformedReal {
                    text: text.to_string(),
                    span: SourceSpan::from((start, text.len())),
                })?;
                return Ok(Token::new(kind, normalized));
            }
            TokenKind::Identifier if self.in_declaration_section => {
                self.declared.insert(text.to_string());
            }
            TokenKind::Identifier if !self.declared.contains(text) => {
                tracing::warn!(name = text, "variable used without declaration");
                self.undeclared.push(text.to_string());
                return Ok(Token::new(TokenKind::Unknown, text));
            }
            _ => {}
        }
        Ok(Token::new(kind, text))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.source.len() {
            let start = self.offset;
            let Some(found) = classify(self.source, start) else {
                let ch = self.source[start..].chars().next()?;
                self.offset = self.source.len();
                return Some(Err(LexError::UnrecognizedCharacter {
                    ch,
                    span: SourceSpan::from((start, ch.len_utf8())),
                }));
            };
            self.offset = found.end;

            if let Category::Token(kind) = found.category {
                tracing::trace!(%kind, text = found.text, "token");
                let token = self.track(kind, found.text, start);
                if token.is_err() {
                    self.offset = self.source.len();
                }
                return Some(token);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    fn first(source: &str) -> (Category, &str) {
        let found = classify(source, 0).unwrap();
        (found.category, found.text)
    }

    #[test]
    fn priority_order() {
        assert_eq!(first("while x"), (Category::Token(Keyword), "while"));
        assert_eq!(first("whiles"), (Category::Token(Identifier), "whiles"));
        assert_eq!(first("LT y"), (Category::Token(RelationalOp), "LT"));
        assert_eq!(first("true;"), (Category::Token(BooleanLiteral), "true"));
        assert_eq!(first("plus 1"), (Category::Token(AdditiveOp), "plus"));
        assert_eq!(first("div 2"), (Category::Token(MultiplicativeOp), "div"));
        assert_eq!(first("~true"), (Category::Token(UnaryOp), "~"));
        assert_eq!(first("{a\nb} x"), (Category::Token(Comment), "{a\nb}"));
        assert_eq!(first("  \n\tx"), (Category::Whitespace, "  \n\t"));
        assert_eq!(first("@"), (Category::Token(Unknown), "@"));
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(first("101B"), (Category::Token(BinaryLiteral), "101B"));
        assert_eq!(first("17o"), (Category::Token(OctalLiteral), "17o"));
        assert_eq!(first("1FH"), (Category::Token(HexLiteral), "1FH"));
        assert_eq!(first("12.5;"), (Category::Token(RealLiteral), "12.5"));
        assert_eq!(first("3.0E+2"), (Category::Token(RealLiteral), "3.0E+2"));
        assert_eq!(first("42;"), (Category::Token(IntegerLiteral), "42"));
        assert_eq!(first("42d"), (Category::Token(IntegerLiteral), "42d"));
        // a fractional part is mandatory
        assert_eq!(first("12."), (Category::Token(IntegerLiteral), "12"));
        // hex digits alone start like an identifier
        assert_eq!(first("FFh"), (Category::Token(Identifier), "FFh"));
    }

    #[test]
    fn word_boundary_looks_behind_the_offset() {
        let source = "5x";
        assert_eq!(classify(source, 0).unwrap().category, Category::Token(Unknown));
        let found = classify(source, 1).unwrap();
        assert_eq!(found.category, Category::Token(Unknown));
        assert_eq!(found.text, "x");
        assert_eq!(classify(source, 2), None);
    }

    #[test]
    fn comments_do_not_nest() {
        let source = "{ a { b } c }";
        let found = classify(source, 0).unwrap();
        assert_eq!(found.text, "{ a { b }");
        assert_eq!(found.end, 9);
    }

    #[test]
    fn real_literals_are_normalized() {
        assert_eq!(normalize_real("10.2E-5"), normalize_real("0.000102"));
        assert_eq!(normalize_real("10.3222E+0").as_deref(), Some("10.3222"));
        assert_eq!(normalize_real("1.0").as_deref(), Some("1.0"));

        let a = kinds("program var x : real; begin x as 10.2E-5; end.");
        let b = kinds("program var x : real; begin x as 0.000102; end.");
        assert_eq!(a, b);
    }

    #[test]
    fn written_form_of_a_real() {
        let source = "x as 1.5; y as 10.2E-5;";
        assert_eq!(written_real(source, "0.000102"), Some("10.2E-5"));
        assert_eq!(written_real(source, "1.5"), Some("1.5"));
        assert_eq!(written_real(source, "2.5"), None);

        assert!(is_identifier("x1"));
        assert!(!is_identifier("@"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn declarations_and_uses() {
        let mut lexer = Lexer::new("program var x : integer; begin x as y; end.");
        let tokens = lexer.tokenize().unwrap();
        assert!(lexer.has_error());
        assert_eq!(lexer.undeclared(), ["y".to_string()]);
        assert!(lexer.declared_names().contains("x"));
        assert!(!lexer.in_declaration_section());

        let ids: Vec<_> = tokens
            .iter()
            .filter(|token| token.text == "x" || token.text == "y")
            .map(|token| (token.text.as_str(), token.kind))
            .collect();
        assert_eq!(ids, [("x", Identifier), ("x", Identifier), ("y", Unknown)]);
    }

    #[test]
    fn begin_closes_declarations_without_var() {
        let mut lexer = Lexer::new("program begin z as 1; end.");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[2], Token::new(Unknown, "z"));
        assert_eq!(lexer.undeclared(), ["z".to_string()]);
    }

    #[test]
    fn nothing_is_declared_after_begin() {
        let mut lexer = Lexer::new("var a : integer; begin a as 1; end. var b");
        let tokens = lexer.tokenize().unwrap();
        assert!(!lexer.in_declaration_section());
        assert_eq!(tokens.last(), Some(&Token::new(Unknown, "b")));
        assert_eq!(lexer.undeclared(), ["b".to_string()]);

        let mut lexer = Lexer::new("var a : integer; begin b as 1; end.");
        lexer.tokenize().unwrap();
        assert_eq!(lexer.undeclared(), ["b".to_string()]);
    }

    #[test]
    fn whitespace_emits_nothing() {
        assert!(kinds(" \n\t ").is_empty());
        assert_eq!(
            kinds("{c}\n(x)"),
            [
                (Comment, "{c}".to_string()),
                (Punctuation, "(".to_string()),
                (Unknown, "x".to_string()),
                (Punctuation, ")".to_string()),
            ]
        );
    }

    #[test]
    fn tokenizing_is_idempotent() {
        fn prop(source: String) -> bool {
            let first = Lexer::new(&source).tokenize();
            let second = Lexer::new(&source).tokenize();
            first == second
        }
        quickcheck(prop as fn(String) -> bool);
    }

    #[test]
    fn tokenizing_never_fails() {
        fn prop(source: String) -> bool {
            Lexer::new(&source).tokenize().is_ok()
        }
        quickcheck(prop as fn(String) -> bool);
    }
}
