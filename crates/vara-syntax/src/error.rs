use std::fmt;

use miette::{Diagnostic, LabeledSpan, SourceSpan};
use thiserror::Error;

use crate::symbols::DeclaredType;
use crate::token::TokenKind;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum LexError {
    #[error("unrecognized character `{ch}`")]
    #[diagnostic(code(vara::lex::unrecognized_character))]
    UnrecognizedCharacter {
        ch: char,
        #[label("no token starts here")]
        span: SourceSpan,
    },

    #[error("malformed real literal `{text}`")]
    #[diagnostic(code(vara::lex::malformed_real))]
    MalformedReal {
        text: String,
        #[label("cannot be read as a floating value")]
        span: SourceSpan,
    },
}

/// Every way a parse can be aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },

    #[error("unexpected statement {0}")]
    UnexpectedStatement(String),

    #[error("identifier '{0}' is declared more than once")]
    DuplicateDeclaration(String),

    #[error("mismatched type for variable '{name}': declared {declared}, found {found}")]
    TypeMismatch {
        name: String,
        declared: DeclaredType,
        found: TokenKind,
    },

    #[error("unknown type for variable '{0}'")]
    UnknownType(String),

    #[error("cannot process statements after end: found {0}")]
    TrailingContent(String),

    #[error("statements nested deeper than {0} levels")]
    TooDeep(usize),
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected { .. } => "vara::syntax::unexpected",
            ErrorKind::UnexpectedStatement(_) => "vara::syntax::unexpected_statement",
            ErrorKind::DuplicateDeclaration(_) => "vara::semantic::duplicate_declaration",
            ErrorKind::TypeMismatch { .. } => "vara::semantic::type_mismatch",
            ErrorKind::UnknownType(_) => "vara::semantic::unknown_type",
            ErrorKind::TrailingContent(_) => "vara::syntax::trailing_content",
            ErrorKind::TooDeep(_) => "vara::syntax::too_deep",
        }
    }
}

/// The single fatal report of a failed parse.
///
/// Line information is found by searching the source for the offending text,
/// so it may point at an earlier occurrence of the same text or be missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error: {kind}")]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub line_number: Option<usize>,
    pub line_text: Option<String>,
    pub span: Option<SourceSpan>,
}

impl SyntaxError {
    pub fn new(kind: ErrorKind, location: Option<Location>) -> Self {
        match location {
            Some(location) => SyntaxError {
                kind,
                line_number: Some(location.line_number),
                line_text: Some(location.line_text),
                span: Some(location.span),
            },
            None => SyntaxError {
                kind,
                line_number: None,
                line_text: None,
                span: None,
            },
        }
    }
}

impl Diagnostic for SyntaxError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let line_number = self.line_number?;
        let line_text = self.line_text.as_deref().unwrap_or_default();
        Some(Box::new(format!("near line {line_number}: {}", line_text.trim())))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some("here".to_string()),
            span,
        ))))
    }
}

/// Best-effort position of some text in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// 1-based.
    pub line_number: usize,
    pub line_text: String,
    pub span: SourceSpan,
}

impl Location {
    /// First line containing `needle` as a substring.
    pub fn find(source: &str, needle: &str) -> Option<Location> {
        if needle.is_empty() {
            return None;
        }
        let mut line_start = 0;
        for (index, raw) in source.split_inclusive('\n').enumerate() {
            let line = raw.trim_end_matches(['\n', '\r']);
            if let Some(column) = line.find(needle) {
                return Some(Location {
                    line_number: index + 1,
                    line_text: line.to_string(),
                    span: SourceSpan::from((line_start + column, needle.len())),
                });
            }
            line_start += raw.len();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_line_containing_text() {
        let source = "program\nvar x : integer;\nbegin\r\nx as 1;\nend.";
        let location = Location::find(source, "x as").unwrap();
        assert_eq!(location.line_number, 4);
        assert_eq!(location.line_text, "x as 1;");
        assert_eq!(location.span, SourceSpan::from((32, 4)));
    }

    #[test]
    fn earlier_occurrence_wins() {
        let source = "var x : integer;\nbegin\nx as 1;";
        let location = Location::find(source, "x").unwrap();
        assert_eq!(location.line_number, 1);
    }

    #[test]
    fn missing_text_has_no_location() {
        assert_eq!(Location::find("begin end.", "while"), None);
        assert_eq!(Location::find("begin end.", ""), None);

        let error = SyntaxError::new(ErrorKind::UnknownType("y".into()), None);
        assert_eq!(error.line_number, None);
        assert!(error.labels().is_none());
        assert!(error.help().is_none());
    }

    #[test]
    fn message_names_the_variable() {
        let error = SyntaxError::new(
            ErrorKind::TypeMismatch {
                name: "x".into(),
                declared: DeclaredType::Integer,
                found: TokenKind::RealLiteral,
            },
            None,
        );
        assert_eq!(
            error.to_string(),
            "syntax error: mismatched type for variable 'x': declared integer, found REAL_LITERAL"
        );
        assert_eq!(
            error.code().map(|code| code.to_string()).as_deref(),
            Some("vara::semantic::type_mismatch")
        );
    }
}
