//! Front end for Vara, a small Pascal-like teaching language.
//!
//! Source text is tokenized by [`Lexer`], then validated by [`Parser`] against
//! the grammar and the primitive type rules. Nothing is built for later
//! stages; the result is either acceptance or one [`SyntaxError`].

pub mod error;
pub mod lexer;
pub mod parser;
pub mod symbols;
pub mod token;

pub use error::{ErrorKind, LexError, Location, SyntaxError};
pub use lexer::Lexer;
pub use parser::Parser;
pub use symbols::{DeclaredType, SymbolTable};
pub use token::{Token, TokenKind};

/// Everything known about one program after a full check.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    /// Names used without declaration, one entry per use.
    pub undeclared: Vec<String>,
    pub outcome: Result<(), SyntaxError>,
}

impl Analysis {
    /// Accepted only when no name went undeclared and the parse succeeded.
    pub fn is_accepted(&self) -> bool {
        self.undeclared.is_empty() && self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&SyntaxError> {
        self.outcome.as_ref().err()
    }
}

/// Tokenize and parse `source` with a fresh lexer and parser.
pub fn analyze(source: &str) -> Result<Analysis, LexError> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;
    let outcome = Parser::new(&tokens, source).parse_program();

    Ok(Analysis {
        undeclared: lexer.undeclared().to_vec(),
        tokens,
        outcome,
    })
}
