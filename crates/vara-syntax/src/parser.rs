//! Recursive-descent validation of a token stream.
//!
//! The parser does not build a tree. It walks the grammar, fills the symbol
//! table from the `var` section, checks assignments against it and stops at
//! the first violation. Comments are skipped wherever a token is looked at.

use crate::error::{ErrorKind, Location, SyntaxError};
use crate::lexer;
use crate::symbols::{Compatibility, DeclaredType, SymbolTable};
use crate::token::{Token, TokenKind};

/// Deepest statement nesting accepted before the parse is aborted.
pub const MAX_NESTING: usize = 256;

type ParseResult<T = ()> = Result<T, SyntaxError>;

/// Statements inside a `[ ... ]` block may carry a leading `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Program,
    Block,
}

#[derive(Debug)]
pub struct Parser<'t> {
    tokens: &'t [Token],
    source: &'t str,
    pos: usize,
    depth: usize,
    symbols: SymbolTable,
    declared: Vec<String>,
    has_errors: bool,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token], source: &'t str) -> Self {
        Parser {
            tokens,
            source,
            pos: 0,
            depth: 0,
            symbols: SymbolTable::new(),
            declared: Vec::new(),
            has_errors: false,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Validate the whole program, stopping at the first error.
    pub fn parse_program(&mut self) -> Result<(), SyntaxError> {
        let result = self.program();
        if let Err(error) = &result {
            tracing::debug!(%error, "parse aborted");
            self.has_errors = true;
        }
        result
    }

    fn program(&mut self) -> ParseResult {
        self.expect_keyword("program")?;
        if self.current().is_some_and(|token| token.is_keyword("var")) {
            self.declarations()?;
        }
        self.expect_keyword("begin")?;

        while let Some(token) = self.current() {
            if token.is_keyword("end") {
                break;
            }
            self.statement(Context::Program)?;
        }
        self.expect_keyword("end")?;
        self.expect_punct(".")?;

        match self.current() {
            Some(token) => {
                let kind = ErrorKind::TrailingContent(token.to_string());
                Err(self.error_at(kind, Some(token)))
            }
            None => Ok(()),
        }
    }

    fn declarations(&mut self) -> ParseResult {
        self.expect_keyword("var")?;
        while self.current().is_some_and(|token| token.kind == TokenKind::Identifier) {
            self.declaration()?;
        }
        Ok(())
    }

    fn declaration(&mut self) -> ParseResult {
        let mut names = vec![self.declare()?];
        while self.eat_punct(",") {
            names.push(self.declare()?);
        }
        self.expect_punct(":")?;

        let type_token = self.current();
        let ty = type_token
            .filter(|token| token.kind == TokenKind::Keyword)
            .and_then(|token| DeclaredType::from_keyword(&token.text))
            .ok_or_else(|| self.unexpected("type", type_token))?;
        self.pos += 1;

        for name in names {
            tracing::debug!(%name, %ty, "declared");
            self.symbols.insert(name, ty);
        }
        self.expect_punct(";")?;
        Ok(())
    }

    fn declare(&mut self) -> ParseResult<String> {
        let token = self.expect(TokenKind::Identifier, None)?;
        if self.declared.contains(&token.text) {
            return Err(self.error_at(
                ErrorKind::DuplicateDeclaration(token.text.clone()),
                Some(token),
            ));
        }
        self.declared.push(token.text.clone());
        Ok(token.text.clone())
    }

    fn statement(&mut self, context: Context) -> ParseResult {
        if self.depth >= MAX_NESTING {
            let token = self.current();
            return Err(self.error_at(ErrorKind::TooDeep(MAX_NESTING), token));
        }
        self.depth += 1;
        let result = self.dispatch(context);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, context: Context) -> ParseResult {
        if context == Context::Block {
            self.eat_punct(":");
        }
        let Some(token) = self.current() else {
            return Err(self.unexpected("statement", None));
        };

        match (token.kind, token.text.as_str()) {
            (TokenKind::Keyword, "if") => self.if_statement(context),
            (TokenKind::Keyword, "while") => self.while_statement(context),
            (TokenKind::Keyword, "for") => self.for_statement(context),
            (TokenKind::Keyword, "read") => self.read_statement(),
            (TokenKind::Keyword, "write") => self.write_statement(),
            (TokenKind::Punctuation, "[") => self.compound_statement(),
            (TokenKind::Identifier, _) => self.assignment(true),
            // an undeclared target still reads as an assignment so that its
            // missing type is what gets reported
            (TokenKind::Unknown, text)
                if lexer::is_identifier(text)
                    && self.peek_second().is_some_and(|next| next.is_keyword("as")) =>
            {
                self.assignment(true)
            }
            _ => {
                let kind = ErrorKind::UnexpectedStatement(token.to_string());
                Err(self.error_at(kind, Some(token)))
            }
        }
    }

    fn compound_statement(&mut self) -> ParseResult {
        self.expect_punct("[")?;
        while let Some(token) = self.current() {
            if token.is_punct("]") {
                break;
            }
            self.statement(Context::Block)?;
        }
        self.expect_punct("]")?;
        self.expect_punct(";")?;
        Ok(())
    }

    fn if_statement(&mut self, context: Context) -> ParseResult {
        self.expect_keyword("if")?;
        self.expression()?;
        self.expect_keyword("then")?;
        self.statement(context)?;
        if self.eat_keyword("else") {
            self.statement(context)?;
        }
        Ok(())
    }

    fn while_statement(&mut self, context: Context) -> ParseResult {
        self.expect_keyword("while")?;
        self.expression()?;
        self.expect_keyword("do")?;
        self.statement(context)
    }

    fn for_statement(&mut self, context: Context) -> ParseResult {
        self.expect_keyword("for")?;
        self.assignment(false)?;
        self.expect_keyword("to")?;
        self.expression()?;
        self.expect_keyword("do")?;
        self.statement(context)
    }

    fn read_statement(&mut self) -> ParseResult {
        self.expect_keyword("read")?;
        self.expect_punct("(")?;
        self.expect(TokenKind::Identifier, None)?;
        while self.eat_punct(",") {
            self.expect(TokenKind::Identifier, None)?;
        }
        self.expect_punct(")")?;
        self.expect_punct(";")?;
        Ok(())
    }

    fn write_statement(&mut self) -> ParseResult {
        self.expect_keyword("write")?;
        self.expect_punct("(")?;
        self.expression()?;
        while self.eat_punct(",") {
            self.expression()?;
        }
        self.expect_punct(")")?;
        self.expect_punct(";")?;
        Ok(())
    }

    /// `name as rhs`, followed by `;` unless it initializes a `for` loop.
    fn assignment(&mut self, terminated: bool) -> ParseResult {
        let Some(target) = self.current() else {
            return Err(self.unexpected(TokenKind::Identifier.as_str(), None));
        };
        let Some(ty) = self.symbols.get(&target.text) else {
            return Err(self.error_at(ErrorKind::UnknownType(target.text.clone()), Some(target)));
        };
        self.expect(TokenKind::Identifier, None)?;
        self.expect_keyword("as")?;

        match self.current().map(|token| (token, ty.check_rhs(token.kind))) {
            Some((_, Compatibility::Accept)) => self.pos += 1,
            Some((token, Compatibility::Reject)) => {
                let kind = ErrorKind::TypeMismatch {
                    name: target.text.clone(),
                    declared: ty,
                    found: token.kind,
                };
                return Err(self.error_at(kind, Some(token)));
            }
            Some((_, Compatibility::Expression)) | None => self.expression()?,
        }

        if terminated {
            self.expect_punct(";")?;
        }
        Ok(())
    }

    /// Operands joined by operators, left to right, with no precedence.
    fn expression(&mut self) -> ParseResult {
        self.operand()?;
        while self.current().is_some_and(|token| token.kind.is_binary_op()) {
            self.pos += 1;
            self.operand()?;
        }
        Ok(())
    }

    fn operand(&mut self) -> ParseResult {
        let mut negated = false;
        while self.current().is_some_and(|token| token.kind == TokenKind::UnaryOp) {
            self.pos += 1;
            negated = true;
        }

        let token = self.current();
        let accepted = token.is_some_and(|token| match token.kind {
            TokenKind::Identifier | TokenKind::IntegerLiteral | TokenKind::RealLiteral => true,
            TokenKind::BooleanLiteral => negated,
            _ => false,
        });
        if !accepted {
            return Err(self.unexpected("operand", token));
        }
        self.pos += 1;
        Ok(())
    }

    /// The token under the cursor, past any comments.
    fn current(&mut self) -> Option<&'t Token> {
        while let Some(token) = self.tokens.get(self.pos) {
            if token.kind != TokenKind::Comment {
                return Some(token);
            }
            self.pos += 1;
        }
        None
    }

    /// The non-comment token after the current one.
    fn peek_second(&self) -> Option<&'t Token> {
        self.tokens[self.pos..]
            .iter()
            .filter(|token| token.kind != TokenKind::Comment)
            .nth(1)
    }

    fn expect(&mut self, kind: TokenKind, text: Option<&str>) -> ParseResult<&'t Token> {
        match self.current() {
            Some(token) if token.kind == kind && text.is_none_or(|text| token.text == text) => {
                self.pos += 1;
                Ok(token)
            }
            found => {
                let expected = match text {
                    Some(text) => format!("'{text}'"),
                    None => kind.to_string(),
                };
                Err(self.unexpected(expected, found))
            }
        }
    }

    fn expect_keyword(&mut self, text: &str) -> ParseResult {
        self.expect(TokenKind::Keyword, Some(text)).map(drop)
    }

    fn expect_punct(&mut self, text: &str) -> ParseResult {
        self.expect(TokenKind::Punctuation, Some(text)).map(drop)
    }

    fn eat(&mut self, kind: TokenKind, text: &str) -> bool {
        let found = self.current().is_some_and(|token| token.is(kind, text));
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_keyword(&mut self, text: &str) -> bool {
        self.eat(TokenKind::Keyword, text)
    }

    fn eat_punct(&mut self, text: &str) -> bool {
        self.eat(TokenKind::Punctuation, text)
    }

    fn unexpected(&self, expected: impl Into<String>, found: Option<&Token>) -> SyntaxError {
        let kind = ErrorKind::Unexpected {
            expected: expected.into(),
            found: found.map_or_else(|| "end of input".to_string(), Token::to_string),
        };
        self.error_at(kind, found)
    }

    fn error_at(&self, kind: ErrorKind, token: Option<&Token>) -> SyntaxError {
        let location = token.and_then(|token| {
            // real literals carry their normalized text, not what was written
            let needle = match token.kind {
                TokenKind::RealLiteral => lexer::written_real(self.source, &token.text)?,
                _ => token.text.as_str(),
            };
            Location::find(self.source, needle)
        });
        SyntaxError::new(kind, location)
    }
}
