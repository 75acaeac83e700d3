use std::collections::HashMap;
use std::fmt;

use crate::token::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Integer,
    Real,
    Boolean,
}

impl DeclaredType {
    pub fn from_keyword(text: &str) -> Option<Self> {
        match text {
            "integer" => Some(DeclaredType::Integer),
            "real" => Some(DeclaredType::Real),
            "boolean" => Some(DeclaredType::Boolean),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeclaredType::Integer => "integer",
            DeclaredType::Real => "real",
            DeclaredType::Boolean => "boolean",
        }
    }

    /// How the first token of an assignment's right-hand side is treated.
    pub fn check_rhs(self, first: TokenKind) -> Compatibility {
        use TokenKind::{BooleanLiteral, IntegerLiteral, RealLiteral};

        match (self, first) {
            (DeclaredType::Integer, IntegerLiteral) => Compatibility::Accept,
            (DeclaredType::Integer, RealLiteral | BooleanLiteral) => Compatibility::Reject,
            // integers widen to real
            (DeclaredType::Real, RealLiteral | IntegerLiteral) => Compatibility::Accept,
            (DeclaredType::Real, BooleanLiteral) => Compatibility::Reject,
            (DeclaredType::Boolean, BooleanLiteral) => Compatibility::Accept,
            (DeclaredType::Boolean, RealLiteral | IntegerLiteral) => Compatibility::Reject,
            _ => Compatibility::Expression,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// The literal is the whole right-hand side.
    Accept,
    Reject,
    /// Not a literal; parse a generic expression.
    Expression,
}

/// Declared identifiers and their types, filled while parsing `var`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    types: HashMap<String, DeclaredType>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: DeclaredType) {
        self.types.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<DeclaredType> {
        self.types.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
