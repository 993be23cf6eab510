//! Token kinds and structures for GraphQL documents.

use gqlbind_core::Span;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum TokenKind {
    // Special tokens
    Eof,
    Error,

    // Literals
    Ident,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    BlockStringLiteral,

    // Keywords - Type definitions
    Type,
    Interface,
    Union,
    Enum,
    Input,
    Scalar,
    Schema,
    Extend,
    Implements,
    Fragment,
    On,
    Directive,

    // Keywords - Operations
    Query,
    Mutation,
    Subscription,

    // Keywords - Directive modifiers
    Repeatable,

    // Keywords - Values
    True,
    False,
    Null,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Spread,
    Eq,
    Pipe,
    Amp,
    At,
    Bang,
    Dollar,
}

impl TokenKind {
    /// Keywords are contextual in GraphQL: every keyword is also a valid name.
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::Type
                | Self::Interface
                | Self::Union
                | Self::Enum
                | Self::Input
                | Self::Scalar
                | Self::Schema
                | Self::Extend
                | Self::Implements
                | Self::Fragment
                | Self::On
                | Self::Directive
                | Self::Query
                | Self::Mutation
                | Self::Subscription
                | Self::Repeatable
                | Self::True
                | Self::False
                | Self::Null
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eof => "<eof>",
            Self::Error => "<error>",
            Self::Ident => "<name>",
            Self::IntLiteral => "<int>",
            Self::FloatLiteral => "<float>",
            Self::StringLiteral => "<string>",
            Self::BlockStringLiteral => "<block-string>",
            Self::Type => "type",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::Input => "input",
            Self::Scalar => "scalar",
            Self::Schema => "schema",
            Self::Extend => "extend",
            Self::Implements => "implements",
            Self::Fragment => "fragment",
            Self::On => "on",
            Self::Directive => "directive",
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
            Self::Repeatable => "repeatable",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Colon => ":",
            Self::Spread => "...",
            Self::Eq => "=",
            Self::Pipe => "|",
            Self::Amp => "&",
            Self::At => "@",
            Self::Bang => "!",
            Self::Dollar => "$",
        }
    }

    #[must_use]
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "type" => Some(Self::Type),
            "interface" => Some(Self::Interface),
            "union" => Some(Self::Union),
            "enum" => Some(Self::Enum),
            "input" => Some(Self::Input),
            "scalar" => Some(Self::Scalar),
            "schema" => Some(Self::Schema),
            "extend" => Some(Self::Extend),
            "implements" => Some(Self::Implements),
            "fragment" => Some(Self::Fragment),
            "on" => Some(Self::On),
            "directive" => Some(Self::Directive),
            "query" => Some(Self::Query),
            "mutation" => Some(Self::Mutation),
            "subscription" => Some(Self::Subscription),
            "repeatable" => Some(Self::Repeatable),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    #[must_use]
    #[inline]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Directive locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DirectiveLocation {
    // Executable
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,

    // Type system
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

impl DirectiveLocation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::Mutation => "MUTATION",
            Self::Subscription => "SUBSCRIPTION",
            Self::Field => "FIELD",
            Self::FragmentDefinition => "FRAGMENT_DEFINITION",
            Self::FragmentSpread => "FRAGMENT_SPREAD",
            Self::InlineFragment => "INLINE_FRAGMENT",
            Self::VariableDefinition => "VARIABLE_DEFINITION",
            Self::Schema => "SCHEMA",
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::FieldDefinition => "FIELD_DEFINITION",
            Self::ArgumentDefinition => "ARGUMENT_DEFINITION",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::EnumValue => "ENUM_VALUE",
            Self::InputObject => "INPUT_OBJECT",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        }
    }

    /// Parses a directive location from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUERY" => Some(Self::Query),
            "MUTATION" => Some(Self::Mutation),
            "SUBSCRIPTION" => Some(Self::Subscription),
            "FIELD" => Some(Self::Field),
            "FRAGMENT_DEFINITION" => Some(Self::FragmentDefinition),
            "FRAGMENT_SPREAD" => Some(Self::FragmentSpread),
            "INLINE_FRAGMENT" => Some(Self::InlineFragment),
            "VARIABLE_DEFINITION" => Some(Self::VariableDefinition),
            "SCHEMA" => Some(Self::Schema),
            "SCALAR" => Some(Self::Scalar),
            "OBJECT" => Some(Self::Object),
            "FIELD_DEFINITION" => Some(Self::FieldDefinition),
            "ARGUMENT_DEFINITION" => Some(Self::ArgumentDefinition),
            "INTERFACE" => Some(Self::Interface),
            "UNION" => Some(Self::Union),
            "ENUM" => Some(Self::Enum),
            "ENUM_VALUE" => Some(Self::EnumValue),
            "INPUT_OBJECT" => Some(Self::InputObject),
            "INPUT_FIELD_DEFINITION" => Some(Self::InputFieldDefinition),
            _ => None,
        }
    }
}

impl std::fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_roundtrip_names() {
        for kw in ["type", "extend", "repeatable", "subscription"] {
            let kind = TokenKind::from_keyword(kw).unwrap();
            assert!(kind.is_keyword());
            assert_eq!(kind.as_str(), kw);
        }
        assert_eq!(TokenKind::from_keyword("User"), None);
    }

    #[test]
    fn test_directive_location_parse() {
        assert_eq!(
            DirectiveLocation::parse("FIELD_DEFINITION"),
            Some(DirectiveLocation::FieldDefinition)
        );
        assert_eq!(DirectiveLocation::parse("FIELDS"), None);
        assert_eq!(DirectiveLocation::EnumValue.to_string(), "ENUM_VALUE");
    }
}
