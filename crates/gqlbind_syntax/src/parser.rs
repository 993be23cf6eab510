//! Recursive descent parser for GraphQL documents.
//!
//! One parser handles both schema documents and executable documents. The
//! parser never stops at the first error: it reports a diagnostic, skips
//! ahead and keeps going so a single run surfaces as many problems as
//! possible.

use crate::ast::*;
use crate::lexer::{self, Lexer};
use crate::token::{DirectiveLocation, Token, TokenKind};
use gqlbind_core::{diagnostics::codes, DiagnosticBag, Interner, Location, SourceId, Span, Text};

/// Parser for GraphQL documents.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    source_id: SourceId,
    current: Token,
    diagnostics: DiagnosticBag,
}

/// Result of parsing.
pub struct ParseResult {
    pub document: Document,
    pub diagnostics: DiagnosticBag,
}

/// Parses a source string into a document.
pub fn parse(source: &str, source_id: SourceId, interner: &Interner) -> ParseResult {
    let mut parser = Parser::new(source, source_id, interner);
    let document = parser.parse_document();
    ParseResult {
        document,
        diagnostics: parser.diagnostics,
    }
}

impl<'a> Parser<'a> {
    /// Creates a new parser.
    pub fn new(source: &'a str, source_id: SourceId, interner: &'a Interner) -> Self {
        let mut parser = Self {
            lexer: Lexer::new(source, interner),
            source_id,
            current: Token::new(TokenKind::Eof, Span::empty(0)),
            diagnostics: DiagnosticBag::new(),
        };
        parser.advance();
        parser
    }

    #[inline]
    fn at(&self) -> TokenKind {
        self.current.kind
    }

    #[inline]
    fn at_kind(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    #[inline]
    fn at_name(&self) -> bool {
        self.at_kind(TokenKind::Ident) || self.at().is_keyword()
    }

    /// Advances to the next token, reporting any unrecognized input.
    fn advance(&mut self) {
        loop {
            self.current = self.lexer.next_token();
            if !self.at_kind(TokenKind::Error) {
                break;
            }
            let text = self.current_text().to_string();
            self.diagnostics.error(
                codes::INVALID_SYNTAX,
                "unrecognized token",
                self.location(self.current.span),
                format!("cannot tokenize `{text}`"),
            );
        }
    }

    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.advance();
            true
        } else {
            self.error_expected(kind);
            false
        }
    }

    /// Consumes the token if it matches.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Guarantees progress inside list loops after an error.
    fn bump_if_stuck(&mut self, before: u32) {
        if self.current.span.start == before && !self.at_kind(TokenKind::Eof) {
            self.advance();
        }
    }

    fn current_text(&self) -> &'a str {
        self.lexer.span_text(self.current.span)
    }

    fn intern_current(&self) -> Text {
        self.lexer.intern_span(self.current.span)
    }

    fn location(&self, span: Span) -> Location {
        Location::new(self.source_id, span)
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.current.span.start.max(start))
    }

    fn error(&mut self, message: &str) {
        let code = if self.at_kind(TokenKind::Eof) {
            codes::UNEXPECTED_EOF
        } else {
            codes::INVALID_SYNTAX
        };
        self.diagnostics.error(
            code,
            message,
            self.location(self.current.span),
            format!("{message}, found {}", self.at()),
        );
    }

    fn error_at(&mut self, span: Span, title: &str, message: String) {
        self.diagnostics
            .error(codes::INVALID_SYNTAX, title, self.location(span), message);
    }

    fn error_expected(&mut self, expected: TokenKind) {
        let code = if self.at_kind(TokenKind::Eof) {
            codes::UNEXPECTED_EOF
        } else {
            codes::UNEXPECTED_TOKEN
        };
        self.diagnostics.error(
            code,
            "unexpected token",
            self.location(self.current.span),
            format!("expected {}, found {}", expected, self.at()),
        );
    }

    /// Parses a document.
    pub fn parse_document(&mut self) -> Document {
        let start = self.current.span.start;
        let mut definitions = Vec::new();

        while !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            if let Some(def) = self.parse_definition() {
                definitions.push(def);
            } else {
                self.recover_to_definition();
            }
            self.bump_if_stuck(before);
        }

        Document {
            definitions,
            span: Span::new(start, self.current.span.end),
        }
    }

    /// Skips tokens until something that can start a definition.
    fn recover_to_definition(&mut self) {
        self.advance();
        while !matches!(
            self.at(),
            TokenKind::Eof
                | TokenKind::Schema
                | TokenKind::Extend
                | TokenKind::Type
                | TokenKind::Interface
                | TokenKind::Union
                | TokenKind::Enum
                | TokenKind::Input
                | TokenKind::Scalar
                | TokenKind::Directive
                | TokenKind::Query
                | TokenKind::Mutation
                | TokenKind::Subscription
                | TokenKind::Fragment
                | TokenKind::StringLiteral
                | TokenKind::BlockStringLiteral
        ) {
            self.advance();
        }
    }

    fn parse_definition(&mut self) -> Option<Definition> {
        let description = self.try_parse_description();

        match self.at() {
            TokenKind::Extend => {
                let start = self.current.span.start;
                self.advance();
                if let Some(description) = &description {
                    self.error_at(
                        description.span,
                        "description on extension",
                        "extensions cannot carry a description".to_string(),
                    );
                }
                if self.at_kind(TokenKind::Schema) {
                    let mut schema = self.parse_schema_definition(None, true);
                    schema.span = self.span_from(start);
                    return Some(Definition::SchemaExtension(schema));
                }
                let def = self.parse_type_definition(None, start)?;
                Some(Definition::TypeExtension(def))
            }
            TokenKind::Schema => Some(Definition::Schema(
                self.parse_schema_definition(description, false),
            )),
            TokenKind::Type
            | TokenKind::Interface
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Input
            | TokenKind::Scalar => {
                let start = description
                    .as_ref()
                    .map_or(self.current.span.start, |d| d.span.start);
                self.parse_type_definition(description, start)
                    .map(Definition::Type)
            }
            TokenKind::Directive => Some(Definition::Directive(
                self.parse_directive_definition(description),
            )),
            TokenKind::Query | TokenKind::Mutation | TokenKind::Subscription | TokenKind::LBrace => {
                self.reject_description(description.as_ref());
                Some(Definition::Operation(self.parse_operation()))
            }
            TokenKind::Fragment => {
                self.reject_description(description.as_ref());
                Some(Definition::Fragment(self.parse_fragment_definition()))
            }
            _ => {
                self.error("expected definition");
                None
            }
        }
    }

    fn reject_description(&mut self, description: Option<&Description>) {
        if let Some(description) = description {
            self.error_at(
                description.span,
                "unexpected description",
                "executable definitions cannot carry a description".to_string(),
            );
        }
    }

    fn try_parse_description(&mut self) -> Option<Description> {
        let span = self.current.span;
        let value = match self.at() {
            TokenKind::StringLiteral => self.decode_string(),
            TokenKind::BlockStringLiteral => lexer::block_string_value(self.current_text()),
            _ => return None,
        };
        self.advance();
        Some(Description { value, span })
    }

    fn decode_string(&mut self) -> String {
        match lexer::string_value(self.current_text()) {
            Ok(value) => value,
            Err(escape) => {
                self.error_at(
                    self.current.span,
                    "invalid escape sequence",
                    format!("`{escape}` is not a valid escape"),
                );
                String::new()
            }
        }
    }

    fn parse_name(&mut self) -> Name {
        let span = self.current.span;
        if self.at_name() {
            let value = self.intern_current();
            self.advance();
            Name::new(value, span)
        } else {
            self.error("expected name");
            Name::new(self.lexer.intern_span(Span::empty(span.start)), span)
        }
    }

    fn parse_operation_type(&mut self) -> Option<OperationType> {
        let op = match self.at() {
            TokenKind::Query => OperationType::Query,
            TokenKind::Mutation => OperationType::Mutation,
            TokenKind::Subscription => OperationType::Subscription,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_schema_definition(
        &mut self,
        description: Option<Description>,
        extension: bool,
    ) -> SchemaDefinition {
        let start = description
            .as_ref()
            .map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // schema

        let directives = self.parse_directives(true);

        let mut operations = Vec::new();
        if self.at_kind(TokenKind::LBrace) || !extension {
            self.expect(TokenKind::LBrace);
            while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
                let before = self.current.span.start;
                let op_start = self.current.span.start;
                if let Some(operation) = self.parse_operation_type() {
                    self.expect(TokenKind::Colon);
                    let type_name = self.parse_name();
                    operations.push(OperationTypeDefinition {
                        operation,
                        type_name,
                        span: self.span_from(op_start),
                    });
                } else {
                    self.error("expected operation type");
                }
                self.bump_if_stuck(before);
            }
            self.expect(TokenKind::RBrace);
        }

        SchemaDefinition {
            description,
            directives,
            operations,
            span: self.span_from(start),
        }
    }

    /// Parses any named type definition. The body is optional so the same
    /// routine serves definitions and extensions.
    fn parse_type_definition(
        &mut self,
        description: Option<Description>,
        start: u32,
    ) -> Option<TypeDefinition> {
        let keyword = self.at();
        if !matches!(
            keyword,
            TokenKind::Type
                | TokenKind::Interface
                | TokenKind::Union
                | TokenKind::Enum
                | TokenKind::Input
                | TokenKind::Scalar
        ) {
            self.error("expected type definition");
            return None;
        }
        self.advance();
        let name = self.parse_name();

        let def = match keyword {
            TokenKind::Scalar => {
                let directives = self.parse_directives(true);
                TypeDefinition::Scalar(ScalarTypeDefinition {
                    description,
                    name,
                    directives,
                    span: self.span_from(start),
                })
            }
            TokenKind::Type | TokenKind::Interface => {
                let implements = self.parse_implements();
                let directives = self.parse_directives(true);
                let fields = if self.eat(TokenKind::LBrace) {
                    let fields = self.parse_field_definitions();
                    self.expect(TokenKind::RBrace);
                    fields
                } else {
                    Vec::new()
                };
                let def = ObjectTypeDefinition {
                    description,
                    name,
                    implements,
                    directives,
                    fields,
                    span: self.span_from(start),
                };
                if keyword == TokenKind::Type {
                    TypeDefinition::Object(def)
                } else {
                    TypeDefinition::Interface(def)
                }
            }
            TokenKind::Union => {
                let directives = self.parse_directives(true);
                let members = if self.eat(TokenKind::Eq) {
                    self.parse_union_members()
                } else {
                    Vec::new()
                };
                TypeDefinition::Union(UnionTypeDefinition {
                    description,
                    name,
                    directives,
                    members,
                    span: self.span_from(start),
                })
            }
            TokenKind::Enum => {
                let directives = self.parse_directives(true);
                let values = if self.eat(TokenKind::LBrace) {
                    let values = self.parse_enum_values();
                    self.expect(TokenKind::RBrace);
                    values
                } else {
                    Vec::new()
                };
                TypeDefinition::Enum(EnumTypeDefinition {
                    description,
                    name,
                    directives,
                    values,
                    span: self.span_from(start),
                })
            }
            _ => {
                let directives = self.parse_directives(true);
                let fields = if self.eat(TokenKind::LBrace) {
                    let fields = self.parse_input_value_definitions(TokenKind::RBrace);
                    self.expect(TokenKind::RBrace);
                    fields
                } else {
                    Vec::new()
                };
                TypeDefinition::Input(InputObjectTypeDefinition {
                    description,
                    name,
                    directives,
                    fields,
                    span: self.span_from(start),
                })
            }
        };
        Some(def)
    }

    fn parse_union_members(&mut self) -> Vec<Name> {
        let mut members = Vec::new();
        self.eat(TokenKind::Pipe);
        members.push(self.parse_name());
        while self.eat(TokenKind::Pipe) {
            members.push(self.parse_name());
        }
        members
    }

    fn parse_enum_values(&mut self) -> Vec<EnumValueDefinition> {
        let mut values = Vec::new();
        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            let description = self.try_parse_description();
            let start = description
                .as_ref()
                .map_or(self.current.span.start, |d| d.span.start);
            if matches!(
                self.at(),
                TokenKind::True | TokenKind::False | TokenKind::Null
            ) {
                self.error("enum values cannot be true, false or null");
            }
            let name = self.parse_name();
            let directives = self.parse_directives(true);
            values.push(EnumValueDefinition {
                description,
                name,
                directives,
                span: self.span_from(start),
            });
            self.bump_if_stuck(before);
        }
        values
    }

    fn parse_directive_definition(&mut self, description: Option<Description>) -> DirectiveDefinitionNode {
        let start = description
            .as_ref()
            .map_or(self.current.span.start, |d| d.span.start);
        self.advance(); // directive
        self.expect(TokenKind::At);
        let name = self.parse_name();

        let arguments = if self.eat(TokenKind::LParen) {
            let args = self.parse_input_value_definitions(TokenKind::RParen);
            self.expect(TokenKind::RParen);
            args
        } else {
            Vec::new()
        };

        let repeatable = self.eat(TokenKind::Repeatable);

        self.expect(TokenKind::On);
        let mut locations = Vec::new();
        self.eat(TokenKind::Pipe);
        loop {
            let span = self.current.span;
            let text = self.current_text();
            match DirectiveLocation::parse(text) {
                Some(location) if self.at_name() => {
                    self.advance();
                    locations.push((location, span));
                }
                _ => {
                    let text = text.to_string();
                    self.error_at(
                        span,
                        "unknown directive location",
                        format!("`{text}` is not a directive location"),
                    );
                    if self.at_name() {
                        self.advance();
                    }
                }
            }
            if !self.eat(TokenKind::Pipe) {
                break;
            }
        }

        DirectiveDefinitionNode {
            description,
            name,
            arguments,
            repeatable,
            locations,
            span: self.span_from(start),
        }
    }

    fn parse_implements(&mut self) -> Vec<Name> {
        let mut interfaces = Vec::new();
        if self.eat(TokenKind::Implements) {
            self.eat(TokenKind::Amp);
            interfaces.push(self.parse_name());
            while self.eat(TokenKind::Amp) {
                interfaces.push(self.parse_name());
            }
        }
        interfaces
    }

    fn parse_field_definitions(&mut self) -> Vec<FieldDefinition> {
        let mut fields = Vec::new();
        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            let description = self.try_parse_description();
            fields.push(self.parse_field_definition(description));
            self.bump_if_stuck(before);
        }
        fields
    }

    fn parse_field_definition(&mut self, description: Option<Description>) -> FieldDefinition {
        let start = description
            .as_ref()
            .map_or(self.current.span.start, |d| d.span.start);
        let name = self.parse_name();

        let arguments = if self.eat(TokenKind::LParen) {
            let args = self.parse_input_value_definitions(TokenKind::RParen);
            self.expect(TokenKind::RParen);
            args
        } else {
            Vec::new()
        };

        self.expect(TokenKind::Colon);
        let ty = self.parse_type();
        let directives = self.parse_directives(true);

        FieldDefinition {
            description,
            name,
            arguments,
            ty,
            directives,
            span: self.span_from(start),
        }
    }

    fn parse_input_value_definitions(&mut self, close: TokenKind) -> Vec<InputValueDefinition> {
        let mut fields = Vec::new();
        while !self.at_kind(close) && !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            let description = self.try_parse_description();
            fields.push(self.parse_input_value_definition(description));
            self.bump_if_stuck(before);
        }
        fields
    }

    fn parse_input_value_definition(
        &mut self,
        description: Option<Description>,
    ) -> InputValueDefinition {
        let start = description
            .as_ref()
            .map_or(self.current.span.start, |d| d.span.start);
        let name = self.parse_name();
        self.expect(TokenKind::Colon);
        let ty = self.parse_type();

        let default_value = if self.eat(TokenKind::Eq) {
            Some(self.parse_value(true))
        } else {
            None
        };

        let directives = self.parse_directives(true);

        InputValueDefinition {
            description,
            name,
            ty,
            default_value,
            directives,
            span: self.span_from(start),
        }
    }

    /// Parses a type reference: `Name`, `[Type]`, and `!` suffixes.
    fn parse_type(&mut self) -> Type {
        let start = self.current.span.start;

        let ty = if self.eat(TokenKind::LBracket) {
            let inner = self.parse_type();
            self.expect(TokenKind::RBracket);
            Type::List(Box::new(inner), self.span_from(start))
        } else {
            Type::Named(self.parse_name())
        };

        if self.eat(TokenKind::Bang) {
            Type::NonNull(Box::new(ty), self.span_from(start))
        } else {
            ty
        }
    }

    fn parse_directives(&mut self, is_const: bool) -> Vec<Directive> {
        let mut directives = Vec::new();
        while self.at_kind(TokenKind::At) {
            directives.push(self.parse_directive(is_const));
        }
        directives
    }

    fn parse_directive(&mut self, is_const: bool) -> Directive {
        let start = self.current.span.start;
        self.advance(); // @

        let name = self.parse_name();
        let arguments = self.parse_arguments(is_const);

        Directive {
            name,
            arguments,
            span: self.span_from(start),
        }
    }

    fn parse_arguments(&mut self, is_const: bool) -> Vec<Argument> {
        let mut args = Vec::new();
        if !self.eat(TokenKind::LParen) {
            return args;
        }
        while !self.at_kind(TokenKind::RParen) && !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            let start = self.current.span.start;
            let name = self.parse_name();
            self.expect(TokenKind::Colon);
            let value = self.parse_value(is_const);
            args.push(Argument {
                name,
                value,
                span: self.span_from(start),
            });
            self.bump_if_stuck(before);
        }
        self.expect(TokenKind::RParen);
        args
    }

    /// Parses a value. Variables are rejected in constant positions.
    fn parse_value(&mut self, is_const: bool) -> Value {
        let start = self.current.span.start;

        match self.at() {
            TokenKind::Dollar => {
                self.advance();
                let name = self.parse_name();
                if is_const {
                    self.error_at(
                        self.span_from(start),
                        "variable in constant value",
                        "variables are not allowed in default values or schema directives"
                            .to_string(),
                    );
                }
                Value::Variable(name)
            }
            TokenKind::IntLiteral => {
                let text = self.current_text();
                let span = self.current.span;
                let value = if let Ok(value) = text.parse::<i64>() {
                    value
                } else {
                    let text = text.to_string();
                    self.error_at(
                        span,
                        "integer out of range",
                        format!("`{text}` does not fit a 64-bit integer"),
                    );
                    0
                };
                self.advance();
                Value::Int(value, span)
            }
            TokenKind::FloatLiteral => {
                let span = self.current.span;
                let value = self.current_text().parse().unwrap_or(0.0);
                self.advance();
                Value::Float(value, span)
            }
            TokenKind::StringLiteral => {
                let span = self.current.span;
                let value = self.decode_string();
                self.advance();
                Value::String(value, span)
            }
            TokenKind::BlockStringLiteral => {
                let span = self.current.span;
                let value = lexer::block_string_value(self.current_text());
                self.advance();
                Value::String(value, span)
            }
            TokenKind::True => {
                self.advance();
                Value::Boolean(true, self.span_from(start))
            }
            TokenKind::False => {
                self.advance();
                Value::Boolean(false, self.span_from(start))
            }
            TokenKind::Null => {
                self.advance();
                Value::Null(self.span_from(start))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut values = Vec::new();
                while !self.at_kind(TokenKind::RBracket) && !self.at_kind(TokenKind::Eof) {
                    let before = self.current.span.start;
                    values.push(self.parse_value(is_const));
                    self.bump_if_stuck(before);
                }
                self.expect(TokenKind::RBracket);
                Value::List(values, self.span_from(start))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
                    let before = self.current.span.start;
                    let name = self.parse_name();
                    self.expect(TokenKind::Colon);
                    let value = self.parse_value(is_const);
                    fields.push((name, value));
                    self.bump_if_stuck(before);
                }
                self.expect(TokenKind::RBrace);
                Value::Object(fields, self.span_from(start))
            }
            _ if self.at_name() => Value::Enum(self.parse_name()),
            _ => {
                self.error("expected value");
                Value::Null(self.span_from(start))
            }
        }
    }

    fn parse_operation(&mut self) -> OperationDefinition {
        let start = self.current.span.start;

        let (operation, name) = match self.parse_operation_type() {
            // Shorthand `{ ... }` is an anonymous query.
            None => (OperationType::Query, None),
            Some(op) => {
                let name = if self.at_name() {
                    Some(self.parse_name())
                } else {
                    None
                };
                (op, name)
            }
        };

        let variables = if self.eat(TokenKind::LParen) {
            let vars = self.parse_variable_definitions();
            self.expect(TokenKind::RParen);
            vars
        } else {
            Vec::new()
        };

        let directives = self.parse_directives(false);
        let selection_set = self.parse_selection_set();

        OperationDefinition {
            operation,
            name,
            variables,
            directives,
            selection_set,
            span: self.span_from(start),
        }
    }

    fn parse_variable_definitions(&mut self) -> Vec<VariableDefinition> {
        let mut vars = Vec::new();
        while !self.at_kind(TokenKind::RParen) && !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            vars.push(self.parse_variable_definition());
            self.bump_if_stuck(before);
        }
        vars
    }

    fn parse_variable_definition(&mut self) -> VariableDefinition {
        let start = self.current.span.start;
        self.expect(TokenKind::Dollar);
        let name = self.parse_name();
        self.expect(TokenKind::Colon);
        let ty = self.parse_type();

        let default_value = if self.eat(TokenKind::Eq) {
            Some(self.parse_value(true))
        } else {
            None
        };

        let directives = self.parse_directives(true);

        VariableDefinition {
            name,
            ty,
            default_value,
            directives,
            span: self.span_from(start),
        }
    }

    fn parse_fragment_definition(&mut self) -> FragmentDefinition {
        let start = self.current.span.start;
        self.advance(); // fragment

        if self.at_kind(TokenKind::On) {
            self.error("fragment name cannot be `on`");
        }
        let name = self.parse_name();
        self.expect(TokenKind::On);
        let type_condition = self.parse_name();
        let directives = self.parse_directives(false);
        let selection_set = self.parse_selection_set();

        FragmentDefinition {
            name,
            type_condition,
            directives,
            selection_set,
            span: self.span_from(start),
        }
    }

    fn parse_selection_set(&mut self) -> SelectionSet {
        let start = self.current.span.start;
        self.expect(TokenKind::LBrace);

        let mut selections = Vec::new();
        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            let before = self.current.span.start;
            selections.push(self.parse_selection());
            self.bump_if_stuck(before);
        }
        if selections.is_empty() {
            self.error("selection set cannot be empty");
        }
        self.expect(TokenKind::RBrace);

        SelectionSet {
            selections,
            span: self.span_from(start),
        }
    }

    fn parse_selection(&mut self) -> Selection {
        let start = self.current.span.start;
        if !self.eat(TokenKind::Spread) {
            return Selection::Field(self.parse_field_selection());
        }

        if self.eat(TokenKind::On) {
            let type_condition = Some(self.parse_name());
            let directives = self.parse_directives(false);
            let selection_set = self.parse_selection_set();
            Selection::InlineFragment(InlineFragment {
                type_condition,
                directives,
                selection_set,
                span: self.span_from(start),
            })
        } else if self.at_kind(TokenKind::LBrace) || self.at_kind(TokenKind::At) {
            let directives = self.parse_directives(false);
            let selection_set = self.parse_selection_set();
            Selection::InlineFragment(InlineFragment {
                type_condition: None,
                directives,
                selection_set,
                span: self.span_from(start),
            })
        } else {
            let name = self.parse_name();
            let directives = self.parse_directives(false);
            Selection::FragmentSpread(FragmentSpread {
                name,
                directives,
                span: self.span_from(start),
            })
        }
    }

    fn parse_field_selection(&mut self) -> FieldSelection {
        let start = self.current.span.start;

        let first_name = self.parse_name();
        let (alias, name) = if self.eat(TokenKind::Colon) {
            (Some(first_name), self.parse_name())
        } else {
            (None, first_name)
        };

        let arguments = self.parse_arguments(false);
        let directives = self.parse_directives(false);

        let selection_set = if self.at_kind(TokenKind::LBrace) {
            Some(self.parse_selection_set())
        } else {
            None
        };

        FieldSelection {
            alias,
            name,
            arguments,
            directives,
            selection_set,
            span: self.span_from(start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str, interner: &Interner) -> Document {
        let result = parse(source, SourceId::from_raw(0), interner);
        assert!(
            !result.diagnostics.has_errors(),
            "unexpected diagnostics: {:?}",
            result.diagnostics
        );
        result.document
    }

    #[test]
    fn test_parse_simple_type() {
        let interner = Interner::new();
        let doc = parse_ok("type Query { hello: String }", &interner);
        assert_eq!(doc.definitions.len(), 1);
        let Definition::Type(TypeDefinition::Object(obj)) = &doc.definitions[0] else {
            panic!("expected object type");
        };
        assert_eq!(interner.get(obj.name.value), "Query");
        assert_eq!(obj.fields.len(), 1);
    }

    #[test]
    fn test_parse_wrapped_types() {
        let interner = Interner::new();
        let doc = parse_ok("type User { tags: [String!]! }", &interner);
        let Definition::Type(TypeDefinition::Object(obj)) = &doc.definitions[0] else {
            panic!("expected object type");
        };
        let Type::NonNull(list, _) = &obj.fields[0].ty else {
            panic!("expected non-null");
        };
        let Type::List(inner, _) = list.as_ref() else {
            panic!("expected list");
        };
        assert!(matches!(inner.as_ref(), Type::NonNull(_, _)));
        assert_eq!(interner.get(obj.fields[0].ty.named().value), "String");
    }

    #[test]
    fn test_parse_all_type_kinds() {
        let interner = Interner::new();
        let doc = parse_ok(
            r#"
            "A custom scalar"
            scalar DateTime @specifiedBy(url: "https://example.com")
            interface Node { id: ID! }
            type User implements & Node & Named { id: ID! name(upper: Boolean = false): String }
            union SearchResult = | User | Post
            enum Role { ADMIN USER }
            input NewUser { name: String!, role: Role = USER }
            "#,
            &interner,
        );
        assert_eq!(doc.definitions.len(), 6);
        let Definition::Type(TypeDefinition::Object(user)) = &doc.definitions[2] else {
            panic!("expected object type");
        };
        assert_eq!(user.implements.len(), 2);
        let Definition::Type(TypeDefinition::Union(union)) = &doc.definitions[3] else {
            panic!("expected union");
        };
        assert_eq!(union.members.len(), 2);
        let Definition::Type(TypeDefinition::Scalar(scalar)) = &doc.definitions[0] else {
            panic!("expected scalar");
        };
        assert_eq!(
            scalar.description.as_ref().map(|d| d.value.as_str()),
            Some("A custom scalar")
        );
    }

    #[test]
    fn test_parse_extensions() {
        let interner = Interner::new();
        let doc = parse_ok(
            "extend type User @key { age: Int } extend union U = A extend schema { mutation: M }",
            &interner,
        );
        assert!(matches!(
            doc.definitions[0],
            Definition::TypeExtension(TypeDefinition::Object(_))
        ));
        assert!(matches!(
            doc.definitions[1],
            Definition::TypeExtension(TypeDefinition::Union(_))
        ));
        assert!(matches!(doc.definitions[2], Definition::SchemaExtension(_)));
    }

    #[test]
    fn test_parse_directive_definition() {
        let interner = Interner::new();
        let doc = parse_ok(
            "directive @tag(name: String!) repeatable on FIELD_DEFINITION | OBJECT",
            &interner,
        );
        let Definition::Directive(directive) = &doc.definitions[0] else {
            panic!("expected directive definition");
        };
        assert!(directive.repeatable);
        assert_eq!(
            directive
                .locations
                .iter()
                .map(|(l, _)| *l)
                .collect::<Vec<_>>(),
            vec![DirectiveLocation::FieldDefinition, DirectiveLocation::Object]
        );
    }

    #[test]
    fn test_parse_operation() {
        let interner = Interner::new();
        let doc = parse_ok(
            r#"
            query GetUser($id: ID!, $withPosts: Boolean = false) {
              user(id: $id) {
                name
                handle: login
                posts @include(if: $withPosts) { title }
                ... on Admin { level }
                ...UserFields
              }
            }
            fragment UserFields on User { email }
            "#,
            &interner,
        );
        assert!(doc.is_executable());
        let Definition::Operation(op) = &doc.definitions[0] else {
            panic!("expected operation");
        };
        assert_eq!(op.operation, OperationType::Query);
        assert_eq!(op.variables.len(), 2);
        let Selection::Field(user) = &op.selection_set.selections[0] else {
            panic!("expected field");
        };
        let selections = &user.selection_set.as_ref().unwrap().selections;
        assert_eq!(selections.len(), 5);
        assert!(matches!(selections[3], Selection::InlineFragment(_)));
        assert!(matches!(selections[4], Selection::FragmentSpread(_)));
    }

    #[test]
    fn test_parse_anonymous_query() {
        let interner = Interner::new();
        let doc = parse_ok("{ me { id } }", &interner);
        let Definition::Operation(op) = &doc.definitions[0] else {
            panic!("expected operation");
        };
        assert!(op.name.is_none());
    }

    #[test]
    fn test_keywords_are_valid_names() {
        let interner = Interner::new();
        let doc = parse_ok("type Query { type: String input(on: Int): Int }", &interner);
        let Definition::Type(TypeDefinition::Object(obj)) = &doc.definitions[0] else {
            panic!("expected object type");
        };
        assert_eq!(interner.get(obj.fields[0].name.value), "type");
    }

    #[test]
    fn test_error_recovery_reports_and_continues() {
        let interner = Interner::new();
        let result = parse(
            "type A { x: } type B { y: Int }",
            SourceId::from_raw(3),
            &interner,
        );
        assert!(result.diagnostics.has_errors());
        let first = result.diagnostics.iter().next().unwrap();
        assert_eq!(first.primary_location().unwrap().source, SourceId::from_raw(3));
        assert_eq!(result.document.definitions.len(), 2);
    }

    #[test]
    fn test_unterminated_input_does_not_hang() {
        let interner = Interner::new();
        let result = parse("type A { x: [Int", SourceId::from_raw(0), &interner);
        assert!(result.diagnostics.has_errors());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == codes::UNEXPECTED_EOF));
    }

    #[test]
    fn test_variables_rejected_in_defaults() {
        let interner = Interner::new();
        let result = parse(
            "query Q($a: Int = $b) { f }",
            SourceId::from_raw(0),
            &interner,
        );
        assert!(result.diagnostics.has_errors());
    }
}
