//! Lexer for GraphQL documents.
//!
//! Commas, whitespace, comments and the byte order mark are insignificant
//! and never reach the parser.

use crate::token::{Token, TokenKind};
use gqlbind_core::{Interner, Span, Text};

/// A lexer for GraphQL source text.
#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: u32,
    interner: &'a Interner,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer.
    pub fn new(source: &'a str, interner: &'a Interner) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            interner,
        }
    }

    /// Returns the current position.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).copied()
    }

    #[inline]
    fn peek_at(&self, offset: u32) -> Option<u8> {
        self.bytes.get((self.pos + offset) as usize).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn advance_by(&mut self, n: u32) {
        self.pos += n;
    }

    #[inline]
    fn slice_from(&self, start: u32) -> &'a str {
        &self.source[start as usize..self.pos as usize]
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.pos;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match c {
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b':' => self.single(TokenKind::Colon),
            b'=' => self.single(TokenKind::Eq),
            b'|' => self.single(TokenKind::Pipe),
            b'&' => self.single(TokenKind::Amp),
            b'@' => self.single(TokenKind::At),
            b'!' => self.single(TokenKind::Bang),
            b'$' => self.single(TokenKind::Dollar),
            b'.' => {
                if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                    self.advance_by(3);
                    TokenKind::Spread
                } else {
                    self.single(TokenKind::Error)
                }
            }

            b'"' => self.scan_string(),

            b'-' | b'0'..=b'9' => self.scan_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            _ => {
                // Consume the whole character so spans stay on char boundaries.
                let width = self.source[self.pos as usize..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                self.advance_by(u32::try_from(width).unwrap_or(1));
                TokenKind::Error
            }
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    #[inline]
    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Skips whitespace, commas, comments and the byte order mark.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b',') => {
                    self.advance();
                }
                Some(b'#') => {
                    let rest = &self.bytes[self.pos as usize..];
                    let len = memchr::memchr2(b'\n', b'\r', rest).unwrap_or(rest.len());
                    self.advance_by(u32::try_from(len).unwrap_or(u32::MAX - self.pos));
                }
                Some(0xEF) if self.peek_at(1) == Some(0xBB) && self.peek_at(2) == Some(0xBF) => {
                    self.advance_by(3);
                }
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::from_keyword(self.slice_from(start)).unwrap_or(TokenKind::Ident)
    }

    fn scan_digits(&mut self) -> u32 {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.pos - start
    }

    fn scan_number(&mut self) -> TokenKind {
        let mut is_float = false;

        if self.peek() == Some(b'-') {
            self.advance();
        }

        // Leading zeros are not allowed: `01` is an error.
        if self.peek() == Some(b'0') {
            self.advance();
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.scan_digits();
                return TokenKind::Error;
            }
        } else if self.scan_digits() == 0 {
            return TokenKind::Error;
        }

        if self.peek() == Some(b'.') {
            is_float = true;
            self.advance();
            if self.scan_digits() == 0 {
                return TokenKind::Error;
            }
        }

        if let Some(b'e' | b'E') = self.peek() {
            is_float = true;
            self.advance();
            if let Some(b'+' | b'-') = self.peek() {
                self.advance();
            }
            if self.scan_digits() == 0 {
                return TokenKind::Error;
            }
        }

        // A number directly followed by a name start is invalid (`12abc`).
        if self
            .peek()
            .is_some_and(|c| c == b'.' || c == b'_' || c.is_ascii_alphabetic())
        {
            return TokenKind::Error;
        }

        if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        self.advance();

        if self.peek() == Some(b'"') && self.peek_at(1) == Some(b'"') {
            self.advance_by(2);
            return self.scan_block_string();
        }

        loop {
            match self.peek() {
                None | Some(b'\n' | b'\r') => {
                    return TokenKind::Error;
                }
                Some(b'"') => {
                    self.advance();
                    return TokenKind::StringLiteral;
                }
                Some(b'\\') if self.peek_at(1).is_some() => {
                    self.advance_by(2);
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn scan_block_string(&mut self) -> TokenKind {
        loop {
            match self.peek() {
                None => {
                    return TokenKind::Error;
                }
                Some(b'"') if self.peek_at(1) == Some(b'"') && self.peek_at(2) == Some(b'"') => {
                    self.advance_by(3);
                    return TokenKind::BlockStringLiteral;
                }
                Some(b'\\')
                    if self.peek_at(1) == Some(b'"')
                        && self.peek_at(2) == Some(b'"')
                        && self.peek_at(3) == Some(b'"') =>
                {
                    self.advance_by(4);
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Interns the text at the given span.
    pub fn intern_span(&self, span: Span) -> Text {
        self.interner.intern(self.span_text(span))
    }

    /// Gets the text at the given span.
    pub fn span_text(&self, span: Span) -> &'a str {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
    }
}

/// Tokenizes the entire source.
pub fn tokenize(source: &str, interner: &Interner) -> Vec<Token> {
    let mut lexer = Lexer::new(source, interner);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token();
        let is_eof = token.is_eof();
        tokens.push(token);
        if is_eof {
            break;
        }
    }

    tokens
}

/// Decodes the raw text of a quoted string token, quotes included.
///
/// Returns the offending escape on failure.
pub fn string_value(raw: &str) -> Result<String, String> {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => return Err(format!("\\u{hex}")),
                }
            }
            Some(other) => return Err(format!("\\{other}")),
            None => return Err("\\".to_string()),
        }
    }

    Ok(out)
}

/// Decodes the raw text of a block string token, triple quotes included.
///
/// Applies the common-indentation and blank-line trimming rules of GraphQL
/// block strings.
#[must_use]
pub fn block_string_value(raw: &str) -> String {
    let inner = raw
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
        .unwrap_or(raw)
        .replace("\\\"\"\"", "\"\"\"");

    let lines: Vec<&str> = inner
        .split("\r\n")
        .flat_map(|l| l.split(['\n', '\r']))
        .collect();

    let indent_of = |line: &str| line.len() - line.trim_start_matches([' ', '\t']).len();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim_start_matches([' ', '\t']).is_empty())
        .map(|l| indent_of(l))
        .min();

    let mut trimmed: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| match common_indent {
            Some(indent) if i > 0 => line.get(indent.min(line.len())..).unwrap_or_default(),
            _ => line,
        })
        .collect();

    let is_blank = |l: &&str| l.trim_start_matches([' ', '\t']).is_empty();
    while trimmed.first().is_some_and(is_blank) {
        trimmed.remove(0);
    }
    while trimmed.last().is_some_and(is_blank) {
        trimmed.pop();
    }

    trimmed.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let interner = Interner::new();
        tokenize(source, &interner).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("{ } ( ) [ ] : ... = | & @ ! $"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Colon,
                TokenKind::Spread,
                TokenKind::Eq,
                TokenKind::Pipe,
                TokenKind::Amp,
                TokenKind::At,
                TokenKind::Bang,
                TokenKind::Dollar,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_commas_and_comments_are_trivia() {
        assert_eq!(
            kinds("a, b # trailing comment, with comma\n c"),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("type extend repeatable User"),
            vec![
                TokenKind::Type,
                TokenKind::Extend,
                TokenKind::Repeatable,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("0 -12 1.5 2e10 -0.5E-3"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("012")[0], TokenKind::Error);
        assert_eq!(kinds("1.")[0], TokenKind::Error);
        assert_eq!(kinds("3abc")[0], TokenKind::Error);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""hello" """block""""#),
            vec![
                TokenKind::StringLiteral,
                TokenKind::BlockStringLiteral,
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds("\"unterminated\n")[0], TokenKind::Error);
    }

    #[test]
    fn test_unknown_character_is_error() {
        assert_eq!(kinds("é")[0], TokenKind::Error);
    }

    #[test]
    fn test_string_value_escapes() {
        assert_eq!(string_value(r#""a\nb""#).unwrap(), "a\nb");
        assert_eq!(string_value(r#""A\"""#).unwrap(), "A\"");
        assert_eq!(string_value(r#""\q""#).unwrap_err(), "\\q");
    }

    #[test]
    fn test_block_string_value() {
        let raw = "\"\"\"\n    The user.\n\n      Indented.\n  \"\"\"";
        assert_eq!(block_string_value(raw), "The user.\n\n  Indented.");
    }
}
