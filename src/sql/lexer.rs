//! Hand-written, dialect-aware SQL tokenizer.
//!
//! The [`Lexer`] turns SQL text into a `Vec<SpannedToken>`. Each token keeps
//! the byte range it was read from so that the builder can recover the exact
//! source text of any expression. Literal bodies are kept as written; decoding
//! (escapes, hex digits, numeric precision) happens in [`super::literal`].
//!
//! Reserved words become dedicated [`Token`] variants. Command words such as
//! `KEYS` or `OPETREE` stay [`Token::Identifier`] and are matched by the
//! grammar in context, so they remain usable as column names.

use std::fmt;

use crate::error::{Error, Result};
use crate::sql::dialect::Dialect;

/// A single SQL token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // -----------------------------------------------------------------------
    // Keywords
    // -----------------------------------------------------------------------
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Create,
    Drop,
    Alter,
    Table,
    Index,
    Column,
    If,
    Exists,
    Not,
    And,
    Or,
    Is,
    Null,
    In,
    Between,
    Like,
    Escape,
    As,
    On,
    Join,
    Inner,
    Left,
    Right,
    Outer,
    Cross,
    Full,
    Order,
    By,
    Asc,
    Desc,
    Group,
    Having,
    Limit,
    Offset,
    Distinct,
    All,
    Primary,
    Key,
    Unique,
    Default,
    True,
    False,
    Use,

    // -----------------------------------------------------------------------
    // Literals (bodies as written)
    // -----------------------------------------------------------------------
    /// `42`, `3.14`, `.5`, `1e10`
    Number(String),
    /// Digits of `0x4202`.
    HexNumber(String),
    /// Digits of `X'4202'`.
    HexString(String),
    /// Content between the quotes, escapes unresolved.
    String { body: String, kind: StringKind },

    // -----------------------------------------------------------------------
    // Identifiers
    // -----------------------------------------------------------------------
    Identifier(String),
    /// `"x"`, `[x]` or `` `x` ``, delimiters removed.
    QuotedIdentifier(String),

    // -----------------------------------------------------------------------
    // Operators & punctuation
    // -----------------------------------------------------------------------
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Caret,
    Ampersand,
    Pipe,
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Dot,

    // -----------------------------------------------------------------------
    // Special
    // -----------------------------------------------------------------------
    /// `?` (numbered per batch as `?1`, `?2`, ...), `$n` or `@name`.
    Placeholder(String),
    /// End-of-input sentinel.
    Eof,
}

/// Quoting form of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// `'...'`
    Single,
    /// `"..."` (MySQL)
    Double,
    /// `N'...'` (MSSQL)
    National,
    /// `E'...'` (Postgres), always backslash-escaped.
    Escaped,
}

impl StringKind {
    pub fn quote(self) -> char {
        match self {
            StringKind::Double => '"',
            _ => '\'',
        }
    }
}

impl Token {
    /// True for words that may start or continue a name.
    pub fn is_identifier(&self) -> bool {
        matches!(self, Token::Identifier(_) | Token::QuotedIdentifier(_))
    }

    /// Case-insensitive match of an unquoted, non-reserved word.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Identifier(w) if w.eq_ignore_ascii_case(word))
    }

    pub fn keyword_text(&self) -> Option<&'static str> {
        KEYWORDS.iter().find(|(_, t)| t == self).map(|(w, _)| *w)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(word) = self.keyword_text() {
            return write!(f, "keyword {word}");
        }
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::HexNumber(h) => write!(f, "hex literal 0x{h}"),
            Token::HexString(h) => write!(f, "hex literal X'{h}'"),
            Token::String { body, kind } => write!(f, "string {q}{body}{q}", q = kind.quote()),
            Token::Identifier(name) | Token::QuotedIdentifier(name) => {
                write!(f, "identifier '{name}'")
            }
            Token::Placeholder(label) => write!(f, "placeholder {label}"),
            Token::Eof => write!(f, "end of input"),
            other => write!(f, "'{}'", punctuation_text(other)),
        }
    }
}

fn punctuation_text(token: &Token) -> &'static str {
    match token {
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::Eq => "=",
        Token::NotEq => "<>",
        Token::Lt => "<",
        Token::Gt => ">",
        Token::LtEq => "<=",
        Token::GtEq => ">=",
        Token::Caret => "^",
        Token::Ampersand => "&",
        Token::Pipe => "|",
        Token::LeftParen => "(",
        Token::RightParen => ")",
        Token::Comma => ",",
        Token::Semicolon => ";",
        Token::Dot => ".",
        _ => "?",
    }
}

// ---------------------------------------------------------------------------
// Keyword lookup
// ---------------------------------------------------------------------------

const KEYWORDS: &[(&str, Token)] = &[
    ("SELECT", Token::Select),
    ("FROM", Token::From),
    ("WHERE", Token::Where),
    ("INSERT", Token::Insert),
    ("INTO", Token::Into),
    ("VALUES", Token::Values),
    ("UPDATE", Token::Update),
    ("SET", Token::Set),
    ("DELETE", Token::Delete),
    ("CREATE", Token::Create),
    ("DROP", Token::Drop),
    ("ALTER", Token::Alter),
    ("TABLE", Token::Table),
    ("INDEX", Token::Index),
    ("COLUMN", Token::Column),
    ("IF", Token::If),
    ("EXISTS", Token::Exists),
    ("NOT", Token::Not),
    ("AND", Token::And),
    ("OR", Token::Or),
    ("IS", Token::Is),
    ("NULL", Token::Null),
    ("IN", Token::In),
    ("BETWEEN", Token::Between),
    ("LIKE", Token::Like),
    ("ESCAPE", Token::Escape),
    ("AS", Token::As),
    ("ON", Token::On),
    ("JOIN", Token::Join),
    ("INNER", Token::Inner),
    ("LEFT", Token::Left),
    ("RIGHT", Token::Right),
    ("OUTER", Token::Outer),
    ("CROSS", Token::Cross),
    ("FULL", Token::Full),
    ("ORDER", Token::Order),
    ("BY", Token::By),
    ("ASC", Token::Asc),
    ("DESC", Token::Desc),
    ("GROUP", Token::Group),
    ("HAVING", Token::Having),
    ("LIMIT", Token::Limit),
    ("OFFSET", Token::Offset),
    ("DISTINCT", Token::Distinct),
    ("ALL", Token::All),
    ("PRIMARY", Token::Primary),
    ("KEY", Token::Key),
    ("UNIQUE", Token::Unique),
    ("DEFAULT", Token::Default),
    ("TRUE", Token::True),
    ("FALSE", Token::False),
    ("USE", Token::Use),
];

fn keyword_token(word: &str) -> Option<Token> {
    KEYWORDS
        .iter()
        .find(|(w, _)| w.eq_ignore_ascii_case(word))
        .map(|(_, t)| t.clone())
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Byte range of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn slice(self, source: &str) -> &str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// 1-based line and column of a byte offset.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let prefix = source.get(..offset).unwrap_or(source);
    let line = prefix.matches('\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(nl) => prefix[nl + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, column)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// A hand-written SQL tokenizer.
///
/// Create one with [`Lexer::new`], then call [`Lexer::tokenize`] to obtain
/// the full token stream (terminated by [`Token::Eof`]).
pub struct Lexer<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
    dialect: Dialect,
    /// Backslash escapes in plain (non `E'...'`) strings.
    backslash_escapes: bool,
    /// Counter for bare `?` placeholders.
    placeholder_counter: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, dialect: Dialect) -> Self {
        Lexer {
            source,
            input: source.as_bytes(),
            pos: 0,
            dialect,
            backslash_escapes: dialect.backslash_escapes(),
            placeholder_counter: 0,
        }
    }

    pub fn with_backslash_escapes(mut self, enabled: bool) -> Self {
        self.backslash_escapes = enabled;
        self
    }

    /// Tokenize the entire input. The returned vector always ends with
    /// [`Token::Eof`].
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let start = self.pos;
            let token = self.next_token()?;
            let is_eof = token == Token::Eof;
            tokens.push(SpannedToken {
                token,
                span: Span::new(start, self.pos),
            });
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    // -- helpers ------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> Error {
        let (line, column) = line_column(self.source, offset);
        Error::syntax(message, line, column)
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.source.get(start..end).unwrap_or("").to_string()
    }

    fn is_ident_byte(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' || ch >= 0x80
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == b'\n' {
                break;
            }
        }
    }

    /// Skip one comment, returning `true` if one was consumed.
    fn skip_comment(&mut self) -> Result<bool> {
        match (self.peek(), self.peek_at(1)) {
            (Some(b'-'), Some(b'-')) => {
                self.skip_line();
                Ok(true)
            }
            (Some(b'#'), _) if self.dialect.hash_comments() => {
                self.skip_line();
                Ok(true)
            }
            (Some(b'/'), Some(b'*')) => {
                let start = self.pos;
                self.pos += 2;
                loop {
                    match self.peek() {
                        None => return Err(self.error_at(start, "unterminated block comment")),
                        Some(b'*') if self.peek_at(1) == Some(b'/') => {
                            self.pos += 2;
                            return Ok(true);
                        }
                        _ => self.pos += 1,
                    }
                }
            }
            _ => Ok(false),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if !self.skip_comment()? {
                break;
            }
        }
        Ok(())
    }

    // -- main scanner -------------------------------------------------------

    fn next_token(&mut self) -> Result<Token> {
        let ch = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };
        let next = self.peek_at(1);

        match ch {
            b'\'' => {
                let escapes = self.backslash_escapes;
                self.read_string(StringKind::Single, escapes)
            }
            b'"' if self.dialect.double_quoted_strings() => {
                let escapes = self.backslash_escapes;
                self.read_string(StringKind::Double, escapes)
            }
            b'"' => self.read_quoted_identifier(b'"'),
            b'[' if self.dialect.bracket_identifiers() => self.read_quoted_identifier(b']'),
            b'`' if self.dialect.backtick_identifiers() => self.read_quoted_identifier(b'`'),
            b'N' | b'n' if next == Some(b'\'') && self.dialect.national_strings() => {
                self.advance();
                let escapes = self.backslash_escapes;
                self.read_string(StringKind::National, escapes)
            }
            b'E' | b'e' if next == Some(b'\'') && self.dialect.escape_strings() => {
                self.advance();
                self.read_string(StringKind::Escaped, true)
            }
            b'X' | b'x' if next == Some(b'\'') && self.dialect.hex_strings() => {
                self.read_hex_string()
            }
            b'0' if matches!(next, Some(b'x') | Some(b'X')) && self.dialect.hex_numbers() => {
                self.read_hex_number()
            }
            b'0'..=b'9' => self.read_number(),
            b'.' if next.map_or(false, |c| c.is_ascii_digit()) => self.read_number(),
            b'?' => {
                self.advance();
                self.placeholder_counter += 1;
                Ok(Token::Placeholder(format!("?{}", self.placeholder_counter)))
            }
            b'$' if self.dialect.dollar_placeholders() => self.read_dollar_placeholder(),
            b'@' if self.dialect.named_placeholders() => self.read_named_placeholder(),
            c if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 => {
                Ok(self.read_identifier_or_keyword())
            }
            _ => self.read_operator(),
        }
    }

    // -- literal readers ----------------------------------------------------

    /// Read a quoted string whose opening quote is at the current position.
    fn read_string(&mut self, kind: StringKind, backslash_escapes: bool) -> Result<Token> {
        let start = self.pos;
        let quote = kind.quote() as u8;
        self.advance();
        let body_start = self.pos;
        loop {
            match self.advance() {
                None => return Err(self.error_at(start, "unterminated string literal")),
                Some(b'\\') if backslash_escapes => {
                    if self.advance().is_none() {
                        return Err(self.error_at(start, "unterminated string literal"));
                    }
                }
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(_) => {}
            }
        }
        Ok(Token::String {
            body: self.text(body_start, self.pos - 1),
            kind,
        })
    }

    fn read_hex_string(&mut self) -> Result<Token> {
        let start = self.pos;
        self.advance(); // X
        self.advance(); // '
        let digits_start = self.pos;
        loop {
            match self.advance() {
                None => return Err(self.error_at(start, "unterminated hex literal")),
                Some(b'\'') => break,
                Some(c) if c.is_ascii_hexdigit() => {}
                Some(c) => {
                    return Err(self.error_at(
                        self.pos - 1,
                        format!("invalid character '{}' in hex literal", c as char),
                    ))
                }
            }
        }
        Ok(Token::HexString(self.text(digits_start, self.pos - 1)))
    }

    fn read_hex_number(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 2; // 0x
        let digits_start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
            self.advance();
        }
        if self.pos == digits_start || self.peek().map_or(false, Self::is_ident_byte) {
            return Err(self.error_at(start, "invalid hex literal"));
        }
        Ok(Token::HexNumber(self.text(digits_start, self.pos)))
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') {
            self.advance();
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let exp_start = self.pos;
            self.advance();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.advance();
            }
            if !self.peek().map_or(false, |c| c.is_ascii_digit()) {
                return Err(self.error_at(exp_start, "expected digit after exponent"));
            }
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        Ok(Token::Number(self.text(start, self.pos)))
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while self.peek().map_or(false, Self::is_ident_byte) {
            self.advance();
        }
        let word = self.text(start, self.pos);
        keyword_token(&word).unwrap_or(Token::Identifier(word))
    }

    fn read_quoted_identifier(&mut self, close: u8) -> Result<Token> {
        let start = self.pos;
        self.advance();
        let mut name = String::new();
        let mut chunk_start = self.pos;
        loop {
            match self.advance() {
                None => return Err(self.error_at(start, "unterminated quoted identifier")),
                Some(c) if c == close => {
                    name.push_str(&self.source[chunk_start..self.pos - 1]);
                    // A doubled closing delimiter stands for itself.
                    if self.peek() == Some(close) {
                        self.advance();
                        name.push(close as char);
                        chunk_start = self.pos;
                    } else {
                        break;
                    }
                }
                Some(_) => {}
            }
        }
        if name.is_empty() {
            return Err(self.error_at(start, "empty quoted identifier"));
        }
        Ok(Token::QuotedIdentifier(name))
    }

    fn read_dollar_placeholder(&mut self) -> Result<Token> {
        let start = self.pos;
        self.advance();
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start + 1 {
            return Err(self.error_at(start, "expected parameter number after '$'"));
        }
        Ok(Token::Placeholder(self.text(start, self.pos)))
    }

    fn read_named_placeholder(&mut self) -> Result<Token> {
        let start = self.pos;
        self.advance();
        while self.peek().map_or(false, Self::is_ident_byte) {
            self.advance();
        }
        if self.pos == start + 1 {
            return Err(self.error_at(start, "expected parameter name after '@'"));
        }
        Ok(Token::Placeholder(self.text(start, self.pos)))
    }

    fn read_operator(&mut self) -> Result<Token> {
        let start = self.pos;
        let ch = match self.advance() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };
        let token = match ch {
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b'^' => Token::Caret,
            b'&' => Token::Ampersand,
            b'|' => Token::Pipe,
            b'(' => Token::LeftParen,
            b')' => Token::RightParen,
            b',' => Token::Comma,
            b';' => Token::Semicolon,
            b'.' => Token::Dot,
            b'=' => Token::Eq,
            b'!' if self.peek() == Some(b'=') => {
                self.advance();
                Token::NotEq
            }
            b'<' => match self.peek() {
                Some(b'=') => {
                    self.advance();
                    Token::LtEq
                }
                Some(b'>') => {
                    self.advance();
                    Token::NotEq
                }
                _ => Token::Lt,
            },
            b'>' => match self.peek() {
                Some(b'=') => {
                    self.advance();
                    Token::GtEq
                }
                _ => Token::Gt,
            },
            _ => {
                let shown = self.source[start..].chars().next().unwrap_or('?');
                return Err(self.error_at(start, format!("unexpected character '{shown}'")));
            }
        };
        Ok(token)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str, dialect: Dialect) -> Vec<Token> {
        Lexer::new(input, dialect)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    fn ident(name: &str) -> Token {
        Token::Identifier(name.into())
    }

    fn string(body: &str, kind: StringKind) -> Token {
        Token::String {
            body: body.into(),
            kind,
        }
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = lex("select FROM Where", Dialect::MySql);
        assert_eq!(tokens[..3], [Token::Select, Token::From, Token::Where]);
    }

    #[test]
    fn command_words_stay_identifiers() {
        let tokens = lex("EXPORT KEYS status", Dialect::MySql);
        assert_eq!(tokens[0], ident("EXPORT"));
        assert!(tokens[1].is_word("keys"));
        assert!(tokens[2].is_word("STATUS"));
    }

    #[test]
    fn identifier_quoting_per_dialect() {
        assert_eq!(
            lex("[My Col] \"x\"", Dialect::MsSql)[..2],
            [Token::QuotedIdentifier("My Col".into()), Token::QuotedIdentifier("x".into())]
        );
        assert_eq!(
            lex("`a``b` \"s\"", Dialect::MySql)[..2],
            [Token::QuotedIdentifier("a`b".into()), string("s", StringKind::Double)]
        );
        assert_eq!(lex("\"Tbl\"", Dialect::Postgres)[0], Token::QuotedIdentifier("Tbl".into()));
        assert!(Lexer::new("[x]", Dialect::Postgres).tokenize().is_err());
    }

    #[test]
    fn numbers_are_kept_as_written() {
        let tokens = lex("42 3.14 .5 1e10 2.5E-3", Dialect::MySql);
        let expected: Vec<Token> = ["42", "3.14", ".5", "1e10", "2.5E-3"]
            .iter()
            .map(|n| Token::Number(n.to_string()))
            .collect();
        assert_eq!(tokens[..5], expected[..]);
    }

    #[test]
    fn string_prefixes() {
        assert_eq!(lex("N'abc'", Dialect::MsSql)[0], string("abc", StringKind::National));
        assert_eq!(lex("E'a\\'b'", Dialect::Postgres)[0], string("a\\'b", StringKind::Escaped));
        assert_eq!(lex("'it''s'", Dialect::Postgres)[0], string("it''s", StringKind::Single));
        assert_eq!(lex("E'x'", Dialect::MySql)[0], ident("E"));
    }

    #[test]
    fn backslash_quote_does_not_terminate_mysql_strings() {
        assert_eq!(lex("'a\\'b'", Dialect::MySql)[0], string("a\\'b", StringKind::Single));
        let tokens = lex("'a\\' 'b'", Dialect::MsSql);
        assert_eq!(tokens[0], string("a\\", StringKind::Single));
        assert_eq!(tokens[1], string("b", StringKind::Single));
    }

    #[test]
    fn hex_literals() {
        assert_eq!(lex("0x4202", Dialect::MsSql)[0], Token::HexNumber("4202".into()));
        assert_eq!(lex("X'ff'", Dialect::MySql)[0], Token::HexString("ff".into()));
        assert!(Lexer::new("X'fg'", Dialect::Postgres).tokenize().is_err());
        assert!(Lexer::new("0xZZ", Dialect::MySql).tokenize().is_err());
    }

    #[test]
    fn operators() {
        let tokens = lex("+ - * / % = != <> < > <= >= ^ & |", Dialect::MySql);
        assert_eq!(
            tokens[..15],
            [
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Eq,
                Token::NotEq,
                Token::NotEq,
                Token::Lt,
                Token::Gt,
                Token::LtEq,
                Token::GtEq,
                Token::Caret,
                Token::Ampersand,
                Token::Pipe,
            ]
        );
    }

    #[test]
    fn placeholders() {
        assert_eq!(
            lex("? ?", Dialect::MySql)[..2],
            [Token::Placeholder("?1".into()), Token::Placeholder("?2".into())]
        );
        assert_eq!(lex("$3", Dialect::Postgres)[0], Token::Placeholder("$3".into()));
        assert_eq!(lex("@id", Dialect::MsSql)[0], Token::Placeholder("@id".into()));
    }

    #[test]
    fn comments() {
        let tokens = lex("SELECT -- note\n/* block */ 42 # tail", Dialect::MySql);
        assert_eq!(tokens, vec![Token::Select, Token::Number("42".into()), Token::Eof]);
        assert!(Lexer::new("SELECT # x", Dialect::MsSql).tokenize().is_err());
    }

    #[test]
    fn spans_cover_source_text() {
        let sql = "SELECT a+b FROM t";
        let tokens = Lexer::new(sql, Dialect::MySql).tokenize().unwrap();
        assert_eq!(tokens[1].span.slice(sql), "a");
        assert_eq!(tokens[1].span.join(tokens[3].span).slice(sql), "a+b");
    }

    #[test]
    fn errors_report_position() {
        let err = Lexer::new("SELECT\n  'oops", Dialect::MySql).tokenize().unwrap_err();
        assert_eq!(err, Error::syntax("unterminated string literal", 2, 3));
        let err = Lexer::new("/* never", Dialect::MySql).tokenize().unwrap_err();
        assert_eq!(err, Error::syntax("unterminated block comment", 1, 1));
    }

    #[test]
    fn non_ascii_text_survives() {
        let tokens = lex("'héllo' naïve", Dialect::Postgres);
        assert_eq!(tokens[0], string("héllo", StringKind::Single));
        assert_eq!(tokens[1], ident("naïve"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(lex("", Dialect::MsSql), vec![Token::Eof]);
    }
}
