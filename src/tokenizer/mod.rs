//=====================================================
// File: tokenizer/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: ChronoScript lexical analysis
// Objective: Scan source buffers into tokens on demand with two tokens of
//            lookahead, reporting malformed input into the error sink
//=====================================================

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::diagnostics::ErrorSink;
use crate::source::{SourceFile, SourceLocation};

//=====================================================
//            Section 1: Token Kinds
//=====================================================

/// All token types recognised by the ChronoScript lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Integer,
    Float,
    String,
    Identifier,

    // Keywords
    Declare,
    If,
    Else,
    ForChronon,
    WhileEvent,
    RewindFlow,
    BranchTimeline,
    MergeTimelines,
    TemporalEchoLoop,
    ParadoxHandler,
    True,
    False,
    Collapse,

    // Modifiers
    Conf,
    Reb,

    // Flags
    Static,
    Volatile,
    Anchor,
    Weaver,
    Flux,
    Echo,

    // Types
    IntType,
    FloatType,
    BooleanType,
    StringType,
    VoidType,
    ArrayType,
    MapType,
    TupleType,
    TimestampType,
    QuantumStateType,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    And,
    Or,
    Not,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    DoubleColon,

    // Temporal operators
    Arrow,
    LeftArrow,
    Query,

    // Special
    Error,
    Eof,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Integer => "INTEGER",
            TokenKind::Float => "FLOAT",
            TokenKind::String => "STRING",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Declare => "DECLARE",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::ForChronon => "FOR_CHRONON",
            TokenKind::WhileEvent => "WHILE_EVENT",
            TokenKind::RewindFlow => "REWIND_FLOW",
            TokenKind::BranchTimeline => "BRANCH_TIMELINE",
            TokenKind::MergeTimelines => "MERGE_TIMELINES",
            TokenKind::TemporalEchoLoop => "TEMPORAL_ECHO_LOOP",
            TokenKind::ParadoxHandler => "PARADOX_HANDLER",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Collapse => "COLLAPSE",
            TokenKind::Conf => "CONF",
            TokenKind::Reb => "REB",
            TokenKind::Static => "STATIC",
            TokenKind::Volatile => "VOLATILE",
            TokenKind::Anchor => "ANCHOR",
            TokenKind::Weaver => "WEAVER",
            TokenKind::Flux => "FLUX",
            TokenKind::Echo => "ECHO",
            TokenKind::IntType => "INT",
            TokenKind::FloatType => "FLOAT_TYPE",
            TokenKind::BooleanType => "BOOLEAN",
            TokenKind::StringType => "STRING_TYPE",
            TokenKind::VoidType => "VOID",
            TokenKind::ArrayType => "ARRAY",
            TokenKind::MapType => "MAP",
            TokenKind::TupleType => "TUPLE",
            TokenKind::TimestampType => "TIMESTAMP",
            TokenKind::QuantumStateType => "QUANTUM_STATE",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "STAR",
            TokenKind::Slash => "SLASH",
            TokenKind::Percent => "PERCENT",
            TokenKind::EqualEqual => "EQUAL_EQUAL",
            TokenKind::NotEqual => "BANG_EQUAL",
            TokenKind::Less => "LESS",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::Greater => "GREATER",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Equal => "EQUAL",
            TokenKind::PlusEqual => "PLUS_EQUAL",
            TokenKind::MinusEqual => "MINUS_EQUAL",
            TokenKind::StarEqual => "STAR_EQUAL",
            TokenKind::SlashEqual => "SLASH_EQUAL",
            TokenKind::PercentEqual => "PERCENT_EQUAL",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "BANG",
            TokenKind::LeftParen => "LEFT_PAREN",
            TokenKind::RightParen => "RIGHT_PAREN",
            TokenKind::LeftBrace => "LEFT_BRACE",
            TokenKind::RightBrace => "RIGHT_BRACE",
            TokenKind::LeftBracket => "LEFT_BRACKET",
            TokenKind::RightBracket => "RIGHT_BRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::Colon => "COLON",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::DoubleColon => "DOUBLE_COLON",
            TokenKind::Arrow => "ARROW",
            TokenKind::LeftArrow => "LEFT_ARROW",
            TokenKind::Query => "QUERY",
            TokenKind::Error => "ERROR",
            TokenKind::Eof => "EOF",
        }
    }

    pub fn is_temporal_op(self) -> bool {
        matches!(
            self,
            TokenKind::ForChronon
                | TokenKind::WhileEvent
                | TokenKind::RewindFlow
                | TokenKind::BranchTimeline
                | TokenKind::MergeTimelines
                | TokenKind::TemporalEchoLoop
        )
    }

    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::IntType
                | TokenKind::FloatType
                | TokenKind::BooleanType
                | TokenKind::StringType
                | TokenKind::VoidType
                | TokenKind::ArrayType
                | TokenKind::MapType
                | TokenKind::TupleType
                | TokenKind::TimestampType
                | TokenKind::QuantumStateType
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("DECLARE", TokenKind::Declare),
        ("IF", TokenKind::If),
        ("ELSE", TokenKind::Else),
        ("FOR_CHRONON", TokenKind::ForChronon),
        ("WHILE_EVENT", TokenKind::WhileEvent),
        ("REWIND_FLOW", TokenKind::RewindFlow),
        ("BRANCH_TIMELINE", TokenKind::BranchTimeline),
        ("MERGE_TIMELINES", TokenKind::MergeTimelines),
        ("TEMPORAL_ECHO_LOOP", TokenKind::TemporalEchoLoop),
        ("PARADOX_HANDLER", TokenKind::ParadoxHandler),
        ("TRUE", TokenKind::True),
        ("FALSE", TokenKind::False),
        ("COLLAPSE", TokenKind::Collapse),
        ("CONF", TokenKind::Conf),
        ("REB", TokenKind::Reb),
        ("STATIC", TokenKind::Static),
        ("VOLATILE", TokenKind::Volatile),
        ("ANCHOR", TokenKind::Anchor),
        ("WEAVER", TokenKind::Weaver),
        ("FLUX", TokenKind::Flux),
        ("ECHO", TokenKind::Echo),
        ("INT", TokenKind::IntType),
        ("FLOAT", TokenKind::FloatType),
        ("BOOLEAN", TokenKind::BooleanType),
        ("STRING", TokenKind::StringType),
        ("VOID", TokenKind::VoidType),
        ("ARRAY", TokenKind::ArrayType),
        ("MAP", TokenKind::MapType),
        ("TUPLE", TokenKind::TupleType),
        ("TIMESTAMP", TokenKind::TimestampType),
        ("QUANTUM_STATE", TokenKind::QuantumStateType),
    ])
});

/// Keyword lookup. Case-sensitive: only the upper-case spelling matches.
pub fn keyword(text: &str) -> Option<TokenKind> {
    KEYWORDS.get(text).copied()
}

//=============================================/*
//  Keyword table is built once and shared by every lexer.
//============================================*/
//=====================================================
//            Section 2: Tokens
//=====================================================

/// A token with its kind, literal text and source location.
/// String literal lexemes hold the decoded contents without quotes;
/// error token lexemes hold the diagnostic message.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            location,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' at {}", self.kind, self.lexeme, self.location)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LexError {
    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Unterminated block comment")]
    UnterminatedComment,
    #[error("Invalid number: expected digits after exponent")]
    MissingExponentDigits,
}

//=====================================================
//            Section 3: Lexer State
//=====================================================

/// On-demand scanner over a single source buffer
pub struct Lexer {
    source: Rc<SourceFile>,
    chars: Vec<char>,
    position: usize,
    offset: usize,
    line: usize,
    column: usize,
    lookahead: VecDeque<Token>,
    sink: ErrorSink,
}

struct Mark {
    line: usize,
    column: usize,
    offset: usize,
}

impl Lexer {
    pub fn new(source: Rc<SourceFile>, sink: ErrorSink) -> Self {
        let chars = source.text().chars().collect();
        Self {
            source,
            chars,
            position: 0,
            offset: 0,
            line: 1,
            column: 1,
            lookahead: VecDeque::new(),
            sink,
        }
    }

    pub fn source(&self) -> &Rc<SourceFile> {
        &self.source
    }

    pub fn sink(&self) -> &ErrorSink {
        &self.sink
    }

    //=====================================================
    //            Section 4: Token Stream
    //=====================================================

    //Function: next_token
    //Purpose: Return the next token, draining the lookahead buffer first
    //Inputs: &mut self
    //Returns: Token
    pub fn next_token(&mut self) -> Token {
        match self.lookahead.pop_front() {
            Some(token) => token,
            None => self.scan_token(),
        }
    }

    pub fn peek_token(&mut self) -> &Token {
        self.fill_lookahead(1);
        &self.lookahead[0]
    }

    pub fn peek_next_token(&mut self) -> &Token {
        self.fill_lookahead(2);
        &self.lookahead[1]
    }

    /// Drains the stream up to and including the end-of-file token.
    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn fill_lookahead(&mut self, count: usize) {
        while self.lookahead.len() < count {
            let token = self.scan_token();
            self.lookahead.push_back(token);
        }
    }

    //=============================================/*
    //  Peeked tokens are buffered, so each token is scanned exactly once.
    //============================================*/
    //=====================================================
    //            Section 5: Scanning
    //=====================================================

    fn scan_token(&mut self) -> Token {
        if let Err(err) = self.skip_trivia() {
            let mark = self.mark();
            return self.error_token(err, &mark);
        }

        let start = self.mark();
        let Some(ch) = self.current_char() else {
            return self.make_token(TokenKind::Eof, "", &start);
        };

        let scanned = if ch.is_alphabetic() || ch == '_' {
            Ok(self.scan_identifier(&start))
        } else if ch.is_ascii_digit() {
            self.scan_number(&start)
        } else if ch == '"' {
            self.scan_string(&start)
        } else {
            self.scan_operator(&start)
        };

        match scanned {
            Ok(token) => token,
            Err(err) => self.error_token(err, &start),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.current_char(), self.peek_char()) {
                (Some(ch), _) if ch.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.advance();
                    self.advance();
                    loop {
                        match (self.current_char(), self.peek_char()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => {
                                self.advance();
                            }
                            (None, _) => return Err(LexError::UnterminatedComment),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_identifier(&mut self, start: &Mark) -> Token {
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = self.text_from(start);
        let kind = keyword(&text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, text, start)
    }

    fn scan_number(&mut self, start: &Mark) -> Result<Token, LexError> {
        let mut kind = TokenKind::Integer;
        self.consume_digits();

        if self.current_char() == Some('.') && self.peek_char().is_some_and(|c| c.is_ascii_digit())
        {
            kind = TokenKind::Float;
            self.advance();
            self.consume_digits();
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            kind = TokenKind::Float;
            self.advance();
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance();
            }
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError::MissingExponentDigits);
            }
            self.consume_digits();
        }

        let text = self.text_from(start);
        Ok(self.make_token(kind, text, start))
    }

    fn consume_digits(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn scan_string(&mut self, start: &Mark) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.current_char() {
                None => return Err(LexError::UnterminatedString),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.current_char().ok_or(LexError::UnterminatedString)?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                    self.advance();
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
        Ok(self.make_token(TokenKind::String, value, start))
    }

    fn scan_operator(&mut self, start: &Mark) -> Result<Token, LexError> {
        let ch = self.advance();
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            ':' => self.pick(':', TokenKind::DoubleColon, TokenKind::Colon),
            '+' => self.pick('=', TokenKind::PlusEqual, TokenKind::Plus),
            '*' => self.pick('=', TokenKind::StarEqual, TokenKind::Star),
            '/' => self.pick('=', TokenKind::SlashEqual, TokenKind::Slash),
            '%' => self.pick('=', TokenKind::PercentEqual, TokenKind::Percent),
            '=' => self.pick('=', TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.pick('=', TokenKind::NotEqual, TokenKind::Not),
            '>' => self.pick('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '-' => {
                if self.matches('>') {
                    TokenKind::Arrow
                } else {
                    self.pick('=', TokenKind::MinusEqual, TokenKind::Minus)
                }
            }
            '<' => {
                if self.matches('-') {
                    TokenKind::LeftArrow
                } else {
                    self.pick('=', TokenKind::LessEqual, TokenKind::Less)
                }
            }
            '&' if self.matches('&') => TokenKind::And,
            '|' if self.matches('|') => TokenKind::Or,
            '?' if self.matches(':') => TokenKind::Query,
            other => return Err(LexError::UnexpectedCharacter(other)),
        };
        let text = self.text_from(start);
        Ok(self.make_token(kind, text, start))
    }

    fn pick(&mut self, next: char, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.matches(next) { matched } else { otherwise }
    }

    //=====================================================
    //            Section 6: Character Cursor
    //=====================================================

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> char {
        let Some(ch) = self.current_char() else {
            return '\0';
        };
        self.position += 1;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn text_from(&self, start: &Mark) -> String {
        self.source.text()[start.offset..self.offset].to_string()
    }

    fn location(&self, mark: &Mark) -> SourceLocation {
        SourceLocation::new(Rc::clone(&self.source), mark.line, mark.column, mark.offset)
    }

    fn make_token(&self, kind: TokenKind, lexeme: impl Into<String>, start: &Mark) -> Token {
        Token::new(kind, lexeme, self.location(start))
    }

    fn error_token(&mut self, err: LexError, start: &Mark) -> Token {
        let location = self.location(start);
        let message = err.to_string();
        tracing::debug!(%location, %message, "lexer error");
        self.sink.report_error(location.clone(), message.clone());
        Token::new(TokenKind::Error, message, location)
    }
}

//=====================================================
//            Section 7: Unit Tests
//=====================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> (Vec<Token>, ErrorSink) {
        let sink = ErrorSink::new();
        let source = Rc::new(SourceFile::from_string(input, "test.chs"));
        let tokens = Lexer::new(source, sink.clone()).tokenize_all();
        (tokens, sink)
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_declaration_tokens() {
        let expected = vec![
            TokenKind::Declare,
            TokenKind::Conf,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::IntType,
            TokenKind::DoubleColon,
            TokenKind::Static,
            TokenKind::Equal,
            TokenKind::Integer,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];
        assert_eq!(kinds("DECLARE CONF x : INT :: STATIC = 5;"), expected);
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(
            kinds("declare DECLARE Echo ECHO"),
            vec![
                TokenKind::Identifier,
                TokenKind::Declare,
                TokenKind::Identifier,
                TokenKind::Echo,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_greedy_two_character_operators() {
        assert_eq!(
            kinds(":: : -> - -= <- < <= ?: == = != ! && ||"),
            vec![
                TokenKind::DoubleColon,
                TokenKind::Colon,
                TokenKind::Arrow,
                TokenKind::Minus,
                TokenKind::MinusEqual,
                TokenKind::LeftArrow,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Query,
                TokenKind::EqualEqual,
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::Not,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let (tokens, sink) = lex("42 3.14 3.14e2 1E-3 7.");
        let summary: Vec<(TokenKind, &str)> =
            tokens.iter().map(|t| (t.kind, t.lexeme.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Integer, "42"),
                (TokenKind::Float, "3.14"),
                (TokenKind::Float, "3.14e2"),
                (TokenKind::Float, "1E-3"),
                (TokenKind::Integer, "7"),
                (TokenKind::Dot, "."),
                (TokenKind::Eof, ""),
            ]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_exponent_without_digits_is_error() {
        let (tokens, sink) = lex("2e+;");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(
            tokens[0].lexeme,
            "Invalid number: expected digits after exponent"
        );
        assert_eq!(tokens[1].kind, TokenKind::Semicolon);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_string_escapes() {
        let (tokens, _) = lex(r#""a\tb\n\"q\"""#);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "a\tb\n\"q\"");
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, sink) = lex("\"open");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].lexeme, "Unterminated string");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_lone_ampersand_and_question_mark() {
        let (tokens, sink) = lex("& ? |");
        assert_eq!(tokens[0].lexeme, "Unexpected character '&'");
        assert_eq!(tokens[1].lexeme, "Unexpected character '?'");
        assert_eq!(tokens[2].lexeme, "Unexpected character '|'");
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n/* block\n comment */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
        let (tokens, sink) = lex("a /* never closed");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_position_tracking() {
        let (tokens, _) = lex("DECLARE\n  x");
        assert_eq!((tokens[0].location.line, tokens[0].location.column), (1, 1));
        assert_eq!((tokens[1].location.line, tokens[1].location.column), (2, 3));
        assert_eq!(tokens[1].location.offset, 10);
        assert_eq!(tokens[1].to_string(), "IDENTIFIER 'x' at test.chs:2:3");
    }

    #[test]
    fn test_peek_does_not_consume() {
        let sink = ErrorSink::new();
        let source = Rc::new(SourceFile::from_string("a b c", "peek.chs"));
        let mut lexer = Lexer::new(source, sink.clone());
        assert_eq!(lexer.peek_token().lexeme, "a");
        assert_eq!(lexer.peek_next_token().lexeme, "b");
        assert_eq!(lexer.next_token().lexeme, "a");
        assert_eq!(lexer.peek_next_token().lexeme, "c");
        assert_eq!(lexer.next_token().lexeme, "b");
        assert_eq!(lexer.next_token().lexeme, "c");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_peek_reports_errors_once() {
        let sink = ErrorSink::new();
        let source = Rc::new(SourceFile::from_string("@", "peek.chs"));
        let mut lexer = Lexer::new(source, sink.clone());
        lexer.peek_token();
        lexer.peek_token();
        lexer.next_token();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_columns_agree_with_source_lookup() {
        let text = "DECLARE CONF s : STRING = \"héllo wörld\"; s;\n\"π\" + s;";
        let source = Rc::new(SourceFile::from_string(text, "unicode.chs"));
        let tokens = Lexer::new(Rc::clone(&source), ErrorSink::new()).tokenize_all();
        assert_eq!(tokens[8].lexeme, "s");
        assert_eq!(tokens[8].location.column, 42);
        for token in &tokens {
            let location = &token.location;
            assert_eq!(
                source.line_and_column(location.offset).unwrap(),
                (location.line, location.column),
                "{}",
                token
            );
        }
    }
}

//=====================================================
// End of file
//=====================================================
