//=============================================
// chronoscript/parser.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: ChronoScript recursive descent parser implementation
// Objective: Transform the lexer's token stream into AST nodes consumed by
//            the interpreter, recovering from errors in panic mode
// Formatting: Zobie.format (.solvraformat)
//=============================================

//=============================================
//            Section 1: Imports
//=============================================

use std::mem;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{
    AssignOp, BinaryOp, Block, Expr, Flag, FlagSet, Literal, Modifier, Program, Stmt,
    TemporalOpKind, TypeName, TypeNode, UnaryOp, VariableDecl,
};
use crate::diagnostics::ErrorSink;
use crate::source::{SourceFile, SourceLocation};
use crate::tokenizer::{Lexer, Token, TokenKind};

//=============================================/*
//  Collects AST node types and the on-demand lexer the parser pulls from.
//============================================*/
//=============================================
//            Section 2: Parse Errors
//=============================================

/// Parser error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Expected {expected}, found '{lexeme}'")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        lexeme: String,
        location: SourceLocation,
    },
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput {
        expected: String,
        location: SourceLocation,
    },
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget { location: SourceLocation },
    #[error("{message}")]
    InvalidSyntax {
        message: String,
        location: SourceLocation,
    },
}

impl ParseError {
    pub fn location(&self) -> &SourceLocation {
        match self {
            ParseError::UnexpectedToken { location, .. }
            | ParseError::UnexpectedEndOfInput { location, .. }
            | ParseError::InvalidAssignmentTarget { location }
            | ParseError::InvalidSyntax { location, .. } => location,
        }
    }
}

/// Returned when any lexical or syntax error occurred. Carries the
/// statements that still parsed cleanly.
#[derive(Debug, Clone, Error)]
#[error("parsing failed with {} error(s)", .errors.len() + .lexical_errors)]
pub struct ParseFailure {
    pub program: Program,
    pub errors: Vec<ParseError>,
    pub lexical_errors: usize,
}

//=============================================/*
//  Errors carry locations; the sink renders them with file:line:col.
//============================================*/
//=============================================
//            Section 3: Parser State
//=============================================

const MAX_NESTING_DEPTH: usize = 64;
const MAX_ARGUMENTS: usize = 255;

/// Recursive descent parser for ChronoScript
pub struct Parser {
    lexer: Lexer,
    current: Token,
    previous: Token,
    sink: ErrorSink,
    errors: Vec<ParseError>,
    lexical_errors: usize,
    depth: usize,
    block_depth: usize,
}

impl Parser {
    //Function: new
    //Purpose: Prime the parser with the first significant token
    //Inputs: lexer: Lexer
    //Returns: Self
    pub fn new(lexer: Lexer) -> Self {
        let sink = lexer.sink().clone();
        let placeholder = Token::new(TokenKind::Eof, "", SourceLocation::unknown());
        let mut parser = Self {
            lexer,
            current: placeholder.clone(),
            previous: placeholder,
            sink,
            errors: Vec::new(),
            lexical_errors: 0,
            depth: 0,
            block_depth: 0,
        };
        parser.current = parser.next_significant();
        parser
    }

    pub fn from_source(source: Rc<SourceFile>, sink: ErrorSink) -> Self {
        Self::new(Lexer::new(source, sink))
    }

    //=============================================
    //            Section 4: Program & Declarations
    //=============================================

    /// Parse a complete ChronoScript program
    //Function: parse
    //Purpose: Consume the token stream and build the program tree
    //Inputs: &mut self
    //Returns: Result<Program, ParseFailure>
    pub fn parse(&mut self) -> Result<Program, ParseFailure> {
        let location = self.current.location.clone();
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        let program = Program::new(statements, location);
        tracing::debug!(
            statements = program.len(),
            errors = self.errors.len() + self.lexical_errors,
            "parsed program"
        );
        if self.errors.is_empty() && self.lexical_errors == 0 {
            Ok(program)
        } else {
            Err(ParseFailure {
                program,
                errors: mem::take(&mut self.errors),
                lexical_errors: mem::replace(&mut self.lexical_errors, 0),
            })
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.check(TokenKind::Declare) {
            self.variable_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                self.report(error);
                self.synchronize();
                None
            }
        }
    }

    /// DECLARE [modifier] name : type [:: flag]* [= expr] ;
    fn variable_declaration(&mut self) -> Result<Stmt, ParseError> {
        let location = self.advance().location.clone();
        let modifier = self.parse_variable_modifier();
        let name = self.consume_identifier("variable name")?;
        self.consume(TokenKind::Colon, "':' after variable name")?;
        let type_node = self.parse_type()?;

        let mut flags = FlagSet::empty();
        while self.match_kind(TokenKind::DoubleColon) {
            flags.insert(self.parse_variable_flag()?);
        }

        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "';' after variable declaration")?;

        Ok(Stmt::VariableDecl(VariableDecl {
            name,
            type_node,
            modifier,
            flags,
            initializer,
            location,
        }))
    }

    fn parse_variable_modifier(&mut self) -> Modifier {
        if self.match_kind(TokenKind::Reb) {
            Modifier::Reb
        } else {
            self.match_kind(TokenKind::Conf);
            Modifier::Conf
        }
    }

    fn parse_variable_flag(&mut self) -> Result<Flag, ParseError> {
        let flag = match self.current.kind {
            TokenKind::Static => Flag::Static,
            TokenKind::Volatile => Flag::Volatile,
            TokenKind::Anchor => Flag::Anchor,
            TokenKind::Weaver => Flag::Weaver,
            TokenKind::Flux => Flag::Flux,
            TokenKind::Echo => Flag::Echo,
            _ => return Err(self.unexpected("variable flag after '::'")),
        };
        self.advance();
        Ok(flag)
    }

    fn parse_type(&mut self) -> Result<TypeNode, ParseError> {
        let location = self.current.location.clone();
        let name = match self.current.kind {
            TokenKind::IntType => TypeName::Int,
            TokenKind::FloatType => TypeName::Float,
            TokenKind::BooleanType => TypeName::Boolean,
            TokenKind::StringType => TypeName::String,
            TokenKind::VoidType => TypeName::Void,
            TokenKind::ArrayType => TypeName::Array,
            TokenKind::MapType => TypeName::Map,
            TokenKind::TupleType => TypeName::Tuple,
            TokenKind::TimestampType => TypeName::Timestamp,
            TokenKind::QuantumStateType => TypeName::QuantumState,
            TokenKind::Identifier => TypeName::Named(self.current.lexeme.clone()),
            _ => return Err(self.unexpected("type name")),
        };
        self.advance();
        Ok(TypeNode { name, location })
    }

    //=============================================/*
    //  Declarations stamp modifiers and flags; parsing never evaluates.
    //============================================*/
    //=============================================
    //            Section 5: Statement Parsing
    //=============================================

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        self.enter_nesting()?;
        let result = match self.current.kind {
            TokenKind::If => self.if_statement(),
            TokenKind::LeftBrace => self.block().map(Stmt::Block),
            kind if kind.is_temporal_op() => self.temporal_statement(),
            _ => self.expression_statement(),
        };
        self.exit_nesting();
        result
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.advance().location.clone();
        self.consume(TokenKind::LeftParen, "'(' after IF")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after condition")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location,
        })
    }

    fn temporal_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance().clone();
        let kind = match keyword.kind {
            TokenKind::ForChronon => TemporalOpKind::ForChronon,
            TokenKind::WhileEvent => TemporalOpKind::WhileEvent,
            TokenKind::RewindFlow => TemporalOpKind::RewindFlow,
            TokenKind::BranchTimeline => TemporalOpKind::BranchTimeline,
            TokenKind::MergeTimelines => TemporalOpKind::MergeTimelines,
            TokenKind::TemporalEchoLoop => TemporalOpKind::TemporalEchoLoop,
            _ => {
                return Err(ParseError::InvalidSyntax {
                    message: format!("'{}' is not a temporal operation", keyword.lexeme),
                    location: keyword.location,
                });
            }
        };

        self.consume(TokenKind::LeftParen, &format!("'(' after {}", kind))?;
        let arguments = self.arguments()?;
        if !self.check(TokenKind::LeftBrace) {
            return Err(self.unexpected(&format!("'{{' before {} body", kind)));
        }
        let body = self.block()?;

        Ok(Stmt::TemporalOp {
            kind,
            arguments,
            body,
            location: keyword.location,
        })
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        let location = self
            .consume(TokenKind::LeftBrace, "'{' to open block")?
            .location
            .clone();
        self.block_depth += 1;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.block_depth -= 1;
        self.consume(TokenKind::RightBrace, "'}' after block")?;
        Ok(Block {
            statements,
            location,
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        let location = expr.location().clone();
        self.consume(TokenKind::Semicolon, "';' after expression")?;
        Ok(Stmt::Expression { expr, location })
    }

    //=============================================/*
    //  Handles IF, temporal operations, blocks and expression statements.
    //============================================*/
    //=============================================
    //            Section 6: Expression Parsing
    //=============================================

    fn enter_nesting(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::InvalidSyntax {
                message: format!("nesting limit of {} exceeded", MAX_NESTING_DEPTH),
                location: self.current.location.clone(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    /// Parse assignment expression: name (= | += | -= | *= | /= | %=) value
    fn assignment(&mut self) -> Result<Expr, ParseError> {
        self.enter_nesting()?;
        let result = self.assignment_inner();
        self.exit_nesting();
        result
    }

    fn assignment_inner(&mut self) -> Result<Expr, ParseError> {
        let expr = self.logical_or()?;

        let Some(operator) = self.match_assignment_op() else {
            return Ok(expr);
        };
        let value = self.assignment()?;

        match expr {
            Expr::Variable { name, location } => Ok(Expr::Assign {
                name,
                operator,
                value: Box::new(value),
                location,
            }),
            other => Err(ParseError::InvalidAssignmentTarget {
                location: other.location().clone(),
            }),
        }
    }

    fn match_assignment_op(&mut self) -> Option<AssignOp> {
        let op = match self.current.kind {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::AddAssign,
            TokenKind::MinusEqual => AssignOp::SubtractAssign,
            TokenKind::StarEqual => AssignOp::MultiplyAssign,
            TokenKind::SlashEqual => AssignOp::DivideAssign,
            TokenKind::PercentEqual => AssignOp::ModuloAssign,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.logical_and()?;
        while let Some((op, location)) = self.match_binary_op(&[TokenKind::Or]) {
            let right = self.logical_and()?;
            expr = Expr::binary(expr, op, right, location);
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while let Some((op, location)) = self.match_binary_op(&[TokenKind::And]) {
            let right = self.equality()?;
            expr = Expr::binary(expr, op, right, location);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        while let Some((op, location)) =
            self.match_binary_op(&[TokenKind::EqualEqual, TokenKind::NotEqual])
        {
            let right = self.comparison()?;
            expr = Expr::binary(expr, op, right, location);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;
        while let Some((op, location)) = self.match_binary_op(&[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]) {
            let right = self.term()?;
            expr = Expr::binary(expr, op, right, location);
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;
        while let Some((op, location)) = self.match_binary_op(&[TokenKind::Plus, TokenKind::Minus])
        {
            let right = self.factor()?;
            expr = Expr::binary(expr, op, right, location);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;
        while let Some((op, location)) =
            self.match_binary_op(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent])
        {
            let right = self.unary()?;
            expr = Expr::binary(expr, op, right, location);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let operator = match self.current.kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            _ => return self.call(),
        };
        let location = self.advance().location.clone();
        self.enter_nesting()?;
        let operand = self.unary();
        self.exit_nesting();
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand?),
            location,
        })
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.check(TokenKind::LeftParen) {
            let location = self.advance().location.clone();
            let arguments = self.arguments()?;
            expr = Expr::Call {
                callee: Box::new(expr),
                arguments,
                location,
            };
        }
        Ok(expr)
    }

    /// Comma-separated arguments after an already consumed '(' up to ')'.
    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(ParseError::InvalidSyntax {
                        message: format!("Can't have more than {} arguments", MAX_ARGUMENTS),
                        location: self.current.location.clone(),
                    });
                }
                arguments.push(self.expression()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after arguments")?;
        Ok(arguments)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let location = self.current.location.clone();
        let value = match self.current.kind {
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Integer => {
                let value = self.current.lexeme.parse::<i64>().map_err(|_| {
                    ParseError::InvalidSyntax {
                        message: format!("Integer literal out of range: {}", self.current.lexeme),
                        location: location.clone(),
                    }
                })?;
                Literal::Integer(value)
            }
            TokenKind::Float => {
                let value = self.current.lexeme.parse::<f64>().map_err(|_| {
                    ParseError::InvalidSyntax {
                        message: format!("Invalid float literal: {}", self.current.lexeme),
                        location: location.clone(),
                    }
                })?;
                Literal::Float(value)
            }
            TokenKind::String => Literal::String(self.current.lexeme.clone()),
            TokenKind::Identifier => {
                let name = self.advance().lexeme.clone();
                return Ok(Expr::Variable { name, location });
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "')' after expression")?;
                return Ok(Expr::Grouping {
                    inner: Box::new(inner),
                    location,
                });
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(Expr::Literal { value, location })
    }

    //=============================================/*
    //  Implements precedence climbing from assignment down to primary.
    //============================================*/
    //=============================================
    //            Section 7: Token Navigation
    //=============================================

    fn next_significant(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            // Already reported by the lexer.
            if token.is(TokenKind::Error) {
                self.lexical_errors += 1;
                continue;
            }
            return token;
        }
    }

    fn advance(&mut self) -> &Token {
        let next = if self.is_at_end() {
            self.current.clone()
        } else {
            self.next_significant()
        };
        self.previous = mem::replace(&mut self.current, next);
        &self.previous
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.is(kind)
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        if self.check(TokenKind::Identifier) {
            Ok(self.advance().lexeme.clone())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn match_binary_op(&mut self, kinds: &[TokenKind]) -> Option<(BinaryOp, SourceLocation)> {
        let kind = *kinds.iter().find(|kind| self.check(**kind))?;
        let op = match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Subtract,
            TokenKind::Star => BinaryOp::Multiply,
            TokenKind::Slash => BinaryOp::Divide,
            TokenKind::Percent => BinaryOp::Modulo,
            TokenKind::EqualEqual => BinaryOp::Equal,
            TokenKind::NotEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            _ => return None,
        };
        let location = self.advance().location.clone();
        Some((op, location))
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.is_at_end() {
            ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                location: self.current.location.clone(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current.kind,
                lexeme: self.current.lexeme.clone(),
                location: self.current.location.clone(),
            }
        }
    }

    //=============================================
    //            Section 8: Error Recovery
    //=============================================

    fn report(&mut self, error: ParseError) {
        tracing::debug!(error = %error, "parse error");
        self.sink
            .report_error(error.location().clone(), error.to_string());
        self.errors.push(error);
    }

    /// Discard tokens until a statement boundary. A closing brace inside a
    /// block is left for the block to consume.
    fn synchronize(&mut self) {
        let at_block_close = |parser: &Self| {
            parser.block_depth > 0 && parser.check(TokenKind::RightBrace)
        };

        if !at_block_close(self) {
            self.advance();
        }

        while !self.is_at_end() {
            if self.previous.is(TokenKind::Semicolon) || at_block_close(self) {
                return;
            }
            match self.current.kind {
                TokenKind::Declare | TokenKind::If => return,
                kind if kind.is_temporal_op() => return,
                _ => {}
            }
            self.advance();
        }
    }
}

//=============================================/*
//  Panic-mode recovery drops the broken statement and resumes at a boundary.
//============================================*/

/// Parse `text` as a script named `name`, reporting into `sink`.
pub fn parse_str(text: &str, name: &str, sink: &ErrorSink) -> Result<Program, ParseFailure> {
    let source = Rc::new(SourceFile::from_string(text, name));
    Parser::from_source(source, sink.clone()).parse()
}

//=============================================
//            Section 9: Unit Tests
//=============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Program {
        let sink = ErrorSink::new();
        let program = parse_str(text, "test.chs", &sink).expect("parse should succeed");
        assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.diagnostics());
        program
    }

    fn first_expr(program: &Program) -> &Expr {
        match &program.statements[0] {
            Stmt::Expression { expr, .. } => expr,
            other => panic!("expected expression statement, found {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse_ok("1 + 2 * 3;");
        assert_eq!(first_expr(&program).to_string(), "(+ 1 (* 2 3))");
        let program = parse_ok("!a == b && c < d || -e;");
        assert_eq!(
            first_expr(&program).to_string(),
            "(|| (&& (== (! a) b) (< c d)) (- e))"
        );
    }

    #[test]
    fn test_left_associative_terms() {
        let program = parse_ok("10 - 4 - 3;");
        assert_eq!(first_expr(&program).to_string(), "(- (- 10 4) 3)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let program = parse_ok("a = b += 2;");
        assert_eq!(first_expr(&program).to_string(), "(= a (+= b 2))");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let sink = ErrorSink::new();
        let failure = parse_str("1 + 2 = 3;", "test.chs", &sink).unwrap_err();
        assert!(matches!(
            failure.errors[0],
            ParseError::InvalidAssignmentTarget { .. }
        ));
        assert!(sink.has_errors());
    }

    #[test]
    fn test_variable_declaration() {
        let program = parse_ok("DECLARE REB x : FLOAT :: ECHO :: WEAVER :: ECHO = 1.5;");
        let Stmt::VariableDecl(decl) = &program.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.name, "x");
        assert_eq!(decl.modifier, Modifier::Reb);
        assert_eq!(decl.type_node.name, TypeName::Float);
        assert!(decl.flags.contains(Flag::Echo));
        assert!(decl.flags.contains(Flag::Weaver));
        assert_eq!(decl.flags.iter().count(), 2);
        assert!(decl.initializer.is_some());
    }

    #[test]
    fn test_modifier_defaults_to_conf() {
        let program = parse_ok("DECLARE n : Widget;");
        let Stmt::VariableDecl(decl) = &program.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.modifier, Modifier::Conf);
        assert_eq!(decl.type_node.name, TypeName::Named("Widget".to_string()));
        assert!(decl.initializer.is_none());
    }

    #[test]
    fn test_if_else_and_blocks() {
        let program = parse_ok("IF (x > 1) { y = 1; } ELSE y = 2;");
        let Stmt::If {
            then_branch,
            else_branch,
            ..
        } = &program.statements[0]
        else {
            panic!("expected if statement");
        };
        assert!(matches!(**then_branch, Stmt::Block(_)));
        assert!(matches!(
            else_branch.as_deref(),
            Some(Stmt::Expression { .. })
        ));
    }

    #[test]
    fn test_temporal_operation() {
        let program = parse_ok("FOR_CHRONON(i, 3) { total += i; }");
        let Stmt::TemporalOp {
            kind,
            arguments,
            body,
            ..
        } = &program.statements[0]
        else {
            panic!("expected temporal op");
        };
        assert_eq!(*kind, TemporalOpKind::ForChronon);
        assert_eq!(arguments.len(), 2);
        assert_eq!(body.statements.len(), 1);

        let program = parse_ok("MERGE_TIMELINES() { }");
        assert!(matches!(
            program.statements[0],
            Stmt::TemporalOp {
                kind: TemporalOpKind::MergeTimelines,
                ..
            }
        ));
    }

    #[test]
    fn test_temporal_operation_requires_block() {
        let sink = ErrorSink::new();
        let failure = parse_str("REWIND_FLOW() x;", "test.chs", &sink).unwrap_err();
        assert_eq!(failure.errors.len(), 1);
        assert!(sink.diagnostics()[0].message.contains("'{' before REWIND_FLOW body"));
    }

    #[test]
    fn test_call_arguments() {
        let program = parse_ok("print(1, \"two\", x + 3);");
        assert_eq!(
            first_expr(&program).to_string(),
            "(call print 1 \"two\" (+ x 3))"
        );
    }

    #[test]
    fn test_recovery_keeps_following_statements() {
        let mut text = String::from("DECLARE CONF : INT = 1;\n");
        for i in 0..10 {
            text.push_str(&format!("DECLARE CONF v{i} : INT = {i};\n"));
        }
        let sink = ErrorSink::new();
        let failure = parse_str(&text, "test.chs", &sink).unwrap_err();
        assert_eq!(failure.program.statements.len(), 10);
        assert_eq!(failure.errors.len(), 1);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_recovery_inside_block() {
        let sink = ErrorSink::new();
        let failure = parse_str("{ x } y = 2;", "test.chs", &sink).unwrap_err();
        assert_eq!(failure.program.statements.len(), 2);
        assert!(matches!(failure.program.statements[0], Stmt::Block(_)));
    }

    #[test]
    fn test_lexical_errors_fail_parse() {
        let sink = ErrorSink::new();
        let failure = parse_str("x = 1 @ ;", "test.chs", &sink).unwrap_err();
        assert_eq!(failure.lexical_errors, 1);
        assert!(failure.errors.is_empty());
        assert_eq!(failure.program.statements.len(), 1);
    }

    #[test]
    fn test_missing_semicolon_at_end() {
        let sink = ErrorSink::new();
        let failure = parse_str("x = 1", "test.chs", &sink).unwrap_err();
        assert!(matches!(
            failure.errors[0],
            ParseError::UnexpectedEndOfInput { .. }
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let text = format!("{}1{};", "(".repeat(100), ")".repeat(100));
        let sink = ErrorSink::new();
        let failure = parse_str(&text, "test.chs", &sink).unwrap_err();
        assert!(failure.errors[0].to_string().contains("nesting limit"));
    }

    #[test]
    fn test_block_nesting_limit() {
        let text = format!("{}x;{}", "{".repeat(200), "}".repeat(200));
        let sink = ErrorSink::new();
        let failure = parse_str(&text, "test.chs", &sink).unwrap_err();
        assert!(failure.errors[0].to_string().contains("nesting limit"));
    }

    #[test]
    fn test_integer_out_of_range() {
        let sink = ErrorSink::new();
        let failure = parse_str("99999999999999999999;", "test.chs", &sink).unwrap_err();
        assert!(failure.errors[0].to_string().contains("out of range"));
    }
}

//=============================================
// End Of chronoscript/parser.rs
//=============================================
