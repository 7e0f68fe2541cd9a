//! Recursive descent parser for the boson build DSL.
//!
//! Precedence, loosest to tightest: ternary, `or`, `and`, relational,
//! additive, multiplicative, unary, postfix (call / subscript / method),
//! primary.

use text_size::TextRange;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{self, Token, TokenKind};

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Parser {
            source,
            tokens: lexer::lex(source),
            pos: 0,
        }
    }

    /// Parse a whole source file.
    pub fn parse(mut self) -> ParseResult<CodeBlock> {
        let start = self.peek().span;
        let statements = self.parse_statements(&[])?;
        self.expect(TokenKind::Eof)?;
        let span = cover(start, self.previous_span());
        Ok(CodeBlock { statements, span })
    }

    // Statements

    /// Parse statements until EOF or one of the given closing keywords.
    fn parse_statements(&mut self, until: &[TokenKind]) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            while self.eat(TokenKind::Newline) {}
            let kind = self.peek().kind;
            if kind == TokenKind::Eof || until.contains(&kind) {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
            if !matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof) {
                return Err(self.unexpected("newline"));
            }
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Break => {
                let span = self.advance().span;
                Ok(Stmt::Break(span))
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                Ok(Stmt::Continue(span))
            }
            _ => self.parse_assignment_or_expression(),
        }
    }

    fn parse_assignment_or_expression(&mut self) -> ParseResult<Stmt> {
        let lhs = self.parse_expression()?;
        let op = match self.peek().kind {
            TokenKind::Equal => AssignOp::Equal,
            TokenKind::PlusEqual => AssignOp::AddEquals,
            TokenKind::MinusEqual => AssignOp::SubEquals,
            TokenKind::StarEqual => AssignOp::MulEquals,
            TokenKind::SlashEqual => AssignOp::DivEquals,
            TokenKind::PercentEqual => AssignOp::ModEquals,
            _ => {
                let span = lhs.span();
                return Ok(Stmt::Expression(ExprStmt { value: lhs, span }));
            }
        };
        self.advance();
        let rhs = self.parse_expression()?;
        let span = cover(lhs.span(), rhs.span());
        Ok(Stmt::Assignment(AssignmentStmt { lhs, op, rhs, span }))
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::If)?.span;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Newline)?;

        let stop = [
            TokenKind::Elif,
            TokenKind::Else,
            TokenKind::Endif,
        ];
        let ifblock = ConditionedBlock {
            condition,
            block: self.parse_block(&stop)?,
        };

        let mut efblock = Vec::new();
        while self.eat(TokenKind::Elif) {
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Newline)?;
            efblock.push(ConditionedBlock {
                condition,
                block: self.parse_block(&stop)?,
            });
        }

        let eblock = if self.eat(TokenKind::Else) {
            self.expect(TokenKind::Newline)?;
            Some(self.parse_block(&[TokenKind::Endif])?)
        } else {
            None
        };

        let end = self.expect(TokenKind::Endif)?.span;
        Ok(Stmt::If(IfStatement {
            ifblock,
            efblock,
            eblock,
            span: cover(start, end),
        }))
    }

    fn parse_foreach(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(TokenKind::Foreach)?.span;
        let mut ids = vec![self.parse_identifier()?];
        while self.eat(TokenKind::Comma) {
            ids.push(self.parse_identifier()?);
        }
        self.expect(TokenKind::Colon)?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::Newline)?;
        let block = self.parse_block(&[TokenKind::Endforeach])?;
        let end = self.expect(TokenKind::Endforeach)?.span;
        Ok(Stmt::Foreach(ForeachStatement {
            ids,
            iterable,
            block,
            span: cover(start, end),
        }))
    }

    fn parse_block(&mut self, until: &[TokenKind]) -> ParseResult<CodeBlock> {
        let start = self.peek().span;
        let statements = self.parse_statements(until)?;
        Ok(CodeBlock {
            statements,
            span: cover(start, self.previous_span()),
        })
    }

    // Expressions

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> ParseResult<Expr> {
        let condition = self.parse_or()?;
        if !self.eat(TokenKind::Question) {
            return Ok(condition);
        }
        let if_true = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let if_false = self.parse_expression()?;
        let span = cover(condition.span(), if_false.span());
        Ok(Expr::Ternary(Ternary {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            span,
        }))
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = relational(lhs, RelationalOp::Or, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_relational()?;
        while self.eat(TokenKind::And) {
            let rhs = self.parse_relational()?;
            lhs = relational(lhs, RelationalOp::And, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_additive()?;
        let op = match self.peek().kind {
            TokenKind::EqualEqual => RelationalOp::Eq,
            TokenKind::NotEqual => RelationalOp::Ne,
            TokenKind::Less => RelationalOp::Lt,
            TokenKind::LessEqual => RelationalOp::Le,
            TokenKind::Greater => RelationalOp::Gt,
            TokenKind::GreaterEqual => RelationalOp::Ge,
            TokenKind::In => RelationalOp::In,
            TokenKind::Not if self.peek_next().kind == TokenKind::In => RelationalOp::NotIn,
            _ => return Ok(lhs),
        };
        self.advance();
        if op == RelationalOp::NotIn {
            self.advance();
        }
        let rhs = self.parse_additive()?;
        Ok(relational(lhs, op, rhs))
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => AddOp::Add,
                TokenKind::Minus => AddOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let span = cover(lhs.span(), rhs.span());
            lhs = Expr::Additive(AdditiveExpression {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                span,
            });
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => MulOp::Mul,
                TokenKind::Slash => MulOp::Div,
                TokenKind::Percent => MulOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            let span = cover(lhs.span(), rhs.span());
            lhs = Expr::Multiplicative(MultiplicativeExpression {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                span,
            });
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let start = self.advance().span;
        let rhs = self.parse_unary()?;
        let span = cover(start, rhs.span());
        Ok(Expr::Unary(UnaryExpression {
            op,
            rhs: Box::new(rhs),
            span,
        }))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LeftParen => {
                    self.advance();
                    let args = self.parse_arguments()?;
                    let end = self.expect(TokenKind::RightParen)?.span;
                    let span = cover(expr.span(), end);
                    expr = Expr::FunctionCall(FunctionCall {
                        held: Box::new(expr),
                        args,
                        span,
                    });
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let end = self.expect(TokenKind::RightBracket)?.span;
                    let span = cover(expr.span(), end);
                    expr = Expr::Subscript(Subscript {
                        holder: Box::new(expr),
                        index: Box::new(index),
                        span,
                    });
                }
                TokenKind::Dot => {
                    self.advance();
                    let held = self.parse_method_call()?;
                    let span = cover(expr.span(), held.span());
                    expr = Expr::GetAttribute(GetAttribute {
                        holder: Box::new(expr),
                        held: Box::new(held),
                        span,
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    /// The right hand side of `.` is always a method call.
    fn parse_method_call(&mut self) -> ParseResult<Expr> {
        let name = self.parse_identifier()?;
        self.expect(TokenKind::LeftParen)?;
        let args = self.parse_arguments()?;
        let end = self.expect(TokenKind::RightParen)?.span;
        let span = cover(name.span, end);
        Ok(Expr::FunctionCall(FunctionCall {
            held: Box::new(Expr::Identifier(name)),
            args,
            span,
        }))
    }

    fn parse_arguments(&mut self) -> ParseResult<Arguments> {
        let mut args = Arguments::default();
        while self.peek().kind != TokenKind::RightParen {
            // `name : value` is a keyword argument, anything else positional
            if self.peek().kind == TokenKind::Ident && self.peek_next().kind == TokenKind::Colon {
                let name = self.parse_identifier()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression()?;
                args.keyword.push((name, value));
            } else {
                args.positional.push(self.parse_expression()?);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek();
        match token.kind {
            TokenKind::String => {
                self.advance();
                let raw = self.text(token);
                Ok(Expr::String(StringLit {
                    value: lexer::unescape(&raw[1..raw.len() - 1]),
                    span: token.span,
                }))
            }
            TokenKind::Number => {
                self.advance();
                Ok(Expr::Number(NumberLit {
                    value: self.parse_number(token)?,
                    span: token.span,
                }))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::Boolean(BooleanLit {
                    value: token.kind == TokenKind::True,
                    span: token.span,
                }))
            }
            TokenKind::Ident => {
                self.advance();
                Ok(Expr::Identifier(Identifier {
                    value: self.text(token).to_owned(),
                    span: token.span,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::LeftBracket => {
                let start = self.advance().span;
                let mut elements = Vec::new();
                while self.peek().kind != TokenKind::RightBracket {
                    elements.push(self.parse_expression()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RightBracket)?.span;
                Ok(Expr::Array(ArrayExpr {
                    elements,
                    span: cover(start, end),
                }))
            }
            TokenKind::LeftBrace => {
                let start = self.advance().span;
                let mut elements = Vec::new();
                while self.peek().kind != TokenKind::RightBrace {
                    let key = self.parse_expression()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expression()?;
                    elements.push((key, value));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(TokenKind::RightBrace)?.span;
                Ok(Expr::Dict(DictExpr {
                    elements,
                    span: cover(start, end),
                }))
            }
            TokenKind::Error => Err(ParseError::InvalidToken { span: token.span }),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_identifier(&mut self) -> ParseResult<Identifier> {
        let token = self.expect(TokenKind::Ident)?;
        Ok(Identifier {
            value: self.text(token).to_owned(),
            span: token.span,
        })
    }

    fn parse_number(&self, token: Token) -> ParseResult<i64> {
        let text = self.text(token);
        let parsed = match text.as_bytes() {
            [b'0', b'x' | b'X', ..] => i64::from_str_radix(&text[2..], 16),
            [b'0', b'o' | b'O', ..] => i64::from_str_radix(&text[2..], 8),
            [b'0', b'b' | b'B', ..] => i64::from_str_radix(&text[2..], 2),
            _ => text.parse(),
        };
        parsed.map_err(|_| ParseError::NumberOutOfRange { span: token.span })
    }

    // Token plumbing

    fn peek(&self) -> Token {
        self.tokens[self.pos]
    }

    fn peek_next(&self) -> Token {
        self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            expected: expected.to_owned(),
            found: token.kind.describe().to_owned(),
            span: token.span,
        }
    }

    fn text(&self, token: Token) -> &'src str {
        &self.source[token.span]
    }

    fn previous_span(&self) -> TextRange {
        self.tokens[self.pos.saturating_sub(1)].span
    }
}

fn relational(lhs: Expr, op: RelationalOp, rhs: Expr) -> Expr {
    let span = cover(lhs.span(), rhs.span());
    Expr::Relational(Relational {
        lhs: Box::new(lhs),
        op,
        rhs: Box::new(rhs),
        span,
    })
}

fn cover(a: TextRange, b: TextRange) -> TextRange {
    a.cover(b)
}

/// Convenience entry point: lex and parse a source file.
pub fn parse(source: &str) -> ParseResult<CodeBlock> {
    Parser::new(source).parse()
}
