//! Parser for rule expressions.
//!
//! Precedence climbing over the token stream produced by [`Lexer`].
//! From loosest to tightest: `||`, `&&`, `== !=`, `< <= > >=`, `+ -`,
//! `* / %`, then prefix `!` and `-`.

use kindle_foundation::{Error, Result, Value};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

/// Parser for expression source.
pub struct Parser<'src> {
    /// The lexer providing tokens.
    lexer: Lexer<'src>,
    /// Current token (lookahead).
    current: Token,
    /// Source text (for error messages).
    source: &'src str,
}

impl<'src> Parser<'src> {
    /// Creates a new parser for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            source,
        }
    }

    /// Parses the whole source as a single expression.
    ///
    /// # Errors
    /// Returns a parse error if the source is empty, malformed, or has
    /// trailing input after the expression.
    pub fn parse(&mut self) -> Result<Expr> {
        if self.current.kind == TokenKind::Eof {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_binary(0)?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error(&format!(
                "unexpected {} after expression",
                self.current.kind.name()
            )));
        }
        Ok(expr)
    }

    /// Parses a binary expression whose operators bind tighter than `min`.
    fn parse_binary(&mut self, min: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.binary_op() {
            if op.precedence() <= min {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(op.precedence())?;
            let span = lhs.span().to(rhs.span());
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        let start = self.current.span;
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span());
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.current.span;
        let literal = match &self.current.kind {
            TokenKind::Nil => Value::Nil,
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Int(n) => Value::Int(*n),
            TokenKind::Float(n) => Value::Float(*n),
            TokenKind::String(s) => Value::from(s.as_str()),
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                if self.current.kind == TokenKind::LParen {
                    return self.parse_call(name, span);
                }
                return Ok(Expr::Ident(name, span));
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_binary(0)?;
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::Error(msg) => return Err(self.error(msg)),
            TokenKind::Eof => return Err(self.error("unexpected end of input")),
            other => return Err(self.error(&format!("unexpected {}", other.name()))),
        };
        self.advance();
        Ok(Expr::Literal(literal, span))
    }

    /// Parses the argument list of `name(...)`; the name is already consumed.
    fn parse_call(&mut self, name: String, start: Span) -> Result<Expr> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();

        if self.current.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_binary(0)?);
                if self.current.kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let end = self.current.span;
        if self.current.kind == TokenKind::Eof {
            return Err(self.error_at(start, "unterminated argument list"));
        }
        self.expect(&TokenKind::RParen)?;

        Ok(Expr::Call {
            name,
            args,
            span: start.to(end),
        })
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        let op = match self.current.kind {
            TokenKind::OrOr => BinaryOp::Or,
            TokenKind::AndAnd => BinaryOp::And,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            _ => return None,
        };
        Some(op)
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    /// Expects the current token to be of a specific kind, then advances.
    fn expect(&mut self, expected: &TokenKind) -> Result<()> {
        if std::mem::discriminant(&self.current.kind) == std::mem::discriminant(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {}, found {}",
                expected.name(),
                self.current.kind.name()
            )))
        }
    }

    fn error(&self, message: &str) -> Error {
        self.error_at(self.current.span, message)
    }

    fn error_at(&self, span: Span, message: &str) -> Error {
        Error::parse(message, span.line, span.column, self.context_at(span))
    }

    /// Returns the source line containing `span`.
    fn context_at(&self, span: Span) -> String {
        let line_start = self.source[..span.start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.source[span.start..]
            .find('\n')
            .map_or(self.source.len(), |i| span.start + i);

        self.source[line_start..line_end].to_string()
    }
}

/// Parses expression source into an AST.
///
/// # Errors
/// Returns an error if the source cannot be parsed.
pub fn parse(source: &str) -> Result<Expr> {
    Parser::new(source).parse()
}
