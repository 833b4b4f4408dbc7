use crate::core::diag::{Position, Span};
use crate::core::lexer::{Token, TokenKind, TokenKind as TK};
use crate::core::tree::*;

mod decl;
mod errors;
mod expr;
mod type_expr;

pub use errors::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, Copy)]
struct Marker {
    pos: Position,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    curr_token: &'a Token,
    id_gen: NodeIdGen,
    // One pending `>` left over after splitting a `>>` while closing nested
    // generic argument lists.
    angle_debt: bool,
    recovered: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            curr_token: &tokens[0],
            id_gen: NodeIdGen::new(),
            angle_debt: false,
            recovered: Vec::new(),
        }
    }

    pub fn into_id_gen(self) -> NodeIdGen {
        self.id_gen
    }

    /// Diagnostics the parser recovered from without aborting (best-effort
    /// folds of non-associative operator chains).
    pub fn take_recovered(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.recovered)
    }

    pub fn parse(&mut self) -> Result<Module, ParseError> {
        let mut items = Vec::new();
        while self.curr_token.kind != TK::Eof {
            items.push(self.parse_item()?);
        }
        Ok(Module { items })
    }

    /// Parses a single expression followed by end of input; used by tests and
    /// expression-level tooling.
    pub fn parse_single_expr(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr(0)?;
        self.expect(TK::Eof)?;
        Ok(expr)
    }

    fn mark(&self) -> Marker {
        Marker {
            pos: self.curr_token.span.start,
        }
    }

    fn close(&self, marker: Marker) -> Span {
        let end = if self.pos == 0 {
            self.curr_token.span.end
        } else {
            self.tokens[self.pos - 1].span.end
        };
        Span::new(marker.pos, end)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
            self.curr_token = &self.tokens[self.pos];
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn at(&self, kind: &TK) -> bool {
        &self.curr_token.kind == kind
    }

    fn eat(&mut self, kind: &TK) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TK) -> Result<(), ParseError> {
        if self.curr_token.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(ParseErrorKind::ExpectedToken(kind, self.curr_token.clone())
                .at(self.curr_token.span))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match &self.curr_token.kind {
            TK::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseErrorKind::ExpectedIdent(self.curr_token.clone())
                .at(self.curr_token.span)),
        }
    }

    fn at_operator(&self, text: &str) -> bool {
        matches!(&self.curr_token.kind, TK::Operator(op) if op == text)
    }

    /// Consumes one closing `>` of a generic argument list, splitting a `>>`
    /// token across two nesting levels when needed.
    fn expect_generic_close(&mut self) -> Result<(), ParseError> {
        if self.angle_debt {
            self.angle_debt = false;
            return Ok(());
        }
        match &self.curr_token.kind {
            TK::Operator(op) if op == ">" => {
                self.advance();
                Ok(())
            }
            TK::Operator(op) if op == ">>" => {
                self.angle_debt = true;
                self.advance();
                Ok(())
            }
            _ => Err(
                ParseErrorKind::ExpectedGenericClose(self.curr_token.clone())
                    .at(self.curr_token.span),
            ),
        }
    }

    fn new_id(&mut self) -> NodeId {
        self.id_gen.new_id()
    }
}

#[cfg(test)]
#[path = "../../tests/t_parser.rs"]
mod tests;
