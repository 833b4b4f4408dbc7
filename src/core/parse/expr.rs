use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    None,
}

/// Binding power and associativity for infix operators. Unknown operator
/// spellings get a default so user-defined operators still parse.
fn binding_power(op: &str) -> (u8, Assoc) {
    match op {
        "*" | "/" | "%" => (150, Assoc::Left),
        "+" | "-" => (140, Assoc::Left),
        "==" | "!=" | "<" | "<=" | ">" | ">=" => (130, Assoc::None),
        "&&" => (120, Assoc::Left),
        "||" => (110, Assoc::Left),
        _ => (100, Assoc::Left),
    }
}

impl<'a> Parser<'a> {
    /// Expression parsing (Pratt parsing for operator precedence).
    pub(super) fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let mut lhs = self.parse_prefix()?;
        let mut last_nonassoc_bp: Option<u8> = None;
        let mut last_op: Option<String> = None;

        loop {
            let TK::Operator(op) = &self.curr_token.kind else {
                break;
            };
            let op = op.clone();
            let (bp, assoc) = binding_power(&op);
            if bp < min_bp {
                break;
            }

            // Adjacent non-associative operators at the same precedence:
            // diagnose, then fold the first two operands and keep going.
            if assoc == Assoc::None && last_nonassoc_bp == Some(bp) {
                self.recovered.push(
                    ParseErrorKind::NonAssociativeOperators(
                        last_op.clone().unwrap_or_default(),
                        op.clone(),
                    )
                    .at(self.curr_token.span),
                );
            }
            last_nonassoc_bp = (assoc == Assoc::None).then_some(bp);
            last_op = Some(op.clone());

            let op_span = self.curr_token.span;
            self.advance();
            let rhs = self.parse_expr(bp + 1)?;

            let callee = Expr {
                id: self.new_id(),
                kind: ExprKind::OperatorRef {
                    name: op,
                    fixity: Fixity::None,
                },
                span: op_span,
            };
            let arg = Expr {
                id: self.new_id(),
                kind: ExprKind::Tuple {
                    elements: vec![
                        TupleExprElem {
                            name: None,
                            expr: lhs,
                        },
                        TupleExprElem {
                            name: None,
                            expr: rhs,
                        },
                    ],
                },
                span: self.close(marker),
            };
            lhs = Expr {
                id: self.new_id(),
                kind: ExprKind::Call {
                    callee: Box::new(callee),
                    arg: Box::new(arg),
                },
                span: self.close(marker),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        if let TK::Operator(op) = &self.curr_token.kind {
            let op = op.clone();
            let op_span = self.curr_token.span;
            self.advance();

            // `&x` is address-of, not an ordinary prefix operator.
            if op == "&" {
                let operand = self.parse_prefix()?;
                return Ok(Expr {
                    id: self.new_id(),
                    kind: ExprKind::AddressOf {
                        expr: Box::new(operand),
                    },
                    span: self.close(marker),
                });
            }

            let operand = self.parse_prefix()?;
            let callee = Expr {
                id: self.new_id(),
                kind: ExprKind::OperatorRef {
                    name: op,
                    fixity: Fixity::Prefix,
                },
                span: op_span,
            };
            let arg = Expr {
                id: self.new_id(),
                kind: ExprKind::Tuple {
                    elements: vec![TupleExprElem {
                        name: None,
                        expr: operand,
                    }],
                },
                span: self.close(marker),
            };
            return Ok(Expr {
                id: self.new_id(),
                kind: ExprKind::Call {
                    callee: Box::new(callee),
                    arg: Box::new(arg),
                },
                span: self.close(marker),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let mut expr = self.parse_primary()?;
        loop {
            match &self.curr_token.kind {
                TK::Dot => {
                    self.advance();
                    let name = match &self.curr_token.kind {
                        TK::Ident(name) => {
                            let name = name.clone();
                            self.advance();
                            name
                        }
                        // `.0` style tuple element projection.
                        TK::IntLit(index) => {
                            let name = index.to_string();
                            self.advance();
                            name
                        }
                        _ => {
                            return Err(ParseErrorKind::ExpectedIdent(self.curr_token.clone())
                                .at(self.curr_token.span));
                        }
                    };
                    expr = Expr {
                        id: self.new_id(),
                        kind: ExprKind::Member {
                            base: Box::new(expr),
                            name,
                        },
                        span: self.close(marker),
                    };
                }
                TK::LParen => {
                    let arg = self.parse_call_args()?;
                    expr = Expr {
                        id: self.new_id(),
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            arg: Box::new(arg),
                        },
                        span: self.close(marker),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `( (label ':')? expr, ... )` as a tuple expression.
    fn parse_call_args(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::LParen)?;
        let mut elements = Vec::new();
        while !self.at(&TK::RParen) {
            elements.push(self.parse_tuple_elem()?);
            if !self.eat(&TK::Comma) {
                break;
            }
        }
        self.expect(TK::RParen)?;
        Ok(Expr {
            id,
            kind: ExprKind::Tuple { elements },
            span: self.close(marker),
        })
    }

    fn parse_tuple_elem(&mut self) -> Result<TupleExprElem, ParseError> {
        if let TK::Ident(label) = &self.curr_token.kind
            && self.peek().map(|t| &t.kind) == Some(&TK::Colon)
        {
            let label = label.clone();
            self.advance();
            self.advance();
            let expr = self.parse_expr(0)?;
            return Ok(TupleExprElem {
                name: Some(label),
                expr,
            });
        }
        let expr = self.parse_expr(0)?;
        Ok(TupleExprElem { name: None, expr })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        let kind = match &self.curr_token.kind {
            TK::IntLit(value) => {
                let value = *value;
                self.advance();
                ExprKind::IntLit(value)
            }
            TK::FloatLit(value) => {
                let value = *value;
                self.advance();
                ExprKind::FloatLit(value)
            }
            TK::BoolLit(value) => {
                let value = *value;
                self.advance();
                ExprKind::BoolLit(value)
            }
            TK::StringLit(text) => {
                let text = text.clone();
                self.advance();
                ExprKind::StringLit(text)
            }
            TK::Ident(name) => {
                let name = name.clone();
                self.advance();
                ExprKind::Name { name }
            }
            TK::KwSelfValue => {
                self.advance();
                ExprKind::SelfValue
            }
            TK::KwIf => return self.parse_if_expr(),
            TK::LParen => return self.parse_paren_or_tuple(),
            TK::LBracket => return self.parse_collection_literal(),
            TK::LBrace => return self.parse_closure(),
            _ => {
                return Err(ParseErrorKind::ExpectedPrimary(self.curr_token.clone())
                    .at(self.curr_token.span));
            }
        };
        Ok(Expr {
            id,
            kind,
            span: self.close(marker),
        })
    }

    fn parse_if_expr(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::KwIf)?;
        let cond = self.parse_expr(0)?;
        self.expect(TK::LBrace)?;
        let then_expr = self.parse_expr(0)?;
        self.expect(TK::RBrace)?;
        self.expect(TK::KwElse)?;
        let else_expr = if self.at(&TK::KwIf) {
            self.parse_if_expr()?
        } else {
            self.expect(TK::LBrace)?;
            let expr = self.parse_expr(0)?;
            self.expect(TK::RBrace)?;
            expr
        };
        Ok(Expr {
            id,
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span: self.close(marker),
        })
    }

    fn parse_paren_or_tuple(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::LParen)?;
        let mut elements = Vec::new();
        while !self.at(&TK::RParen) {
            elements.push(self.parse_tuple_elem()?);
            if !self.eat(&TK::Comma) {
                break;
            }
        }
        self.expect(TK::RParen)?;

        // A single unlabeled element is grouping, not a tuple.
        if elements.len() == 1 && elements[0].name.is_none() {
            let inner = elements.pop().expect("one element").expr;
            return Ok(Expr {
                id,
                kind: ExprKind::Paren(Box::new(inner)),
                span: self.close(marker),
            });
        }
        Ok(Expr {
            id,
            kind: ExprKind::Tuple { elements },
            span: self.close(marker),
        })
    }

    fn parse_collection_literal(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::LBracket)?;

        // `[:]` is the empty dictionary literal.
        if self.at(&TK::Colon) {
            self.advance();
            self.expect(TK::RBracket)?;
            return Ok(Expr {
                id,
                kind: ExprKind::DictLit {
                    entries: Vec::new(),
                },
                span: self.close(marker),
            });
        }
        if self.eat(&TK::RBracket) {
            return Ok(Expr {
                id,
                kind: ExprKind::ArrayLit {
                    elements: Vec::new(),
                },
                span: self.close(marker),
            });
        }

        let first = self.parse_expr(0)?;
        if self.eat(&TK::Colon) {
            let first_value = self.parse_expr(0)?;
            let mut entries = vec![DictEntry {
                key: first,
                value: first_value,
            }];
            while self.eat(&TK::Comma) {
                let key = self.parse_expr(0)?;
                self.expect(TK::Colon)?;
                let value = self.parse_expr(0)?;
                entries.push(DictEntry { key, value });
            }
            self.expect(TK::RBracket)?;
            return Ok(Expr {
                id,
                kind: ExprKind::DictLit { entries },
                span: self.close(marker),
            });
        }

        let mut elements = vec![first];
        while self.eat(&TK::Comma) {
            elements.push(self.parse_expr(0)?);
        }
        self.expect(TK::RBracket)?;
        Ok(Expr {
            id,
            kind: ExprKind::ArrayLit { elements },
            span: self.close(marker),
        })
    }

    /// `{ params in expr }` or `{ expr }` for a parameterless closure.
    fn parse_closure(&mut self) -> Result<Expr, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::LBrace)?;

        let saved_pos = self.pos;
        let params = match self.try_parse_closure_params() {
            Some(params) => params,
            None => {
                self.pos = saved_pos;
                self.curr_token = &self.tokens[self.pos];
                Vec::new()
            }
        };

        let body = self.parse_expr(0)?;
        self.expect(TK::RBrace)?;
        Ok(Expr {
            id,
            kind: ExprKind::Closure {
                params,
                body: Box::new(body),
            },
            span: self.close(marker),
        })
    }

    /// Attempts `ident (':' type)? (',' ident (':' type)?)* 'in'`; returns
    /// `None` (without consuming) when the brace body is not parameterized.
    fn try_parse_closure_params(&mut self) -> Option<Vec<ClosureParamSyntax>> {
        let mut params = Vec::new();
        loop {
            let marker = self.mark();
            let id = self.new_id();
            let TK::Ident(name) = &self.curr_token.kind else {
                return None;
            };
            let name = name.clone();
            self.advance();
            let ty = if self.eat(&TK::Colon) {
                Some(self.parse_type_expr().ok()?)
            } else {
                None
            };
            params.push(ClosureParamSyntax {
                id,
                name,
                ty,
                span: self.close(marker),
            });
            if self.eat(&TK::Comma) {
                continue;
            }
            if self.eat(&TK::KwIn) {
                return Some(params);
            }
            return None;
        }
    }
}
