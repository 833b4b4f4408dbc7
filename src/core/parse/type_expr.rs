use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        let marker = self.mark();
        let id = self.new_id();

        let base = match &self.curr_token.kind {
            TK::Ident(name) => {
                let name = name.clone();
                self.advance();
                let mut args = Vec::new();
                if self.at_operator("<") {
                    self.advance();
                    loop {
                        args.push(self.parse_type_expr()?);
                        if !self.eat(&TK::Comma) {
                            break;
                        }
                    }
                    self.expect_generic_close()?;
                }
                TypeExpr {
                    id,
                    kind: TypeExprKind::Named { name, args },
                    span: self.close(marker),
                }
            }
            TK::KwSelfType => {
                self.advance();
                TypeExpr {
                    id,
                    kind: TypeExprKind::SelfType,
                    span: self.close(marker),
                }
            }
            TK::LParen => {
                self.advance();
                let mut elements = Vec::new();
                while !self.at(&TK::RParen) {
                    elements.push(self.parse_tuple_type_elem()?);
                    if !self.eat(&TK::Comma) {
                        break;
                    }
                }
                self.expect(TK::RParen)?;

                // Grouping parens collapse; labeled, variadic, or multi
                // element lists stay tuples.
                if elements.len() == 1 && elements[0].name.is_none() && !elements[0].variadic {
                    let inner = elements.pop().expect("one element").ty;
                    TypeExpr {
                        id,
                        kind: inner.kind,
                        span: self.close(marker),
                    }
                } else {
                    TypeExpr {
                        id,
                        kind: TypeExprKind::Tuple { elements },
                        span: self.close(marker),
                    }
                }
            }
            _ => {
                return Err(ParseErrorKind::ExpectedType(self.curr_token.clone())
                    .at(self.curr_token.span));
            }
        };

        if self.eat(&TK::Arrow) {
            let output = self.parse_type_expr()?;
            return Ok(TypeExpr {
                id: self.new_id(),
                kind: TypeExprKind::Fn {
                    input: Box::new(base),
                    output: Box::new(output),
                },
                span: self.close(marker),
            });
        }
        Ok(base)
    }

    fn parse_tuple_type_elem(&mut self) -> Result<TupleTypeExprElem, ParseError> {
        let name = if let TK::Ident(label) = &self.curr_token.kind
            && self.peek().map(|t| &t.kind) == Some(&TK::Colon)
        {
            let label = label.clone();
            self.advance();
            self.advance();
            Some(label)
        } else {
            None
        };
        let ty = self.parse_type_expr()?;
        let variadic = self.eat(&TK::Ellipsis);
        Ok(TupleTypeExprElem { name, ty, variadic })
    }
}
