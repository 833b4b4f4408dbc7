use super::*;

impl<'a> Parser<'a> {
    pub(super) fn parse_item(&mut self) -> Result<Item, ParseError> {
        match &self.curr_token.kind {
            TK::KwPrefix | TK::KwPostfix | TK::KwStatic | TK::KwFunc => self.parse_func_item(),
            TK::KwStruct => self.parse_type_item(false),
            TK::KwClass => self.parse_type_item(true),
            TK::KwEnum => self.parse_enum_item(),
            TK::KwProtocol => self.parse_protocol_item(),
            TK::KwVar | TK::KwLet => self.parse_var_item(false),
            TK::KwInit => self.parse_init_item(),
            _ => Err(ParseErrorKind::ExpectedDecl(self.curr_token.clone())
                .at(self.curr_token.span)),
        }
    }

    fn parse_func_item(&mut self) -> Result<Item, ParseError> {
        let marker = self.mark();
        let id = self.new_id();

        let fixity = match self.curr_token.kind {
            TK::KwPrefix => {
                self.advance();
                Fixity::Prefix
            }
            TK::KwPostfix => {
                self.advance();
                Fixity::Postfix
            }
            _ => Fixity::None,
        };
        let is_static = self.eat(&TK::KwStatic);
        self.expect(TK::KwFunc)?;

        let name = match &self.curr_token.kind {
            TK::Ident(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            TK::Operator(op) => {
                let op = op.clone();
                self.advance();
                op
            }
            _ => {
                return Err(ParseErrorKind::ExpectedIdent(self.curr_token.clone())
                    .at(self.curr_token.span));
            }
        };

        let generics = self.parse_generic_params()?;
        let params = self.parse_param_list()?;
        let ret = if self.eat(&TK::Arrow) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        let body = if self.at(&TK::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Item {
            id,
            kind: ItemKind::Func(FuncItem {
                name,
                fixity,
                is_static,
                generics,
                params,
                ret,
                body,
            }),
            span: self.close(marker),
        })
    }

    fn parse_generic_params(&mut self) -> Result<Vec<GenericParamSyntax>, ParseError> {
        if !self.at_operator("<") {
            return Ok(Vec::new());
        }
        self.advance();
        let mut params = Vec::new();
        loop {
            let marker = self.mark();
            let name = self.expect_ident()?;
            let mut bounds = Vec::new();
            if self.eat(&TK::Colon) {
                bounds.push(self.parse_type_expr()?);
            }
            params.push(GenericParamSyntax {
                name,
                bounds,
                span: self.close(marker),
            });
            if !self.eat(&TK::Comma) {
                break;
            }
        }
        self.expect_generic_close()?;
        Ok(params)
    }

    fn parse_param_list(&mut self) -> Result<Vec<ParamSyntax>, ParseError> {
        self.expect(TK::LParen)?;
        let mut params = Vec::new();
        while !self.at(&TK::RParen) {
            params.push(self.parse_param()?);
            if !self.eat(&TK::Comma) {
                break;
            }
        }
        self.expect(TK::RParen)?;
        Ok(params)
    }

    fn parse_param(&mut self) -> Result<ParamSyntax, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        let name = if self.eat(&TK::Underscore) {
            self.expect(TK::Colon)?;
            None
        } else {
            let name = self.expect_ident()?;
            self.expect(TK::Colon)?;
            Some(name)
        };
        let ty = self.parse_type_expr()?;
        let variadic = self.eat(&TK::Ellipsis);
        let has_default = if self.eat(&TK::Assign) {
            // The default value expression is recorded syntactically only;
            // the checker needs just the defaulted-ness of the element.
            let _ = self.parse_expr(0)?;
            true
        } else {
            false
        };
        Ok(ParamSyntax {
            id,
            name,
            ty,
            variadic,
            has_default,
            span: self.close(marker),
        })
    }

    fn parse_type_item(&mut self, is_class: bool) -> Result<Item, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.advance(); // struct / class
        let name = self.expect_ident()?;
        let generics = self.parse_generic_params()?;
        let inherits = self.parse_inheritance_clause()?;

        self.expect(TK::LBrace)?;
        let mut members = Vec::new();
        while !self.at(&TK::RBrace) && !self.at(&TK::Eof) {
            members.push(self.parse_item()?);
        }
        self.expect(TK::RBrace)?;

        let item = TypeItem {
            name,
            generics,
            inherits,
            members,
        };
        Ok(Item {
            id,
            kind: if is_class {
                ItemKind::Class(item)
            } else {
                ItemKind::Struct(item)
            },
            span: self.close(marker),
        })
    }

    fn parse_inheritance_clause(&mut self) -> Result<Vec<TypeExpr>, ParseError> {
        let mut inherits = Vec::new();
        if self.eat(&TK::Colon) {
            loop {
                inherits.push(self.parse_type_expr()?);
                if !self.eat(&TK::Comma) {
                    break;
                }
            }
        }
        Ok(inherits)
    }

    fn parse_enum_item(&mut self) -> Result<Item, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::KwEnum)?;
        let name = self.expect_ident()?;
        let generics = self.parse_generic_params()?;
        let inherits = self.parse_inheritance_clause()?;

        self.expect(TK::LBrace)?;
        let mut cases = Vec::new();
        let mut members = Vec::new();
        while !self.at(&TK::RBrace) && !self.at(&TK::Eof) {
            if self.at(&TK::KwCase) {
                let case_marker = self.mark();
                let case_id = self.new_id();
                self.advance();
                let case_name = self.expect_ident()?;
                let mut payload = Vec::new();
                if self.eat(&TK::LParen) {
                    while !self.at(&TK::RParen) {
                        payload.push(self.parse_type_expr()?);
                        if !self.eat(&TK::Comma) {
                            break;
                        }
                    }
                    self.expect(TK::RParen)?;
                }
                cases.push(EnumCaseSyntax {
                    id: case_id,
                    name: case_name,
                    payload,
                    span: self.close(case_marker),
                });
            } else {
                members.push(self.parse_item()?);
            }
        }
        self.expect(TK::RBrace)?;

        Ok(Item {
            id,
            kind: ItemKind::Enum(EnumItem {
                name,
                generics,
                inherits,
                cases,
                members,
            }),
            span: self.close(marker),
        })
    }

    fn parse_protocol_item(&mut self) -> Result<Item, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::KwProtocol)?;
        let name = self.expect_ident()?;
        let inherits = self.parse_inheritance_clause()?;

        self.expect(TK::LBrace)?;
        let mut members = Vec::new();
        while !self.at(&TK::RBrace) && !self.at(&TK::Eof) {
            if self.at(&TK::KwType) {
                let assoc_marker = self.mark();
                let assoc_id = self.new_id();
                self.advance();
                let assoc_name = self.expect_ident()?;
                members.push(Item {
                    id: assoc_id,
                    kind: ItemKind::AssocType(AssocTypeItem { name: assoc_name }),
                    span: self.close(assoc_marker),
                });
            } else if self.at(&TK::KwVar) || self.at(&TK::KwLet) {
                members.push(self.parse_protocol_var_req()?);
            } else {
                members.push(self.parse_item()?);
            }
        }
        self.expect(TK::RBrace)?;

        Ok(Item {
            id,
            kind: ItemKind::Protocol(ProtocolItem {
                name,
                inherits,
                members,
            }),
            span: self.close(marker),
        })
    }

    /// `var name: Type { get set }` inside a protocol body.
    fn parse_protocol_var_req(&mut self) -> Result<Item, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        let is_let = self.at(&TK::KwLet);
        self.advance();
        let pattern_marker = self.mark();
        let pattern_id = self.new_id();
        let name = self.expect_ident()?;
        let pattern = Pattern {
            id: pattern_id,
            kind: PatternKind::Name(name),
            span: self.close(pattern_marker),
        };
        self.expect(TK::Colon)?;
        let ty = self.parse_type_expr()?;

        // Accessor clause decides settability; absent clause means get-only.
        let mut settable = false;
        if self.eat(&TK::LBrace) {
            while !self.at(&TK::RBrace) && !self.at(&TK::Eof) {
                let accessor = self.expect_ident()?;
                if accessor == "set" {
                    settable = true;
                }
            }
            self.expect(TK::RBrace)?;
        }

        Ok(Item {
            id,
            kind: ItemKind::Var(VarItem {
                is_let: is_let || !settable,
                is_static: false,
                pattern,
                ty: Some(ty),
                init: None,
            }),
            span: self.close(marker),
        })
    }

    pub(super) fn parse_var_item(&mut self, is_static: bool) -> Result<Item, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        let is_let = self.at(&TK::KwLet);
        self.advance(); // var / let
        let pattern = self.parse_pattern()?;
        let ty = if self.eat(&TK::Colon) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        let init = if self.eat(&TK::Assign) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        Ok(Item {
            id,
            kind: ItemKind::Var(VarItem {
                is_let,
                is_static,
                pattern,
                ty,
                init,
            }),
            span: self.close(marker),
        })
    }

    fn parse_init_item(&mut self) -> Result<Item, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        self.expect(TK::KwInit)?;
        let params = self.parse_param_list()?;
        let body = if self.at(&TK::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Item {
            id,
            kind: ItemKind::Init(InitItem { params, body }),
            span: self.close(marker),
        })
    }

    pub(super) fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        let marker = self.mark();
        let id = self.new_id();
        let kind = match &self.curr_token.kind {
            TK::Ident(name) => {
                let name = name.clone();
                self.advance();
                PatternKind::Name(name)
            }
            TK::Underscore => {
                self.advance();
                PatternKind::Wildcard
            }
            TK::LParen => {
                self.advance();
                let mut patterns = Vec::new();
                while !self.at(&TK::RParen) {
                    patterns.push(self.parse_pattern()?);
                    if !self.eat(&TK::Comma) {
                        break;
                    }
                }
                self.expect(TK::RParen)?;
                PatternKind::Tuple(patterns)
            }
            _ => {
                return Err(ParseErrorKind::ExpectedPattern(self.curr_token.clone())
                    .at(self.curr_token.span));
            }
        };
        Ok(Pattern {
            id,
            kind,
            span: self.close(marker),
        })
    }

    pub(super) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let marker = self.mark();
        self.expect(TK::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&TK::RBrace) && !self.at(&TK::Eof) {
            stmts.push(self.parse_stmt()?);
            while self.eat(&TK::Semi) {}
        }
        self.expect(TK::RBrace)?;
        Ok(Block {
            stmts,
            span: self.close(marker),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let marker = self.mark();
        match &self.curr_token.kind {
            TK::KwVar | TK::KwLet => {
                let item = self.parse_var_item(false)?;
                let span = item.span;
                let ItemKind::Var(var) = item.kind else {
                    unreachable!("parse_var_item returns a var item");
                };
                Ok(Stmt {
                    id: item.id,
                    kind: StmtKind::Var(var),
                    span,
                })
            }
            TK::KwReturn => {
                let id = self.new_id();
                self.advance();
                let value = if self.at(&TK::RBrace) || self.at(&TK::Semi) || self.at(&TK::Eof) {
                    None
                } else {
                    Some(self.parse_expr(0)?)
                };
                Ok(Stmt {
                    id,
                    kind: StmtKind::Return(value),
                    span: self.close(marker),
                })
            }
            _ => {
                let id = self.new_id();
                let expr = self.parse_expr(0)?;
                Ok(Stmt {
                    id,
                    kind: StmtKind::Expr(expr),
                    span: self.close(marker),
                })
            }
        }
    }
}
