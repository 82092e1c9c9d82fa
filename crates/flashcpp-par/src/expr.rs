//! Expression parsing: a precedence-climbing (Pratt) parser over the full
//! C++ expression grammar - assignment, conditional, binary operators in
//! standard precedence order, unary/postfix operators, member access,
//! calls, casts, `sizeof`/`alignof`, `new`/`delete`, lambdas (§4.2, §4.4).

use flashcpp_lex::{Keyword, OperatorKind, PunctuatorKind, TokenKind};

use crate::ast::*;
use crate::Parser;

/// Binding powers for binary operators, left-to-right unless noted. Higher
/// binds tighter. Matches the standard's precedence table collapsed to the
/// operators this subset actually supports.
fn binary_binding_power(op: OperatorKind) -> Option<(u8, u8)> {
    use OperatorKind::*;
    Some(match op {
        OrOr => (1, 2),
        AndAnd => (3, 4),
        Pipe => (5, 6),
        Caret => (7, 8),
        Amp => (9, 10),
        Eq | NotEq => (11, 12),
        Lt | Gt | LtEq | GtEq | Spaceship => (13, 14),
        Shl | Shr => (15, 16),
        Plus | Minus => (17, 18),
        Star | Slash | Percent => (19, 20),
        DotStar | ArrowStar => (21, 22),
        _ => return None,
    })
}

fn is_assignment_op(op: OperatorKind) -> bool {
    use OperatorKind::*;
    matches!(op, Assign | PlusEq | MinusEq | StarEq | SlashEq | PercentEq | AmpEq | PipeEq | CaretEq | ShlEq | ShrEq)
}

impl<'a> Parser<'a> {
    /// Top-level expression entry: the comma operator.
    pub fn parse_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        let first = self.parse_assignment_expr()?;

        if !self.check_punct(PunctuatorKind::Comma) {
            return Some(first);
        }

        let mut items = vec![first];
        while self.eat_punct(PunctuatorKind::Comma) {
            items.push(self.parse_assignment_expr()?);
        }
        let span = self.span_from(span_start);
        Some(self.ast.push_expr(ExprKind::Comma(items), span))
    }

    /// Assignment-expression: right-associative, and lower precedence than
    /// the conditional operator, per the grammar `assignment-expression:
    /// conditional-expression | logical-or-expression assignment-operator
    /// initializer-clause`.
    pub(crate) fn parse_assignment_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();

        if self.check_kw(Keyword::Throw) {
            return self.parse_throw_expr();
        }

        let lhs = self.parse_conditional_expr()?;

        if let TokenKind::Operator(op) = self.peek_kind(0) {
            if is_assignment_op(op) {
                self.advance();
                let rhs = self.parse_assignment_expr()?;
                let span = self.span_from(span_start);
                return Some(self.ast.push_expr(ExprKind::Assign { op, place: lhs, value: rhs }, span));
            }
        }
        Some(lhs)
    }

    fn parse_throw_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        self.advance();
        let operand = if self.starts_expression() {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        let span = self.span_from(span_start);
        Some(self.ast.push_expr(ExprKind::Throw(operand), span))
    }

    fn starts_expression(&mut self) -> bool {
        !matches!(
            self.peek_kind(0),
            TokenKind::Punctuator(PunctuatorKind::Semi)
                | TokenKind::Punctuator(PunctuatorKind::RParen)
                | TokenKind::Punctuator(PunctuatorKind::RBrace)
                | TokenKind::Punctuator(PunctuatorKind::Comma)
                | TokenKind::Eof
        )
    }

    fn parse_conditional_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        let cond = self.parse_binary_expr(0)?;

        if self.eat_op(OperatorKind::Question) {
            let then_expr = self.parse_assignment_expr()?;
            self.expect_punct(PunctuatorKind::Colon, ":")?;
            let else_expr = self.parse_assignment_expr()?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_expr(ExprKind::Conditional { cond, then_expr, else_expr }, span));
        }
        Some(cond)
    }

    /// Precedence-climbing binary parse: keeps consuming operators whose
    /// left binding power is at least `min_bp`.
    fn parse_binary_expr(&mut self, min_bp: u8) -> Option<ExprId> {
        let span_start = self.current_span();
        let mut lhs = self.parse_unary_expr()?;

        loop {
            let op = match self.peek_kind(0) {
                TokenKind::Operator(op) => op,
                _ => break,
            };
            let Some((left_bp, right_bp)) = binary_binding_power(op) else { break };
            if left_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_binary_expr(right_bp)?;
            let span = self.span_from(span_start);
            lhs = self.ast.push_expr(ExprKind::BinaryOp { op, lhs, rhs }, span);
        }
        Some(lhs)
    }

    /// Prefix operators, `sizeof`/`alignof`, C-style casts, and `new`/`delete`.
    fn parse_unary_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();

        if let TokenKind::Operator(op @ (OperatorKind::Inc | OperatorKind::Dec)) = self.peek_kind(0) {
            self.advance();
            let operand = self.parse_unary_expr()?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_expr(ExprKind::UnaryOp { op, operand, is_postfix: false }, span));
        }
        if let TokenKind::Operator(
            op @ (OperatorKind::Plus | OperatorKind::Minus | OperatorKind::LogicalNot | OperatorKind::Tilde | OperatorKind::Star | OperatorKind::Amp),
        ) = self.peek_kind(0)
        {
            self.advance();
            let operand = self.parse_unary_expr()?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_expr(ExprKind::UnaryOp { op, operand, is_postfix: false }, span));
        }

        if self.check_kw(Keyword::Sizeof) {
            return self.parse_sizeof_expr();
        }
        if self.eat_kw(Keyword::Alignof) {
            self.expect_punct(PunctuatorKind::LParen, "(")?;
            let ty = self.parse_type_spec()?;
            self.expect_punct(PunctuatorKind::RParen, ")")?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_expr(ExprKind::Alignof(ty), span));
        }
        if self.check_kw(Keyword::New) {
            return self.parse_new_expr();
        }
        if self.eat_kw(Keyword::Delete) {
            let is_array = if self.check_punct(PunctuatorKind::LBracket) {
                self.advance();
                self.expect_punct(PunctuatorKind::RBracket, "]")?;
                true
            } else {
                false
            };
            let operand = self.parse_unary_expr()?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_expr(ExprKind::Delete { operand, is_array }, span));
        }

        if self.check_punct(PunctuatorKind::LParen) && self.looks_like_cast() {
            return self.parse_c_style_cast();
        }

        self.parse_postfix_expr()
    }

    fn parse_sizeof_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        self.advance();

        if self.eat_punct(PunctuatorKind::Ellipsis) {
            self.expect_punct(PunctuatorKind::LParen, "(")?;
            let name = self.expect_ident()?;
            self.expect_punct(PunctuatorKind::RParen, ")")?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_expr(ExprKind::SizeofPack(name), span));
        }

        if self.check_punct(PunctuatorKind::LParen) {
            let checkpoint = self.begin_trial();
            self.advance();
            if let Some(ty) = self.parse_type_spec() {
                if self.check_punct(PunctuatorKind::RParen) && self.trial_clean(&checkpoint) {
                    self.advance();
                    self.commit_trial(checkpoint);
                    let span = self.span_from(span_start);
                    return Some(self.ast.push_expr(ExprKind::Sizeof(SizeofOperand::Type(ty)), span));
                }
            }
            self.rollback_trial(checkpoint);
        }

        let operand = self.parse_unary_expr()?;
        let span = self.span_from(span_start);
        Some(self.ast.push_expr(ExprKind::Sizeof(SizeofOperand::Expr(operand)), span))
    }

    /// Distinguishing `(Type)expr` from `(expr)` requires either full name
    /// lookup or a trial parse; a trial parse of the parenthesized contents
    /// as a type specifier, rolled back if it fails or if what follows
    /// can't start a unary-expression, is the approach used here.
    fn looks_like_cast(&mut self) -> bool {
        let checkpoint = self.begin_trial();
        self.advance();
        let ok = self.parse_type_spec().is_some()
            && self.check_punct(PunctuatorKind::RParen)
            && self.trial_clean(&checkpoint);
        self.rollback_trial(checkpoint);
        ok
    }

    fn parse_c_style_cast(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        self.advance();
        let target = self.parse_type_spec()?;
        self.expect_punct(PunctuatorKind::RParen, ")")?;
        let operand = self.parse_unary_expr()?;
        let span = self.span_from(span_start);
        Some(self.ast.push_expr(ExprKind::Cast { kind: CastKind::CStyle, target, operand }, span))
    }

    fn parse_named_cast(&mut self, kind: CastKind) -> Option<ExprId> {
        let span_start = self.current_span();
        self.advance();
        self.expect_op(OperatorKind::Lt)?;
        let target = self.parse_type_spec()?;
        self.expect_op(OperatorKind::Gt)?;
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        let operand = self.parse_expr()?;
        self.expect_punct(PunctuatorKind::RParen, ")")?;
        let span = self.span_from(span_start);
        Some(self.ast.push_expr(ExprKind::Cast { kind, target, operand }, span))
    }

    fn parse_new_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        self.advance();

        let placement = if self.check_punct(PunctuatorKind::LParen) {
            self.advance();
            let args = self.parse_expr_list(PunctuatorKind::RParen)?;
            self.expect_punct(PunctuatorKind::RParen, ")")?;
            args
        } else {
            Vec::new()
        };

        let paren_type = self.check_punct(PunctuatorKind::LParen);
        if paren_type {
            self.advance();
        }
        let type_spec = self.parse_type_spec()?;
        if paren_type {
            self.expect_punct(PunctuatorKind::RParen, ")")?;
        }

        let array_size = if self.check_punct(PunctuatorKind::LBracket) {
            self.advance();
            let size = self.parse_expr();
            self.expect_punct(PunctuatorKind::RBracket, "]")?;
            size
        } else {
            None
        };

        let initializer = if self.check_punct(PunctuatorKind::LParen) {
            self.advance();
            let args = self.parse_expr_list(PunctuatorKind::RParen)?;
            self.expect_punct(PunctuatorKind::RParen, ")")?;
            args
        } else if self.check_punct(PunctuatorKind::LBrace) {
            self.advance();
            let args = self.parse_expr_list(PunctuatorKind::RBrace)?;
            self.expect_punct(PunctuatorKind::RBrace, "}")?;
            args
        } else {
            Vec::new()
        };

        let span = self.span_from(span_start);
        Some(self.ast.push_expr(
            ExprKind::New(Box::new(NewExpr { placement, type_spec, array_size, initializer })),
            span,
        ))
    }

    fn parse_expr_list(&mut self, terminator: PunctuatorKind) -> Option<Vec<ExprId>> {
        let mut items = Vec::new();
        if self.check_punct(terminator) {
            return Some(items);
        }
        loop {
            items.push(self.parse_assignment_expr()?);
            if !self.eat_punct(PunctuatorKind::Comma) {
                break;
            }
        }
        Some(items)
    }

    /// Postfix chain: calls, subscripts, member access, post-increment.
    fn parse_postfix_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        let mut expr = self.parse_primary_expr()?;

        loop {
            if self.check_punct(PunctuatorKind::LParen) {
                self.advance();
                let args = self.parse_expr_list(PunctuatorKind::RParen)?;
                self.expect_punct(PunctuatorKind::RParen, ")")?;
                let span = self.span_from(span_start);
                expr = self.ast.push_expr(ExprKind::Call { callee: expr, args }, span);
                continue;
            }
            if self.check_punct(PunctuatorKind::LBracket) {
                self.advance();
                let index = self.parse_expr()?;
                self.expect_punct(PunctuatorKind::RBracket, "]")?;
                let span = self.span_from(span_start);
                expr = self.ast.push_expr(ExprKind::ArraySubscript { base: expr, index }, span);
                continue;
            }
            if self.eat_op(OperatorKind::Dot) {
                let member = self.expect_ident()?;
                let span = self.span_from(span_start);
                expr = self.ast.push_expr(ExprKind::MemberAccess { base: expr, member, is_arrow: false }, span);
                continue;
            }
            if self.eat_op(OperatorKind::Arrow) {
                let member = self.expect_ident()?;
                let span = self.span_from(span_start);
                expr = self.ast.push_expr(ExprKind::MemberAccess { base: expr, member, is_arrow: true }, span);
                continue;
            }
            if self.eat_op(OperatorKind::DotStar) {
                let member = self.parse_unary_expr()?;
                let span = self.span_from(span_start);
                expr = self.ast.push_expr(ExprKind::PointerToMember { base: expr, member, is_arrow: false }, span);
                continue;
            }
            if self.eat_op(OperatorKind::ArrowStar) {
                let member = self.parse_unary_expr()?;
                let span = self.span_from(span_start);
                expr = self.ast.push_expr(ExprKind::PointerToMember { base: expr, member, is_arrow: true }, span);
                continue;
            }
            if let TokenKind::Operator(op @ (OperatorKind::Inc | OperatorKind::Dec)) = self.peek_kind(0) {
                self.advance();
                let span = self.span_from(span_start);
                expr = self.ast.push_expr(ExprKind::UnaryOp { op, operand: expr, is_postfix: true }, span);
                continue;
            }
            break;
        }
        Some(expr)
    }

    fn parse_primary_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();

        match self.peek_kind(0) {
            TokenKind::Numeric(lit) => {
                self.advance();
                let span = self.span_from(span_start);
                Some(self.ast.push_expr(ExprKind::NumericLiteral(lit), span))
            }
            TokenKind::Str(lit) => {
                self.advance();
                let span = self.span_from(span_start);
                Some(self.ast.push_expr(ExprKind::StringLiteral(lit), span))
            }
            TokenKind::Char(lit) => {
                self.advance();
                let span = self.span_from(span_start);
                Some(self.ast.push_expr(ExprKind::CharLiteral(lit), span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                let span = self.span_from(span_start);
                Some(self.ast.push_expr(ExprKind::BoolLiteral(true), span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                let span = self.span_from(span_start);
                Some(self.ast.push_expr(ExprKind::BoolLiteral(false), span))
            }
            TokenKind::Keyword(Keyword::Nullptr) => {
                self.advance();
                let span = self.span_from(span_start);
                Some(self.ast.push_expr(ExprKind::NullptrLiteral, span))
            }
            TokenKind::Punctuator(PunctuatorKind::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_punct(PunctuatorKind::RParen, ")")?;
                Some(inner)
            }
            TokenKind::Keyword(Keyword::StaticCast) => self.parse_named_cast(CastKind::Static),
            TokenKind::Keyword(Keyword::DynamicCast) => self.parse_named_cast(CastKind::Dynamic),
            TokenKind::Keyword(Keyword::ConstCast) => self.parse_named_cast(CastKind::Const),
            TokenKind::Keyword(Keyword::ReinterpretCast) => self.parse_named_cast(CastKind::Reinterpret),
            TokenKind::Punctuator(PunctuatorKind::LBracket) => self.parse_lambda_expr(),
            TokenKind::Identifier(_) | TokenKind::Punctuator(PunctuatorKind::ColonColon) => {
                let qid = self.parse_qualified_id()?;
                let span = self.span_from(span_start);
                if qid.segments.len() == 1 && !qid.leading_colon_colon && qid.segments[0].template_args.is_none() {
                    Some(self.ast.push_expr(ExprKind::IdentifierRef(qid.segments[0].name), span))
                } else {
                    Some(self.ast.push_expr(ExprKind::QualifiedId(qid), span))
                }
            }
            _ => {
                self.error("expected an expression");
                None
            }
        }
    }

    fn parse_lambda_expr(&mut self) -> Option<ExprId> {
        let span_start = self.current_span();
        self.expect_punct(PunctuatorKind::LBracket, "[")?;

        let mut captures = Vec::new();
        if !self.check_punct(PunctuatorKind::RBracket) {
            loop {
                captures.push(self.parse_lambda_capture()?);
                if !self.eat_punct(PunctuatorKind::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(PunctuatorKind::RBracket, "]")?;

        let mut params = Vec::new();
        if self.eat_punct(PunctuatorKind::LParen) {
            if !self.check_punct(PunctuatorKind::RParen) {
                loop {
                    let ty = self.parse_type_spec()?;
                    let name = if self.check_ident() { self.expect_ident() } else { None };
                    params.push(ParamDecl { name, ty, default: None });
                    if !self.eat_punct(PunctuatorKind::Comma) {
                        break;
                    }
                }
            }
            self.expect_punct(PunctuatorKind::RParen, ")")?;
        }

        self.eat_kw(Keyword::Mutable);

        let ret_type = if self.eat_op(OperatorKind::Arrow) { self.parse_type_spec() } else { None };

        self.expect_punct(PunctuatorKind::LBrace, "{")?;
        let body = self.parse_block_after_brace()?;

        let span = self.span_from(span_start);
        Some(self.ast.push_expr(
            ExprKind::Lambda(Box::new(LambdaExpr { captures, params, ret_type, body })),
            span,
        ))
    }

    fn parse_lambda_capture(&mut self) -> Option<LambdaCapture> {
        if self.eat_op(OperatorKind::Amp) {
            if self.check_ident() {
                let name = self.expect_ident()?;
                return Some(LambdaCapture { name: Some(name), by_ref: true, init: None });
            }
            return Some(LambdaCapture { name: None, by_ref: true, init: None });
        }
        if self.eat_op(OperatorKind::Assign) {
            return Some(LambdaCapture { name: None, by_ref: false, init: None });
        }
        if self.eat_kw(Keyword::This) {
            return Some(LambdaCapture { name: None, by_ref: false, init: None });
        }
        if self.check_ident() {
            let name = self.expect_ident()?;
            let init = if self.eat_op(OperatorKind::Assign) { self.parse_assignment_expr() } else { None };
            return Some(LambdaCapture { name: Some(name), by_ref: false, init });
        }
        self.error("expected a lambda capture");
        None
    }
}

#[cfg(test)]
mod tests {
    use flashcpp_util::{Handler, StringInterner};

    use super::*;

    fn parse_expr(src: &str) -> (Ast, bool) {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut parser = Parser::new(src, &mut handler, &mut interner);
        let _ = parser.parse_expr();
        (parser.ast, handler.has_errors())
    }

    #[test]
    fn parses_binary_precedence() {
        let (ast, errors) = parse_expr("1 + 2 * 3;");
        assert!(!errors);
        let top = ast.exprs.as_slice().last().expect("expr arena not empty");
        assert!(matches!(top.kind, ExprKind::BinaryOp { op: OperatorKind::Plus, .. }));
    }

    #[test]
    fn parses_member_call_chain() {
        let (_ast, errors) = parse_expr("a.b->c(1, 2);");
        assert!(!errors);
    }

    #[test]
    fn parses_conditional_and_assignment() {
        let (_ast, errors) = parse_expr("x = cond ? 1 : 2;");
        assert!(!errors);
    }

    #[test]
    fn parses_sizeof_type_and_expr() {
        let (_ast, errors) = parse_expr("sizeof(int);");
        assert!(!errors);
        let (_ast, errors) = parse_expr("sizeof x;");
        assert!(!errors);
    }

    #[test]
    fn parses_named_casts() {
        let (_ast, errors) = parse_expr("static_cast<int>(x);");
        assert!(!errors);
    }

    #[test]
    fn parses_new_and_delete() {
        let (_ast, errors) = parse_expr("new int(5);");
        assert!(!errors);
        let (_ast, errors) = parse_expr("delete p;");
        assert!(!errors);
    }

    #[test]
    fn parses_lambda_with_captures() {
        let (_ast, errors) = parse_expr("[&x, y](int n) -> int { return n; };");
        assert!(!errors);
    }

    #[test]
    fn unterminated_paren_reports_error() {
        let (_ast, errors) = parse_expr("(1 + 2;");
        assert!(errors);
    }
}
