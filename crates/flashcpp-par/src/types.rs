//! Type-specifier parsing: builtins, cv-qualifiers, pointer/reference/array/
//! function compounds, and qualified/template-id named types (§4.2, §4.4).

use flashcpp_lex::{Keyword, PunctuatorKind};

use crate::ast::*;
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parses a full type-specifier: cv-qualifiers, a base type, then any
    /// run of `*`/`&`/`&&` declarator operators applied left to right.
    pub fn parse_type_spec(&mut self) -> Option<TypeSpecId> {
        let span_start = self.current_span();
        let cv = self.parse_cv_qualifiers();

        let mut id = self.parse_base_type_spec()?;
        if cv.is_const || cv.is_volatile {
            let node = &mut self.ast.type_specs[id];
            node.cv.is_const |= cv.is_const;
            node.cv.is_volatile |= cv.is_volatile;
        }

        loop {
            // Trailing cv-qualifiers are also legal directly on the base
            // type (`int const`), handled by re-checking here.
            let trailing = self.parse_cv_qualifiers();
            if trailing.is_const || trailing.is_volatile {
                let node = &mut self.ast.type_specs[id];
                node.cv.is_const |= trailing.is_const;
                node.cv.is_volatile |= trailing.is_volatile;
                continue;
            }

            if self.eat_op(flashcpp_lex::OperatorKind::Star) {
                let span = self.span_from(span_start);
                id = self.ast.push_type_spec(TypeSpecKind::Pointer(id), span);
                continue;
            }
            if self.eat_op(flashcpp_lex::OperatorKind::AndAnd) {
                let span = self.span_from(span_start);
                id = self.ast.push_type_spec(
                    TypeSpecKind::Reference { target: id, is_rvalue: true },
                    span,
                );
                continue;
            }
            if self.eat_op(flashcpp_lex::OperatorKind::Amp) {
                let span = self.span_from(span_start);
                id = self.ast.push_type_spec(
                    TypeSpecKind::Reference { target: id, is_rvalue: false },
                    span,
                );
                continue;
            }
            break;
        }

        // Array suffix: `T[N]` / `T[]`.
        while self.check_punct(PunctuatorKind::LBracket) {
            self.advance();
            let size = if self.check_punct(PunctuatorKind::RBracket) {
                None
            } else {
                self.parse_expr()
            };
            self.expect_punct(PunctuatorKind::RBracket, "]")?;
            let span = self.span_from(span_start);
            id = self.ast.push_type_spec(TypeSpecKind::Array { element: id, size }, span);
        }

        Some(id)
    }

    pub(crate) fn parse_cv_qualifiers(&mut self) -> CvQualifiers {
        let mut cv = CvQualifiers::default();
        loop {
            if self.eat_kw(Keyword::Const) {
                cv.is_const = true;
            } else if self.eat_kw(Keyword::Volatile) {
                cv.is_volatile = true;
            } else {
                break;
            }
        }
        cv
    }

    fn parse_base_type_spec(&mut self) -> Option<TypeSpecId> {
        let span_start = self.current_span();

        if self.eat_kw(Keyword::Auto) {
            let span = self.span_from(span_start);
            return Some(self.ast.push_type_spec(TypeSpecKind::Auto, span));
        }
        if self.eat_kw(Keyword::Void) {
            let span = self.span_from(span_start);
            return Some(self.ast.push_type_spec(TypeSpecKind::Void, span));
        }

        if let Some(builtin) = self.try_parse_builtin_sequence() {
            let span = self.span_from(span_start);
            return Some(self.ast.push_type_spec(TypeSpecKind::Builtin(builtin), span));
        }

        // Function-type parenthesized parameter list used for named
        // function types (`int (int, int)`), mostly seen via typedefs and
        // trailing-return-type contexts.
        if self.check_ident() || self.check_punct(PunctuatorKind::ColonColon) {
            let qid = self.parse_qualified_id()?;
            if let Some(last) = qid.segments.last() {
                if let Some(args) = last.template_args.clone() {
                    let span = self.span_from(span_start);
                    return Some(
                        self.ast.push_type_spec(TypeSpecKind::TemplateId { name: qid, args }, span),
                    );
                }
            }
            let span = self.span_from(span_start);
            return Some(self.ast.push_type_spec(TypeSpecKind::Named(qid), span));
        }

        self.error("expected a type specifier");
        None
    }

    /// Greedily consumes the fundamental-type keyword sequence (`unsigned
    /// long long int`, `signed char`, `long double`, ...) and maps it to a
    /// single [`BuiltinKind`], the way the standard's grammar collapses
    /// these specifier sequences into one type.
    fn try_parse_builtin_sequence(&mut self) -> Option<BuiltinKind> {
        let mut signed = false;
        let mut unsigned = false;
        let mut longs: u32 = 0;
        let mut short = false;
        let mut saw_int = false;
        let mut base: Option<BuiltinKind> = None;

        loop {
            if self.eat_kw(Keyword::Signed) {
                signed = true;
            } else if self.eat_kw(Keyword::Unsigned) {
                unsigned = true;
            } else if self.eat_kw(Keyword::Short) {
                short = true;
            } else if self.eat_kw(Keyword::Long) {
                longs += 1;
            } else if self.eat_kw(Keyword::Int) {
                saw_int = true;
            } else if self.eat_kw(Keyword::Bool) {
                base = Some(BuiltinKind::Bool);
                break;
            } else if self.eat_kw(Keyword::Char) {
                base = Some(BuiltinKind::Char);
                break;
            } else if self.eat_kw(Keyword::Char8T) {
                base = Some(BuiltinKind::Char8T);
                break;
            } else if self.eat_kw(Keyword::Char16T) {
                base = Some(BuiltinKind::Char16T);
                break;
            } else if self.eat_kw(Keyword::Char32T) {
                base = Some(BuiltinKind::Char32T);
                break;
            } else if self.eat_kw(Keyword::WcharT) {
                base = Some(BuiltinKind::WCharT);
                break;
            } else if self.eat_kw(Keyword::Float) {
                base = Some(BuiltinKind::Float);
                break;
            } else if self.eat_kw(Keyword::Double) {
                base = Some(if longs > 0 { BuiltinKind::LongDouble } else { BuiltinKind::Double });
                break;
            } else if self.eat_kw(Keyword::Nullptr) {
                base = Some(BuiltinKind::Nullptr);
                break;
            } else {
                break;
            }
        }

        if let Some(kind) = base {
            return Some(kind);
        }
        if !(signed || unsigned || short || longs > 0 || saw_int) {
            return None;
        }

        Some(match (signed, unsigned, short, longs, saw_int) {
            (_, true, true, _, _) => BuiltinKind::UnsignedShort,
            (_, false, true, _, _) => BuiltinKind::Short,
            (_, true, false, 0, _) => BuiltinKind::UnsignedInt,
            (_, true, false, 1, _) => BuiltinKind::UnsignedLong,
            (_, true, false, _, _) => BuiltinKind::UnsignedLongLong,
            (true, false, false, 0, _) => BuiltinKind::Int,
            (_, false, false, 1, _) => BuiltinKind::Long,
            (_, false, false, n, _) if n >= 2 => BuiltinKind::LongLong,
            _ => BuiltinKind::Int,
        })
    }

    /// Parses `::A::B<int, T>::C`, used both for named types and for
    /// id-expressions (the grammars coincide up to the point the parser
    /// decides, from context, whether it's reading a type or an expression).
    pub(crate) fn parse_qualified_id(&mut self) -> Option<QualifiedId> {
        let leading_colon_colon = self.eat_punct(PunctuatorKind::ColonColon);
        let mut segments = Vec::new();

        loop {
            let name = self.expect_ident()?;
            let template_args = if self.check_op(flashcpp_lex::OperatorKind::Lt) {
                Some(self.parse_template_arg_list()?)
            } else {
                None
            };
            segments.push(IdSegment { name, template_args });

            if self.check_punct(PunctuatorKind::ColonColon) {
                self.advance();
                continue;
            }
            break;
        }

        Some(QualifiedId { leading_colon_colon, segments })
    }

    /// Parses `<arg, arg, ...>`, toggling the lexer's `>>`-splitting mode for
    /// the duration so a nested closing `>>` lexes as two `>` (§4.1/§4.4).
    pub(crate) fn parse_template_arg_list(&mut self) -> Option<Vec<TemplateArg>> {
        self.advance(); // consume '<'
        self.enter_template_arg_mode();

        let mut args = Vec::new();
        if !self.check_op(flashcpp_lex::OperatorKind::Gt) {
            loop {
                if let Some(arg) = self.parse_template_arg() {
                    args.push(arg);
                }
                if !self.eat_punct(PunctuatorKind::Comma) {
                    break;
                }
            }
        }

        let closed = self.eat_op(flashcpp_lex::OperatorKind::Gt);
        self.exit_template_arg_mode();
        if !closed {
            self.error("expected '>' to close template argument list");
            return None;
        }
        Some(args)
    }

    /// A template argument is ambiguous between a type and an expression
    /// (`Foo<Bar>` - is `Bar` a type or a constant?) without full name
    /// lookup; favor a type parse and fall back to an expression on failure,
    /// using a trial checkpoint so a failed type attempt leaves no trace.
    fn parse_template_arg(&mut self) -> Option<TemplateArg> {
        let checkpoint = self.begin_trial();
        if let Some(ty) = self.parse_type_spec() {
            if self.trial_clean(&checkpoint) {
                self.commit_trial(checkpoint);
                return Some(TemplateArg::Type(ty));
            }
        }
        self.rollback_trial(checkpoint);
        self.parse_assignment_expr().map(TemplateArg::Expr)
    }

    pub(crate) fn span_from(&mut self, start: flashcpp_util::Span) -> flashcpp_util::Span {
        let end = self.current_span();
        start.merge(end)
    }
}
