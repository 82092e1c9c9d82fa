//! Operator and punctuator lexing.

use crate::token::{OperatorKind as Op, PunctuatorKind as P, TokenKind};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// `+`, `++`, `+=`
    pub fn lex_plus(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('+') {
            TokenKind::Operator(Op::Inc)
        } else if self.cursor.match_char('=') {
            TokenKind::Operator(Op::PlusEq)
        } else {
            TokenKind::Operator(Op::Plus)
        }
    }

    /// `-`, `--`, `->`, `->*`, `-=`
    pub fn lex_minus(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('-') {
            TokenKind::Operator(Op::Dec)
        } else if self.cursor.match_char('>') {
            if self.cursor.match_char('*') {
                TokenKind::Operator(Op::ArrowStar)
            } else {
                TokenKind::Operator(Op::Arrow)
            }
        } else if self.cursor.match_char('=') {
            TokenKind::Operator(Op::MinusEq)
        } else {
            TokenKind::Operator(Op::Minus)
        }
    }

    /// `*`, `*=`
    pub fn lex_star(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            TokenKind::Operator(Op::StarEq)
        } else {
            TokenKind::Operator(Op::Star)
        }
    }

    /// `/`, `//`, `/* */`, `/=`
    pub fn lex_slash(&mut self) -> TokenKind {
        self.cursor.advance();

        if self.cursor.match_char('/') {
            while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                self.cursor.advance();
            }
            self.skip_whitespace_and_comments();
            return self.lex_one_kind_after_comment();
        }

        if self.cursor.match_char('*') {
            self.skip_block_comment();
            self.skip_whitespace_and_comments();
            return self.lex_one_kind_after_comment();
        }

        if self.cursor.match_char('=') {
            TokenKind::Operator(Op::SlashEq)
        } else {
            TokenKind::Operator(Op::Slash)
        }
    }

    /// Re-enters token dispatch after a comment was skipped mid-token; used
    /// only from within `lex_slash` so a `// comment` or `/* ... */` run
    /// doesn't itself become a token.
    fn lex_one_kind_after_comment(&mut self) -> TokenKind {
        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();
        self.lex_one_kind()
    }

    /// `%`, `%=`
    pub fn lex_percent(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            TokenKind::Operator(Op::PercentEq)
        } else {
            TokenKind::Operator(Op::Percent)
        }
    }

    /// `=`, `==`
    pub fn lex_equals(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            TokenKind::Operator(Op::Eq)
        } else {
            TokenKind::Operator(Op::Assign)
        }
    }

    /// `!`, `!=`
    pub fn lex_bang(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            TokenKind::Operator(Op::NotEq)
        } else {
            TokenKind::Operator(Op::LogicalNot)
        }
    }

    /// `<`, `<=`, `<=>`, `<<`, `<<=`
    pub fn lex_less(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            if self.cursor.match_char('>') {
                TokenKind::Operator(Op::Spaceship)
            } else {
                TokenKind::Operator(Op::LtEq)
            }
        } else if self.cursor.match_char('<') {
            if self.cursor.match_char('=') {
                TokenKind::Operator(Op::ShlEq)
            } else {
                TokenKind::Operator(Op::Shl)
            }
        } else {
            TokenKind::Operator(Op::Lt)
        }
    }

    /// `>`, `>=`, `>>`, `>>=`. Splitting `>>` into two `>` in template
    /// argument lists happens one layer up, in the buffered consume/peek
    /// path (§4.1), not here.
    pub fn lex_greater(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            TokenKind::Operator(Op::GtEq)
        } else if self.cursor.match_char('>') {
            if self.cursor.match_char('=') {
                TokenKind::Operator(Op::ShrEq)
            } else {
                TokenKind::Operator(Op::Shr)
            }
        } else {
            TokenKind::Operator(Op::Gt)
        }
    }

    /// `&`, `&&`, `&=`
    pub fn lex_ampersand(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('&') {
            TokenKind::Operator(Op::AndAnd)
        } else if self.cursor.match_char('=') {
            TokenKind::Operator(Op::AmpEq)
        } else {
            TokenKind::Operator(Op::Amp)
        }
    }

    /// `|`, `||`, `|=`
    pub fn lex_pipe(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('|') {
            TokenKind::Operator(Op::OrOr)
        } else if self.cursor.match_char('=') {
            TokenKind::Operator(Op::PipeEq)
        } else {
            TokenKind::Operator(Op::Pipe)
        }
    }

    /// `^`, `^=`
    pub fn lex_caret(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            TokenKind::Operator(Op::CaretEq)
        } else {
            TokenKind::Operator(Op::Caret)
        }
    }

    /// `~`
    pub fn lex_tilde(&mut self) -> TokenKind {
        self.cursor.advance();
        TokenKind::Operator(Op::Tilde)
    }

    /// `:`, `::`
    pub fn lex_colon(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char(':') {
            TokenKind::Punctuator(P::ColonColon)
        } else {
            TokenKind::Punctuator(P::Colon)
        }
    }

    /// `.`, `.*`, `...`
    pub fn lex_dot(&mut self) -> TokenKind {
        self.cursor.advance();
        if self.cursor.match_char('*') {
            TokenKind::Operator(Op::DotStar)
        } else if self.cursor.current_char() == '.' && self.cursor.peek_char(1) == '.' {
            self.cursor.advance();
            self.cursor.advance();
            TokenKind::Punctuator(P::Ellipsis)
        } else {
            TokenKind::Operator(Op::Dot)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::{OperatorKind, PunctuatorKind, TokenKind};
    use flashcpp_util::{Handler, StringInterner};

    fn lex_op(source: &str) -> TokenKind {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut lexer = crate::Lexer::new(source, &mut handler, &mut interner);
        lexer.consume().kind
    }

    #[test]
    fn arrow_and_arrow_star() {
        assert_eq!(lex_op("->"), TokenKind::Operator(OperatorKind::Arrow));
        assert_eq!(lex_op("->*"), TokenKind::Operator(OperatorKind::ArrowStar));
    }

    #[test]
    fn spaceship() {
        assert_eq!(lex_op("<=>"), TokenKind::Operator(OperatorKind::Spaceship));
    }

    #[test]
    fn shift_left_and_shift_left_eq() {
        assert_eq!(lex_op("<<"), TokenKind::Operator(OperatorKind::Shl));
        assert_eq!(lex_op("<<="), TokenKind::Operator(OperatorKind::ShlEq));
    }

    #[test]
    fn shift_right_not_split_outside_template_mode() {
        assert_eq!(lex_op(">>"), TokenKind::Operator(OperatorKind::Shr));
    }

    #[test]
    fn ellipsis() {
        assert_eq!(lex_op("..."), TokenKind::Punctuator(PunctuatorKind::Ellipsis));
    }

    #[test]
    fn double_colon() {
        assert_eq!(lex_op("::"), TokenKind::Punctuator(PunctuatorKind::ColonColon));
    }

    #[test]
    fn dot_star() {
        assert_eq!(lex_op(".*"), TokenKind::Operator(OperatorKind::DotStar));
    }
}
