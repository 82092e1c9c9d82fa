//! Comment skipping. Unlike Rust, C++ block comments do not nest: the first
//! `*/` closes the comment regardless of any `/*` seen since.

use crate::Lexer;

impl<'a> Lexer<'a> {
    pub(crate) fn skip_block_comment(&mut self) {
        loop {
            if self.cursor.is_at_end() {
                self.report_error("unterminated block comment".to_string());
                return;
            }
            if self.cursor.current_char() == '*' && self.cursor.peek_char(1) == '/' {
                self.cursor.advance();
                self.cursor.advance();
                return;
            }
            self.cursor.advance();
        }
    }

    pub(crate) fn skip_whitespace_and_comments(&mut self) {
        if !self.bom_checked {
            self.bom_checked = true;
            if self.cursor.remaining().starts_with('\u{FEFF}') {
                self.cursor.advance();
            }
        }

        loop {
            if self.cursor.is_at_end() {
                return;
            }

            match self.cursor.current_char() {
                ' ' | '\t' | '\r' | '\n' | '\u{b}' | '\u{c}' => {
                    self.cursor.advance();
                }
                '/' => match self.cursor.peek_char(1) {
                    '/' => self.skip_line_comment(),
                    '*' => self.skip_block_comment(),
                    _ => return,
                },
                _ => return,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.cursor.advance();
        self.cursor.advance();
        while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
            self.cursor.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::TokenKind;
    use flashcpp_util::{Handler, StringInterner};

    fn lex_after_skip(source: &str) -> TokenKind {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut lexer = crate::Lexer::new(source, &mut handler, &mut interner);
        lexer.consume().kind
    }

    #[test]
    fn skip_leading_whitespace() {
        assert!(matches!(lex_after_skip("   hello"), TokenKind::Identifier(_)));
    }

    #[test]
    fn skip_line_comment() {
        assert!(matches!(lex_after_skip("// comment\nhello"), TokenKind::Identifier(_)));
    }

    #[test]
    fn skip_block_comment() {
        assert!(matches!(lex_after_skip("/* comment */hello"), TokenKind::Identifier(_)));
    }

    #[test]
    fn block_comments_do_not_nest() {
        // The first `*/` closes the comment; `outer */` then lexes as code.
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut lexer = crate::Lexer::new("/* a /* b */ outer */hello", &mut handler, &mut interner);
        let _ = lexer.consume(); // "outer" identifier, left over from the closed comment
        let _ = lexer.consume(); // '*'
        let _ = lexer.consume(); // '/'
        assert!(matches!(lexer.consume().kind, TokenKind::Identifier(_)));
    }
}
