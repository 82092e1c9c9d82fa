//! Identifier and keyword lexing.

use crate::token::{Keyword, TokenKind};
use crate::unicode::is_ident_continue;
use crate::Lexer;
use flashcpp_util::StringHandle;

impl<'a> Lexer<'a> {
    /// Lexes an identifier or keyword. A single hash lookup against the
    /// closed keyword set (§4.1) decides which one it is.
    pub fn lex_identifier(&mut self) -> TokenKind {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(self.token_start);

        match Keyword::lookup(text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier(self.intern(text)),
        }
    }

    fn intern(&mut self, text: &str) -> StringHandle {
        self.interner.intern(text)
    }
}

#[cfg(test)]
mod tests {
    use crate::token::{Keyword, TokenKind};
    use flashcpp_util::{Handler, StringInterner};

    fn lex_ident(source: &str) -> TokenKind {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut lexer = crate::Lexer::new(source, &mut handler, &mut interner);
        lexer.consume().kind
    }

    #[test]
    fn simple_identifier() {
        assert!(matches!(lex_ident("foo"), TokenKind::Identifier(_)));
    }

    #[test]
    fn identifier_with_underscore_and_digits() {
        assert!(matches!(lex_ident("foo_bar_123"), TokenKind::Identifier(_)));
    }

    #[test]
    fn keyword_template() {
        assert_eq!(lex_ident("template"), TokenKind::Keyword(Keyword::Template));
    }

    #[test]
    fn keyword_constexpr() {
        assert_eq!(lex_ident("constexpr"), TokenKind::Keyword(Keyword::Constexpr));
    }

    #[test]
    fn keyword_co_await() {
        assert_eq!(lex_ident("co_await"), TokenKind::Keyword(Keyword::CoAwait));
    }

    #[test]
    fn msvc_declspec_is_a_keyword() {
        assert_eq!(lex_ident("__declspec"), TokenKind::Keyword(Keyword::Declspec));
    }

    #[test]
    fn underscore_alone_is_an_identifier() {
        assert!(matches!(lex_ident("_"), TokenKind::Identifier(_)));
    }

    #[test]
    fn unicode_identifier() {
        assert!(matches!(lex_ident("café"), TokenKind::Identifier(_)));
    }
}
