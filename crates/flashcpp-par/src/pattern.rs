//! Structured-binding-list parsing: `auto [a, b, c] = expr;` (§4.2).

use flashcpp_lex::PunctuatorKind;
use flashcpp_util::StringHandle;

use crate::Parser;

impl<'a> Parser<'a> {
    /// Parses `[a, b, c]`, assuming the caller already confirmed a `[`
    /// follows `auto` in a declaration, not a lambda capture or an array
    /// declarator.
    pub(crate) fn parse_structured_binding_list(&mut self) -> Option<Vec<StringHandle>> {
        self.expect_punct(PunctuatorKind::LBracket, "[")?;
        let mut names = Vec::new();
        loop {
            names.push(self.expect_ident()?);
            if !self.eat_punct(PunctuatorKind::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuatorKind::RBracket, "]")?;
        Some(names)
    }
}

#[cfg(test)]
mod tests {
    use flashcpp_util::{Handler, StringInterner};

    use super::*;

    #[test]
    fn parses_binding_names_in_order() {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut parser = Parser::new("[a, b, c]", &mut handler, &mut interner);
        let names = parser.parse_structured_binding_list().expect("parses");
        assert_eq!(names.len(), 3);
        assert!(!handler.has_errors());
    }

    #[test]
    fn missing_closing_bracket_reports_error() {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut parser = Parser::new("[a, b", &mut handler, &mut interner);
        let _ = parser.parse_structured_binding_list();
        assert!(handler.has_errors());
    }
}
