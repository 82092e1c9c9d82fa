//! Edge-case tests for the C++ lexer: `>>` splitting, save/restore,
//! unterminated literals, and other corners the per-module unit tests
//! don't cover.

use crate::token::{Keyword, OperatorKind, TokenKind};
use crate::Lexer;
use flashcpp_util::{Handler, StringInterner};

fn lex_all(source: &str) -> Vec<TokenKind> {
    let mut handler = Handler::new();
    let mut interner = StringInterner::new();
    let mut lexer = Lexer::new(source, &mut handler, &mut interner);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.consume();
        if token.is_eof() {
            break;
        }
        tokens.push(token.kind);
    }
    tokens
}

#[test]
fn empty_source_is_immediate_eof() {
    assert!(lex_all("").is_empty());
}

#[test]
fn keywords_are_not_identifiers() {
    let tokens = lex_all("template typename class");
    assert_eq!(tokens[0], TokenKind::Keyword(Keyword::Template));
    assert_eq!(tokens[1], TokenKind::Keyword(Keyword::Typename));
    assert_eq!(tokens[2], TokenKind::Keyword(Keyword::Class));
}

#[test]
fn shift_right_splits_in_template_arg_mode() {
    let mut handler = Handler::new();
    let mut interner = StringInterner::new();
    let mut lexer = Lexer::new("vector<vector<int>>", &mut handler, &mut interner);

    // Consume up to and including the second `<`.
    for _ in 0..4 {
        lexer.consume();
    }
    lexer.set_template_arg_mode(true);
    assert_eq!(lexer.consume().kind, TokenKind::Keyword(Keyword::Int));
    assert_eq!(lexer.consume().kind, TokenKind::Operator(OperatorKind::Gt));
    assert_eq!(lexer.consume().kind, TokenKind::Operator(OperatorKind::Gt));
}

#[test]
fn shift_right_stays_whole_outside_template_mode() {
    let tokens = lex_all("a >> b");
    assert!(tokens.contains(&TokenKind::Operator(OperatorKind::Shr)));
}

#[test]
fn save_and_restore_position_rewinds_without_retokenizing() {
    let mut handler = Handler::new();
    let mut interner = StringInterner::new();
    let mut lexer = Lexer::new("int x = 1;", &mut handler, &mut interner);

    let checkpoint = lexer.save_position();
    assert_eq!(lexer.consume().kind, TokenKind::Keyword(Keyword::Int));
    assert!(matches!(lexer.consume().kind, TokenKind::Identifier(_)));

    lexer.restore_position(checkpoint);
    assert_eq!(lexer.consume().kind, TokenKind::Keyword(Keyword::Int));
}

#[test]
fn peek_does_not_advance_consume_position() {
    let mut handler = Handler::new();
    let mut interner = StringInterner::new();
    let mut lexer = Lexer::new("a b c", &mut handler, &mut interner);

    assert!(matches!(lexer.peek(0).kind.clone(), TokenKind::Identifier(_)));
    assert!(matches!(lexer.peek(1).kind.clone(), TokenKind::Identifier(_)));
    assert!(matches!(lexer.consume().kind, TokenKind::Identifier(_)));
    assert!(matches!(lexer.peek(0).kind.clone(), TokenKind::Identifier(_)));
}

#[test]
fn unterminated_string_reports_error_but_produces_a_token() {
    let mut handler = Handler::new();
    let mut interner = StringInterner::new();
    let mut lexer = Lexer::new("\"never closed", &mut handler, &mut interner);
    let token = lexer.consume();
    assert!(matches!(token.kind, TokenKind::Str(_)));
    assert!(handler.has_errors());
}

#[test]
fn illegal_character_produces_invalid_token_and_keeps_going() {
    let tokens = lex_all("a ` b");
    assert!(matches!(tokens[0], TokenKind::Identifier(_)));
    assert!(matches!(tokens[1], TokenKind::Invalid(_)));
    assert!(matches!(tokens[2], TokenKind::Identifier(_)));
}

#[test]
fn alternative_operator_spellings_are_keywords() {
    let tokens = lex_all("not and or");
    assert_eq!(tokens[0], TokenKind::Keyword(Keyword::Not));
    assert_eq!(tokens[1], TokenKind::Keyword(Keyword::And));
    assert_eq!(tokens[2], TokenKind::Keyword(Keyword::Or));
}

#[test]
fn long_identifier() {
    let name = "a".repeat(5000);
    let tokens = lex_all(&name);
    assert_eq!(tokens.len(), 1);
    assert!(matches!(tokens[0], TokenKind::Identifier(_)));
}
