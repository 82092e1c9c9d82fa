//! Core lexer implementation: character dispatch plus the buffered
//! peek/consume/save/restore interface required by §4.1.

use flashcpp_util::{DiagnosticBuilder, Handler, Span, StringInterner};

use crate::cursor::Cursor;
use crate::token::{OperatorKind, PunctuatorKind, Token, TokenKind};

/// Opaque handle returned by [`Lexer::save_position`]. Restoring is an O(1)
/// index reset into the token buffer; it never re-tokenizes source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LexerPosition(usize);

/// Lexer for the supported C++20 subset.
///
/// Tokens already produced are kept in `buffer` so that `save_position` /
/// `restore_position` are pointer-bumps, not replays of the character
/// cursor. `peek(k)` fills the buffer on demand and never looks behind
/// `pos`.
pub struct Lexer<'a> {
    pub(crate) cursor: Cursor<'a>,
    pub handler: &'a mut Handler,
    pub interner: &'a mut StringInterner,

    pub(crate) token_start: usize,
    pub(crate) token_start_line: u32,
    pub(crate) token_start_column: u32,
    pub(crate) bom_checked: bool,

    buffer: Vec<Token>,
    pos: usize,

    /// Toggled by the parser while walking a `<...>` template argument
    /// list so that a `>>` lexes as two `>` tokens (§4.1).
    template_arg_mode: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, handler: &'a mut Handler, interner: &'a mut StringInterner) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            interner,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
            bom_checked: false,
            buffer: Vec::new(),
            pos: 0,
            template_arg_mode: false,
        }
    }

    /// Enables or disables `>>` splitting. The parser turns this on when it
    /// enters a template argument list and off when it leaves one.
    pub fn set_template_arg_mode(&mut self, enabled: bool) {
        self.template_arg_mode = enabled;
    }

    pub fn template_arg_mode(&self) -> bool {
        self.template_arg_mode
    }

    /// Returns the token `k` positions ahead of the next one to consume,
    /// tokenizing further input only if the buffer doesn't already cover it.
    pub fn peek(&mut self, k: usize) -> &Token {
        self.fill_to(self.pos + k);
        &self.buffer[self.pos + k]
    }

    /// Consumes and returns the next token.
    pub fn consume(&mut self) -> Token {
        self.fill_to(self.pos);
        let token = self.buffer[self.pos].clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    /// O(1): records the current buffer index.
    pub fn save_position(&self) -> LexerPosition {
        LexerPosition(self.pos)
    }

    /// O(1): rewinds to a previously saved index. Never re-tokenizes.
    pub fn restore_position(&mut self, handle: LexerPosition) {
        self.pos = handle.0;
    }

    fn fill_to(&mut self, index: usize) {
        while self.buffer.len() <= index {
            if self.buffer.last().map(|t| t.is_eof()).unwrap_or(false) {
                break;
            }
            let token = self.lex_one();
            self.push_possibly_split(token);
        }
    }

    fn push_possibly_split(&mut self, token: Token) {
        if self.template_arg_mode {
            if let TokenKind::Operator(OperatorKind::Shr) = token.kind {
                let mid = Span::new(
                    token.span.start,
                    token.span.start + 1,
                    token.span.line,
                    token.span.column,
                );
                let second = Span::new(
                    token.span.start + 1,
                    token.span.end,
                    token.span.line,
                    token.span.column + 1,
                );
                self.buffer
                    .push(Token::new(TokenKind::Operator(OperatorKind::Gt), mid));
                self.buffer
                    .push(Token::new(TokenKind::Operator(OperatorKind::Gt), second));
                return;
            }
        }
        self.buffer.push(token);
    }

    /// Tokenizes exactly one token from the character cursor, skipping
    /// whitespace and comments first. This is the only place that touches
    /// `cursor` directly; everything above operates on the buffer.
    fn lex_one(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        let kind = self.lex_one_kind();
        Token::new(kind, self.current_span())
    }

    fn current_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    pub(crate) fn lex_one_kind(&mut self) -> TokenKind {
        if self.cursor.is_at_end() {
            return TokenKind::Eof;
        }

        match self.cursor.current_char() {
            '(' => self.single(PunctuatorKind::LParen),
            ')' => self.single(PunctuatorKind::RParen),
            '{' => self.single(PunctuatorKind::LBrace),
            '}' => self.single(PunctuatorKind::RBrace),
            '[' => self.single(PunctuatorKind::LBracket),
            ']' => self.single(PunctuatorKind::RBracket),
            ',' => self.single(PunctuatorKind::Comma),
            ';' => self.single(PunctuatorKind::Semi),
            '?' => {
                self.cursor.advance();
                TokenKind::Operator(OperatorKind::Question)
            }
            '#' => {
                self.cursor.advance();
                if self.cursor.match_char('#') {
                    TokenKind::Punctuator(PunctuatorKind::HashHash)
                } else {
                    TokenKind::Punctuator(PunctuatorKind::Hash)
                }
            }
            '+' => self.lex_plus(),
            '-' => self.lex_minus(),
            '*' => self.lex_star(),
            '/' => self.lex_slash(),
            '%' => self.lex_percent(),
            '=' => self.lex_equals(),
            '!' => self.lex_bang(),
            '<' => self.lex_less(),
            '>' => self.lex_greater(),
            '&' => self.lex_ampersand(),
            '|' => self.lex_pipe(),
            ':' => self.lex_colon(),
            '.' => self.lex_dot(),
            '^' => self.lex_caret(),
            '~' => self.lex_tilde(),
            '"' => self.lex_string(None),
            '\'' => self.lex_char(None),
            'L' | 'u' | 'U' if self.is_encoded_literal_prefix() => self.lex_encoded_literal(),
            'R' if self.cursor.peek_char(1) == '"' => self.lex_raw_string(),
            c if crate::unicode::is_ident_start(c) => self.lex_identifier(),
            c if c.is_ascii_digit() => self.lex_number(),
            c => {
                self.report_error(format!("unexpected character '{}'", c));
                self.cursor.advance();
                TokenKind::Invalid(c.to_string())
            }
        }
    }

    fn single(&mut self, p: PunctuatorKind) -> TokenKind {
        self.cursor.advance();
        TokenKind::Punctuator(p)
    }

    /// True if the current `L`/`u`/`U` (and for `u`, the following `8`)
    /// introduces an encoded char/string literal rather than an identifier.
    fn is_encoded_literal_prefix(&self) -> bool {
        let c = self.cursor.current_char();
        let (next_offset, next) = if c == 'u' && self.cursor.peek_char(1) == '8' {
            (2, self.cursor.peek_char(2))
        } else {
            (1, self.cursor.peek_char(1))
        };
        let _ = next_offset;
        next == '"' || next == '\''
    }

    pub fn report_error(&mut self, message: String) {
        let span = self.current_span();
        DiagnosticBuilder::error(message).span(span).emit(self.handler);
    }

    pub fn line(&self) -> u32 {
        self.cursor.line()
    }

    pub fn column(&self) -> u32 {
        self.cursor.column()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.consume();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}
