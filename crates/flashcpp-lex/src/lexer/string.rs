//! String and character literal lexing, including encoding prefixes
//! (`L`, `u8`, `u`, `U`) and raw string literals (`R"delim(...)delim"`).

use crate::token::{CharLiteral, Encoding, StringLiteral, TokenKind};
use crate::unicode::parse_hex_codepoint;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Dispatches an `L`/`u8`/`u`/`U`-prefixed char or string literal.
    pub fn lex_encoded_literal(&mut self) -> TokenKind {
        let encoding = if self.cursor.current_char() == 'u' && self.cursor.peek_char(1) == '8' {
            self.cursor.advance();
            self.cursor.advance();
            Encoding::Utf8
        } else {
            let enc = match self.cursor.current_char() {
                'L' => Encoding::Wide,
                'u' => Encoding::Utf16,
                'U' => Encoding::Utf32,
                _ => Encoding::Narrow,
            };
            self.cursor.advance();
            enc
        };

        if self.cursor.current_char() == '"' {
            self.lex_string(Some(encoding))
        } else {
            self.lex_char(Some(encoding))
        }
    }

    /// Lexes a `"..."` string literal, unescaping as it goes.
    pub fn lex_string(&mut self, encoding: Option<Encoding>) -> TokenKind {
        let encoding = encoding.unwrap_or(Encoding::Narrow);
        self.cursor.advance();

        let mut content = String::new();
        loop {
            if self.cursor.is_at_end() {
                self.report_error("unterminated string literal".to_string());
                break;
            }

            let c = self.cursor.current_char();
            if c == '"' {
                self.cursor.advance();
                break;
            }
            if c == '\n' {
                self.report_error("unterminated string literal".to_string());
                break;
            }
            if c == '\\' {
                self.cursor.advance();
                if let Some(escaped) = self.parse_escape() {
                    content.push(escaped);
                }
            } else {
                content.push(c);
                self.cursor.advance();
            }
        }

        TokenKind::Str(StringLiteral {
            bytes: encode_literal(&content, encoding),
            encoding,
        })
    }

    /// Lexes `R"delim(raw content)delim"`. No escape processing; the
    /// delimiter (0-16 characters, none of them whitespace/`(`/`)`/`\`)
    /// determines the closing sequence.
    pub fn lex_raw_string(&mut self) -> TokenKind {
        self.cursor.advance(); // 'R'
        self.cursor.advance(); // '"'

        let delim_start = self.cursor.position();
        while self.cursor.current_char() != '(' && !self.cursor.is_at_end() {
            self.cursor.advance();
        }
        let delimiter = self.cursor.slice_from(delim_start).to_string();

        if self.cursor.current_char() != '(' {
            self.report_error("expected '(' to begin raw string body".to_string());
            return TokenKind::Invalid("raw string".to_string());
        }
        self.cursor.advance();

        let mut closing = String::from(")");
        closing.push_str(&delimiter);
        closing.push('"');

        let mut content = String::new();
        let mut found_closing = false;

        while !self.cursor.is_at_end() {
            if self.cursor.remaining().starts_with(closing.as_str()) {
                for _ in 0..closing.chars().count() {
                    self.cursor.advance();
                }
                found_closing = true;
                break;
            }
            content.push(self.cursor.current_char());
            self.cursor.advance();
        }

        if !found_closing {
            self.report_error("unterminated raw string literal".to_string());
        }

        TokenKind::Str(StringLiteral {
            bytes: content.into_bytes(),
            encoding: Encoding::Narrow,
        })
    }

    /// Lexes a `'c'` character literal.
    pub fn lex_char(&mut self, encoding: Option<Encoding>) -> TokenKind {
        let encoding = encoding.unwrap_or(Encoding::Narrow);
        self.cursor.advance();

        if self.cursor.is_at_end() {
            self.report_error("unterminated character literal".to_string());
            return TokenKind::Char(CharLiteral { value: 0, encoding });
        }

        let value = if self.cursor.current_char() == '\\' {
            self.cursor.advance();
            self.parse_escape().map(|c| c as u32).unwrap_or(0)
        } else {
            let c = self.cursor.current_char();
            if c == '\'' || c == '\n' {
                self.report_error("empty character literal".to_string());
                return TokenKind::Char(CharLiteral { value: 0, encoding });
            }
            self.cursor.advance();
            c as u32
        };

        if self.cursor.current_char() != '\'' {
            self.report_error("multi-character or unterminated character literal".to_string());
            while !self.cursor.is_at_end()
                && self.cursor.current_char() != '\''
                && self.cursor.current_char() != '\n'
            {
                self.cursor.advance();
            }
            if self.cursor.current_char() == '\'' {
                self.cursor.advance();
            }
        } else {
            self.cursor.advance();
        }

        TokenKind::Char(CharLiteral { value, encoding })
    }

    /// Parses the character(s) after a backslash: `\n \t \r \\ \" \' \0`,
    /// `\xHH`, `\ooo` (octal), and `\u{HHHH}`/`\uHHHH`/`\UHHHHHHHH`.
    pub fn parse_escape(&mut self) -> Option<char> {
        if self.cursor.is_at_end() {
            self.report_error("unterminated escape sequence".to_string());
            return None;
        }

        let c = self.cursor.current_char();
        self.cursor.advance();

        match c {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            'a' => Some('\u{7}'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'v' => Some('\u{b}'),
            '\\' => Some('\\'),
            '"' => Some('"'),
            '\'' => Some('\''),
            '?' => Some('?'),
            '0'..='7' => {
                let mut digits = String::new();
                digits.push(c);
                for _ in 0..2 {
                    let d = self.cursor.current_char();
                    if ('0'..='7').contains(&d) {
                        digits.push(d);
                        self.cursor.advance();
                    } else {
                        break;
                    }
                }
                u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32)
            }
            'x' => {
                let mut hex = String::new();
                while self.cursor.current_char().is_ascii_hexdigit() {
                    hex.push(self.cursor.current_char());
                    self.cursor.advance();
                }
                if hex.is_empty() {
                    self.report_error("\\x used with no following hex digits".to_string());
                    return None;
                }
                parse_hex_codepoint(&hex).and_then(char::from_u32)
            }
            'u' => self.parse_universal_char_name(4),
            'U' => self.parse_universal_char_name(8),
            _ => {
                self.report_error(format!("unknown escape sequence: \\{}", c));
                None
            }
        }
    }

    fn parse_universal_char_name(&mut self, width: usize) -> Option<char> {
        let braced = self.cursor.current_char() == '{';
        if braced {
            self.cursor.advance();
        }

        let mut hex = String::new();
        while self.cursor.current_char().is_ascii_hexdigit() && (braced || hex.len() < width) {
            hex.push(self.cursor.current_char());
            self.cursor.advance();
        }

        if braced {
            if self.cursor.current_char() == '}' {
                self.cursor.advance();
            } else {
                self.report_error("expected '}' to close universal character name".to_string());
            }
        }

        parse_hex_codepoint(&hex).and_then(char::from_u32)
    }
}

fn encode_literal(content: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Narrow | Encoding::Utf8 => content.as_bytes().to_vec(),
        Encoding::Utf16 => content.encode_utf16().flat_map(|u| u.to_le_bytes()).collect(),
        Encoding::Wide | Encoding::Utf32 => content
            .chars()
            .flat_map(|c| (c as u32).to_le_bytes())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use crate::token::{Encoding, TokenKind};
    use flashcpp_util::{Handler, StringInterner};

    fn lex(source: &str) -> TokenKind {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut lexer = crate::Lexer::new(source, &mut handler, &mut interner);
        lexer.consume().kind
    }

    fn string_bytes(kind: TokenKind) -> Vec<u8> {
        match kind {
            TokenKind::Str(s) => s.bytes,
            other => panic!("expected string literal, got {:?}", other),
        }
    }

    #[test]
    fn simple_string() {
        assert_eq!(string_bytes(lex("\"hello\"")), b"hello");
    }

    #[test]
    fn string_with_escapes() {
        assert_eq!(string_bytes(lex("\"hi\\nthere\"")), b"hi\nthere");
    }

    #[test]
    fn utf8_prefixed_string() {
        match lex("u8\"hi\"") {
            TokenKind::Str(s) => {
                assert_eq!(s.encoding, Encoding::Utf8);
                assert_eq!(s.bytes, b"hi");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn wide_char_literal() {
        match lex("L'a'") {
            TokenKind::Char(c) => {
                assert_eq!(c.encoding, Encoding::Wide);
                assert_eq!(c.value, 'a' as u32);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn raw_string_with_quotes_inside() {
        assert_eq!(string_bytes(lex("R\"(he said \"hi\")\"")), "he said \"hi\"".as_bytes());
    }

    #[test]
    fn raw_string_with_delimiter() {
        assert_eq!(string_bytes(lex("R\"delim(a)b)delim\"")), b"a)b");
    }

    #[test]
    fn hex_escape_in_char() {
        match lex("'\\x41'") {
            TokenKind::Char(c) => assert_eq!(c.value, 'A' as u32),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn octal_escape_in_char() {
        match lex("'\\101'") {
            TokenKind::Char(c) => assert_eq!(c.value, 'A' as u32),
            other => panic!("unexpected {:?}", other),
        }
    }
}
