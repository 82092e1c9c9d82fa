//! Numeric literal lexing: integers in base 2/8/10/16 and floats, with their
//! C++ suffixes (§4.1).

use crate::token::{FloatSuffix, IntegerSuffix, NumericBase, NumericLiteral, NumericValue, TokenKind};
use crate::unicode::is_digit_in_base;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a numeric literal starting at the current digit.
    pub fn lex_number(&mut self) -> TokenKind {
        let start = self.cursor.position();
        let mut base = NumericBase::Decimal;

        if self.cursor.current_char() == '0' {
            match self.cursor.peek_char(1) {
                'x' | 'X' => {
                    self.cursor.advance();
                    self.cursor.advance();
                    base = NumericBase::Hexadecimal;
                }
                'b' | 'B' => {
                    self.cursor.advance();
                    self.cursor.advance();
                    base = NumericBase::Binary;
                }
                c if c.is_ascii_digit() => {
                    self.cursor.advance();
                    base = NumericBase::Octal;
                }
                _ => {}
            }
        }

        let digits_start = self.cursor.position();
        self.consume_digits(base);

        let mut is_float = false;
        if base == NumericBase::Decimal || base == NumericBase::Hexadecimal {
            if self.cursor.current_char() == '.' {
                is_float = true;
                self.cursor.advance();
                self.consume_digits(base);
            }
            let exp_chars: &[char] = if base == NumericBase::Hexadecimal {
                &['p', 'P']
            } else {
                &['e', 'E']
            };
            if exp_chars.contains(&self.cursor.current_char()) {
                is_float = true;
                self.cursor.advance();
                if matches!(self.cursor.current_char(), '+' | '-') {
                    self.cursor.advance();
                }
                let exp_digits_start = self.cursor.position();
                self.consume_digits(NumericBase::Decimal);
                if self.cursor.position() == exp_digits_start {
                    self.report_error("no digits in floating-point exponent".to_string());
                }
            }
        }

        if digits_start == self.cursor.position() && !is_float {
            self.report_error(format!("no digits after base-{} prefix", base as u32));
        }

        let (int_suffix, float_suffix) = self.lex_numeric_suffix();
        let text = self.cursor.slice_from(start);
        let value = self.parse_numeric_value(text, base, is_float);

        TokenKind::Numeric(NumericLiteral {
            text: self.interner.intern(text),
            base,
            is_float,
            value,
            int_suffix,
            float_suffix,
        })
    }

    fn consume_digits(&mut self, base: NumericBase) {
        loop {
            let c = self.cursor.current_char();
            if c == '\'' || is_digit_in_base(c, base as u32) {
                self.cursor.advance();
            } else {
                break;
            }
        }
    }

    /// Consumes a trailing `u`/`U`, `l`/`L`/`ll`/`LL`, or `f`/`F`/`l`/`L`
    /// suffix combination. Order and case are not validated here; semantic
    /// analysis rejects nonsensical combinations.
    fn lex_numeric_suffix(&mut self) -> (IntegerSuffix, FloatSuffix) {
        let mut int_suffix = IntegerSuffix::default();
        let mut float_suffix = FloatSuffix::None;

        loop {
            match self.cursor.current_char() {
                'u' | 'U' => {
                    int_suffix.unsigned = true;
                    self.cursor.advance();
                }
                'l' | 'L' => {
                    let c = self.cursor.current_char();
                    self.cursor.advance();
                    if self.cursor.current_char() == c {
                        self.cursor.advance();
                        int_suffix.long_count = 2;
                    } else if int_suffix.long_count < 1 {
                        int_suffix.long_count = 1;
                    }
                    if float_suffix == FloatSuffix::None {
                        float_suffix = FloatSuffix::LongDouble;
                    }
                }
                'f' | 'F' => {
                    float_suffix = FloatSuffix::Float;
                    self.cursor.advance();
                }
                _ => break,
            }
        }

        (int_suffix, float_suffix)
    }

    fn parse_numeric_value(&mut self, text: &str, base: NumericBase, is_float: bool) -> NumericValue {
        let cleaned: String = text.chars().filter(|c| *c != '\'').collect();
        let digits = strip_numeric_text(&cleaned, base, is_float);

        if is_float {
            if base == NumericBase::Hexadecimal {
                // Hex floats need a dedicated parser; defer to semantic analysis.
                return NumericValue::Deferred;
            }
            match digits.parse::<f64>() {
                Ok(v) if v.is_finite() => NumericValue::Float(v),
                Ok(_) => {
                    self.report_error(format!("floating-point literal '{}' is not finite", text));
                    NumericValue::Float(0.0)
                }
                Err(e) => {
                    self.report_error(format!("invalid floating-point literal '{}': {}", text, e));
                    NumericValue::Float(0.0)
                }
            }
        } else {
            match u64::from_str_radix(&digits, base as u32) {
                Ok(v) => NumericValue::Int(v),
                Err(e) => {
                    self.report_error(format!("integer literal overflow: {}", e));
                    NumericValue::Int(0)
                }
            }
        }
    }
}

/// Strips base prefix and trailing suffix letters so the remaining text is
/// pure digits (plus `.`/`e`/`p`/sign for floats) suitable for `from_str`.
fn strip_numeric_text(text: &str, base: NumericBase, is_float: bool) -> String {
    let without_prefix = match base {
        NumericBase::Hexadecimal => text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")),
        NumericBase::Binary => text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")),
        NumericBase::Octal | NumericBase::Decimal => Some(text),
    }
    .unwrap_or(text);

    let end = without_prefix
        .char_indices()
        .find(|(i, c)| {
            if is_float {
                !(c.is_ascii_digit() || *c == '.' || *c == 'e' || *c == 'E' || (*i > 0 && (*c == '+' || *c == '-')))
            } else {
                !c.is_ascii_hexdigit()
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(without_prefix.len());

    without_prefix[..end].to_string()
}

#[cfg(test)]
mod tests {
    use crate::token::{NumericBase, NumericValue, TokenKind};
    use flashcpp_util::{Handler, StringInterner};

    fn lex_num(source: &str) -> TokenKind {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut lexer = crate::Lexer::new(source, &mut handler, &mut interner);
        lexer.consume().kind
    }

    fn numeric(kind: TokenKind) -> crate::token::NumericLiteral {
        match kind {
            TokenKind::Numeric(n) => n,
            other => panic!("expected numeric literal, got {:?}", other),
        }
    }

    #[test]
    fn decimal_integer() {
        let n = numeric(lex_num("42"));
        assert_eq!(n.value, NumericValue::Int(42));
        assert_eq!(n.base, NumericBase::Decimal);
    }

    #[test]
    fn hex_integer() {
        let n = numeric(lex_num("0xFF"));
        assert_eq!(n.value, NumericValue::Int(0xFF));
        assert_eq!(n.base, NumericBase::Hexadecimal);
    }

    #[test]
    fn hex_with_digit_separators() {
        let n = numeric(lex_num("0xAB'CD"));
        assert_eq!(n.value, NumericValue::Int(0xABCD));
    }

    #[test]
    fn binary_integer() {
        let n = numeric(lex_num("0b1010"));
        assert_eq!(n.value, NumericValue::Int(0b1010));
    }

    #[test]
    fn octal_integer() {
        let n = numeric(lex_num("0777"));
        assert_eq!(n.value, NumericValue::Int(0o777));
        assert_eq!(n.base, NumericBase::Octal);
    }

    #[test]
    fn unsigned_long_suffix() {
        let n = numeric(lex_num("42ULL"));
        assert!(n.int_suffix.unsigned);
        assert_eq!(n.int_suffix.long_count, 2);
    }

    #[test]
    fn float_literal() {
        let n = numeric(lex_num("3.14"));
        assert!(matches!(n.value, NumericValue::Float(f) if (f - 3.14).abs() < 1e-9));
        assert!(n.is_float);
    }

    #[test]
    fn float_with_exponent() {
        let n = numeric(lex_num("1e10"));
        assert!(matches!(n.value, NumericValue::Float(f) if (f - 1e10).abs() < 1.0));
    }

    #[test]
    fn float_f_suffix() {
        let n = numeric(lex_num("2.5f"));
        assert_eq!(n.float_suffix, crate::token::FloatSuffix::Float);
    }

    #[test]
    fn hex_float_is_deferred() {
        let n = numeric(lex_num("0x1.8p3"));
        assert_eq!(n.value, NumericValue::Deferred);
    }
}
