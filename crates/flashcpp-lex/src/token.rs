//! Token kinds produced by the lexer (§4.1): identifiers, the closed set of
//! C++20 keywords plus MSVC extensions, numeric/string/char literals,
//! operators, punctuators, and end-of-file.

use flashcpp_util::{Span, StringHandle};

/// A lexed token together with the span it occupies in the source.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(StringHandle),
    Keyword(Keyword),
    Numeric(NumericLiteral),
    Str(StringLiteral),
    Char(CharLiteral),
    Operator(OperatorKind),
    Punctuator(PunctuatorKind),
    Eof,
    /// Illegal character or unterminated literal; the lexer keeps going
    /// best-effort after emitting the diagnostic (§4.1 Failure).
    Invalid(String),
}

/// The closed set of ~110 reserved words recognized by the lexer: the 95
/// keywords of ISO C++20 plus the alternative operator spellings and a
/// subset of MSVC's `__`-prefixed extensions that real headers rely on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Keyword {
    Alignas,
    Alignof,
    Asm,
    Auto,
    Bool,
    Break,
    Case,
    Catch,
    Char,
    Char8T,
    Char16T,
    Char32T,
    Class,
    Concept,
    Const,
    Consteval,
    Constexpr,
    Constinit,
    ConstCast,
    Continue,
    CoAwait,
    CoReturn,
    CoYield,
    Decltype,
    Default,
    Delete,
    Do,
    Double,
    DynamicCast,
    Else,
    Enum,
    Explicit,
    Export,
    Extern,
    False,
    Float,
    For,
    Friend,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Mutable,
    Namespace,
    New,
    Noexcept,
    Nullptr,
    Operator,
    Private,
    Protected,
    Public,
    Register,
    ReinterpretCast,
    Requires,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    StaticAssert,
    StaticCast,
    Struct,
    Switch,
    Template,
    This,
    ThreadLocal,
    Throw,
    True,
    Try,
    Typedef,
    Typeid,
    Typename,
    Union,
    Unsigned,
    Using,
    Virtual,
    Void,
    Volatile,
    WcharT,
    While,
    // Alternative operator spellings (§2.12 [lex.digraph] representations).
    And,
    AndEq,
    BitAnd,
    BitOr,
    Compl,
    Not,
    NotEq,
    Or,
    OrEq,
    Xor,
    XorEq,
    // MSVC extensions that headers and intrinsics in the wild depend on.
    Int8,
    Int16,
    Int32,
    Int64,
    Cdecl,
    Stdcall,
    Fastcall,
    Vectorcall,
    Declspec,
    Forceinline,
    Based,
    Assume,
    Super,
    Interface,
    W64,
    Restrict,
    Ptr32,
    Ptr64,
    Uuidof,
    Leave,
    Except,
    Finally,
}

impl Keyword {
    /// Looks up `text` against the closed keyword set. A single hash lookup,
    /// as required by §4.1: identifiers are only keywords if an exact match
    /// exists here.
    pub fn lookup(text: &str) -> Option<Keyword> {
        keyword_table().get(text).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Alignas => "alignas",
            Keyword::Alignof => "alignof",
            Keyword::Asm => "asm",
            Keyword::Auto => "auto",
            Keyword::Bool => "bool",
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Char => "char",
            Keyword::Char8T => "char8_t",
            Keyword::Char16T => "char16_t",
            Keyword::Char32T => "char32_t",
            Keyword::Class => "class",
            Keyword::Concept => "concept",
            Keyword::Const => "const",
            Keyword::Consteval => "consteval",
            Keyword::Constexpr => "constexpr",
            Keyword::Constinit => "constinit",
            Keyword::ConstCast => "const_cast",
            Keyword::Continue => "continue",
            Keyword::CoAwait => "co_await",
            Keyword::CoReturn => "co_return",
            Keyword::CoYield => "co_yield",
            Keyword::Decltype => "decltype",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Double => "double",
            Keyword::DynamicCast => "dynamic_cast",
            Keyword::Else => "else",
            Keyword::Enum => "enum",
            Keyword::Explicit => "explicit",
            Keyword::Export => "export",
            Keyword::Extern => "extern",
            Keyword::False => "false",
            Keyword::Float => "float",
            Keyword::For => "for",
            Keyword::Friend => "friend",
            Keyword::Goto => "goto",
            Keyword::If => "if",
            Keyword::Inline => "inline",
            Keyword::Int => "int",
            Keyword::Long => "long",
            Keyword::Mutable => "mutable",
            Keyword::Namespace => "namespace",
            Keyword::New => "new",
            Keyword::Noexcept => "noexcept",
            Keyword::Nullptr => "nullptr",
            Keyword::Operator => "operator",
            Keyword::Private => "private",
            Keyword::Protected => "protected",
            Keyword::Public => "public",
            Keyword::Register => "register",
            Keyword::ReinterpretCast => "reinterpret_cast",
            Keyword::Requires => "requires",
            Keyword::Return => "return",
            Keyword::Short => "short",
            Keyword::Signed => "signed",
            Keyword::Sizeof => "sizeof",
            Keyword::Static => "static",
            Keyword::StaticAssert => "static_assert",
            Keyword::StaticCast => "static_cast",
            Keyword::Struct => "struct",
            Keyword::Switch => "switch",
            Keyword::Template => "template",
            Keyword::This => "this",
            Keyword::ThreadLocal => "thread_local",
            Keyword::Throw => "throw",
            Keyword::True => "true",
            Keyword::Try => "try",
            Keyword::Typedef => "typedef",
            Keyword::Typeid => "typeid",
            Keyword::Typename => "typename",
            Keyword::Union => "union",
            Keyword::Unsigned => "unsigned",
            Keyword::Using => "using",
            Keyword::Virtual => "virtual",
            Keyword::Void => "void",
            Keyword::Volatile => "volatile",
            Keyword::WcharT => "wchar_t",
            Keyword::While => "while",
            Keyword::And => "and",
            Keyword::AndEq => "and_eq",
            Keyword::BitAnd => "bitand",
            Keyword::BitOr => "bitor",
            Keyword::Compl => "compl",
            Keyword::Not => "not",
            Keyword::NotEq => "not_eq",
            Keyword::Or => "or",
            Keyword::OrEq => "or_eq",
            Keyword::Xor => "xor",
            Keyword::XorEq => "xor_eq",
            Keyword::Int8 => "__int8",
            Keyword::Int16 => "__int16",
            Keyword::Int32 => "__int32",
            Keyword::Int64 => "__int64",
            Keyword::Cdecl => "__cdecl",
            Keyword::Stdcall => "__stdcall",
            Keyword::Fastcall => "__fastcall",
            Keyword::Vectorcall => "__vectorcall",
            Keyword::Declspec => "__declspec",
            Keyword::Forceinline => "__forceinline",
            Keyword::Based => "__based",
            Keyword::Assume => "__assume",
            Keyword::Super => "__super",
            Keyword::Interface => "__interface",
            Keyword::W64 => "__w64",
            Keyword::Restrict => "__restrict",
            Keyword::Ptr32 => "__ptr32",
            Keyword::Ptr64 => "__ptr64",
            Keyword::Uuidof => "__uuidof",
            Keyword::Leave => "__leave",
            Keyword::Except => "__except",
            Keyword::Finally => "__finally",
        }
    }
}

fn keyword_table() -> &'static flashcpp_util::FxHashMap<&'static str, Keyword> {
    use std::sync::OnceLock;
    static TABLE: OnceLock<flashcpp_util::FxHashMap<&'static str, Keyword>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Keyword::*;
        let all = [
            Alignas, Alignof, Asm, Auto, Bool, Break, Case, Catch, Char, Char8T, Char16T, Char32T,
            Class, Concept, Const, Consteval, Constexpr, Constinit, ConstCast, Continue, CoAwait,
            CoReturn, CoYield, Decltype, Default, Delete, Do, Double, DynamicCast, Else, Enum,
            Explicit, Export, Extern, False, Float, For, Friend, Goto, If, Inline, Int, Long,
            Mutable, Namespace, New, Noexcept, Nullptr, Operator, Private, Protected, Public,
            Register, ReinterpretCast, Requires, Return, Short, Signed, Sizeof, Static,
            StaticAssert, StaticCast, Struct, Switch, Template, This, ThreadLocal, Throw, True,
            Try, Typedef, Typeid, Typename, Union, Unsigned, Using, Virtual, Void, Volatile,
            WcharT, While, And, AndEq, BitAnd, BitOr, Compl, Not, NotEq, Or, OrEq, Xor, XorEq,
            Int8, Int16, Int32, Int64, Cdecl, Stdcall, Fastcall, Vectorcall, Declspec,
            Forceinline, Based, Assume, Super, Interface, W64, Restrict, Ptr32, Ptr64, Uuidof,
            Leave, Except, Finally,
        ];
        all.into_iter().map(|kw| (kw.as_str(), kw)).collect()
    })
}

/// §4.1: base of a numeric literal, independent of whether it is integral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericBase {
    Binary = 2,
    Octal = 8,
    Decimal = 10,
    Hexadecimal = 16,
}

/// Parsed value of a numeric literal, or a deferred range when the literal
/// is a complex float the lexer chooses not to parse precisely (§4.1).
#[derive(Clone, Debug, PartialEq)]
pub enum NumericValue {
    Int(u64),
    Float(f64),
    /// The literal's value needs re-parsing from `NumericLiteral::text` by a
    /// later stage (e.g. hex floats, which Rust's `f64::from_str` rejects).
    Deferred,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntegerSuffix {
    pub unsigned: bool,
    /// 0 = no `L`/`LL`, 1 = `L`, 2 = `LL`.
    pub long_count: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatSuffix {
    None,
    Float,
    LongDouble,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NumericLiteral {
    /// Raw token text (digits, prefix and suffix), kept for exact
    /// reconstruction and for re-parsing deferred float values.
    pub text: StringHandle,
    pub base: NumericBase,
    pub is_float: bool,
    pub value: NumericValue,
    pub int_suffix: IntegerSuffix,
    pub float_suffix: FloatSuffix,
}

/// Encoding prefix of a character or string literal (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    Narrow,
    Wide,
    Utf8,
    Utf16,
    Utf32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StringLiteral {
    /// Decoded bytes, already unescaped. Narrow/UTF-8 strings store their
    /// UTF-8 bytes directly; wide/UTF-16/UTF-32 strings store the
    /// little-endian code-unit bytes for the target encoding.
    pub bytes: Vec<u8>,
    pub encoding: Encoding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharLiteral {
    pub value: u32,
    pub encoding: Encoding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    Assign,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Spaceship,
    AndAnd,
    OrOr,
    LogicalNot,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    Inc,
    Dec,
    Arrow,
    ArrowStar,
    Dot,
    DotStar,
    Question,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PunctuatorKind {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Colon,
    ColonColon,
    Ellipsis,
    Hash,
    HashHash,
}
