//! The error-kind taxonomy from §7: not a Rust `enum Error` per crate, but the
//! *category label* that appears in the `<file>:<line>:<col>: <kind>: <msg>`
//! rendering every diagnostic ultimately goes through, regardless of which
//! pipeline stage produced it.

use std::fmt;

/// One of the nine error categories named in §7 of the specification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexical,
    Parse,
    Name,
    Type,
    Template,
    Semantic,
    Codegen,
    Io,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Lexical => "LexicalError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Template => "TemplateError",
            ErrorKind::Semantic => "SemanticError",
            ErrorKind::Codegen => "CodegenError",
            ErrorKind::Io => "IOError",
            ErrorKind::Internal => "InternalError",
        };
        f.write_str(s)
    }
}

/// One frame of the `instantiated from <template><args> at <file>:<line>:<col>`
/// chain appended to errors raised during template instantiation (§7).
#[derive(Clone, Debug)]
pub struct InstantiationFrame {
    pub template_display: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for InstantiationFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instantiated from {} at {}:{}:{}",
            self.template_display, self.file, self.line, self.column
        )
    }
}
