//! The object file writer (§4.8): encodes `flashcpp-codegen`'s LIR into
//! x86-64 machine code and assembles it, with symbols and relocations,
//! into an ELF or PE/COFF object via the `object` crate. No external
//! assembler or linker is invoked - this crate only emits bytes.

pub mod encode;
pub mod error;
pub mod writer;
#[cfg(test)]
mod tests;

pub use encode::{encode_function, EncodedFunction, PendingRelocation, RelocKind};
pub use error::{ObjectError, Result};
pub use writer::write_object;

use flashcpp_codegen::Module;
use flashcpp_util::StringInterner;

/// Encodes every function in `module` and assembles the finished object
/// file's bytes for `module.target`.
pub fn write_module(module: &Module, interner: &StringInterner) -> Result<Vec<u8>> {
    let functions: Vec<EncodedFunction> =
        module.functions.iter().map(encode_function).collect::<Result<_>>()?;
    write_object(module.target, &functions, &module.globals, interner)
}
