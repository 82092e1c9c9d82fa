//! Error types for object file emission.

use thiserror::Error;

/// Error type for the object file writer.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// A `Call`/`Jmp` target label was never emitted in the function it
    /// was referenced from.
    #[error("label '{0}' not found in function")]
    LabelNotFound(String),

    /// An addressing mode or operand combination the encoder has no
    /// lowering for.
    #[error("unencodable operand: {0}")]
    UnencodableOperand(String),

    /// The underlying `object` crate rejected a section/symbol/relocation.
    #[error("object writer error: {0}")]
    ObjectWrite(String),

    /// Writing the finished object file's bytes failed.
    #[error("failed to emit object file: {0}")]
    Emit(String),
}

pub type Result<T> = std::result::Result<T, ObjectError>;
