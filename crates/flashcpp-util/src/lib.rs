//! flashcpp-util - foundation types shared by every stage of the pipeline.
//!
//! This crate has no dependency on any other `flashcpp-*` crate. It provides:
//!
//! - [`symbol`]: single-threaded string interning (`StringHandle`).
//! - [`span`]: source locations and the `SourceMap` that resolves them back
//!   to file/line/column, including the preprocessor line-mapping table.
//! - [`diagnostic`]: the `Handler`/`Diagnostic`/`DiagnosticBuilder` reporting
//!   pipeline and the `ErrorKind` taxonomy used to render error messages.
//! - [`index_vec`]: arena-style `IndexVec<I, T>` plus the `Idx` trait, used
//!   throughout the AST, IR and machine-code layers instead of raw indices
//!   into a `Vec`.
//!
//! Every compiler-wide table (strings, types, namespaces, templates) is a
//! plain owned struct here, not a global. The driver crate constructs one of
//! each per compilation and threads `&mut` references through the pipeline.

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, ErrorKind, Handler, InstantiationFrame, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, LineMapping, SourceFile, SourceMap, Span};
pub use symbol::{InternerStats, StringHandle, StringInterner};

pub use rustc_hash::{FxHashMap, FxHashSet};

/// Defines a newtype index backed by `u32` and implementing [`Idx`].
///
/// ```
/// flashcpp_util::define_idx!(ExprId);
/// ```
#[macro_export]
macro_rules! define_idx {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}
