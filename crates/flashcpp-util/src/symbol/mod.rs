//! String interning (§3.1 `StringHandle`).
//!
//! A [`StringHandle`] is a compact 4-byte handle into a process-wide
//! [`StringInterner`]. Two handles compare equal iff the strings they name
//! compare equal; hashes are cached at intern time inside the table so that
//! repeat lookups of the same text are O(1).
//!
//! Unlike the concurrent, `DashMap`-backed interner this module grew out of,
//! `StringInterner` is a plain single-owner struct: §5 of the specification
//! mandates a single-threaded compiler core with no internal parallelism, so
//! there is no lock-free data structure to reach for. A multi-translation-unit
//! driver that wants parallelism shards one `StringInterner` per task and
//! merges the resulting tables before object emission (see `DESIGN.md`).

mod interner;

pub use interner::{InternerStats, StringInterner};

/// Opaque handle to an interned string (§3.1).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringHandle(u32);

impl StringHandle {
    /// Reserved handle for "no name" / error recovery placeholders.
    pub const DUMMY: StringHandle = StringHandle(u32::MAX);

    #[inline]
    pub(crate) fn from_index(index: u32) -> Self {
        StringHandle(index)
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_dummy(self) -> bool {
        self.0 == u32::MAX
    }
}

impl std::fmt::Debug for StringHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringHandle(#{})", self.0)
    }
}

impl std::fmt::Display for StringHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_identity_and_content() {
        let mut table = StringInterner::new();
        let a = table.intern("foo");
        let b = table.intern("foo");
        let c = table.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.resolve(a), "foo");
        assert_eq!(table.resolve(c), "bar");
    }
}
