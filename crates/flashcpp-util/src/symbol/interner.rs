//! Single-threaded string interner backed by `rustc_hash::FxHashMap`.

use rustc_hash::FxHashMap;

use super::StringHandle;

/// Process-wide (per-session) string table.
///
/// Strings are leaked to `'static` once interned: the table only grows for
/// the lifetime of one compilation, never shrinks, and is dropped wholesale
/// at end-of-translation-unit (§3.4).
pub struct StringInterner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
    hits: usize,
    misses: usize,
}

/// Snapshot of interner activity, useful for `-v` diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct InternerStats {
    pub count: usize,
    pub hits: usize,
    pub misses: usize,
}

impl InternerStats {
    pub fn load_factor(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.hits as f64 / self.count as f64
        }
    }
}

impl StringInterner {
    pub fn new() -> Self {
        let mut this = Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
            hits: 0,
            misses: 0,
        };
        this.intern("");
        this
    }

    /// Intern `string`, returning its stable handle.
    pub fn intern(&mut self, string: &str) -> StringHandle {
        if let Some(&idx) = self.map.get(string) {
            self.hits += 1;
            return StringHandle::from_index(idx);
        }
        self.misses += 1;
        let leaked: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let idx = self.strings.len() as u32;
        self.strings.push(leaked);
        self.map.insert(leaked, idx);
        StringHandle::from_index(idx)
    }

    /// Resolve a handle back to its text. Panics on a handle never produced
    /// by this interner (an internal-compiler-error condition).
    pub fn resolve(&self, handle: StringHandle) -> &str {
        self.strings
            .get(handle.as_u32() as usize)
            .unwrap_or_else(|| panic!("dangling StringHandle {handle:?}"))
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats {
            count: self.strings.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_handle_zero() {
        let interner = StringInterner::new();
        assert_eq!(interner.resolve(StringHandle::from_index(0)), "");
    }

    #[test]
    fn repeated_intern_is_a_hit() {
        let mut interner = StringInterner::new();
        interner.intern("identifier");
        let before = interner.stats().hits;
        interner.intern("identifier");
        assert_eq!(interner.stats().hits, before + 1);
    }
}
