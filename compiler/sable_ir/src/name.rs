//! Interned identifier names.
//!
//! Provides compact 32-bit interned identifiers plus the interner that
//! backs them. The lowering pipeline is strictly single-threaded, so the
//! interner uses plain `FxHashMap` storage with no locking.

use std::fmt;

use rustc_hash::FxHashMap;

/// Interned string identifier.
///
/// A `Name` is an index into a [`StringInterner`]. Index 0 is reserved
/// for the empty string, which stands for "unnamed" throughout the IR
/// (anonymous bindings, unnamed instructions).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Create from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for the reserved "unnamed" name.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// String interner producing [`Name`] identifiers.
///
/// O(1) interning and lookup. Interning the same string twice returns
/// the same `Name`.
pub struct StringInterner {
    map: FxHashMap<String, u32>,
    strings: Vec<String>,
}

impl StringInterner {
    /// Create an interner with the empty string pre-interned as
    /// [`Name::EMPTY`].
    pub fn new() -> Self {
        let mut interner = Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(64),
        };
        interner.strings.push(String::new());
        interner.map.insert(String::new(), 0);
        interner
    }

    /// Intern a string, returning its `Name`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "interned string counts never exceed u32"
    )]
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&idx) = self.map.get(s) {
            return Name::from_raw(idx);
        }
        let idx = self.strings.len() as u32;
        self.strings.push(s.to_owned());
        self.map.insert(s.to_owned(), idx);
        Name::from_raw(idx)
    }

    /// Resolve a `Name` back to its string.
    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.index()]
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
