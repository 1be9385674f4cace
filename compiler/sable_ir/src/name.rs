//! Interned string identifier.
//!
//! `Name` is a compact 32-bit handle into a [`NameTable`]. Equality and
//! hashing are O(1) index comparisons; the table owns the string data.

use std::fmt;

use rustc_hash::FxHashMap;

/// Interned string identifier.
///
/// Created by [`NameTable::intern`]; resolved back to text with
/// [`NameTable::resolve`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Create from a raw `u32` value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into the table).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
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

/// String interner backing [`Name`] handles.
///
/// A single-map interner: the full compiler shards this across threads,
/// but a per-pass table has no concurrent writers.
pub struct NameTable {
    map: FxHashMap<Box<str>, Name>,
    names: Vec<Box<str>>,
}

impl NameTable {
    /// Create a table with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut table = Self {
            map: FxHashMap::default(),
            names: Vec::new(),
        };
        let empty = table.intern("");
        debug_assert_eq!(empty, Name::EMPTY);
        table
    }

    /// Intern a string, returning its stable handle.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some(&name) = self.map.get(text) {
            return name;
        }
        let id = u32::try_from(self.names.len())
            .unwrap_or_else(|_| panic!("interned name count exceeds u32::MAX"));
        let name = Name(id);
        let boxed: Box<str> = text.into();
        self.names.push(boxed.clone());
        self.map.insert(boxed, name);
        name
    }

    /// Resolve a handle back to its text.
    ///
    /// # Panics
    ///
    /// Panics if `name` was not produced by this table.
    pub fn resolve(&self, name: Name) -> &str {
        &self.names[name.index()]
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if only the pre-interned empty string is present.
    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}
