//! Module-level function storage.
//!
//! A [`Module`] owns every [`Function`] and hands out stable [`FuncId`]
//! handles. Passes that create functions (specializations, thunks) go
//! through the module so name lookup stays consistent.

use rustc_hash::FxHashMap;

use crate::ir::Function;
use crate::name::Name;

/// Function ID within a module. Allocated sequentially from 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FuncId(u32);

impl FuncId {
    /// Create a new function ID from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A collection of IR functions with by-name lookup.
#[derive(Clone, Default)]
pub struct Module {
    functions: Vec<Function>,
    by_name: FxHashMap<Name, FuncId>,
}

impl Module {
    /// Create an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function, returning its handle.
    ///
    /// # Panics
    ///
    /// Debug-panics if a function with the same name already exists.
    pub fn add_function(&mut self, function: Function) -> FuncId {
        debug_assert!(
            !self.by_name.contains_key(&function.name),
            "duplicate function name {:?}",
            function.name,
        );
        let id = FuncId::new(
            u32::try_from(self.functions.len())
                .unwrap_or_else(|_| panic!("function count exceeds u32::MAX")),
        );
        self.by_name.insert(function.name, id);
        self.functions.push(function);
        id
    }

    /// Look up a function by name.
    pub fn lookup(&self, name: Name) -> Option<FuncId> {
        self.by_name.get(&name).copied()
    }

    /// Borrow a function.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this module.
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    /// Mutably borrow a function.
    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    /// Iterate over all (id, function) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId::new(u32::try_from(i).unwrap_or(u32::MAX)), f))
    }

    /// Number of functions in the module.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if the module has no functions.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
