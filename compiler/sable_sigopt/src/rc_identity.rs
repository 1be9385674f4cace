//! Reference-count identity analysis.
//!
//! `Copy` instructions are reference-count-transparent: a retain or
//! release of the copy counts against the original value. Epilogue
//! matching must therefore look through copy chains when deciding
//! whether a release balances an argument. [`RcIdentity`] resolves every
//! value to its copy-chain root in one pass over the function.

use sable_ir::{Function, Instr, ValueId};

/// Maps each value to the root of its `Copy` chain.
pub struct RcIdentity {
    /// `parent[v]` is the copied-from value, or `v` itself when the value
    /// is not a copy.
    parent: Vec<ValueId>,
}

impl RcIdentity {
    /// Compute copy-chain parents for every value in `func`.
    pub fn analyze(func: &Function) -> Self {
        let mut parent: Vec<ValueId> = (0..func.value_types.len())
            .map(|i| {
                ValueId::new(u32::try_from(i).unwrap_or_else(|_| panic!("value id overflow")))
            })
            .collect();
        for block in &func.blocks {
            for instr in &block.body {
                if let Instr::Copy { dst, src, .. } = *instr {
                    parent[dst.index()] = src;
                }
            }
        }
        Self { parent }
    }

    /// The reference-count root of `value`.
    ///
    /// Chains terminate because SSA definitions cannot form cycles.
    pub fn root(&self, value: ValueId) -> ValueId {
        let mut v = value;
        loop {
            let p = self.parent[v.index()];
            if p == v {
                return v;
            }
            v = p;
        }
    }

    /// Returns `true` if `a` and `b` name the same reference count.
    pub fn same(&self, a: ValueId, b: ValueId) -> bool {
        self.root(a) == self.root(b)
    }
}
