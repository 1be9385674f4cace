//! Epilogue reference-count matching.
//!
//! Owned-to-guaranteed conversion needs proof that a callee's ownership
//! obligation is discharged mechanically: a release of the argument on
//! every path out of the function, sitting in the exit block with no use
//! of the argument after it. This module finds those releases, and the
//! balancing retains that produce an owned result.
//!
//! # Algorithm
//!
//! Matching works at exit-block granularity. For a candidate root, each
//! exit block is scanned backwards for the last `Release` of that root;
//! the match holds only if nothing after the release (including the
//! terminator) uses the root. A release set is *complete* when every
//! normal-return block and every throw block has a match; a *partial*
//! set (some but not all exits) blocks the conversion but feeds the
//! explosion heuristic.

use sable_ir::{BlockId, Function, Instr, Terminator, ValueId};
use smallvec::SmallVec;

use crate::rc_identity::RcIdentity;

/// Position of an instruction: block plus index into its body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstrRef {
    pub block: BlockId,
    pub index: u32,
}

/// The complete set of epilogue releases for one argument, split by
/// exit kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgumentReleases {
    /// One release per normal-return block.
    pub normal: SmallVec<[InstrRef; 2]>,
    /// One release per throw block.
    pub throw: SmallVec<[InstrRef; 1]>,
}

impl ArgumentReleases {
    /// Returns `true` if no releases were found.
    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.throw.is_empty()
    }

    /// All recorded release positions.
    pub fn iter(&self) -> impl Iterator<Item = InstrRef> + '_ {
        self.normal.iter().chain(self.throw.iter()).copied()
    }
}

/// Matches epilogue retains and releases against function arguments.
pub struct EpilogueRcMatcher<'f> {
    func: &'f Function,
    rcid: &'f RcIdentity,
    normal_exits: Vec<BlockId>,
    throw_exits: Vec<BlockId>,
}

impl<'f> EpilogueRcMatcher<'f> {
    pub fn new(func: &'f Function, rcid: &'f RcIdentity) -> Self {
        let (normal_exits, throw_exits) = func.exit_blocks();
        Self {
            func,
            rcid,
            normal_exits,
            throw_exits,
        }
    }

    /// The last `Release` of `root` in `block`, provided nothing after it
    /// (terminator included) uses the root.
    fn epilogue_release_in(&self, block: BlockId, root: ValueId) -> Option<InstrRef> {
        let b = &self.func.blocks[block.index()];
        let mut found = None;
        for (i, instr) in b.body.iter().enumerate() {
            if let Instr::Release { value } = *instr {
                if self.rcid.root(value) == root {
                    found = Some(i);
                }
            }
        }
        let index = found?;
        for instr in &b.body[index + 1..] {
            if self.uses_root(&instr.used_values(), root) {
                return None;
            }
        }
        if self.uses_root(&b.terminator.used_values(), root) {
            return None;
        }
        Some(InstrRef {
            block,
            index: u32::try_from(index).unwrap_or_else(|_| panic!("block body exceeds u32::MAX")),
        })
    }

    fn uses_root(&self, values: &[ValueId], root: ValueId) -> bool {
        values.iter().any(|&v| self.rcid.root(v) == root)
    }

    /// Epilogue releases of `value` covering every exit path, or an empty
    /// set if any path lacks one.
    pub fn complete_releases_for_argument(&self, value: ValueId) -> ArgumentReleases {
        self.complete_releases_of_root(self.rcid.root(value))
    }

    fn complete_releases_of_root(&self, root: ValueId) -> ArgumentReleases {
        if self.normal_exits.is_empty() {
            return ArgumentReleases::default();
        }
        let mut releases = ArgumentReleases::default();
        for &block in &self.normal_exits {
            match self.epilogue_release_in(block, root) {
                Some(r) => releases.normal.push(r),
                None => return ArgumentReleases::default(),
            }
        }
        for &block in &self.throw_exits {
            match self.epilogue_release_in(block, root) {
                Some(r) => releases.throw.push(r),
                None => return ArgumentReleases::default(),
            }
        }
        releases
    }

    /// Returns `true` if at least one exit path ends in an epilogue
    /// release of `value`. A true result with an empty complete set means
    /// the argument's ownership is consumed on some paths only.
    pub fn has_some_releases_for_argument(&self, value: ValueId) -> bool {
        let root = self.rcid.root(value);
        self.normal_exits
            .iter()
            .chain(self.throw_exits.iter())
            .any(|&block| self.epilogue_release_in(block, root).is_some())
    }

    /// Epilogue releases covering every exit path for the projection of
    /// `value` at `path`, or an empty set.
    ///
    /// The projection must be materialized by `Project` instructions in
    /// the body; a leaf that is never projected out has no releases to
    /// find.
    pub fn complete_releases_for_projection(
        &self,
        value: ValueId,
        path: &[u32],
    ) -> ArgumentReleases {
        let mut root = self.rcid.root(value);
        for &field in path {
            match self.find_projection(root, field) {
                Some(dst) => root = self.rcid.root(dst),
                None => return ArgumentReleases::default(),
            }
        }
        self.complete_releases_of_root(root)
    }

    fn find_projection(&self, base_root: ValueId, field: u32) -> Option<ValueId> {
        for block in &self.func.blocks {
            for instr in &block.body {
                if let Instr::Project {
                    dst,
                    base,
                    field: f,
                    ..
                } = *instr
                {
                    if f == field && self.rcid.root(base) == base_root {
                        return Some(dst);
                    }
                }
            }
        }
        None
    }

    /// The retains that produce the owned result, one per normal-return
    /// block, or an empty set if any return path lacks one.
    ///
    /// A match is the last `Retain` of the returned value's root in the
    /// exit block, with no `Release` of that root after it.
    pub fn retains_for_result(&self) -> SmallVec<[InstrRef; 2]> {
        if self.normal_exits.is_empty() {
            return SmallVec::new();
        }
        let mut retains = SmallVec::new();
        for &block in &self.normal_exits {
            let b = &self.func.blocks[block.index()];
            let Terminator::Return { value } = b.terminator else {
                return SmallVec::new();
            };
            let root = self.rcid.root(value);
            let mut found = None;
            for (i, instr) in b.body.iter().enumerate() {
                match *instr {
                    Instr::Retain { value: v } if self.rcid.root(v) == root => found = Some(i),
                    Instr::Release { value: v } if self.rcid.root(v) == root => found = None,
                    _ => {}
                }
            }
            match found {
                Some(index) => retains.push(InstrRef {
                    block,
                    index: u32::try_from(index)
                        .unwrap_or_else(|_| panic!("block body exceeds u32::MAX")),
                }),
                None => return SmallVec::new(),
            }
        }
        retains
    }
}
