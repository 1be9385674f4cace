//! SSA basic-block intermediate representation.
//!
//! The signature-optimization pass operates on this IR. A [`Function`] is a
//! control-flow graph of [`Block`]s; each block holds sequential [`Instr`]s
//! and ends in exactly one [`Terminator`]. Values are named via [`ValueId`]
//! (SSA — every value has exactly one definition) and control flow uses
//! [`BlockId`] references, with block parameters instead of phi nodes.
//!
//! Ownership is explicit: every function parameter carries a
//! [`ParamConvention`] and every direct result a [`ResultConvention`].
//! Reference-count traffic appears as `Retain`/`Release` instructions.

use crate::name::Name;
use crate::types::TypeId;

// ── ID newtypes ─────────────────────────────────────────────────────

/// SSA value ID within a function. Allocated sequentially from 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ValueId(u32);

impl ValueId {
    /// Create a new value ID from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Basic block ID within a function. Allocated sequentially from 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID from a raw index.
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

// ── Conventions ─────────────────────────────────────────────────────

/// How an argument's lifetime is managed across a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamConvention {
    /// Passed by value; the callee must release it.
    DirectOwned,
    /// Passed by value; the caller keeps it alive for the call's duration,
    /// the callee must not release it.
    DirectGuaranteed,
    /// Passed by address; the callee consumes the pointee.
    IndirectIn,
    /// Passed by address; the caller keeps the pointee alive.
    IndirectInGuaranteed,
    /// Passed by address; read-write, written back on return.
    IndirectInout,
    /// An out-parameter slot for an indirect result.
    IndirectResult,
    /// No reference counting needed.
    Trivial,
}

impl ParamConvention {
    /// Returns `true` if the callee consumes ownership of the argument.
    pub fn is_owned(self) -> bool {
        matches!(self, Self::DirectOwned | Self::IndirectIn)
    }

    /// Returns `true` if the caller retains the argument for the call.
    pub fn is_guaranteed(self) -> bool {
        matches!(self, Self::DirectGuaranteed | Self::IndirectInGuaranteed)
    }

    /// Returns `true` for any of the by-address conventions.
    pub fn is_indirect(self) -> bool {
        matches!(
            self,
            Self::IndirectIn
                | Self::IndirectInGuaranteed
                | Self::IndirectInout
                | Self::IndirectResult
        )
    }

    /// Returns `true` if this argument is an indirect result slot.
    pub fn is_indirect_result(self) -> bool {
        matches!(self, Self::IndirectResult)
    }

    /// Returns `true` if this argument is written back on return.
    pub fn is_inout(self) -> bool {
        matches!(self, Self::IndirectInout)
    }
}

/// How a direct result's lifetime is managed across a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultConvention {
    /// The caller receives ownership and must release it.
    Owned,
    /// The caller receives a borrowed value it must not release.
    Unowned,
    /// Returned through an indirect result slot.
    Indirect,
}

/// Ownership category of a single value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OwnershipKind {
    /// Not reference counted.
    Trivial,
    /// Holds a +1 reference.
    Owned,
    /// Borrowed; kept alive by someone else.
    Guaranteed,
}

// ── Signature pieces ────────────────────────────────────────────────

/// A function parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    /// The entry-block value bound to this parameter.
    pub value: ValueId,
    /// The parameter's type.
    pub ty: TypeId,
    /// Passing convention.
    pub convention: ParamConvention,
    /// Source-level declaration, when one exists.
    pub decl: Option<Name>,
}

/// A direct result of a function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResultInfo {
    /// The result's type.
    pub ty: TypeId,
    /// Passing convention.
    pub convention: ResultConvention,
}

// ── Literals ────────────────────────────────────────────────────────

/// Literal constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lit {
    Int(i64),
    /// Bit pattern of an `f64`; stored raw so `Lit` stays `Eq`/`Hash`.
    Float(u64),
    Bool(bool),
    Str(Name),
    Unit,
}

// ── Instructions ────────────────────────────────────────────────────

/// A single instruction in a basic block.
///
/// Value-producing instructions bind `dst`; `Retain`/`Release` are
/// side-effect-only reference-count operations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instr {
    /// Bind a literal constant: `let dst: ty = value`.
    Literal { dst: ValueId, ty: TypeId, value: Lit },

    /// Reference-count-transparent alias: `let dst: ty = src`.
    Copy { dst: ValueId, ty: TypeId, src: ValueId },

    /// Direct function call: `let dst: ty = callee(args...)`.
    Apply {
        dst: ValueId,
        ty: TypeId,
        callee: Name,
        args: Vec<ValueId>,
    },

    /// Partial application / closure creation over `callee`.
    PartialApply {
        dst: ValueId,
        ty: TypeId,
        callee: Name,
        args: Vec<ValueId>,
    },

    /// Field projection: `let dst: ty = base.field`. Pure; borrows from
    /// `base`, no ownership transfer.
    Project {
        dst: ValueId,
        ty: TypeId,
        base: ValueId,
        field: u32,
    },

    /// Aggregate construction from ordered field values. Pure composition
    /// with no reference-count effect of its own.
    Aggregate {
        dst: ValueId,
        ty: TypeId,
        fields: Vec<ValueId>,
    },

    /// Increment the reference count of `value`.
    Retain { value: ValueId },

    /// Decrement the reference count of `value`, freeing at zero.
    Release { value: ValueId },
}

impl Instr {
    /// Returns the value defined (written) by this instruction, if any.
    pub fn defined_value(&self) -> Option<ValueId> {
        match self {
            Instr::Literal { dst, .. }
            | Instr::Copy { dst, .. }
            | Instr::Apply { dst, .. }
            | Instr::PartialApply { dst, .. }
            | Instr::Project { dst, .. }
            | Instr::Aggregate { dst, .. } => Some(*dst),
            Instr::Retain { .. } | Instr::Release { .. } => None,
        }
    }

    /// Returns all values read (used) by this instruction. The `dst` of
    /// value-producing instructions is a definition, not a use.
    pub fn used_values(&self) -> Vec<ValueId> {
        match self {
            Instr::Literal { .. } => vec![],
            Instr::Copy { src, .. } => vec![*src],
            Instr::Apply { args, .. } | Instr::PartialApply { args, .. } => args.clone(),
            Instr::Project { base, .. } => vec![*base],
            Instr::Aggregate { fields, .. } => fields.clone(),
            Instr::Retain { value } | Instr::Release { value } => vec![*value],
        }
    }

    /// Replace all occurrences of `old` with `new` in read positions.
    pub fn substitute_value(&mut self, old: ValueId, new: ValueId) {
        fn sub(v: &mut ValueId, old: ValueId, new: ValueId) {
            if *v == old {
                *v = new;
            }
        }
        match self {
            Instr::Literal { .. } => {}
            Instr::Copy { src, .. } => sub(src, old, new),
            Instr::Apply { args, .. } | Instr::PartialApply { args, .. } => {
                for a in args {
                    sub(a, old, new);
                }
            }
            Instr::Project { base, .. } => sub(base, old, new),
            Instr::Aggregate { fields, .. } => {
                for f in fields {
                    sub(f, old, new);
                }
            }
            Instr::Retain { value } | Instr::Release { value } => sub(value, old, new),
        }
    }
}

// ── Terminators ─────────────────────────────────────────────────────

/// Block terminator — how control leaves a basic block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Terminator {
    /// Normal return of a value.
    Return { value: ValueId },

    /// Error return along the function's throw path.
    Throw { value: ValueId },

    /// Unconditional jump, passing arguments to the target's block params.
    Jump { target: BlockId, args: Vec<ValueId> },

    /// Conditional branch on a boolean.
    Branch {
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },

    /// Marks a block as unreachable.
    Unreachable,
}

impl Terminator {
    /// Returns all values read by this terminator.
    pub fn used_values(&self) -> Vec<ValueId> {
        match self {
            Terminator::Return { value } | Terminator::Throw { value } => vec![*value],
            Terminator::Jump { args, .. } => args.clone(),
            Terminator::Branch { cond, .. } => vec![*cond],
            Terminator::Unreachable => vec![],
        }
    }

    /// Successor blocks reached from this terminator.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump { target, .. } => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Return { .. } | Terminator::Throw { .. } | Terminator::Unreachable => {
                vec![]
            }
        }
    }

    /// Returns `true` if this terminator leaves the function.
    pub fn is_function_exit(&self) -> bool {
        matches!(self, Terminator::Return { .. } | Terminator::Throw { .. })
    }
}

// ── Blocks and functions ────────────────────────────────────────────

/// A basic block: parameters, sequential body, one terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// This block's identifier.
    pub id: BlockId,
    /// Block parameters — values passed from predecessors via `Jump`.
    pub params: Vec<(ValueId, TypeId)>,
    /// Sequential instructions executed in order.
    pub body: Vec<Instr>,
    /// How control leaves this block.
    pub terminator: Terminator,
}

/// A complete IR function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    /// The function's mangled name.
    pub name: Name,
    /// Parameters with passing conventions, in signature order.
    pub params: Vec<Param>,
    /// Direct results. `Return` carries one value; `results[0]` describes
    /// it. The list form mirrors the signature model and never exceeds one
    /// entry in practice.
    pub results: Vec<ResultInfo>,
    /// Whether the last parameter is a method receiver.
    pub is_method: bool,
    /// Basic blocks in definition order; `blocks[entry.index()]` is the entry.
    pub blocks: Vec<Block>,
    /// The entry block ID.
    pub entry: BlockId,
    /// Type of each value, indexed by `ValueId::index()`.
    pub value_types: Vec<TypeId>,
}

impl Function {
    /// Look up the type of a value.
    ///
    /// # Panics
    ///
    /// Debug-panics if `value` is out of bounds.
    #[inline]
    pub fn value_type(&self, value: ValueId) -> TypeId {
        debug_assert!(
            value.index() < self.value_types.len(),
            "ValueId {} out of bounds (have {} values)",
            value.raw(),
            self.value_types.len(),
        );
        self.value_types[value.index()]
    }

    /// Allocate a fresh value with the given type.
    pub fn fresh_value(&mut self, ty: TypeId) -> ValueId {
        let id = u32::try_from(self.value_types.len())
            .unwrap_or_else(|_| panic!("value count exceeds u32::MAX"));
        self.value_types.push(ty);
        ValueId::new(id)
    }

    /// Append a new basic block.
    ///
    /// # Panics
    ///
    /// Debug-panics if `block.id` does not match the next sequential index.
    pub fn push_block(&mut self, block: Block) {
        let expected = self.next_block_id();
        debug_assert_eq!(
            block.id,
            expected,
            "block ID {} does not match expected index {}",
            block.id.raw(),
            expected.raw(),
        );
        self.blocks.push(block);
    }

    /// The [`BlockId`] the next [`push_block`](Self::push_block) will use.
    pub fn next_block_id(&self) -> BlockId {
        BlockId::new(
            u32::try_from(self.blocks.len())
                .unwrap_or_else(|_| panic!("block count exceeds u32::MAX")),
        )
    }

    /// Block IDs whose terminator leaves the function, split into
    /// (normal-return blocks, throw blocks).
    pub fn exit_blocks(&self) -> (Vec<BlockId>, Vec<BlockId>) {
        let mut normal = Vec::new();
        let mut throw = Vec::new();
        for block in &self.blocks {
            match block.terminator {
                Terminator::Return { .. } => normal.push(block.id),
                Terminator::Throw { .. } => throw.push(block.id),
                _ => {}
            }
        }
        (normal, throw)
    }

    /// Returns the parameter index of `value`, if it is a parameter.
    pub fn param_index(&self, value: ValueId) -> Option<usize> {
        self.params.iter().position(|p| p.value == value)
    }
}
