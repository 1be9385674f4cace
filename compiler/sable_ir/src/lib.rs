//! Mid-level SSA intermediate representation for the Sable compiler.
//!
//! This crate provides:
//!
//! - **Names** ([`Name`], [`NameTable`]) — compact interned identifiers.
//! - **Types** ([`TypeId`], [`TypeTable`], [`TypeKind`]) — a pooled type
//!   representation with O(1) equality, structural triviality, and the
//!   aggregate-shape queries signature optimization needs.
//! - **IR** ([`Function`], [`Block`], [`Instr`], [`Terminator`]) — a
//!   basic-block representation with explicit ownership conventions on
//!   parameters and results, and explicit `Retain`/`Release` traffic.
//! - **Construction** ([`FunctionBuilder`], [`Module`]) — the facility
//!   passes use to synthesize new functions and rewrite existing ones.
//!
//! # Design
//!
//! Values are SSA ([`ValueId`]) and control flow uses block parameters
//! rather than phi nodes, in the style of LLVM IR, Lean 4's LCNF, and
//! Rust's MIR. Ownership follows the owned/guaranteed/indirect/trivial
//! convention lattice; retain/release instructions are the only
//! reference-count effects.

pub mod builder;
pub mod ir;
pub mod module;
pub mod name;
pub mod types;

pub use builder::FunctionBuilder;
pub use ir::{
    Block, BlockId, Function, Instr, Lit, OwnershipKind, Param, ParamConvention, ResultConvention,
    ResultInfo, Terminator, ValueId,
};
pub use module::{FuncId, Module};
pub use name::{Name, NameTable};
pub use types::{TypeId, TypeKind, TypeTable};
