//! Function signature optimization.
//!
//! Rewrites function signatures to cheaper equivalents when a function's
//! body proves the original signature over-promises:
//!
//! - **Dead-argument elimination** — arguments used only by their own
//!   balancing releases disappear from the signature.
//! - **Owned-to-guaranteed** — owned arguments the callee releases
//!   mechanically on every path are passed guaranteed instead, and owned
//!   results produced by a balancing retain are returned unowned. Each
//!   conversion deletes a retain/release pair from the hot path.
//! - **Argument explosion** — small aggregate arguments are split into
//!   their scalar leaves, exposing dead and lowerable components
//!   individually.
//!
//! Callers never notice: the original function becomes a thunk that
//! forwards to the specialized function and re-balances every erased
//! ownership obligation. Functions without callers are rewritten in
//! place instead.
//!
//! The entry points are [`optimize_module`] for a whole module and
//! [`FunctionSignatureTransform`] for a single function.

mod dead_arg;
mod explode;
mod owned_to_guaranteed;

pub mod descriptor;
pub mod epilogue;
pub mod mangle;
pub mod plan;
pub mod projection;
pub mod rc_identity;
pub mod transform;

#[cfg(test)]
pub(crate) mod sim;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use descriptor::{
    AppliedDecision, ArgDecision, ArgumentDescriptor, ResultDecision, ResultDescriptor,
};
pub use epilogue::{ArgumentReleases, EpilogueRcMatcher, InstrRef};
pub use plan::{ArgIndexMap, OptimizedFunction, TransformPlan};
pub use projection::{Leaf, ProjNode, ProjectionTree};
pub use rc_identity::RcIdentity;
pub use transform::{
    count_callers, optimize_module, CallerCounts, FunctionSignatureTransform,
};

/// Tunable thresholds for the pass.
///
/// The defaults mirror what profitable call sites look like in practice;
/// tests override individual fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigOptPolicy {
    /// Smallest leaf count worth exploding.
    pub min_explosion_leaves: u32,
    /// Largest leaf count worth exploding, absent partial releases.
    pub max_explosion_leaves: u32,
    /// Hard cap on a type's full decomposition size; above it the type
    /// is treated as opaque.
    pub max_expanded_leaves: u32,
    /// Partial applications needed before dead-argument-only removal
    /// pays for the thunk.
    pub min_partial_applies: u32,
}

impl Default for SigOptPolicy {
    fn default() -> Self {
        Self {
            min_explosion_leaves: 1,
            max_explosion_leaves: 3,
            max_expanded_leaves: 6,
            min_partial_applies: 1,
        }
    }
}
