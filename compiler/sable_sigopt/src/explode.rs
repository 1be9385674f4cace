//! Argument explosion.
//!
//! An aggregate argument in the policy window is replaced by one
//! parameter per scalar leaf of its decomposition tree. Callers that
//! build the aggregate just to pass it can then forward the components
//! directly and the aggregate construction dies. Inside the optimized
//! body the original aggregate value is rebuilt from the leaf parameters
//! in an entry prologue, so no use needs rewriting.
//!
//! Explosion subsumes per-leaf ownership lowering: an owned leaf whose
//! releases cover every exit path is passed guaranteed, which is what
//! makes exploding an argument with partial releases profitable even
//! outside the leaf-count window.

use sable_ir::{Function, Instr, TypeTable, ValueId};
use tracing::debug;

use crate::descriptor::{ArgDecision, ArgumentDescriptor};
use crate::epilogue::{ArgumentReleases, EpilogueRcMatcher};
use crate::plan::TransformPlan;
use crate::SigOptPolicy;

/// Mark every argument worth exploding. Returns `true` if any verdict
/// changed.
///
/// Runs after ownership lowering: a lowered argument can still explode,
/// and its leaves inherit the guaranteed convention.
pub(crate) fn analyze(
    plan: &mut TransformPlan,
    types: &TypeTable,
    policy: &SigOptPolicy,
    matcher: &EpilogueRcMatcher<'_>,
) -> bool {
    let mut changed = false;
    for desc in &mut plan.args {
        let lowered = match desc.decision {
            ArgDecision::Unchanged => false,
            ArgDecision::OwnershipLowered => true,
            _ => continue,
        };
        if !desc.should_explode(types, policy) {
            continue;
        }
        let leaves = desc.tree.leaves();
        let mut leaf_lowered = vec![false; leaves.len()];
        let mut leaf_releases = vec![ArgumentReleases::default(); leaves.len()];
        for (i, leaf) in leaves.iter().enumerate() {
            if types.is_trivial(leaf.ty) {
                continue;
            }
            if lowered {
                // Whole-argument releases are already recorded on the
                // descriptor; the leaves just inherit the convention.
                leaf_lowered[i] = true;
                continue;
            }
            if desc.convention.is_owned() {
                let releases = matcher.complete_releases_for_projection(desc.value, &leaf.path);
                if !releases.is_empty() {
                    leaf_lowered[i] = true;
                    leaf_releases[i] = releases;
                }
            }
        }
        debug!(
            arg = desc.index,
            leaves = leaves.len(),
            "exploding aggregate argument",
        );
        desc.leaf_lowered = leaf_lowered;
        desc.leaf_releases = leaf_releases;
        desc.decision = ArgDecision::Exploded {
            leaves: u32::try_from(leaves.len())
                .unwrap_or_else(|_| panic!("leaf count exceeds u32::MAX")),
        };
        changed = true;
    }
    changed
}

/// Instructions rebuilding the original aggregate value of `desc` from
/// its leaf parameters, for insertion at the top of the entry block.
///
/// The final instruction defines the old argument's `ValueId`, so every
/// existing use keeps working without substitution.
pub(crate) fn reconstruction_prologue(
    func: &mut Function,
    desc: &ArgumentDescriptor,
    leaf_values: &[ValueId],
) -> Vec<Instr> {
    debug_assert!(!desc.tree.is_singleton(), "exploded a singleton tree");
    let mut out = Vec::new();
    let mut next_leaf = 0;
    build_node(func, desc, 0, leaf_values, &mut next_leaf, &mut out);
    debug_assert_eq!(next_leaf, leaf_values.len(), "leaf values left over");
    out
}

fn build_node(
    func: &mut Function,
    desc: &ArgumentDescriptor,
    node: u32,
    leaf_values: &[ValueId],
    next_leaf: &mut usize,
    out: &mut Vec<Instr>,
) -> ValueId {
    let (ty, children) = {
        let n = desc.tree.node(node);
        (n.ty, n.children.clone())
    };
    if children.is_empty() {
        let value = leaf_values[*next_leaf];
        *next_leaf += 1;
        return value;
    }
    let fields: Vec<ValueId> = children
        .iter()
        .map(|&c| build_node(func, desc, c, leaf_values, next_leaf, out))
        .collect();
    let dst = if node == 0 {
        desc.value
    } else {
        func.fresh_value(ty)
    };
    out.push(Instr::Aggregate { dst, ty, fields });
    dst
}
