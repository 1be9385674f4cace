//! Owned-to-guaranteed conversion.
//!
//! An owned argument whose ownership the callee discharges mechanically
//! (an epilogue release on every exit path) can be passed guaranteed
//! instead: the callee stops releasing, the caller keeps the value alive
//! across the call, and the thunk releases it after the call returns.
//! Dually, an owned result produced by a balancing retain on every
//! return path can be returned unowned, with the thunk retaining it on
//! the way out.

use sable_ir::{Function, ResultConvention, TypeTable};
use tracing::debug;

use crate::descriptor::{ArgDecision, ResultDecision};
use crate::epilogue::{EpilogueRcMatcher, InstrRef};
use crate::plan::TransformPlan;

/// Mark every convertible owned parameter. Returns `true` if any verdict
/// changed.
pub(crate) fn analyze_parameters(
    plan: &mut TransformPlan,
    types: &TypeTable,
    matcher: &EpilogueRcMatcher<'_>,
) -> bool {
    let mut changed = false;
    for desc in &mut plan.args {
        if desc.decision != ArgDecision::Unchanged {
            continue;
        }
        if !desc.convention.is_owned() || types.is_trivial(desc.ty) {
            continue;
        }
        let releases = matcher.complete_releases_for_argument(desc.value);
        if releases.is_empty() {
            desc.has_partial_releases = matcher.has_some_releases_for_argument(desc.value);
            continue;
        }
        debug!(arg = desc.index, "lowering owned argument to guaranteed");
        desc.releases = releases;
        desc.decision = ArgDecision::OwnershipLowered;
        changed = true;
    }
    changed
}

/// Mark the result convertible if every return path produces it with a
/// balancing retain. Returns `true` if the verdict changed.
pub(crate) fn analyze_results(
    plan: &mut TransformPlan,
    types: &TypeTable,
    matcher: &EpilogueRcMatcher<'_>,
) -> bool {
    let [result] = &mut plan.results[..] else {
        return false;
    };
    if result.decision != ResultDecision::Unchanged {
        return false;
    }
    if result.convention != ResultConvention::Owned || types.is_trivial(result.ty) {
        return false;
    }
    let retains = matcher.retains_for_result();
    if retains.is_empty() {
        return false;
    }
    debug!("lowering owned result to unowned");
    result.retains = retains;
    result.decision = ResultDecision::OwnershipLowered;
    true
}

/// Delete the instructions at `refs` from `func`.
///
/// Positions must all be distinct; deletion runs in descending order so
/// earlier indices stay valid.
pub(crate) fn strip_rc_instructions(func: &mut Function, refs: &mut Vec<InstrRef>) {
    refs.sort_unstable();
    refs.dedup();
    for r in refs.iter().rev() {
        func.blocks[r.block.index()].body.remove(r.index as usize);
    }
}
