//! Dead-argument analysis and finalization.
//!
//! An argument is dead when its only uses are the releases that balance
//! its own ownership. Removing it from the signature lets the caller
//! skip materializing the value entirely; the callee loses the
//! balancing releases, and the thunk picks up the ownership obligation.
//!
//! Inout arguments and indirect result slots are never considered: both
//! carry effects visible to the caller even when the body ignores them.

use sable_ir::{Function, Instr, ValueId};
use tracing::debug;

use crate::descriptor::ArgDecision;
use crate::plan::TransformPlan;
use crate::rc_identity::RcIdentity;

/// Mark every dead argument in the plan. Returns `true` if any verdict
/// changed.
pub(crate) fn analyze(plan: &mut TransformPlan, func: &Function, rcid: &RcIdentity) -> bool {
    let mut changed = false;
    for desc in &mut plan.args {
        if desc.decision != ArgDecision::Unchanged {
            continue;
        }
        if desc.convention.is_inout() || desc.convention.is_indirect_result() {
            continue;
        }
        if has_real_use(func, rcid, desc.value) {
            continue;
        }
        debug!(arg = desc.index, "argument is dead");
        desc.decision = ArgDecision::Dead;
        changed = true;
    }
    changed
}

/// Any use of `value` other than a release balancing its own count.
fn has_real_use(func: &Function, rcid: &RcIdentity, value: ValueId) -> bool {
    let root = rcid.root(value);
    for block in &func.blocks {
        for instr in &block.body {
            if let Instr::Release { value: released } = *instr {
                if rcid.root(released) == root {
                    continue;
                }
            }
            if instr.used_values().contains(&value) {
                return true;
            }
        }
        if block.terminator.used_values().contains(&value) {
            return true;
        }
    }
    false
}

/// Delete the balancing releases of every dead argument from `func`.
pub(crate) fn finalize(func: &mut Function, plan: &TransformPlan) {
    let dead: Vec<ValueId> = plan
        .args
        .iter()
        .filter(|d| d.is_entirely_dead())
        .map(|d| d.value)
        .collect();
    if dead.is_empty() {
        return;
    }
    for block in &mut func.blocks {
        block
            .body
            .retain(|instr| !matches!(instr, Instr::Release { value } if dead.contains(value)));
    }
}
