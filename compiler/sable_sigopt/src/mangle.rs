//! Specialized-function naming.
//!
//! The optimized function's name is derived from the original name plus a
//! segment per argument and result describing the decision applied to
//! it. Encoding the decisions makes the name deterministic (rerunning
//! the pass finds the existing specialization instead of minting a new
//! one) and injective (different decision vectors cannot collide).
//!
//! Segment grammar, joined by `_` after a `$sig$` marker:
//!
//! - `n` — unchanged
//! - `d` — dead, removed
//! - `g` — owned-to-guaranteed
//! - `x<count>` followed by `g<index>` per lowered leaf — exploded
//!
//! Result segments follow a `$r$` marker with `n`/`g` tags.

use std::fmt::Write as _;

use sable_ir::{Name, NameTable};

use crate::descriptor::{AppliedDecision, ArgumentDescriptor, ResultDescriptor};

/// Derive the optimized function's name from the planned decisions.
pub fn optimized_name(
    names: &mut NameTable,
    original: Name,
    args: &[ArgumentDescriptor],
    results: &[ResultDescriptor],
) -> Name {
    let mut text = String::with_capacity(names.resolve(original).len() + 8 + 2 * args.len());
    text.push_str(names.resolve(original));
    text.push_str("$sig$");
    for (i, desc) in args.iter().enumerate() {
        if i > 0 {
            text.push('_');
        }
        match desc.decision.applied() {
            None => text.push('n'),
            Some(AppliedDecision::Dead) => text.push('d'),
            Some(AppliedDecision::OwnershipLowered) => text.push('g'),
            Some(AppliedDecision::Exploded { leaves }) => {
                let _ = write!(text, "x{leaves}");
                for (leaf, &lowered) in desc.leaf_lowered.iter().enumerate() {
                    if lowered {
                        let _ = write!(text, "g{leaf}");
                    }
                }
            }
        }
    }
    if !results.is_empty() {
        text.push_str("$r$");
        for (i, result) in results.iter().enumerate() {
            if i > 0 {
                text.push('_');
            }
            text.push(if result.is_lowered() { 'g' } else { 'n' });
        }
    }
    names.intern(&text)
}
