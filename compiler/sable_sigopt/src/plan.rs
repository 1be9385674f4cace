//! Transform planning state.
//!
//! A [`TransformPlan`] gathers everything the pass knows about one
//! function: the per-argument and per-result descriptors the analyses
//! write their verdicts into, the mapping from old to new argument
//! indices, and the handle of the optimized function once it exists.
//! Analyses mutate only the plan; the module is untouched until
//! synthesis commits the whole plan at once.

use sable_ir::{
    FuncId, Function, FunctionBuilder, ParamConvention, ResultConvention, ResultInfo, TypeId,
    TypeTable, ValueId,
};

use crate::descriptor::{AppliedDecision, ArgumentDescriptor, ResultDecision, ResultDescriptor};

/// The optimized function, if synthesis has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizedFunction {
    NotYetBuilt,
    Built(FuncId),
}

impl OptimizedFunction {
    /// The built function's handle, if any.
    pub fn built(self) -> Option<FuncId> {
        match self {
            Self::NotYetBuilt => None,
            Self::Built(id) => Some(id),
        }
    }
}

/// Partial map from original argument indices to optimized ones.
///
/// Dead arguments have no entry; an exploded argument maps to its first
/// leaf parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgIndexMap {
    entries: Vec<Option<u32>>,
}

impl ArgIndexMap {
    pub fn new(len: usize) -> Self {
        Self {
            entries: vec![None; len],
        }
    }

    pub fn set(&mut self, old: u32, new: u32) {
        self.entries[old as usize] = Some(new);
    }

    /// New index of original argument `old`, or `None` if it was removed.
    pub fn get(&self, old: u32) -> Option<u32> {
        self.entries.get(old as usize).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the pass knows about transforming one function.
pub struct TransformPlan {
    /// The function being optimized.
    pub original: FuncId,
    /// Whether the original's last parameter is a method receiver.
    pub is_method: bool,
    /// The specialized function, once synthesized.
    pub optimized: OptimizedFunction,
    /// Old-to-new argument index mapping, filled by
    /// [`optimized_interface`](Self::optimized_interface).
    pub arg_map: ArgIndexMap,
    /// Set when a method's receiver argument is changed by any decision.
    pub modifies_self_argument: bool,
    /// Per-argument state, in original signature order.
    pub args: Vec<ArgumentDescriptor>,
    /// Per-result state.
    pub results: Vec<ResultDescriptor>,
}

impl TransformPlan {
    /// Set up descriptors for every parameter and result of `func`.
    pub fn new(original: FuncId, func: &Function, types: &TypeTable) -> Self {
        let args = func
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                ArgumentDescriptor::new(
                    u32::try_from(i).unwrap_or_else(|_| panic!("argument index overflow")),
                    param,
                    types,
                )
            })
            .collect();
        let results = func
            .results
            .iter()
            .map(|r| ResultDescriptor::new(r.ty, r.convention))
            .collect();
        Self {
            original,
            is_method: func.is_method,
            optimized: OptimizedFunction::NotYetBuilt,
            arg_map: ArgIndexMap::new(func.params.len()),
            modifies_self_argument: false,
            args,
            results,
        }
    }

    /// Returns `true` if any analysis accepted an argument or result.
    pub fn has_accepted_decisions(&self) -> bool {
        self.args.iter().any(|d| d.decision.is_accepted())
            || self
                .results
                .iter()
                .any(|r| r.decision != ResultDecision::Unchanged)
    }

    /// Compute the optimized signature from the planned decisions,
    /// filling the argument index map and the self-argument flag.
    pub fn optimized_interface(
        &mut self,
        types: &TypeTable,
    ) -> (Vec<(TypeId, ParamConvention)>, Vec<ResultInfo>) {
        let mut params = Vec::with_capacity(self.args.len());
        let receiver_index = self.args.len().checked_sub(1);
        for desc in &self.args {
            let changed = desc.decision.is_accepted();
            if self.is_method && changed && Some(desc.index as usize) == receiver_index {
                self.modifies_self_argument = true;
            }
            match desc.decision.applied() {
                Some(AppliedDecision::Dead) => {}
                Some(AppliedDecision::Exploded { .. }) => {
                    let first = u32::try_from(params.len())
                        .unwrap_or_else(|_| panic!("parameter count overflow"));
                    self.arg_map.set(desc.index, first);
                    for (i, leaf) in desc.tree.leaves().iter().enumerate() {
                        params.push((leaf.ty, leaf_convention(desc, i, leaf.ty, types)));
                    }
                }
                Some(AppliedDecision::OwnershipLowered) => {
                    let new = u32::try_from(params.len())
                        .unwrap_or_else(|_| panic!("parameter count overflow"));
                    self.arg_map.set(desc.index, new);
                    params.push((desc.ty, lowered_convention(desc.convention)));
                }
                None => {
                    let new = u32::try_from(params.len())
                        .unwrap_or_else(|_| panic!("parameter count overflow"));
                    self.arg_map.set(desc.index, new);
                    params.push((desc.ty, desc.convention));
                }
            }
        }
        let results = self
            .results
            .iter()
            .map(|r| ResultInfo {
                ty: r.ty,
                convention: if r.is_lowered() {
                    ResultConvention::Unowned
                } else {
                    r.convention
                },
            })
            .collect();
        (params, results)
    }

    /// Emit the thunk-side handling of one original argument: push the
    /// values the optimized callee expects onto `call_args`, and record
    /// any release the thunk owes after the call in `post_releases`.
    pub fn add_thunk_argument(
        &self,
        desc: &ArgumentDescriptor,
        builder: &mut FunctionBuilder,
        types: &TypeTable,
        call_args: &mut Vec<ValueId>,
        post_releases: &mut Vec<ValueId>,
    ) {
        let arg = builder.param_value(desc.index as usize);
        match desc.decision.applied() {
            Some(AppliedDecision::Dead) => {
                // The callee no longer discharges this obligation.
                if desc.convention.is_owned() && !types.is_trivial(desc.ty) {
                    builder.release(arg);
                }
            }
            Some(AppliedDecision::OwnershipLowered) => {
                call_args.push(arg);
                post_releases.push(arg);
            }
            Some(AppliedDecision::Exploded { .. }) => {
                for (i, leaf) in desc.tree.leaves().iter().enumerate() {
                    let mut value = arg;
                    for &field in &leaf.path {
                        let field_ty = projected_type(types, builder.value_type(value), field);
                        value = builder.project(field_ty, value, field);
                    }
                    let convention = leaf_convention(desc, i, leaf.ty, types);
                    if convention == ParamConvention::DirectOwned {
                        builder.retain(value);
                    }
                    call_args.push(value);
                }
                if desc.convention.is_owned() && !types.is_trivial(desc.ty) {
                    post_releases.push(arg);
                }
            }
            None => call_args.push(arg),
        }
    }
}

/// Convention of leaf `index` of an exploded argument.
fn leaf_convention(
    desc: &ArgumentDescriptor,
    index: usize,
    leaf_ty: TypeId,
    types: &TypeTable,
) -> ParamConvention {
    if types.is_trivial(leaf_ty) {
        ParamConvention::Trivial
    } else if desc.leaf_lowered.get(index).copied().unwrap_or(false) || !desc.convention.is_owned()
    {
        ParamConvention::DirectGuaranteed
    } else {
        ParamConvention::DirectOwned
    }
}

/// Convention of an owned argument after lowering to guaranteed.
fn lowered_convention(convention: ParamConvention) -> ParamConvention {
    match convention {
        ParamConvention::DirectOwned => ParamConvention::DirectGuaranteed,
        ParamConvention::IndirectIn => ParamConvention::IndirectInGuaranteed,
        other => other,
    }
}

/// Field type of `ty` at `field`.
///
/// # Panics
///
/// Panics if `ty` is not an aggregate with that field; explosion only
/// walks paths its own projection tree produced.
fn projected_type(types: &TypeTable, ty: TypeId, field: u32) -> TypeId {
    match types.aggregate_fields(ty) {
        Some(fields) => fields[field as usize],
        None => panic!("projecting field {field} out of non-aggregate type"),
    }
}
