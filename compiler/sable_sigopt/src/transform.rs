//! The signature-optimization driver.
//!
//! [`FunctionSignatureTransform`] ties the analyses together: it builds a
//! [`TransformPlan`] for one function, runs dead-argument elimination,
//! owned-to-guaranteed lowering, and argument explosion over it, and
//! commits the surviving decisions. Commit synthesizes a specialized
//! function under a decision-derived name and rewrites the original into
//! a forwarding thunk, so every existing caller keeps its ABI; when the
//! function has no callers, the original is rewritten in place instead
//! and no thunk exists.
//!
//! Nothing touches the module until commit, so a plan with no accepted
//! decisions leaves the function byte-for-byte unchanged.
//!
//! # Algorithm
//!
//! 1. Analyze: each optimization inspects the function and records
//!    verdicts in the plan's descriptors. Order matters: dead arguments
//!    are excluded from lowering, and explosion builds on lowering's
//!    release discovery.
//! 2. Compute the optimized interface and the old-to-new index map.
//! 3. Synthesize: clone the body, delete the reference-count traffic the
//!    new conventions make redundant, rebuild exploded aggregates in an
//!    entry prologue, and install the new parameter list.
//! 4. Thunk: replace the original body with a call to the specialization
//!    that re-balances every erased ownership obligation on the caller
//!    side.

use rustc_hash::FxHashMap;
use sable_ir::{
    FuncId, Function, FunctionBuilder, Instr, Module, Name, NameTable, Param, ParamConvention,
    ResultInfo, Terminator, TypeId, TypeTable,
};
use tracing::debug;

use crate::descriptor::{AppliedDecision, ArgDecision, ResultDecision};
use crate::epilogue::{EpilogueRcMatcher, InstrRef};
use crate::plan::{OptimizedFunction, TransformPlan};
use crate::rc_identity::RcIdentity;
use crate::{dead_arg, explode, mangle, owned_to_guaranteed, SigOptPolicy};

/// Signature optimization of a single function within a module.
pub struct FunctionSignatureTransform<'a> {
    module: &'a mut Module,
    types: &'a TypeTable,
    names: &'a mut NameTable,
    policy: SigOptPolicy,
    plan: TransformPlan,
}

impl<'a> FunctionSignatureTransform<'a> {
    pub fn new(
        module: &'a mut Module,
        types: &'a TypeTable,
        names: &'a mut NameTable,
        policy: SigOptPolicy,
        original: FuncId,
    ) -> Self {
        let plan = TransformPlan::new(original, module.function(original), types);
        Self {
            module,
            types,
            names,
            policy,
            plan,
        }
    }

    /// The transform plan, with the decisions recorded so far.
    pub fn plan(&self) -> &TransformPlan {
        &self.plan
    }

    /// The specialized function, once a commit has run.
    pub fn optimized_function(&self) -> Option<FuncId> {
        self.plan.optimized.built()
    }

    /// Run every analysis and commit the accepted decisions.
    ///
    /// With `has_caller`, the original becomes a forwarding thunk to the
    /// specialization; without, the rewrite happens in place under the
    /// original name. Returns `true` if the function changed.
    pub fn run(&mut self, has_caller: bool) -> bool {
        self.analyze(true);
        if !self.plan.has_accepted_decisions() {
            return false;
        }
        self.commit(has_caller);
        true
    }

    /// Run dead-argument elimination alone and commit it.
    ///
    /// Used for functions that appear in at least `min_partial_applies`
    /// partial applications: removing dead arguments shrinks every
    /// closure context even when the full transform is not worthwhile.
    pub fn remove_dead_args(&mut self, partial_apply_count: u32) -> bool {
        if partial_apply_count < self.policy.min_partial_applies {
            return false;
        }
        self.analyze(false);
        if !self.plan.has_accepted_decisions() {
            return false;
        }
        self.commit(true);
        true
    }

    fn analyze(&mut self, full: bool) {
        let func = self.module.function(self.plan.original);
        let rcid = RcIdentity::analyze(func);
        dead_arg::analyze(&mut self.plan, func, &rcid);
        if full {
            let matcher = EpilogueRcMatcher::new(func, &rcid);
            owned_to_guaranteed::analyze_parameters(&mut self.plan, self.types, &matcher);
            owned_to_guaranteed::analyze_results(&mut self.plan, self.types, &matcher);
            explode::analyze(&mut self.plan, self.types, &self.policy, &matcher);
        }
    }

    fn commit(&mut self, has_caller: bool) {
        let (param_specs, results) = self.plan.optimized_interface(self.types);
        if has_caller {
            self.specialize(&param_specs, &results);
        } else {
            debug!("no callers; rewriting signature in place");
            let mut func = self.module.function(self.plan.original).clone();
            self.rewrite_body(&mut func, &param_specs, results);
            *self.module.function_mut(self.plan.original) = func;
            self.plan.optimized = OptimizedFunction::Built(self.plan.original);
        }
        self.mark_erased();
    }

    fn specialize(&mut self, param_specs: &[(TypeId, ParamConvention)], results: &[ResultInfo]) {
        let original_name = self.module.function(self.plan.original).name;
        let mangled = mangle::optimized_name(
            self.names,
            original_name,
            &self.plan.args,
            &self.plan.results,
        );
        match self.module.lookup(mangled) {
            Some(existing) => {
                // Deterministic naming: a rerun finds the specialization
                // a previous run minted and reuses it.
                debug!(name = self.names.resolve(mangled), "reusing specialization");
                self.plan.optimized = OptimizedFunction::Built(existing);
            }
            None => {
                let mut func = self.module.function(self.plan.original).clone();
                func.name = mangled;
                self.rewrite_body(&mut func, param_specs, results.to_vec());
                let id = self.module.add_function(func);
                debug!(name = self.names.resolve(mangled), "built specialization");
                self.plan.optimized = OptimizedFunction::Built(id);
            }
        }
        let thunk = self.build_thunk(mangled);
        *self.module.function_mut(self.plan.original) = thunk;
    }

    /// Turn a clone of the original body into the optimized body.
    fn rewrite_body(
        &self,
        func: &mut Function,
        param_specs: &[(TypeId, ParamConvention)],
        results: Vec<ResultInfo>,
    ) {
        // Positions recorded by the matcher refer to the original body,
        // so deletion must precede every index-shifting edit.
        let mut refs: Vec<InstrRef> = Vec::new();
        for desc in &self.plan.args {
            refs.extend(desc.releases.iter());
            for leaf in &desc.leaf_releases {
                refs.extend(leaf.iter());
            }
        }
        for result in &self.plan.results {
            refs.extend(result.retains.iter().copied());
        }
        owned_to_guaranteed::strip_rc_instructions(func, &mut refs);
        dead_arg::finalize(func, &self.plan);

        let mut params = Vec::with_capacity(param_specs.len());
        let mut prologue: Vec<Instr> = Vec::new();
        for desc in &self.plan.args {
            match desc.decision.applied() {
                Some(AppliedDecision::Dead) => {}
                Some(AppliedDecision::Exploded { .. }) => {
                    let leaves = desc.tree.leaves();
                    let mut leaf_values = Vec::with_capacity(leaves.len());
                    for leaf in &leaves {
                        let value = func.fresh_value(leaf.ty);
                        params.push(Param {
                            value,
                            ty: leaf.ty,
                            convention: param_specs[params.len()].1,
                            decl: desc.decl,
                        });
                        leaf_values.push(value);
                    }
                    prologue.extend(explode::reconstruction_prologue(func, desc, &leaf_values));
                }
                Some(AppliedDecision::OwnershipLowered) | None => {
                    params.push(Param {
                        value: desc.value,
                        ty: desc.ty,
                        convention: param_specs[params.len()].1,
                        decl: desc.decl,
                    });
                }
            }
        }
        debug_assert_eq!(params.len(), param_specs.len());
        if !prologue.is_empty() {
            let entry = func.entry.index();
            func.blocks[entry].body.splice(0..0, prologue);
        }
        func.params = params;
        func.results = results;
    }

    /// Build the forwarding thunk that keeps the original ABI alive.
    ///
    /// Every ownership obligation the specialization stopped discharging
    /// reappears here with the opposite sign: owned arguments that went
    /// guaranteed are released after the call, dead owned arguments are
    /// released immediately, exploded owned leaves are retained before
    /// the call, and a lowered result is retained on the way out.
    fn build_thunk(&mut self, callee: Name) -> Function {
        let original = self.module.function(self.plan.original);
        let specs: Vec<(TypeId, ParamConvention)> = original
            .params
            .iter()
            .map(|p| (p.ty, p.convention))
            .collect();
        let decls: Vec<Option<Name>> = original.params.iter().map(|p| p.decl).collect();
        let results = original.results.clone();
        let is_method = original.is_method;
        let name = original.name;

        let mut b = FunctionBuilder::new(name, &specs, results.clone());
        b.set_method(is_method);
        let mut call_args = Vec::new();
        let mut post_releases = Vec::new();
        for desc in &self.plan.args {
            self.plan
                .add_thunk_argument(desc, &mut b, self.types, &mut call_args, &mut post_releases);
        }
        let result_ty = results.first().map_or(TypeId::UNIT, |r| r.ty);
        let result = b.apply(result_ty, callee, call_args);
        if self.plan.results.first().is_some_and(|r| r.is_lowered()) {
            b.retain(result);
        }
        for value in post_releases {
            b.release(value);
        }
        b.terminate(Terminator::Return { value: result });
        let mut thunk = b.finish();
        for (param, decl) in thunk.params.iter_mut().zip(decls) {
            param.decl = decl;
        }
        thunk
    }

    fn mark_erased(&mut self) {
        for desc in &mut self.plan.args {
            if let ArgDecision::Erased(_) = desc.decision {
                continue;
            }
            if let Some(applied) = desc.decision.applied() {
                desc.decision = ArgDecision::Erased(applied);
            }
        }
        for result in &mut self.plan.results {
            if result.decision == ResultDecision::OwnershipLowered {
                result.decision = ResultDecision::Erased;
            }
        }
    }
}

/// How often each function is called, directly and through partial
/// application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallerCounts {
    pub direct: u32,
    pub partial: u32,
}

impl CallerCounts {
    pub fn has_caller(self) -> bool {
        self.direct > 0 || self.partial > 0
    }
}

/// Count call sites per callee name across the module.
pub fn count_callers(module: &Module) -> FxHashMap<Name, CallerCounts> {
    let mut counts: FxHashMap<Name, CallerCounts> = FxHashMap::default();
    for (_, func) in module.iter() {
        for block in &func.blocks {
            for instr in &block.body {
                match instr {
                    Instr::Apply { callee, .. } => counts.entry(*callee).or_default().direct += 1,
                    Instr::PartialApply { callee, .. } => {
                        counts.entry(*callee).or_default().partial += 1;
                    }
                    _ => {}
                }
            }
        }
    }
    counts
}

/// Run the full transform over every function in the module. Returns the
/// number of functions changed.
///
/// Specializations minted during the walk are appended to the module and
/// not revisited.
pub fn optimize_module(
    module: &mut Module,
    types: &TypeTable,
    names: &mut NameTable,
    policy: &SigOptPolicy,
) -> usize {
    let counts = count_callers(module);
    let ids: Vec<FuncId> = module.iter().map(|(id, _)| id).collect();
    let mut changed = 0;
    for id in ids {
        let name = module.function(id).name;
        let has_caller = counts.get(&name).copied().unwrap_or_default().has_caller();
        let mut transform =
            FunctionSignatureTransform::new(module, types, names, *policy, id);
        if transform.run(has_caller) {
            changed += 1;
        }
    }
    debug!(changed, "signature optimization finished");
    changed
}
