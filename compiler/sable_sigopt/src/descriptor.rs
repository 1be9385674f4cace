//! Per-argument and per-result optimization state.
//!
//! One [`ArgumentDescriptor`] is allocated per original parameter and one
//! [`ResultDescriptor`] per direct result when a transform plan is set up.
//! Analyses record their verdicts here as an [`ArgDecision`]; synthesis
//! reads the decisions back and marks them applied. The decision is a
//! single exclusive enum, so an argument cannot be simultaneously dead
//! and exploded, and an applied decision cannot be applied twice.

use sable_ir::{Name, OwnershipKind, Param, ParamConvention, ResultConvention, TypeId, TypeTable, ValueId};
use smallvec::SmallVec;

use crate::epilogue::{ArgumentReleases, InstrRef};
use crate::projection::ProjectionTree;
use crate::SigOptPolicy;

/// A decision that has been applied to a synthesized function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppliedDecision {
    Dead,
    OwnershipLowered,
    Exploded { leaves: u32 },
}

/// The optimization verdict for one argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgDecision {
    /// No analysis accepted this argument.
    Unchanged,
    /// The argument is unused apart from its own balancing releases; it
    /// will be removed from the signature.
    Dead,
    /// The owned argument will be passed guaranteed; its epilogue
    /// releases will be deleted.
    OwnershipLowered,
    /// The aggregate argument will be replaced by its scalar leaves.
    Exploded { leaves: u32 },
    /// The decision has been applied to the optimized function.
    Erased(AppliedDecision),
}

impl ArgDecision {
    /// Returns `true` for any verdict other than [`Unchanged`](Self::Unchanged).
    pub fn is_accepted(self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// The decision that was (or will be) applied, if any.
    pub fn applied(self) -> Option<AppliedDecision> {
        match self {
            Self::Unchanged => None,
            Self::Dead => Some(AppliedDecision::Dead),
            Self::OwnershipLowered => Some(AppliedDecision::OwnershipLowered),
            Self::Exploded { leaves } => Some(AppliedDecision::Exploded { leaves }),
            Self::Erased(applied) => Some(applied),
        }
    }
}

/// Optimization state for one original argument.
#[derive(Clone, Debug)]
pub struct ArgumentDescriptor {
    /// Position in the original signature.
    pub index: u32,
    /// The entry value bound to this argument in the original function.
    pub value: ValueId,
    /// Source declaration carried over to synthesized parameters.
    pub decl: Option<Name>,
    /// Original passing convention.
    pub convention: ParamConvention,
    /// Original type.
    pub ty: TypeId,
    /// Current verdict.
    pub decision: ArgDecision,
    /// Complete epilogue releases, set when the verdict is
    /// [`ArgDecision::OwnershipLowered`].
    pub releases: ArgumentReleases,
    /// Releases exist on some exit paths but not all. Blocks lowering,
    /// but makes explosion profitable regardless of leaf count.
    pub has_partial_releases: bool,
    /// Decomposition tree of `ty`.
    pub tree: ProjectionTree,
    /// Per-leaf lowering verdicts, parallel to `tree.leaves()`. Filled
    /// when the verdict becomes [`ArgDecision::Exploded`].
    pub leaf_lowered: Vec<bool>,
    /// Per-leaf epilogue releases to delete, parallel to `leaf_lowered`.
    pub leaf_releases: Vec<ArgumentReleases>,
}

impl ArgumentDescriptor {
    /// Set up the descriptor for parameter `index` of a function.
    pub fn new(index: u32, param: &Param, types: &TypeTable) -> Self {
        Self {
            index,
            value: param.value,
            decl: param.decl,
            convention: param.convention,
            ty: param.ty,
            decision: ArgDecision::Unchanged,
            releases: ArgumentReleases::default(),
            has_partial_releases: false,
            tree: ProjectionTree::build(types, param.ty),
            leaf_lowered: Vec::new(),
            leaf_releases: Vec::new(),
        }
    }

    pub fn is_entirely_dead(&self) -> bool {
        matches!(self.decision.applied(), Some(AppliedDecision::Dead))
    }

    pub fn is_exploded(&self) -> bool {
        matches!(
            self.decision.applied(),
            Some(AppliedDecision::Exploded { .. })
        )
    }

    pub fn is_lowered(&self) -> bool {
        matches!(
            self.decision.applied(),
            Some(AppliedDecision::OwnershipLowered)
        )
    }

    /// Returns `true` once synthesis has applied this argument's decision.
    pub fn was_erased(&self) -> bool {
        matches!(self.decision, ArgDecision::Erased(_))
    }

    /// Whether a live argument's representation permits optimization at
    /// all: direct object arguments qualify, as do address arguments of
    /// generic type passed by consuming or immutable indirection.
    pub fn can_optimize_live_arg(&self, types: &TypeTable) -> bool {
        if !self.convention.is_indirect() {
            return true;
        }
        matches!(
            self.convention,
            ParamConvention::IndirectIn | ParamConvention::IndirectInGuaranteed
        ) && types.is_archetype(self.ty)
    }

    /// Whether explosion is worthwhile for this argument.
    ///
    /// Singletons never explode (the "explosion" would reproduce the
    /// original argument), nor do types mentioning archetypes or whose
    /// full decomposition exceeds the policy cap. Within those limits the
    /// leaf count must fall in the policy window, except that an owned
    /// argument with partial releases always benefits: splitting it lets
    /// the consumed leaves be lowered individually.
    pub fn should_explode(&self, types: &TypeTable, policy: &SigOptPolicy) -> bool {
        if !self.can_optimize_live_arg(types) {
            return false;
        }
        if self.tree.is_singleton() {
            return false;
        }
        if types.contains_archetype(self.ty) {
            return false;
        }
        let leaves = self.tree.leaf_count();
        if leaves > policy.max_expanded_leaves {
            return false;
        }
        if self.convention.is_owned() && self.has_partial_releases {
            return true;
        }
        leaves >= policy.min_explosion_leaves && leaves <= policy.max_explosion_leaves
    }

    /// Ownership kind of a component of this argument, after the current
    /// decision is applied. `None` for a dead argument, which has no
    /// ownership left to speak of.
    pub fn transformed_ownership_kind(
        &self,
        sub_ty: TypeId,
        types: &TypeTable,
    ) -> Option<OwnershipKind> {
        if self.is_entirely_dead() {
            return None;
        }
        if types.is_trivial(sub_ty) {
            return Some(OwnershipKind::Trivial);
        }
        if matches!(
            self.decision.applied(),
            Some(AppliedDecision::OwnershipLowered)
        ) {
            return Some(OwnershipKind::Guaranteed);
        }
        Some(match self.convention {
            ParamConvention::DirectOwned | ParamConvention::IndirectIn => OwnershipKind::Owned,
            ParamConvention::Trivial => OwnershipKind::Trivial,
            // Guaranteed and address arguments alike leave the caller
            // responsible for the value's lifetime.
            ParamConvention::DirectGuaranteed
            | ParamConvention::IndirectInGuaranteed
            | ParamConvention::IndirectInout
            | ParamConvention::IndirectResult => OwnershipKind::Guaranteed,
        })
    }
}

/// The optimization verdict for one direct result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultDecision {
    Unchanged,
    /// The owned result will be returned unowned; its producing retains
    /// will be deleted.
    OwnershipLowered,
    /// The lowering has been applied to the optimized function.
    Erased,
}

/// Optimization state for one direct result.
#[derive(Clone, Debug)]
pub struct ResultDescriptor {
    pub ty: TypeId,
    pub convention: ResultConvention,
    pub decision: ResultDecision,
    /// Retains producing the owned result, one per return path. Set when
    /// the verdict is [`ResultDecision::OwnershipLowered`].
    pub retains: SmallVec<[InstrRef; 2]>,
}

impl ResultDescriptor {
    pub fn new(ty: TypeId, convention: ResultConvention) -> Self {
        Self {
            ty,
            convention,
            decision: ResultDecision::Unchanged,
            retains: SmallVec::new(),
        }
    }

    pub fn is_lowered(&self) -> bool {
        matches!(
            self.decision,
            ResultDecision::OwnershipLowered | ResultDecision::Erased
        )
    }
}
