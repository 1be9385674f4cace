//! Shared fixtures for transform tests.

use sable_ir::{FuncId, Module, Name, NameTable, TypeTable};

use crate::sim::{Machine, Outcome, SimShape, SimValue};
use crate::transform::FunctionSignatureTransform;
use crate::SigOptPolicy;

/// Module, tables, and policy bundled for fixture assembly.
pub(crate) struct TestCtx {
    pub module: Module,
    pub types: TypeTable,
    pub names: NameTable,
    pub policy: SigOptPolicy,
}

impl TestCtx {
    pub(crate) fn new() -> Self {
        Self {
            module: Module::new(),
            types: TypeTable::new(),
            names: NameTable::new(),
            policy: SigOptPolicy::default(),
        }
    }

    pub(crate) fn name(&mut self, text: &str) -> Name {
        self.names.intern(text)
    }
}

/// Run the full transform on one function. Returns whether it changed
/// and the specialization's handle.
pub(crate) fn run_transform(
    ctx: &mut TestCtx,
    id: FuncId,
    has_caller: bool,
) -> (bool, Option<FuncId>) {
    let mut transform = FunctionSignatureTransform::new(
        &mut ctx.module,
        &ctx.types,
        &mut ctx.names,
        ctx.policy,
        id,
    );
    let changed = transform.run(has_caller);
    (changed, transform.optimized_function())
}

/// Everything a caller can observe from invoking a function: the result
/// (or thrown value) with heap identity erased, and the net
/// reference-count effect on each argument object, in argument order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Observation {
    pub outcome: SimShape,
    pub threw: bool,
    pub nets: Vec<i64>,
}

/// Invoke `name` with deterministic inputs and record the observation.
///
/// Object ids are allocated in parameter order from a fresh machine, so
/// observations of the same signature are comparable across modules.
pub(crate) fn observe(module: &Module, types: &TypeTable, name: Name) -> Observation {
    let id = module
        .lookup(name)
        .unwrap_or_else(|| panic!("no function named {name:?}"));
    let func = module.function(id);
    let mut machine = Machine::new(module);
    let args: Vec<SimValue> = func
        .params
        .iter()
        .map(|p| machine.value_for_type(types, p.ty))
        .collect();
    let objs: Vec<u64> = args.iter().flat_map(SimValue::objects).collect();
    let (outcome, threw) = match machine.run(func, args) {
        Outcome::Returned(v) => (v.shape(), false),
        Outcome::Threw(v) => (v.shape(), true),
    };
    Observation {
        outcome,
        threw,
        nets: objs.iter().map(|&o| machine.net(o)).collect(),
    }
}
