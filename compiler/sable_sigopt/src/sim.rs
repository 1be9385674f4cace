//! Test-only IR interpreter with reference-count accounting.
//!
//! Used to check observable equivalence of a function before and after
//! the transform: same inputs, same structural result, and the same net
//! reference-count effect on every object passed in. Heap objects are
//! plain ids; retains and releases adjust a per-id tally that tests read
//! back as a delta.

use rustc_hash::FxHashMap;
use sable_ir::{Function, Instr, Lit, Module, Name, Terminator, TypeId, TypeKind, TypeTable, ValueId};

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SimValue {
    Int(i64),
    Float(u64),
    Bool(bool),
    Unit,
    /// A reference-counted heap object.
    Obj(u64),
    /// A struct or tuple, stored structurally.
    Agg(Vec<SimValue>),
}

/// A value with heap identities erased, comparable across runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SimShape {
    Int(i64),
    Float(u64),
    Bool(bool),
    Unit,
    Obj,
    Agg(Vec<SimShape>),
}

impl SimValue {
    pub(crate) fn shape(&self) -> SimShape {
        match self {
            SimValue::Int(n) => SimShape::Int(*n),
            SimValue::Float(bits) => SimShape::Float(*bits),
            SimValue::Bool(b) => SimShape::Bool(*b),
            SimValue::Unit => SimShape::Unit,
            SimValue::Obj(_) => SimShape::Obj,
            SimValue::Agg(fields) => SimShape::Agg(fields.iter().map(SimValue::shape).collect()),
        }
    }

    /// Every heap object reachable from this value.
    pub(crate) fn objects(&self) -> Vec<u64> {
        let mut out = Vec::new();
        self.collect_objects(&mut out);
        out
    }

    fn collect_objects(&self, out: &mut Vec<u64>) {
        match self {
            SimValue::Obj(id) => out.push(*id),
            SimValue::Agg(fields) => {
                for f in fields {
                    f.collect_objects(out);
                }
            }
            _ => {}
        }
    }
}

/// How a function run ended.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Outcome {
    Returned(SimValue),
    Threw(SimValue),
}

/// Interpreter over a module, accumulating reference-count deltas.
pub(crate) struct Machine<'m> {
    module: &'m Module,
    counts: FxHashMap<u64, i64>,
    next_obj: u64,
}

impl<'m> Machine<'m> {
    pub(crate) fn new(module: &'m Module) -> Self {
        Self {
            module,
            counts: FxHashMap::default(),
            next_obj: 0,
        }
    }

    /// Allocate a fresh heap object id.
    pub(crate) fn fresh_obj(&mut self) -> u64 {
        let id = self.next_obj;
        self.next_obj += 1;
        id
    }

    /// Net retain/release balance recorded for `obj`.
    pub(crate) fn net(&self, obj: u64) -> i64 {
        self.counts.get(&obj).copied().unwrap_or(0)
    }

    /// A deterministic input value of the given type. Non-trivial leaves
    /// become fresh heap objects.
    pub(crate) fn value_for_type(&mut self, types: &TypeTable, ty: TypeId) -> SimValue {
        match types.kind(ty) {
            TypeKind::Int => SimValue::Int(7),
            TypeKind::Float => SimValue::Float(2.5_f64.to_bits()),
            TypeKind::Bool => SimValue::Bool(true),
            TypeKind::Unit => SimValue::Unit,
            TypeKind::Str | TypeKind::Enum { .. } | TypeKind::Archetype { .. } | TypeKind::Ref { .. } => {
                SimValue::Obj(self.fresh_obj())
            }
            TypeKind::Struct { fields, .. } | TypeKind::Tuple { fields } => {
                let fields = fields.clone();
                SimValue::Agg(
                    fields
                        .into_iter()
                        .map(|f| self.value_for_type(types, f))
                        .collect(),
                )
            }
        }
    }

    fn adjust(&mut self, value: &SimValue, delta: i64) {
        for obj in value.objects() {
            *self.counts.entry(obj).or_insert(0) += delta;
        }
    }

    /// Call a function by name.
    pub(crate) fn call(&mut self, name: Name, args: Vec<SimValue>) -> Outcome {
        let id = self
            .module
            .lookup(name)
            .unwrap_or_else(|| panic!("no function named {name:?} in module"));
        let func = self.module.function(id).clone();
        self.run(&func, args)
    }

    /// Execute `func` on `args`.
    pub(crate) fn run(&mut self, func: &Function, args: Vec<SimValue>) -> Outcome {
        assert_eq!(args.len(), func.params.len(), "argument count mismatch");
        let mut env: FxHashMap<ValueId, SimValue> = FxHashMap::default();
        for (param, arg) in func.params.iter().zip(args) {
            env.insert(param.value, arg);
        }
        let mut block = func.entry;
        loop {
            let b = &func.blocks[block.index()];
            for instr in &b.body {
                if let Some(outcome) = self.step(instr, &mut env) {
                    return outcome;
                }
            }
            match &b.terminator {
                Terminator::Return { value } => {
                    return Outcome::Returned(lookup(&env, *value));
                }
                Terminator::Throw { value } => {
                    return Outcome::Threw(lookup(&env, *value));
                }
                Terminator::Jump { target, args } => {
                    let values: Vec<SimValue> = args.iter().map(|&a| lookup(&env, a)).collect();
                    let params: Vec<ValueId> = func.blocks[target.index()]
                        .params
                        .iter()
                        .map(|&(v, _)| v)
                        .collect();
                    assert_eq!(values.len(), params.len(), "jump argument mismatch");
                    for (param, value) in params.into_iter().zip(values) {
                        env.insert(param, value);
                    }
                    block = *target;
                }
                Terminator::Branch {
                    cond,
                    then_block,
                    else_block,
                } => {
                    let SimValue::Bool(taken) = lookup(&env, *cond) else {
                        panic!("branch on non-bool value");
                    };
                    block = if taken { *then_block } else { *else_block };
                }
                Terminator::Unreachable => panic!("executed unreachable block"),
            }
        }
    }

    fn step(
        &mut self,
        instr: &Instr,
        env: &mut FxHashMap<ValueId, SimValue>,
    ) -> Option<Outcome> {
        match instr {
            Instr::Literal { dst, value, .. } => {
                let v = match value {
                    Lit::Int(n) => SimValue::Int(*n),
                    Lit::Float(bits) => SimValue::Float(*bits),
                    Lit::Bool(b) => SimValue::Bool(*b),
                    Lit::Str(_) => SimValue::Obj(self.fresh_obj()),
                    Lit::Unit => SimValue::Unit,
                };
                env.insert(*dst, v);
            }
            Instr::Copy { dst, src, .. } => {
                let v = lookup(env, *src);
                env.insert(*dst, v);
            }
            Instr::Apply { dst, callee, args, .. } => {
                let values: Vec<SimValue> = args.iter().map(|&a| lookup(env, a)).collect();
                match self.call(*callee, values) {
                    Outcome::Returned(v) => {
                        env.insert(*dst, v);
                    }
                    thrown @ Outcome::Threw(_) => return Some(thrown),
                }
            }
            Instr::PartialApply { dst, .. } => {
                // Closure contexts are opaque heap objects here.
                let obj = SimValue::Obj(self.fresh_obj());
                env.insert(*dst, obj);
            }
            Instr::Project { dst, base, field, .. } => {
                let SimValue::Agg(fields) = lookup(env, *base) else {
                    panic!("projecting out of a non-aggregate");
                };
                env.insert(*dst, fields[*field as usize].clone());
            }
            Instr::Aggregate { dst, fields, .. } => {
                let values: Vec<SimValue> = fields.iter().map(|&f| lookup(env, f)).collect();
                env.insert(*dst, SimValue::Agg(values));
            }
            Instr::Retain { value } => {
                let v = lookup(env, *value);
                self.adjust(&v, 1);
            }
            Instr::Release { value } => {
                let v = lookup(env, *value);
                self.adjust(&v, -1);
            }
        }
        None
    }
}

fn lookup(env: &FxHashMap<ValueId, SimValue>, value: ValueId) -> SimValue {
    env.get(&value)
        .unwrap_or_else(|| panic!("use of undefined value {value:?}"))
        .clone()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sable_ir::{FunctionBuilder, ParamConvention, ResultConvention, ResultInfo};

    use super::*;

    #[test]
    fn retain_release_balance_is_tracked() {
        let mut b = FunctionBuilder::new(
            Name::from_raw(1),
            &[(TypeId::STR, ParamConvention::DirectOwned)],
            vec![],
        );
        let arg = b.param_value(0);
        b.retain(arg);
        b.release(arg);
        b.release(arg);
        let unit = b.literal(TypeId::UNIT, Lit::Unit);
        b.terminate(Terminator::Return { value: unit });
        let func = b.finish();

        let module = Module::new();
        let mut machine = Machine::new(&module);
        let obj = machine.fresh_obj();
        let outcome = machine.run(&func, vec![SimValue::Obj(obj)]);
        assert_eq!(outcome, Outcome::Returned(SimValue::Unit));
        assert_eq!(machine.net(obj), -1);
    }

    #[test]
    fn aggregate_release_reaches_every_component() {
        let mut types = TypeTable::new();
        let pair = types.tuple(vec![TypeId::STR, TypeId::STR]);
        let mut b = FunctionBuilder::new(
            Name::from_raw(1),
            &[(pair, ParamConvention::DirectOwned)],
            vec![],
        );
        let arg = b.param_value(0);
        b.release(arg);
        let unit = b.literal(TypeId::UNIT, Lit::Unit);
        b.terminate(Terminator::Return { value: unit });
        let func = b.finish();

        let module = Module::new();
        let mut machine = Machine::new(&module);
        let value = machine.value_for_type(&types, pair);
        let objs = value.objects();
        assert_eq!(objs.len(), 2);
        machine.run(&func, vec![value]);
        assert_eq!(machine.net(objs[0]), -1);
        assert_eq!(machine.net(objs[1]), -1);
    }

    #[test]
    fn calls_resolve_through_the_module() {
        let callee_name = Name::from_raw(5);
        let mut b = FunctionBuilder::new(
            callee_name,
            &[(TypeId::INT, ParamConvention::Trivial)],
            vec![ResultInfo {
                ty: TypeId::INT,
                convention: ResultConvention::Unowned,
            }],
        );
        let arg = b.param_value(0);
        b.terminate(Terminator::Return { value: arg });
        let callee = b.finish();

        let mut b = FunctionBuilder::new(Name::from_raw(6), &[], vec![]);
        let n = b.literal(TypeId::INT, Lit::Int(42));
        let r = b.apply(TypeId::INT, callee_name, vec![n]);
        b.terminate(Terminator::Return { value: r });
        let caller = b.finish();

        let mut module = Module::new();
        module.add_function(callee);
        let caller_name = caller.name;
        module.add_function(caller);

        let mut machine = Machine::new(&module);
        let outcome = machine.call(caller_name, vec![]);
        assert_eq!(outcome, Outcome::Returned(SimValue::Int(42)));
    }
}
