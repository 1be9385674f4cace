//! Function construction facility.
//!
//! [`FunctionBuilder`] follows the "position at a block, emit instructions,
//! terminate" pattern of LLVM's `IRBuilder`, with block parameters instead
//! of phi nodes. The signature-optimization pass uses it to synthesize
//! thunk bodies; tests use it to assemble fixtures.

use crate::ir::{
    Block, BlockId, Function, Instr, Lit, Param, ParamConvention, ResultInfo, Terminator, ValueId,
};
use crate::name::Name;
use crate::types::TypeId;

/// In-progress basic block.
struct BlockInProgress {
    id: BlockId,
    params: Vec<(ValueId, TypeId)>,
    body: Vec<Instr>,
    terminator: Option<Terminator>,
}

/// Builder for an in-progress IR function.
///
/// Owns block and value state while the function is assembled; consumed by
/// [`finish`](FunctionBuilder::finish).
pub struct FunctionBuilder {
    name: Name,
    params: Vec<Param>,
    results: Vec<ResultInfo>,
    is_method: bool,
    blocks: Vec<BlockInProgress>,
    current: BlockId,
    value_types: Vec<TypeId>,
}

impl FunctionBuilder {
    /// Create a builder with an entry block and parameter values allocated.
    ///
    /// Parameter values receive the first `params.len()` value IDs, in order.
    pub fn new(name: Name, params: &[(TypeId, ParamConvention)], results: Vec<ResultInfo>) -> Self {
        let mut builder = Self {
            name,
            params: Vec::with_capacity(params.len()),
            results,
            is_method: false,
            blocks: vec![BlockInProgress {
                id: BlockId::new(0),
                params: Vec::new(),
                body: Vec::new(),
                terminator: None,
            }],
            current: BlockId::new(0),
            value_types: Vec::new(),
        };
        for &(ty, convention) in params {
            let value = builder.fresh_value(ty);
            builder.params.push(Param {
                value,
                ty,
                convention,
                decl: None,
            });
        }
        builder
    }

    /// Mark the function as a method (last parameter is the receiver).
    pub fn set_method(&mut self, is_method: bool) {
        self.is_method = is_method;
    }

    /// Allocate a fresh value with the given type.
    pub fn fresh_value(&mut self, ty: TypeId) -> ValueId {
        let id = u32::try_from(self.value_types.len())
            .unwrap_or_else(|_| panic!("value count exceeds u32::MAX"));
        self.value_types.push(ty);
        ValueId::new(id)
    }

    /// The type of a previously allocated value.
    ///
    /// # Panics
    ///
    /// Panics if `value` was not allocated by this builder.
    pub fn value_type(&self, value: ValueId) -> TypeId {
        self.value_types[value.index()]
    }

    /// The value bound to parameter `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn param_value(&self, index: usize) -> ValueId {
        self.params[index].value
    }

    /// Append a new block with the given parameters; does not switch to it.
    pub fn new_block(&mut self, params: &[TypeId]) -> BlockId {
        let id = BlockId::new(
            u32::try_from(self.blocks.len())
                .unwrap_or_else(|_| panic!("block count exceeds u32::MAX")),
        );
        let params = params
            .iter()
            .map(|&ty| (self.fresh_value(ty), ty))
            .collect();
        self.blocks.push(BlockInProgress {
            id,
            params,
            body: Vec::new(),
            terminator: None,
        });
        id
    }

    /// Position subsequent emissions at `block`.
    pub fn switch_to(&mut self, block: BlockId) {
        debug_assert!(block.index() < self.blocks.len(), "unknown block");
        self.current = block;
    }

    /// The values bound to `block`'s parameters.
    pub fn block_params(&self, block: BlockId) -> Vec<ValueId> {
        self.blocks[block.index()]
            .params
            .iter()
            .map(|&(v, _)| v)
            .collect()
    }

    /// Emit a raw instruction into the current block.
    pub fn emit(&mut self, instr: Instr) {
        let current = self.current.index();
        debug_assert!(
            self.blocks[current].terminator.is_none(),
            "emitting into a terminated block",
        );
        self.blocks[current].body.push(instr);
    }

    /// Terminate the current block.
    ///
    /// # Panics
    ///
    /// Debug-panics if the block already has a terminator.
    pub fn terminate(&mut self, terminator: Terminator) {
        let current = self.current.index();
        debug_assert!(
            self.blocks[current].terminator.is_none(),
            "block terminated twice",
        );
        self.blocks[current].terminator = Some(terminator);
    }

    // Convenience emitters.

    /// Emit a literal binding; returns the defined value.
    pub fn literal(&mut self, ty: TypeId, value: Lit) -> ValueId {
        let dst = self.fresh_value(ty);
        self.emit(Instr::Literal { dst, ty, value });
        dst
    }

    /// Emit a direct call; returns the result value.
    pub fn apply(&mut self, ty: TypeId, callee: Name, args: Vec<ValueId>) -> ValueId {
        let dst = self.fresh_value(ty);
        self.emit(Instr::Apply {
            dst,
            ty,
            callee,
            args,
        });
        dst
    }

    /// Emit a field projection; returns the projected value.
    pub fn project(&mut self, ty: TypeId, base: ValueId, field: u32) -> ValueId {
        let dst = self.fresh_value(ty);
        self.emit(Instr::Project {
            dst,
            ty,
            base,
            field,
        });
        dst
    }

    /// Emit an aggregate construction; returns the aggregate value.
    pub fn aggregate(&mut self, ty: TypeId, fields: Vec<ValueId>) -> ValueId {
        let dst = self.fresh_value(ty);
        self.emit(Instr::Aggregate { dst, ty, fields });
        dst
    }

    /// Emit a retain of `value`.
    pub fn retain(&mut self, value: ValueId) {
        self.emit(Instr::Retain { value });
    }

    /// Emit a release of `value`.
    pub fn release(&mut self, value: ValueId) {
        self.emit(Instr::Release { value });
    }

    /// Consume the builder, producing the finished function.
    ///
    /// # Panics
    ///
    /// Panics if any block lacks a terminator.
    pub fn finish(self) -> Function {
        let blocks = self
            .blocks
            .into_iter()
            .map(|b| Block {
                id: b.id,
                params: b.params,
                body: b.body,
                terminator: b.terminator.unwrap_or_else(|| {
                    panic!("block {} left unterminated", b.id.raw())
                }),
            })
            .collect();
        Function {
            name: self.name,
            params: self.params,
            results: self.results,
            is_method: self.is_method,
            blocks,
            entry: BlockId::new(0),
            value_types: self.value_types,
        }
    }
}
