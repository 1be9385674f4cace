//! Argument decomposition trees.
//!
//! A [`ProjectionTree`] mirrors the recursive aggregate structure of one
//! argument's type: interior nodes are structs and tuples, leaves are
//! everything else (scalars, strings, enums, archetypes, class
//! references). Explosion replaces an aggregate argument with one
//! parameter per leaf; the tree supplies the leaf ordering and the field
//! paths needed to project each leaf out of the original value.
//!
//! # Design
//!
//! Nodes live in a flat arena indexed by `u32`, with node 0 as the root.
//! Leaf enumeration is pre-order (field order within each aggregate),
//! which makes the leaf sequence deterministic for a given type.

use sable_ir::{TypeId, TypeTable};
use smallvec::SmallVec;

/// One node of a decomposition tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjNode {
    /// Type at this node.
    pub ty: TypeId,
    /// Field index of this node within its parent. 0 for the root.
    pub field: u32,
    /// Child node indices, in field order. Empty for leaves.
    pub children: Vec<u32>,
}

/// A scalar leaf of a decomposition tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    /// Field indices from the root to this leaf. Empty when the root
    /// itself is the leaf.
    pub path: SmallVec<[u32; 4]>,
    /// The leaf's type.
    pub ty: TypeId,
}

/// Decomposition tree for a single argument type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectionTree {
    nodes: Vec<ProjNode>,
}

impl ProjectionTree {
    /// Build the full decomposition tree for `ty`.
    ///
    /// Structs and tuples with at least one field expand into children;
    /// every other type is a leaf. Empty aggregates stay leaves.
    pub fn build(types: &TypeTable, ty: TypeId) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.expand(types, ty, 0);
        tree
    }

    fn expand(&mut self, types: &TypeTable, ty: TypeId, field: u32) -> u32 {
        let index = u32::try_from(self.nodes.len())
            .unwrap_or_else(|_| panic!("projection tree exceeds u32::MAX nodes"));
        self.nodes.push(ProjNode {
            ty,
            field,
            children: Vec::new(),
        });
        let fields: Vec<TypeId> = match types.aggregate_fields(ty) {
            Some(fields) if !fields.is_empty() => fields.to_vec(),
            _ => return index,
        };
        let children: Vec<u32> = fields
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                self.expand(
                    types,
                    f,
                    u32::try_from(i).unwrap_or_else(|_| panic!("field index exceeds u32::MAX")),
                )
            })
            .collect();
        self.nodes[index as usize].children = children;
        index
    }

    /// The root node's type.
    pub fn root_type(&self) -> TypeId {
        self.nodes[0].ty
    }

    /// Borrow a node by arena index. Node 0 is the root.
    pub fn node(&self, index: u32) -> &ProjNode {
        &self.nodes[index as usize]
    }

    /// Number of scalar leaves.
    pub fn leaf_count(&self) -> u32 {
        let mut count = 0;
        for node in &self.nodes {
            if node.children.is_empty() {
                count += 1;
            }
        }
        count
    }

    /// Returns `true` if decomposing would reproduce the original value
    /// unchanged (the tree is a single leaf).
    pub fn is_singleton(&self) -> bool {
        self.nodes.len() == 1
    }

    /// All leaves in pre-order, each with its field path from the root.
    pub fn leaves(&self) -> Vec<Leaf> {
        let mut out = Vec::new();
        let mut path = SmallVec::new();
        self.collect_leaves(0, &mut path, &mut out);
        out
    }

    fn collect_leaves(&self, node: u32, path: &mut SmallVec<[u32; 4]>, out: &mut Vec<Leaf>) {
        let n = &self.nodes[node as usize];
        if n.children.is_empty() {
            out.push(Leaf {
                path: path.clone(),
                ty: n.ty,
            });
            return;
        }
        for &child in &n.children {
            path.push(self.nodes[child as usize].field);
            self.collect_leaves(child, path, out);
            path.pop();
        }
    }
}
