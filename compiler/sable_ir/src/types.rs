//! Pooled type representation.
//!
//! `TypeId` is the canonical type handle: a 32-bit index into a [`TypeTable`]
//! pool. Scalar primitives have fixed indices for O(1) access; aggregate
//! shapes are interned with deduplication, so type equality is index
//! equality.
//!
//! The signature-optimization pass only needs a handful of queries from the
//! type system: triviality (does a value of this type carry a reference
//! count), aggregate field lists (for the decomposition tree), archetype
//! detection (generic `@in` arguments), and the per-module expansion policy.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::name::Name;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // Primitive types are pre-interned at pool creation for O(1) access.

    /// The `int` type (64-bit signed integer).
    pub const INT: Self = Self(0);
    /// The `float` type (64-bit floating point).
    pub const FLOAT: Self = Self(1);
    /// The `bool` type.
    pub const BOOL: Self = Self(2);
    /// The `str` type (reference-counted UTF-8 string).
    pub const STR: Self = Self(3);
    /// The unit type `()`.
    pub const UNIT: Self = Self(4);

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 5;

    /// Create an index from a raw `u32` value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INT => write!(f, "TypeId::INT"),
            Self::FLOAT => write!(f, "TypeId::FLOAT"),
            Self::BOOL => write!(f, "TypeId::BOOL"),
            Self::STR => write!(f, "TypeId::STR"),
            Self::UNIT => write!(f, "TypeId::UNIT"),
            _ => write!(f, "TypeId({})", self.0),
        }
    }
}

/// Structural shape of a pooled type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Int,
    Float,
    Bool,
    /// Reference-counted string.
    Str,
    Unit,
    /// Named struct with ordered fields.
    Struct { name: Name, fields: Vec<TypeId> },
    /// Anonymous tuple.
    Tuple { fields: Vec<TypeId> },
    /// Enum. Payload types participate in triviality only — enums are
    /// never decomposed by the signature pass.
    Enum { name: Name, payload: Vec<TypeId> },
    /// Unresolved generic parameter. Address-only; conservatively
    /// reference-counted.
    Archetype { name: Name },
    /// Opaque reference-counted class instance.
    Ref { name: Name },
}

/// Type pool with interning and cached triviality.
pub struct TypeTable {
    kinds: Vec<TypeKind>,
    /// `trivial[i]` — values of type `i` carry no reference count.
    trivial: Vec<bool>,
    dedup: FxHashMap<TypeKind, TypeId>,
}

impl TypeTable {
    /// Create a table with the primitive types pre-interned at their fixed
    /// indices.
    pub fn new() -> Self {
        let mut table = Self {
            kinds: Vec::new(),
            trivial: Vec::new(),
            dedup: FxHashMap::default(),
        };
        let int = table.intern(TypeKind::Int);
        let float = table.intern(TypeKind::Float);
        let boolean = table.intern(TypeKind::Bool);
        let str_ty = table.intern(TypeKind::Str);
        let unit = table.intern(TypeKind::Unit);
        debug_assert_eq!(int, TypeId::INT);
        debug_assert_eq!(float, TypeId::FLOAT);
        debug_assert_eq!(boolean, TypeId::BOOL);
        debug_assert_eq!(str_ty, TypeId::STR);
        debug_assert_eq!(unit, TypeId::UNIT);
        table
    }

    /// Intern a type shape, returning its stable handle.
    ///
    /// Component types of aggregates must already be interned in this table.
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.dedup.get(&kind) {
            return id;
        }
        let trivial = self.compute_trivial(&kind);
        let raw = u32::try_from(self.kinds.len())
            .unwrap_or_else(|_| panic!("type pool exceeds u32::MAX entries"));
        let id = TypeId::from_raw(raw);
        self.kinds.push(kind.clone());
        self.trivial.push(trivial);
        self.dedup.insert(kind, id);
        id
    }

    fn compute_trivial(&self, kind: &TypeKind) -> bool {
        match kind {
            TypeKind::Int | TypeKind::Float | TypeKind::Bool | TypeKind::Unit => true,
            TypeKind::Str | TypeKind::Archetype { .. } | TypeKind::Ref { .. } => false,
            TypeKind::Struct { fields, .. } | TypeKind::Tuple { fields } => {
                fields.iter().all(|&f| self.is_trivial(f))
            }
            TypeKind::Enum { payload, .. } => payload.iter().all(|&f| self.is_trivial(f)),
        }
    }

    /// Structural shape of a type.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this table.
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.index()]
    }

    /// Returns `true` if values of this type carry no reference count.
    pub fn is_trivial(&self, id: TypeId) -> bool {
        self.trivial[id.index()]
    }

    /// Returns `true` if this type is an unresolved generic parameter.
    pub fn is_archetype(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Archetype { .. })
    }

    /// Ordered field types of a decomposable aggregate (struct or tuple).
    ///
    /// Enums, archetypes, and scalars return `None` — they are leaves as far
    /// as signature decomposition is concerned.
    pub fn aggregate_fields(&self, id: TypeId) -> Option<&[TypeId]> {
        match self.kind(id) {
            TypeKind::Struct { fields, .. } | TypeKind::Tuple { fields } => Some(fields),
            _ => None,
        }
    }

    /// Returns `true` if the type mentions an archetype anywhere in its
    /// structure.
    pub fn contains_archetype(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Archetype { .. } => true,
            TypeKind::Struct { fields, .. } | TypeKind::Tuple { fields } => {
                fields.iter().any(|&f| self.contains_archetype(f))
            }
            TypeKind::Enum { payload, .. } => payload.iter().any(|&f| self.contains_archetype(f)),
            _ => false,
        }
    }

    /// Total number of scalar leaves a full decomposition of this type
    /// would produce. Non-aggregates count as one leaf.
    pub fn leaf_count(&self, id: TypeId) -> u32 {
        match self.aggregate_fields(id) {
            Some(fields) if !fields.is_empty() => {
                fields.iter().map(|&f| self.leaf_count(f)).sum()
            }
            _ => 1,
        }
    }

    // Convenience constructors used across the pass tests.

    /// Intern a named struct type.
    pub fn strukt(&mut self, name: Name, fields: Vec<TypeId>) -> TypeId {
        self.intern(TypeKind::Struct { name, fields })
    }

    /// Intern a tuple type.
    pub fn tuple(&mut self, fields: Vec<TypeId>) -> TypeId {
        self.intern(TypeKind::Tuple { fields })
    }

    /// Intern an enum type.
    pub fn enumeration(&mut self, name: Name, payload: Vec<TypeId>) -> TypeId {
        self.intern(TypeKind::Enum { name, payload })
    }

    /// Intern an archetype (generic parameter) type.
    pub fn archetype(&mut self, name: Name) -> TypeId {
        self.intern(TypeKind::Archetype { name })
    }

    /// Intern an opaque reference-counted class type.
    pub fn reference(&mut self, name: Name) -> TypeId {
        self.intern(TypeKind::Ref { name })
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

// Compile-time size assertion: TypeId must be exactly 4 bytes.
const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
