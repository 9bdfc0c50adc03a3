//! Type descriptors.
//!
//! Structural records describing every type a module can declare. The
//! runtime's type table resolves ids to these and is the sole authority
//! on byte layout; nothing here computes sizes.

use serde::{Deserialize, Serialize};

use crate::ids::Id;

/// Storage class of a pointer or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    UniformConstant,
    Input,
    Uniform,
    Output,
    Private,
    Function,
}

/// Image dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    D1,
    D2,
    D3,
    Cube,
}

impl Dim {
    /// Number of coordinate components needed to address the image.
    pub fn rank(&self) -> u32 {
        match self {
            Dim::D1 => 1,
            Dim::D2 | Dim::Cube => 2,
            Dim::D3 => 3,
        }
    }
}

/// Structural descriptor for a declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDesc {
    Void,
    Bool,
    /// Integer with a width in bits (must be a multiple of 8).
    Int { width: u32, signed: bool },
    /// IEEE float with a width in bits (must be a multiple of 8).
    Float { width: u32 },
    /// Homogeneous fixed-arity vector.
    Vector { component: Id, count: u32 },
    /// Fixed-length array; `length` names an integer constant resolved
    /// at size-query time.
    Array { element: Id, length: Id },
    /// Members laid out contiguously in declaration order, no padding.
    Struct { members: Vec<Id> },
    /// Machine-word-sized handle to a value of the pointee type.
    Pointer { pointee: Id, storage: StorageClass },
    Image { dim: Dim, arrayed: bool, sampled: bool },
    SampledImage { image: Id },
    Function { ret: Id, params: Vec<Id> },
}

impl TypeDesc {
    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDesc::Pointer { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, TypeDesc::Vector { .. })
    }

    /// Short name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TypeDesc::Void => "void",
            TypeDesc::Bool => "bool",
            TypeDesc::Int { .. } => "int",
            TypeDesc::Float { .. } => "float",
            TypeDesc::Vector { .. } => "vector",
            TypeDesc::Array { .. } => "array",
            TypeDesc::Struct { .. } => "struct",
            TypeDesc::Pointer { .. } => "pointer",
            TypeDesc::Image { .. } => "image",
            TypeDesc::SampledImage { .. } => "sampled-image",
            TypeDesc::Function { .. } => "function",
        }
    }
}
