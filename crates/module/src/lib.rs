//! Program representation for Specular.
//!
//! A [`Program`] is the parsed form of a shader bytecode module: type
//! declarations, constants, global variables, function bodies and entry
//! points. The parser that produces it from a binary module lives
//! outside this workspace; [`ProgramBuilder`] assembles programs in
//! process for embedders and tests.

pub mod ids;
pub mod instr;
pub mod program;
pub mod types;

pub use ids::Id;
pub use instr::{ConstantDef, Instruction};
pub use program::{
    EntryPoint, FunctionBuilder, FunctionDef, Parameter, Program, ProgramBuilder, VariableDecl,
};
pub use types::{Dim, StorageClass, TypeDesc};
