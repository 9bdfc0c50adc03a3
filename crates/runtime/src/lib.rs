//! Specular runtime.
//!
//! Executes parsed shader bytecode against a typed-value memory model:
//! every runtime value is a (type id, buffer) pair laid out by the type
//! table, pointers are handles into an interpreter-owned arena, and a
//! frame-stack loop dispatches instructions one at a time.

pub mod constants;
pub mod error;
pub mod interpreter;
pub mod kernels;
pub mod layout;
pub mod navigate;
pub mod sampler;
pub mod store;

pub use error::{Error, Result};
pub use interpreter::Interpreter;
pub use layout::TypeTable;
pub use sampler::{SamplerRecord, WrapMode};
pub use store::{Ptr, Value, ValueStore, POINTER_SIZE};
