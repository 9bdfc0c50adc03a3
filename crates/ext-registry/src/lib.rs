//! Extension-instruction sets.
//!
//! A module imports extension sets by name; each import binds a set id
//! to an ordered table of callables, and the `ExtInst` opcode addresses
//! a callable by `(set id, instruction index)`. Resolution goes through
//! an [`ExtensionProvider`]: the platform shared-library loader is one
//! provider, [`StaticProvider`] serves in-process tables for tests and
//! embedders.
//!
//! Callables receive their operands materialized to byte images and
//! return the byte image of the result. They cannot hold references
//! into interpreter memory past the call.

use std::collections::HashMap;

use tracing::debug;

use specular_module::Id;

pub mod glsl;

/// An operand materialized to its byte image.
#[derive(Debug, Clone)]
pub struct ExtOperand {
    pub type_id: Id,
    pub bits: Vec<u8>,
}

impl ExtOperand {
    /// Reinterpret the payload as packed little-endian `f32`s.
    pub fn as_f32s(&self) -> Vec<f32> {
        self.bits
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

/// Pack `f32`s back into a little-endian byte image.
pub fn pack_f32s(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// An extended-instruction callable.
///
/// Receives the result type id and the dereferenced operands; returns
/// the result's byte image, which the interpreter validates against the
/// result type and installs.
pub type ExtInstFn = fn(result_type: Id, args: &[ExtOperand]) -> Vec<u8>;

/// A named entry in an extension set's instruction table.
///
/// Dispatch is by table index; the name only feeds diagnostics.
#[derive(Clone, Copy)]
pub struct ExtInst {
    pub name: &'static str,
    pub func: ExtInstFn,
}

impl std::fmt::Debug for ExtInst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExtInst({})", self.name)
    }
}

/// Resolves a lowercased set name to its instruction table.
pub trait ExtensionProvider {
    fn resolve(&self, name: &str) -> Option<Vec<ExtInst>>;
}

/// In-process provider backed by a name to table map.
#[derive(Default)]
pub struct StaticProvider {
    sets: HashMap<String, Vec<ExtInst>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under a set name; the name is lowercased.
    pub fn with_set(mut self, name: &str, table: Vec<ExtInst>) -> Self {
        self.sets.insert(name.to_lowercase(), table);
        self
    }
}

impl ExtensionProvider for StaticProvider {
    fn resolve(&self, name: &str) -> Option<Vec<ExtInst>> {
        self.sets.get(name).cloned()
    }
}

/// Bindings from imported set ids to resolved instruction tables.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    sets: HashMap<Id, Vec<ExtInst>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, set: Id, table: Vec<ExtInst>) {
        debug!(set = %set, instructions = table.len(), "extension set registered");
        self.sets.insert(set, table);
    }

    pub fn is_registered(&self, set: Id) -> bool {
        self.sets.contains_key(&set)
    }

    /// Look up a callable by set id and instruction index.
    pub fn lookup(&self, set: Id, instruction: u32) -> Option<ExtInst> {
        self.sets
            .get(&set)?
            .get(instruction as usize)
            .copied()
    }
}
