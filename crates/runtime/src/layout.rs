//! Type table.
//!
//! Resolves type ids to their structural descriptors and is the sole
//! authority on byte layout. Sizes follow structural recursion: scalars
//! by declared width, vectors and arrays by element size times arity,
//! structs by the padding-free sum of their members. Array lengths are
//! named by constant ids and read from the value store at query time,
//! which is why size queries take the store.

use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::IndexMap;

use specular_module::{Id, Program, TypeDesc};

use crate::error::{Error, Result};
use crate::sampler::SamplerRecord;
use crate::store::{ValueStore, POINTER_SIZE};

/// Id to descriptor mapping with a byte-size cache.
#[derive(Debug)]
pub struct TypeTable {
    types: IndexMap<Id, TypeDesc>,
    sizes: RefCell<HashMap<Id, u32>>,
}

impl TypeTable {
    pub fn new(program: &Program) -> Self {
        Self {
            types: program.types.clone(),
            sizes: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: Id) -> Result<&TypeDesc> {
        self.types
            .get(&id)
            .ok_or_else(|| Error::malformed(format!("no type declared for {id}")))
    }

    /// Pointee of a pointer type.
    pub fn pointee(&self, id: Id) -> Result<Id> {
        match self.get(id)? {
            TypeDesc::Pointer { pointee, .. } => Ok(*pointee),
            other => Err(Error::TypeMismatch {
                message: format!("{id} is a {}, not a pointer", other.kind()),
            }),
        }
    }

    pub fn is_pointer(&self, id: Id) -> Result<bool> {
        Ok(self.get(id)?.is_pointer())
    }

    /// Byte size of a type, cached after the first query.
    pub fn byte_size(&self, id: Id, store: &ValueStore) -> Result<u32> {
        if let Some(size) = self.sizes.borrow().get(&id) {
            return Ok(*size);
        }

        let size = match self.get(id)? {
            TypeDesc::Bool => 1,
            TypeDesc::Int { width, .. } | TypeDesc::Float { width } => {
                if width % 8 != 0 {
                    return Err(Error::malformed(format!(
                        "{id} has a width of {width} bits, not a multiple of 8"
                    )));
                }
                width / 8
            }
            TypeDesc::Vector { component, count } => {
                count * self.byte_size(*component, store)?
            }
            TypeDesc::Array { element, length } => {
                let length = self.array_length(*length, store)?;
                length * self.byte_size(*element, store)?
            }
            TypeDesc::Struct { members } => {
                let members = members.clone();
                let mut total = 0;
                for member in members {
                    total += self.byte_size(member, store)?;
                }
                total
            }
            TypeDesc::Pointer { .. } => POINTER_SIZE,
            TypeDesc::Image { .. } | TypeDesc::SampledImage { .. } => SamplerRecord::SIZE,
            TypeDesc::Void | TypeDesc::Function { .. } => {
                return Err(Error::malformed(format!(
                    "{id} ({}) has no byte size",
                    self.get(id)?.kind()
                )))
            }
        };

        self.sizes.borrow_mut().insert(id, size);
        Ok(size)
    }

    /// Offset of member `index` within a struct or vector.
    pub fn member_offset(&self, id: Id, index: u32, store: &ValueStore) -> Result<u32> {
        match self.get(id)? {
            TypeDesc::Vector { component, .. } => {
                Ok(index * self.byte_size(*component, store)?)
            }
            TypeDesc::Struct { members } => {
                let members = members[..index as usize].to_vec();
                let mut offset = 0;
                for member in members {
                    offset += self.byte_size(member, store)?;
                }
                Ok(offset)
            }
            other => Err(Error::TypeMismatch {
                message: format!("{id} ({}) has no member layout", other.kind()),
            }),
        }
    }

    /// Number of elements in a vector or array; zero for anything else.
    pub fn element_count(&self, id: Id, store: &ValueStore) -> Result<u32> {
        match self.get(id)? {
            TypeDesc::Vector { count, .. } => Ok(*count),
            TypeDesc::Array { length, .. } => self.array_length(*length, store),
            _ => Ok(0),
        }
    }

    /// Resolve an array-length constant to its value.
    fn array_length(&self, length: Id, store: &ValueStore) -> Result<u32> {
        let value = store.lookup(length).map_err(|_| {
            Error::malformed(format!("array length constant {length} is not materialized"))
        })?;
        store.read_u32(value.ptr)
    }
}
