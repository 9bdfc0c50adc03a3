//! Composite navigation.
//!
//! Index chains address sub-objects of vectors and structs; a pointer
//! met anywhere along the chain is dereferenced and the chain continues
//! into the pointee. Offsets always come from the type table.

use specular_module::TypeDesc;

use crate::error::{Error, Result};
use crate::layout::TypeTable;
use crate::store::{Value, ValueStore};

/// Follow a pointer value to its pointee; anything else passes through.
pub fn dereference(types: &TypeTable, store: &ValueStore, value: Value) -> Result<Value> {
    if !types.is_pointer(value.type_id)? {
        return Ok(value);
    }
    Ok(Value {
        type_id: types.pointee(value.type_id)?,
        ptr: store.read_ptr(value.ptr)?,
    })
}

/// Address member `index` of a composite value.
pub fn index_member(
    types: &TypeTable,
    store: &ValueStore,
    value: Value,
    index: u32,
) -> Result<Value> {
    match types.get(value.type_id)? {
        TypeDesc::Vector { component, count } => {
            if index >= *count {
                return Err(Error::IndexOutOfRange {
                    type_id: value.type_id,
                    index,
                    limit: *count,
                });
            }
            Ok(Value {
                type_id: *component,
                ptr: value.ptr.advanced(types.member_offset(value.type_id, index, store)?),
            })
        }
        TypeDesc::Struct { members } => {
            if index as usize >= members.len() {
                return Err(Error::IndexOutOfRange {
                    type_id: value.type_id,
                    index,
                    limit: members.len() as u32,
                });
            }
            Ok(Value {
                type_id: members[index as usize],
                ptr: value.ptr.advanced(types.member_offset(value.type_id, index, store)?),
            })
        }
        TypeDesc::Pointer { .. } => {
            let pointee = dereference(types, store, value)?;
            index_member(types, store, pointee, index)
        }
        other => Err(Error::TypeMismatch {
            message: format!("{} ({}) is not a composite type", value.type_id, other.kind()),
        }),
    }
}

/// Apply an index chain left to right; with no indices the value is
/// returned unchanged.
pub fn pointer_in_composite(
    types: &TypeTable,
    store: &ValueStore,
    value: Value,
    indices: &[u32],
) -> Result<Value> {
    let mut current = value;
    for &index in indices {
        current = index_member(types, store, current, index)?;
    }
    Ok(current)
}
