//! Constant materialization.
//!
//! Walks the module's constant table in declaration order and installs
//! a value for each entry, so composites can reference constituents
//! declared before them.

use tracing::{debug, trace};

use specular_module::{ConstantDef, Program};

use crate::error::{Error, Result};
use crate::layout::TypeTable;
use crate::store::ValueStore;

pub fn initialize(program: &Program, types: &TypeTable, store: &mut ValueStore) -> Result<()> {
    for (&id, def) in &program.constants {
        trace!(constant = %id, "materializing constant");
        match def {
            ConstantDef::Scalar { result_type, bits } => {
                let size = types.byte_size(*result_type, store)?;
                if bits.len() != size as usize {
                    return Err(Error::BadConstant {
                        id,
                        message: format!(
                            "literal payload is {} bytes, result type needs {}",
                            bits.len(),
                            size
                        ),
                    });
                }
                let value = store.alloc_value(*result_type, size);
                store.write(value.ptr, bits)?;
                store.bind(id, value);
            }
            ConstantDef::Composite {
                result_type,
                constituents,
            } => {
                let size = types.byte_size(*result_type, store)?;
                let value = store.alloc_value(*result_type, size);
                let mut cursor = 0;
                for constituent in constituents {
                    let part = store.lookup(*constituent).map_err(|_| Error::BadConstant {
                        id,
                        message: format!("constituent {constituent} is not yet defined"),
                    })?;
                    let part_size = types.byte_size(part.type_id, store)?;
                    if cursor + part_size > size {
                        return Err(Error::BadConstant {
                            id,
                            message: "constituents overflow the result type".to_string(),
                        });
                    }
                    store.copy(part.ptr, value.ptr.advanced(cursor), part_size)?;
                    cursor += part_size;
                }
                if cursor != size {
                    return Err(Error::BadConstant {
                        id,
                        message: format!(
                            "constituents fill {cursor} of {size} result bytes"
                        ),
                    });
                }
                store.bind(id, value);
            }
            ConstantDef::Bool { result_type, value } => {
                let size = types.byte_size(*result_type, store)?;
                let slot = store.alloc_value(*result_type, size);
                store.write(slot.ptr, &[*value as u8])?;
                store.bind(id, slot);
            }
        }
    }

    debug!(count = program.constants.len(), "constants materialized");
    Ok(())
}
