//! Operator kernels.
//!
//! Scalar kernels over 32-bit integers, 32-bit floats and booleans,
//! applied element-wise by [`do_op`]: when the result type is a vector
//! the kernel runs once per component over the matching components of
//! every operand, otherwise once over the scalar operands.

use std::cmp::Ordering;

use specular_module::{Id, TypeDesc};

use crate::error::{Error, Result};
use crate::layout::TypeTable;
use crate::navigate::index_member;
use crate::store::{Value, ValueStore};

/// A scalar read out of or written into a typed buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    I32(i32),
    F32(f32),
    Bool(bool),
}

impl Scalar {
    /// Load a scalar according to its value's element type.
    pub fn read(types: &TypeTable, store: &ValueStore, value: Value) -> Result<Scalar> {
        match types.get(value.type_id)? {
            TypeDesc::Int { width: 32, .. } => Ok(Scalar::I32(store.read_i32(value.ptr)?)),
            TypeDesc::Float { width: 32 } => Ok(Scalar::F32(store.read_f32(value.ptr)?)),
            TypeDesc::Bool => Ok(Scalar::Bool(store.read_u8(value.ptr)? != 0)),
            other => Err(Error::TypeMismatch {
                message: format!(
                    "kernels operate on 32-bit scalars, got {} for {}",
                    other.kind(),
                    value.type_id
                ),
            }),
        }
    }

    /// Store a scalar into a typed slot.
    pub fn write(self, types: &TypeTable, store: &mut ValueStore, target: Value) -> Result<()> {
        match (self, types.get(target.type_id)?) {
            (Scalar::I32(v), TypeDesc::Int { width: 32, .. }) => {
                store.write(target.ptr, &v.to_le_bytes())
            }
            (Scalar::F32(v), TypeDesc::Float { width: 32 }) => {
                store.write(target.ptr, &v.to_le_bytes())
            }
            (Scalar::Bool(v), TypeDesc::Bool) => store.write(target.ptr, &[v as u8]),
            (value, other) => Err(Error::TypeMismatch {
                message: format!("cannot store {value:?} into a {} slot", other.kind()),
            }),
        }
    }

    pub fn as_i32(self) -> Result<i32> {
        match self {
            Scalar::I32(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                message: format!("expected a 32-bit integer, got {other:?}"),
            }),
        }
    }

    pub fn as_f32(self) -> Result<f32> {
        match self {
            Scalar::F32(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                message: format!("expected a 32-bit float, got {other:?}"),
            }),
        }
    }
}

/// A scalar kernel applied to one component of every operand.
pub type Kernel<'a> = &'a dyn Fn(&[Scalar]) -> Result<Scalar>;

/// Apply a kernel element-wise and bind the result into a fresh buffer.
pub fn do_op(
    types: &TypeTable,
    store: &mut ValueStore,
    result_type: Id,
    operands: &[Value],
    kernel: Kernel<'_>,
) -> Result<Value> {
    let size = types.byte_size(result_type, store)?;
    let result = store.alloc_value(result_type, size);

    if let TypeDesc::Vector { count, .. } = types.get(result_type)? {
        let count = *count;
        for i in 0..count {
            let mut args = Vec::with_capacity(operands.len());
            for operand in operands {
                let component = index_member(types, store, *operand, i)?;
                args.push(Scalar::read(types, store, component)?);
            }
            let slot = index_member(types, store, result, i)?;
            kernel(&args)?.write(types, store, slot)?;
        }
    } else {
        let mut args = Vec::with_capacity(operands.len());
        for operand in operands {
            args.push(Scalar::read(types, store, *operand)?);
        }
        kernel(&args)?.write(types, store, result)?;
    }

    Ok(result)
}

// Integer arithmetic wraps, matching hardware shader behavior.

pub fn add_i32(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::I32(args[0].as_i32()?.wrapping_add(args[1].as_i32()?)))
}

pub fn sub_i32(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::I32(args[0].as_i32()?.wrapping_sub(args[1].as_i32()?)))
}

pub fn mul_i32(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::I32(args[0].as_i32()?.wrapping_mul(args[1].as_i32()?)))
}

pub fn div_i32(args: &[Scalar]) -> Result<Scalar> {
    let divisor = args[1].as_i32()?;
    args[0]
        .as_i32()?
        .checked_div(divisor)
        .map(Scalar::I32)
        .ok_or_else(|| Error::malformed("signed division by zero"))
}

pub fn add_f32(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::F32(args[0].as_f32()? + args[1].as_f32()?))
}

pub fn sub_f32(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::F32(args[0].as_f32()? - args[1].as_f32()?))
}

pub fn mul_f32(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::F32(args[0].as_f32()? * args[1].as_f32()?))
}

pub fn div_f32(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::F32(args[0].as_f32()? / args[1].as_f32()?))
}

/// Three-way compare of signed integers: -1, 0 or 1.
pub fn cmp_i32(a: Scalar, b: Scalar) -> Result<i32> {
    Ok(match a.as_i32()?.cmp(&b.as_i32()?) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

/// Three-way compare of floats; NaN compares equal.
pub fn cmp_f32(a: Scalar, b: Scalar) -> Result<i32> {
    Ok(match a.as_f32()?.partial_cmp(&b.as_f32()?) {
        Some(Ordering::Less) => -1,
        Some(Ordering::Greater) => 1,
        _ => 0,
    })
}

pub fn convert_s_to_f(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::F32(args[0].as_i32()? as f32))
}

pub fn convert_f_to_s(args: &[Scalar]) -> Result<Scalar> {
    Ok(Scalar::I32(args[0].as_f32()? as i32))
}
