//! Value storage.
//!
//! All runtime buffers live in an arena owned by the store; a [`Ptr`]
//! is a (slot, byte offset) handle into it. A [`Value`] is a typed view
//! over a place: the type id names the layout, the handle names the
//! bytes. Pointer-typed values keep their machine-pointer-sized buffer
//! from the bytecode's point of view, but the eight bytes hold an
//! encoded handle rather than a raw address, so dereferencing is always
//! checked against the arena.
//!
//! Buffers are never freed during a run; everything is released when
//! the store is dropped.

use std::collections::HashMap;

use specular_module::Id;

use crate::error::{Error, Result};

/// Byte size of a pointer buffer.
pub const POINTER_SIZE: u32 = 8;

/// Handle to a place inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ptr {
    pub slot: u32,
    pub offset: u32,
}

impl Ptr {
    /// The same slot, `delta` bytes further in.
    pub fn advanced(self, delta: u32) -> Ptr {
        Ptr {
            slot: self.slot,
            offset: self.offset + delta,
        }
    }

    /// Encode into a pointer buffer image.
    pub fn encode(self) -> [u8; POINTER_SIZE as usize] {
        let mut bits = [0u8; POINTER_SIZE as usize];
        bits[..4].copy_from_slice(&self.slot.to_le_bytes());
        bits[4..].copy_from_slice(&self.offset.to_le_bytes());
        bits
    }

    pub fn decode(bits: [u8; POINTER_SIZE as usize]) -> Ptr {
        Ptr {
            slot: u32::from_le_bytes([bits[0], bits[1], bits[2], bits[3]]),
            offset: u32::from_le_bytes([bits[4], bits[5], bits[6], bits[7]]),
        }
    }
}

/// A typed view over a place in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value {
    pub type_id: Id,
    pub ptr: Ptr,
}

/// Arena of interpreter-owned buffers plus result-id bindings.
#[derive(Debug, Default)]
pub struct ValueStore {
    slots: Vec<Vec<u8>>,
    bindings: HashMap<Id, Value>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zeroed buffer and return its handle.
    pub fn alloc(&mut self, len: u32) -> Ptr {
        let slot = self.slots.len() as u32;
        self.slots.push(vec![0u8; len as usize]);
        Ptr { slot, offset: 0 }
    }

    /// Allocate a zeroed buffer typed as `type_id`.
    pub fn alloc_value(&mut self, type_id: Id, len: u32) -> Value {
        Value {
            type_id,
            ptr: self.alloc(len),
        }
    }

    /// Borrow `len` bytes starting at `ptr`.
    pub fn bytes(&self, ptr: Ptr, len: u32) -> Result<&[u8]> {
        let slot = self
            .slots
            .get(ptr.slot as usize)
            .ok_or_else(|| Error::malformed(format!("dangling buffer handle {ptr:?}")))?;
        let start = ptr.offset as usize;
        let end = start + len as usize;
        slot.get(start..end)
            .ok_or_else(|| Error::malformed(format!("read of {len} bytes past end of {ptr:?}")))
    }

    pub fn bytes_mut(&mut self, ptr: Ptr, len: u32) -> Result<&mut [u8]> {
        let slot = self
            .slots
            .get_mut(ptr.slot as usize)
            .ok_or_else(|| Error::malformed(format!("dangling buffer handle {ptr:?}")))?;
        let start = ptr.offset as usize;
        let end = start + len as usize;
        slot.get_mut(start..end)
            .ok_or_else(|| Error::malformed(format!("write of {len} bytes past end of {ptr:?}")))
    }

    /// Overwrite the bytes at `dst` with `src`.
    pub fn write(&mut self, dst: Ptr, src: &[u8]) -> Result<()> {
        self.bytes_mut(dst, src.len() as u32)?.copy_from_slice(src);
        Ok(())
    }

    /// Copy `len` bytes from one place to another. The places may live
    /// in the same slot.
    pub fn copy(&mut self, src: Ptr, dst: Ptr, len: u32) -> Result<()> {
        let image = self.bytes(src, len)?.to_vec();
        self.write(dst, &image)
    }

    pub fn read_u8(&self, ptr: Ptr) -> Result<u8> {
        Ok(self.bytes(ptr, 1)?[0])
    }

    pub fn read_u32(&self, ptr: Ptr) -> Result<u32> {
        let b = self.bytes(ptr, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&self, ptr: Ptr) -> Result<i32> {
        let b = self.bytes(ptr, 4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&self, ptr: Ptr) -> Result<f32> {
        let b = self.bytes(ptr, 4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read the handle stored in a pointer buffer.
    pub fn read_ptr(&self, at: Ptr) -> Result<Ptr> {
        let b = self.bytes(at, POINTER_SIZE)?;
        let mut bits = [0u8; POINTER_SIZE as usize];
        bits.copy_from_slice(b);
        Ok(Ptr::decode(bits))
    }

    /// Store a handle into a pointer buffer.
    pub fn write_ptr(&mut self, at: Ptr, target: Ptr) -> Result<()> {
        self.write(at, &target.encode())
    }

    /// Bind a result id, replacing any previous binding.
    pub fn bind(&mut self, id: Id, value: Value) {
        self.bindings.insert(id, value);
    }

    pub fn try_lookup(&self, id: Id) -> Option<Value> {
        self.bindings.get(&id).copied()
    }

    pub fn lookup(&self, id: Id) -> Result<Value> {
        self.try_lookup(id)
            .ok_or_else(|| Error::malformed(format!("no value bound to {id}")))
    }
}
