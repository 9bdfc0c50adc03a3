//! Image sampling.
//!
//! A sampled-image value's buffer holds a fixed-layout record bundling
//! a texture handle with dimensions, wrap mode and texel arity. Texel
//! storage itself is registered with the interpreter by the embedder
//! and addressed through the handle. Filtering is nearest-neighbor.

use crate::error::{Error, Result};

/// Texel wrap behavior at image edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Clamp,
    Repeat,
}

impl WrapMode {
    fn encode(self) -> u32 {
        match self {
            WrapMode::Clamp => 0,
            WrapMode::Repeat => 1,
        }
    }

    fn decode(raw: u32) -> Result<WrapMode> {
        match raw {
            0 => Ok(WrapMode::Clamp),
            1 => Ok(WrapMode::Repeat),
            other => Err(Error::malformed(format!("unknown wrap mode {other}"))),
        }
    }
}

/// The fixed-layout sampler record stored in a sampled-image buffer.
///
/// Layout, little-endian u32 fields: texture handle, dimension count,
/// three dimension extents, wrap mode, components per texel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerRecord {
    /// Handle into the interpreter's registered texture table.
    pub texture: u32,
    pub dim_count: u32,
    pub dims: [u32; 3],
    pub wrap: WrapMode,
    /// Floats per texel in the row-major texel storage.
    pub components: u32,
}

impl SamplerRecord {
    pub const SIZE: u32 = 28;

    pub fn encode(&self) -> [u8; Self::SIZE as usize] {
        let mut bits = [0u8; Self::SIZE as usize];
        let fields = [
            self.texture,
            self.dim_count,
            self.dims[0],
            self.dims[1],
            self.dims[2],
            self.wrap.encode(),
            self.components,
        ];
        for (chunk, field) in bits.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        bits
    }

    pub fn decode(bits: &[u8]) -> Result<SamplerRecord> {
        if bits.len() != Self::SIZE as usize {
            return Err(Error::malformed(format!(
                "sampler record is {} bytes, expected {}",
                bits.len(),
                Self::SIZE
            )));
        }
        let mut fields = [0u32; 7];
        for (field, chunk) in fields.iter_mut().zip(bits.chunks_exact(4)) {
            *field = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        if fields[1] > 3 {
            return Err(Error::malformed(format!(
                "sampler record has {} dimensions, at most 3 supported",
                fields[1]
            )));
        }
        Ok(SamplerRecord {
            texture: fields[0],
            dim_count: fields[1],
            dims: [fields[2], fields[3], fields[4]],
            wrap: WrapMode::decode(fields[5])?,
            components: fields[6],
        })
    }
}

/// Nearest-neighbor lattice coordinate for one axis.
fn lattice(coord: f32, size: u32, wrap: WrapMode) -> i64 {
    let nearest = (coord * (size - 1) as f32 + 0.5).floor() as i64;
    match wrap {
        WrapMode::Clamp => nearest.clamp(0, size as i64 - 1),
        WrapMode::Repeat => nearest.rem_euclid(size as i64),
    }
}

/// Linear texel index for normalized coordinates, row-major.
pub fn texel_index(record: &SamplerRecord, coords: &[f32]) -> Result<usize> {
    if coords.len() < record.dim_count as usize {
        return Err(Error::TypeMismatch {
            message: format!(
                "sampler needs {} coordinates, got {}",
                record.dim_count,
                coords.len()
            ),
        });
    }

    let mut index: i64 = 0;
    let mut stride: i64 = 1;
    for d in 0..record.dim_count as usize {
        let size = record.dims[d];
        if size == 0 {
            return Err(Error::malformed("sampler record has a zero-sized dimension"));
        }
        index += lattice(coords[d], size, record.wrap) * stride;
        stride *= size as i64;
    }
    Ok(index as usize)
}
