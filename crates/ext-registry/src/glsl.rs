//! Reference extension set with GLSL-flavored operations.
//!
//! All entries treat their operands as packed `f32`s and work
//! element-wise, so they apply to scalars and vectors alike.

use specular_module::Id;

use crate::{pack_f32s, ExtInst, ExtOperand};

/// Set name the table is conventionally registered under.
pub const SET_NAME: &str = "glsl.std";

/// The instruction table, in index order.
pub fn table() -> Vec<ExtInst> {
    vec![
        ExtInst {
            name: "sqrt",
            func: sqrt,
        },
        ExtInst {
            name: "mix",
            func: mix,
        },
        ExtInst {
            name: "clamp",
            func: clamp,
        },
        ExtInst {
            name: "normalize",
            func: normalize,
        },
    ]
}

fn sqrt(_: Id, args: &[ExtOperand]) -> Vec<u8> {
    let xs: Vec<f32> = args[0].as_f32s().iter().map(|v| v.sqrt()).collect();
    pack_f32s(&xs)
}

/// `mix(a, b, t) = a + (b - a) * t`, with `t` broadcast when scalar.
fn mix(_: Id, args: &[ExtOperand]) -> Vec<u8> {
    let a = args[0].as_f32s();
    let b = args[1].as_f32s();
    let t = args[2].as_f32s();
    let out: Vec<f32> = a
        .iter()
        .zip(&b)
        .enumerate()
        .map(|(i, (a, b))| {
            let t = if t.len() == 1 { t[0] } else { t[i] };
            a + (b - a) * t
        })
        .collect();
    pack_f32s(&out)
}

fn clamp(_: Id, args: &[ExtOperand]) -> Vec<u8> {
    let x = args[0].as_f32s();
    let lo = args[1].as_f32s();
    let hi = args[2].as_f32s();
    let out: Vec<f32> = x
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let lo = if lo.len() == 1 { lo[0] } else { lo[i] };
            let hi = if hi.len() == 1 { hi[0] } else { hi[i] };
            v.clamp(lo, hi)
        })
        .collect();
    pack_f32s(&out)
}

fn normalize(_: Id, args: &[ExtOperand]) -> Vec<u8> {
    let xs = args[0].as_f32s();
    let len = xs.iter().map(|v| v * v).sum::<f32>().sqrt();
    let out: Vec<f32> = if len == 0.0 {
        xs
    } else {
        xs.iter().map(|v| v / len).collect()
    };
    pack_f32s(&out)
}
