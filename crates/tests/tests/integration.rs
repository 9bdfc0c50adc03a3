//! End-to-end execution tests.
//!
//! Each test assembles a program, injects inputs, runs every entry
//! point and checks the observable effects: stores to output variables,
//! texture sampling results and reported failures.

use specular_module::{Instruction, StorageClass};
use specular_runtime::{Error, SamplerRecord, WrapMode};
use specular_tests::{Scaffold, TestHarness};

/// Lerp through the arithmetic opcodes: `a + (b - a) * t`.
///
/// With `a = (0,0,0)`, `b = (4,2,1)` and `t = 0.25` the output must be
/// `(1.0, 0.5, 0.25)`.
#[test]
fn test_lerp_through_arithmetic() {
    let mut s = Scaffold::new();
    let in_a = s.input(s.vec3, "in_a");
    let in_b = s.input(s.vec3, "in_b");
    let in_t = s.input(s.float, "in_t");
    let out = s.output(s.vec3, "out_color");
    let (vec3, float, void_fn) = (s.vec3, s.float, s.void_fn);
    let in_vec3 = s.pointer(vec3, StorageClass::Input);
    let in_float = s.pointer(float, StorageClass::Input);

    let mut f = s.builder.function(void_fn);
    let a = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: in_vec3,
        result: a,
        pointer: in_a,
    });
    let b = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: in_vec3,
        result: b,
        pointer: in_b,
    });
    let t = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: in_float,
        result: t,
        pointer: in_t,
    });
    let delta = f.fresh_id();
    f.emit(Instruction::FSub {
        result_type: vec3,
        result: delta,
        operand1: b,
        operand2: a,
    });
    let scaled = f.fresh_id();
    f.emit(Instruction::VectorTimesScalar {
        result_type: vec3,
        result: scaled,
        vector: delta,
        scalar: t,
    });
    let sum = f.fresh_id();
    f.emit(Instruction::FAdd {
        result_type: vec3,
        result: sum,
        operand1: a,
        operand2: scaled,
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: sum,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.set_f32s("in_a", &[0.0, 0.0, 0.0]);
    harness.set_f32s("in_b", &[4.0, 2.0, 1.0]);
    harness.set_f32("in_t", 0.25);
    harness.run();

    assert_eq!(harness.read_f32s("out_color", 3), vec![1.0, 0.5, 0.25]);
}

/// A branching loop that sums `i` for `i` in `[0, 5)`.
///
/// Exercises labels, the loop-merge hint, the conditional branch and
/// stores through function-local variables. The accumulator ends at 10.
#[test]
fn test_integer_loop_accumulator() {
    let mut s = Scaffold::new();
    let out = s.output(s.int, "out_sum");
    let (int, boolean, void_fn) = (s.int, s.boolean, s.void_fn);
    let ptr_int = s.pointer(int, StorageClass::Function);
    let c0 = s.builder.const_i32(int, 0);
    let c1 = s.builder.const_i32(int, 1);
    let c5 = s.builder.const_i32(int, 5);

    let mut f = s.builder.function(void_fn);
    let i_var = f.local_variable(ptr_int, StorageClass::Function);
    let sum_var = f.local_variable(ptr_int, StorageClass::Function);
    f.emit(Instruction::Store {
        pointer: i_var,
        object: c0,
    });
    f.emit(Instruction::Store {
        pointer: sum_var,
        object: c0,
    });

    let head = f.new_label();
    let body = f.new_label();
    let exit = f.new_label();

    f.place_label(head);
    let i_now = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_int,
        result: i_now,
        pointer: i_var,
    });
    let keep_going = f.fresh_id();
    f.emit(Instruction::SLessThan {
        result_type: boolean,
        result: keep_going,
        operand1: i_now,
        operand2: c5,
    });
    f.emit(Instruction::LoopMerge {
        merge: exit,
        continue_target: head,
    });
    f.emit(Instruction::BranchConditional {
        condition: keep_going,
        true_label: body,
        false_label: exit,
    });

    f.place_label(body);
    let sum_now = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_int,
        result: sum_now,
        pointer: sum_var,
    });
    let i_again = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_int,
        result: i_again,
        pointer: i_var,
    });
    let new_sum = f.fresh_id();
    f.emit(Instruction::IAdd {
        result_type: int,
        result: new_sum,
        operand1: sum_now,
        operand2: i_again,
    });
    f.emit(Instruction::Store {
        pointer: sum_var,
        object: new_sum,
    });
    let i_next = f.fresh_id();
    f.emit(Instruction::IAdd {
        result_type: int,
        result: i_next,
        operand1: i_again,
        operand2: c1,
    });
    f.emit(Instruction::Store {
        pointer: i_var,
        object: i_next,
    });
    f.emit(Instruction::Branch { target: head });

    f.place_label(exit);
    let final_sum = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_int,
        result: final_sum,
        pointer: sum_var,
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: final_sum,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();
    assert_eq!(harness.read_i32("out_sum"), 10);
}

/// Shuffle selectors reaching into the second vector, and an
/// interleaving selection across both.
#[test]
fn test_vector_shuffle_selection() {
    let mut s = Scaffold::new();
    let in_v1 = s.input(s.vec4, "v1");
    let in_v2 = s.input(s.vec4, "v2");
    let out_second = s.output(s.vec4, "out_second");
    let out_even = s.output(s.vec4, "out_even");
    let (vec4, void_fn) = (s.vec4, s.void_fn);
    let in_vec4 = s.pointer(vec4, StorageClass::Input);

    let mut f = s.builder.function(void_fn);
    let v1 = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: in_vec4,
        result: v1,
        pointer: in_v1,
    });
    let v2 = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: in_vec4,
        result: v2,
        pointer: in_v2,
    });
    let second = f.fresh_id();
    f.emit(Instruction::VectorShuffle {
        result_type: vec4,
        result: second,
        vector1: v1,
        vector2: v2,
        components: vec![4, 5, 6, 7],
    });
    let even = f.fresh_id();
    f.emit(Instruction::VectorShuffle {
        result_type: vec4,
        result: even,
        vector1: v1,
        vector2: v2,
        components: vec![0, 2, 4, 6],
    });
    f.emit(Instruction::Store {
        pointer: out_second,
        object: second,
    });
    f.emit(Instruction::Store {
        pointer: out_even,
        object: even,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.set_f32s("v1", &[1.0, 2.0, 3.0, 4.0]);
    harness.set_f32s("v2", &[5.0, 6.0, 7.0, 8.0]);
    harness.run();

    assert_eq!(harness.read_f32s("out_second", 4), vec![5.0, 6.0, 7.0, 8.0]);
    assert_eq!(harness.read_f32s("out_even", 4), vec![1.0, 3.0, 5.0, 7.0]);
}

/// A store through an access chain touches only the addressed member.
///
/// For `struct { v: vec3, k: i32 }`, storing through `[0, 1]` sets
/// `v[1]` and leaves the rest of the struct intact.
#[test]
fn test_access_chain_store_into_struct() {
    let mut s = Scaffold::new();
    let (vec3, float, int, void_fn) = (s.vec3, s.float, s.int, s.void_fn);
    let st = s.builder.type_def(specular_module::TypeDesc::Struct {
        members: vec![vec3, int],
    });
    let out = s.output(st, "out_struct");
    let ptr_float = s.pointer(float, StorageClass::Output);
    let c1 = s.builder.const_f32(float, 1.0);
    let c2 = s.builder.const_f32(float, 2.0);
    let c3 = s.builder.const_f32(float, 3.0);
    let c7 = s.builder.const_i32(int, 7);
    let c95 = s.builder.const_f32(float, 9.5);
    let idx0 = s.builder.const_i32(int, 0);
    let idx1 = s.builder.const_i32(int, 1);
    let vec_init = s.builder.const_composite(vec3, vec![c1, c2, c3]);

    let mut f = s.builder.function(void_fn);
    let constructed = f.fresh_id();
    f.emit(Instruction::CompositeConstruct {
        result_type: st,
        result: constructed,
        constituents: vec![vec_init, c7],
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: constructed,
    });
    let chain = f.fresh_id();
    f.emit(Instruction::AccessChain {
        result_type: ptr_float,
        result: chain,
        base: out,
        indices: vec![idx0, idx1],
    });
    f.emit(Instruction::Store {
        pointer: chain,
        object: c95,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();

    let bits = harness.read_bytes("out_struct");
    assert_eq!(bits.len(), 16);
    let v: Vec<f32> = bits[..12]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let k = i32::from_le_bytes([bits[12], bits[13], bits[14], bits[15]]);
    assert_eq!(v, vec![1.0, 9.5, 3.0]);
    assert_eq!(k, 7);
}

/// Both arms of a conditional branch write the same output variable;
/// reruns with a flipped condition overwrite it in place.
#[test]
fn test_conditional_branch_selects_arm() {
    let mut s = Scaffold::new();
    let cond = s.input(s.boolean, "cond");
    let out = s.output(s.int, "out_flag");
    let (int, boolean, void_fn) = (s.int, s.boolean, s.void_fn);
    let ptr_bool = s.pointer(boolean, StorageClass::Input);
    let c0 = s.builder.const_i32(int, 0);
    let c1 = s.builder.const_i32(int, 1);

    let mut f = s.builder.function(void_fn);
    let loaded = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_bool,
        result: loaded,
        pointer: cond,
    });
    let on_true = f.new_label();
    let on_false = f.new_label();
    let merge = f.new_label();
    f.emit(Instruction::SelectionMerge { merge });
    f.emit(Instruction::BranchConditional {
        condition: loaded,
        true_label: on_true,
        false_label: on_false,
    });
    f.place_label(on_true);
    f.emit(Instruction::Store {
        pointer: out,
        object: c1,
    });
    f.emit(Instruction::Branch { target: merge });
    f.place_label(on_false);
    f.emit(Instruction::Store {
        pointer: out,
        object: c0,
    });
    f.emit(Instruction::Branch { target: merge });
    f.place_label(merge);
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.set_bool("cond", true);
    harness.run();
    assert_eq!(harness.read_i32("out_flag"), 1);

    harness.set_bool("cond", false);
    harness.run();
    assert_eq!(harness.read_i32("out_flag"), 0);
}

/// Nearest-neighbor sampling with clamp wrap lands on the edge texel.
///
/// A 2x2 RGBA texture sampled at `(1.3, 1.7)` returns pixel `(1, 1)`.
#[test]
fn test_texture_sample_clamp() {
    let mut s = Scaffold::new();
    let (vec2, vec4, float, void_fn) = (s.vec2, s.vec4, s.float, s.void_fn);
    let image = s.builder.type_def(specular_module::TypeDesc::Image {
        dim: specular_module::Dim::D2,
        arrayed: false,
        sampled: true,
    });
    let sampled_image = s
        .builder
        .type_def(specular_module::TypeDesc::SampledImage { image });
    let tex = s.uniform(sampled_image, "tex");
    let out = s.output(vec4, "out_texel");
    let ptr_si = s.pointer(sampled_image, StorageClass::UniformConstant);
    let cu = s.builder.const_f32(float, 1.3);
    let cv = s.builder.const_f32(float, 1.7);
    let coord = s.builder.const_composite(vec2, vec![cu, cv]);

    let mut f = s.builder.function(void_fn);
    let si = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_si,
        result: si,
        pointer: tex,
    });
    let texel = f.fresh_id();
    f.emit(Instruction::ImageSampleImplicitLod {
        result_type: vec4,
        result: texel,
        sampled_image: si,
        coordinate: coord,
        image_operands: vec![],
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: texel,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    let texels = vec![
        0.0, 0.0, 0.0, 1.0, // (0, 0)
        0.5, 0.5, 0.5, 1.0, // (1, 0)
        0.1, 0.8, 0.3, 1.0, // (0, 1)
        0.9, 0.1, 0.2, 1.0, // (1, 1)
    ];
    let handle = harness.interpreter_mut().register_texture(texels);
    let record = SamplerRecord {
        texture: handle,
        dim_count: 2,
        dims: [2, 2, 0],
        wrap: WrapMode::Clamp,
        components: 4,
    };
    harness.set_bytes("tex", &record.encode());
    harness.run();

    assert_eq!(harness.read_f32s("out_texel", 4), vec![0.9, 0.1, 0.2, 1.0]);
}

/// Repeat wrap folds an out-of-range lattice coordinate back to the
/// start of the axis.
#[test]
fn test_texture_sample_repeat() {
    let mut s = Scaffold::new();
    let (vec2, vec4, float, void_fn) = (s.vec2, s.vec4, s.float, s.void_fn);
    let image = s.builder.type_def(specular_module::TypeDesc::Image {
        dim: specular_module::Dim::D2,
        arrayed: false,
        sampled: true,
    });
    let sampled_image = s
        .builder
        .type_def(specular_module::TypeDesc::SampledImage { image });
    let tex = s.uniform(sampled_image, "tex");
    let out = s.output(vec4, "out_texel");
    let ptr_si = s.pointer(sampled_image, StorageClass::UniformConstant);
    let cu = s.builder.const_f32(float, 0.0);
    let cv = s.builder.const_f32(float, 1.7);
    let coord = s.builder.const_composite(vec2, vec![cu, cv]);

    let mut f = s.builder.function(void_fn);
    let si = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_si,
        result: si,
        pointer: tex,
    });
    let texel = f.fresh_id();
    f.emit(Instruction::ImageSampleImplicitLod {
        result_type: vec4,
        result: texel,
        sampled_image: si,
        coordinate: coord,
        image_operands: vec![],
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: texel,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    let texels = vec![
        0.2, 0.4, 0.6, 1.0, // (0, 0)
        0.5, 0.5, 0.5, 1.0, // (1, 0)
        0.1, 0.8, 0.3, 1.0, // (0, 1)
        0.9, 0.1, 0.2, 1.0, // (1, 1)
    ];
    let handle = harness.interpreter_mut().register_texture(texels);
    let record = SamplerRecord {
        texture: handle,
        dim_count: 2,
        dims: [2, 2, 0],
        wrap: WrapMode::Repeat,
        components: 4,
    };
    harness.set_bytes("tex", &record.encode());
    harness.run();

    // Lattice (0, 2) wraps to (0, 0).
    assert_eq!(harness.read_f32s("out_texel", 4), vec![0.2, 0.4, 0.6, 1.0]);
}

/// A callee's returned value lands in the caller's result id.
#[test]
fn test_function_call_returns_value() {
    let mut s = Scaffold::new();
    let out = s.output(s.float, "out_sum");
    let (float, void_fn) = (s.float, s.void_fn);
    let add_fn_ty = s.builder.type_def(specular_module::TypeDesc::Function {
        ret: float,
        params: vec![float, float],
    });
    let ca = s.builder.const_f32(float, 1.25);
    let cb = s.builder.const_f32(float, 2.5);

    let mut callee = s.builder.function(add_fn_ty);
    let p1 = callee.parameter(float);
    let p2 = callee.parameter(float);
    let total = callee.fresh_id();
    callee.emit(Instruction::FAdd {
        result_type: float,
        result: total,
        operand1: p1,
        operand2: p2,
    });
    callee.emit(Instruction::ReturnValue { value: total });
    let add = callee.finish();

    let mut f = s.builder.function(void_fn);
    let call_result = f.fresh_id();
    f.emit(Instruction::FunctionCall {
        result_type: float,
        result: call_result,
        function: add,
        arguments: vec![ca, cb],
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: call_result,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();
    assert_eq!(harness.read_f32("out_sum"), 3.75);
}

/// The `mix` entry of the reference extension set, dispatched by index.
#[test]
fn test_extension_instruction_mix() {
    let mut s = Scaffold::new();
    let out = s.output(s.vec3, "out_color");
    let (vec3, float, void_fn) = (s.vec3, s.float, s.void_fn);
    let set = s.builder.import_extension("GLSL.std");
    let a0 = s.builder.const_f32(float, 0.0);
    let b0 = s.builder.const_f32(float, 4.0);
    let b1 = s.builder.const_f32(float, 2.0);
    let b2 = s.builder.const_f32(float, 1.0);
    let a = s.builder.const_composite(vec3, vec![a0, a0, a0]);
    let b = s.builder.const_composite(vec3, vec![b0, b1, b2]);
    let t = s.builder.const_f32(float, 0.25);

    let mut f = s.builder.function(void_fn);
    let mixed = f.fresh_id();
    f.emit(Instruction::ExtInst {
        result_type: vec3,
        result: mixed,
        set,
        instruction: 1, // mix
        operands: vec![a, b, t],
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: mixed,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();
    assert_eq!(harness.read_f32s("out_color", 3), vec![1.0, 0.5, 0.25]);
}

/// Store then load through the same pointer reproduces the bytes.
#[test]
fn test_store_load_round_trip() {
    let mut s = Scaffold::new();
    let out = s.output(s.vec3, "out_v");
    let (vec3, float, void_fn) = (s.vec3, s.float, s.void_fn);
    let ptr_vec3 = s.pointer(vec3, StorageClass::Function);
    let c1 = s.builder.const_f32(float, -1.5);
    let c2 = s.builder.const_f32(float, 0.25);
    let c3 = s.builder.const_f32(float, 128.0);
    let v = s.builder.const_composite(vec3, vec![c1, c2, c3]);

    let mut f = s.builder.function(void_fn);
    let tmp = f.local_variable(ptr_vec3, StorageClass::Function);
    f.emit(Instruction::Store {
        pointer: tmp,
        object: v,
    });
    let loaded = f.fresh_id();
    f.emit(Instruction::Load {
        result_type: ptr_vec3,
        result: loaded,
        pointer: tmp,
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: loaded,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();
    assert_eq!(harness.read_f32s("out_v", 3), vec![-1.5, 0.25, 128.0]);
}

/// Construct-then-extract reproduces a constituent byte for byte, and
/// insert leaves every other member untouched.
#[test]
fn test_composite_extract_and_insert() {
    let mut s = Scaffold::new();
    let out_k = s.output(s.int, "out_k");
    let out_v = s.output(s.vec3, "out_v");
    let (vec3, float, int, void_fn) = (s.vec3, s.float, s.int, s.void_fn);
    let st = s.builder.type_def(specular_module::TypeDesc::Struct {
        members: vec![vec3, int],
    });
    let c1 = s.builder.const_f32(float, 1.0);
    let c2 = s.builder.const_f32(float, 2.0);
    let c3 = s.builder.const_f32(float, 3.0);
    let c9 = s.builder.const_i32(int, 9);
    let c42 = s.builder.const_f32(float, 42.0);
    let v = s.builder.const_composite(vec3, vec![c1, c2, c3]);

    let mut f = s.builder.function(void_fn);
    let constructed = f.fresh_id();
    f.emit(Instruction::CompositeConstruct {
        result_type: st,
        result: constructed,
        constituents: vec![v, c9],
    });
    let k = f.fresh_id();
    f.emit(Instruction::CompositeExtract {
        result_type: int,
        result: k,
        composite: constructed,
        indices: vec![1],
    });
    f.emit(Instruction::Store {
        pointer: out_k,
        object: k,
    });
    let patched = f.fresh_id();
    f.emit(Instruction::CompositeInsert {
        result_type: st,
        result: patched,
        object: c42,
        composite: constructed,
        indices: vec![0, 2],
    });
    let patched_v = f.fresh_id();
    f.emit(Instruction::CompositeExtract {
        result_type: vec3,
        result: patched_v,
        composite: patched,
        indices: vec![0],
    });
    f.emit(Instruction::Store {
        pointer: out_v,
        object: patched_v,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();
    assert_eq!(harness.read_i32("out_k"), 9);
    assert_eq!(harness.read_f32s("out_v", 3), vec![1.0, 2.0, 42.0]);
}

/// `FAdd(x, FSub(y, x))` returns to `y`, and the integer counterpart is
/// exact.
#[test]
fn test_add_sub_inverse() {
    let mut s = Scaffold::new();
    let out_f = s.output(s.float, "out_f");
    let out_i = s.output(s.int, "out_i");
    let (float, int, void_fn) = (s.float, s.int, s.void_fn);
    let x = s.builder.const_f32(float, 1.375);
    let y = s.builder.const_f32(float, -42.5);
    let ix = s.builder.const_i32(int, 1_000_001);
    let iy = s.builder.const_i32(int, -77);

    let mut f = s.builder.function(void_fn);
    let diff = f.fresh_id();
    f.emit(Instruction::FSub {
        result_type: float,
        result: diff,
        operand1: y,
        operand2: x,
    });
    let back = f.fresh_id();
    f.emit(Instruction::FAdd {
        result_type: float,
        result: back,
        operand1: x,
        operand2: diff,
    });
    f.emit(Instruction::Store {
        pointer: out_f,
        object: back,
    });
    let idiff = f.fresh_id();
    f.emit(Instruction::ISub {
        result_type: int,
        result: idiff,
        operand1: iy,
        operand2: ix,
    });
    let iback = f.fresh_id();
    f.emit(Instruction::IAdd {
        result_type: int,
        result: iback,
        operand1: ix,
        operand2: idiff,
    });
    f.emit(Instruction::Store {
        pointer: out_i,
        object: iback,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();
    assert!((harness.read_f32("out_f") - -42.5).abs() < 1e-6);
    assert_eq!(harness.read_i32("out_i"), -77);
}

/// Signed-to-float conversion represents small integers exactly.
#[test]
fn test_convert_signed_to_float() {
    let mut s = Scaffold::new();
    let out = s.output(s.float, "out_f");
    let (float, int, void_fn) = (s.float, s.int, s.void_fn);
    let c = s.builder.const_i32(int, -41);

    let mut f = s.builder.function(void_fn);
    let converted = f.fresh_id();
    f.emit(Instruction::ConvertSToF {
        result_type: float,
        result: converted,
        value: c,
    });
    f.emit(Instruction::Store {
        pointer: out,
        object: converted,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    harness.run();
    assert_eq!(harness.read_f32("out_f"), -41.0);
}

/// An out-of-range access-chain index aborts the run.
#[test]
fn test_out_of_range_index_aborts() {
    let mut s = Scaffold::new();
    let out = s.output(s.vec3, "out_v");
    let (vec3, float, int, void_fn) = (s.vec3, s.float, s.int, s.void_fn);
    let ptr_float = s.pointer(float, StorageClass::Output);
    let c0 = s.builder.const_f32(float, 0.0);
    let v = s.builder.const_composite(vec3, vec![c0, c0, c0]);
    let bad_index = s.builder.const_i32(int, 5);
    let c9 = s.builder.const_f32(float, 9.0);

    let mut f = s.builder.function(void_fn);
    f.emit(Instruction::Store {
        pointer: out,
        object: v,
    });
    let chain = f.fresh_id();
    f.emit(Instruction::AccessChain {
        result_type: ptr_float,
        result: chain,
        base: out,
        indices: vec![bad_index],
    });
    f.emit(Instruction::Store {
        pointer: chain,
        object: c9,
    });
    f.emit(Instruction::Return);
    let main = f.finish();
    s.builder.entry_point("main", main);

    let mut harness = TestHarness::from_program(s.build());
    let err = harness.try_run().unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 5, .. }));
}
