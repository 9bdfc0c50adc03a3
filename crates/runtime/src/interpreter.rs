//! Interpreter loop and driver.
//!
//! Executes function bodies with an explicit frame stack: each frame
//! carries a function id, a program counter and the caller's result
//! slot. The counter advances linearly except where a branch sets it,
//! calls push a frame, returns pop one, and a function only ends by
//! returning; running off the end of a body is a malformed module.
//!
//! Variables are materialized as a data buffer of the pointee's size
//! plus a pointer-typed binding addressing it. `Load` is lazy (it binds
//! the pointer value itself, consumers dereference), and `Store` writes
//! through the pointer into the pointee buffer in place, so aliased
//! pointers observe updates and pointer identity survives stores.

use tracing::{debug, info, trace};

use specular_ext_registry::{ExtOperand, ExtensionProvider, ExtensionRegistry};
use specular_module::{Id, Instruction, Program, TypeDesc, VariableDecl};

use crate::constants;
use crate::error::{Error, Result};
use crate::kernels::{self, do_op, Scalar};
use crate::layout::TypeTable;
use crate::navigate::{dereference, index_member, pointer_in_composite};
use crate::sampler::{texel_index, SamplerRecord};
use crate::store::{Value, ValueStore, POINTER_SIZE};

/// One entry of the call stack.
#[derive(Debug)]
struct Frame {
    function: Id,
    pc: usize,
    /// Caller's result id, bound when the callee returns a value.
    result: Option<Id>,
}

/// A single-run interpreter instance.
///
/// Owns every buffer allocated during execution; all of it is released
/// on drop. Texel storage is registered up front and addressed through
/// sampler-record handles.
pub struct Interpreter {
    program: Program,
    types: TypeTable,
    store: ValueStore,
    extensions: ExtensionRegistry,
    textures: Vec<Vec<f32>>,
    /// Function whose locals win when a store materializes a variable.
    current_function: Option<Id>,
}

impl Interpreter {
    pub fn new(program: Program) -> Self {
        let types = TypeTable::new(&program);
        Self {
            program,
            types,
            store: ValueStore::new(),
            extensions: ExtensionRegistry::new(),
            textures: Vec::new(),
            current_function: None,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Resolve every imported extension set and materialize constants.
    pub fn setup(&mut self, provider: &dyn ExtensionProvider) -> Result<()> {
        let imports: Vec<(Id, String)> = self
            .program
            .extension_imports
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        for (id, name) in imports {
            let lowered = name.to_lowercase();
            let table = provider
                .resolve(&lowered)
                .ok_or_else(|| Error::ExtensionLoad {
                    id,
                    name: name.clone(),
                })?;
            info!(set = %id, name = %lowered, instructions = table.len(), "extension set resolved");
            self.extensions.register(id, table);
        }

        constants::initialize(&self.program, &self.types, &mut self.store)
    }

    /// Execute every entry point in declaration order.
    pub fn run(&mut self) -> Result<()> {
        let entry_points = self.program.entry_points.clone();
        for entry in entry_points {
            info!(entry = %entry.name, function = %entry.function, "executing entry point");
            let outcome = self.execute_function(entry.function);
            self.current_function = None;
            if let Some(id) = outcome? {
                return Err(Error::malformed(format!(
                    "entry point {:?} returned value {id}",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    /// Register row-major texel storage; the handle goes into a
    /// [`SamplerRecord`].
    pub fn register_texture(&mut self, texels: Vec<f32>) -> u32 {
        let handle = self.textures.len() as u32;
        self.textures.push(texels);
        handle
    }

    /// Peek a variable's current value.
    pub fn read_variable(&self, id: Id) -> Option<Vec<u8>> {
        let decl = self.program.variables.get(&id)?;
        let binding = self.store.try_lookup(decl.result)?;
        let value = dereference(&self.types, &self.store, binding).ok()?;
        let size = self.types.byte_size(value.type_id, &self.store).ok()?;
        self.store.bytes(value.ptr, size).ok().map(<[u8]>::to_vec)
    }

    pub fn read_variable_by_name(&self, name: &str) -> Option<Vec<u8>> {
        self.read_variable(self.program.id_of_name(name)?)
    }

    /// Inject a value into a variable, materializing it if needed.
    pub fn set_variable(&mut self, id: Id, src: &[u8]) -> Result<()> {
        let decl = self.variable_decl(id)?.clone();
        let binding = match self.store.try_lookup(decl.result) {
            Some(value) => value,
            None => self.materialize_pointer(decl.result, decl.result_type)?,
        };
        let target = dereference(&self.types, &self.store, binding)?;
        let size = self.types.byte_size(target.type_id, &self.store)?;
        if src.len() != size as usize {
            return Err(Error::TypeMismatch {
                message: format!(
                    "variable {id} holds {size} bytes, source is {}",
                    src.len()
                ),
            });
        }
        self.store.write(target.ptr, src)
    }

    pub fn set_variable_by_name(&mut self, name: &str, src: &[u8]) -> Result<()> {
        let id = self
            .program
            .id_of_name(name)
            .ok_or_else(|| Error::malformed(format!("no definition named {name:?}")))?;
        self.set_variable(id, src)
    }

    fn execute_function(&mut self, root: Id) -> Result<Option<Id>> {
        let mut frames = vec![Frame {
            function: root,
            pc: 0,
            result: None,
        }];
        self.current_function = Some(root);

        loop {
            let (function, pc) = {
                let frame = frames.last().expect("frame stack never empty");
                (frame.function, frame.pc)
            };
            let instr = self.instruction_at(function, pc)?;
            trace!(function = %function, pc, op = instr.mnemonic(), "dispatch");

            match instr {
                Instruction::Label { .. }
                | Instruction::SelectionMerge { .. }
                | Instruction::LoopMerge { .. } => {
                    frames.last_mut().unwrap().pc += 1;
                }

                Instruction::Branch { target } => {
                    frames.last_mut().unwrap().pc = self.label_index(function, target)?;
                }

                Instruction::BranchConditional {
                    condition,
                    true_label,
                    false_label,
                } => {
                    let cond = self.operand(condition)?;
                    let taken = if self.store.read_u8(cond.ptr)? != 0 {
                        true_label
                    } else {
                        false_label
                    };
                    frames.last_mut().unwrap().pc = self.label_index(function, taken)?;
                }

                Instruction::FunctionCall {
                    result,
                    function: callee,
                    arguments,
                    ..
                } => {
                    let params = self
                        .program
                        .functions
                        .get(&callee)
                        .ok_or_else(|| Error::malformed(format!("call of undefined function {callee}")))?
                        .parameters
                        .clone();
                    if params.len() != arguments.len() {
                        return Err(Error::malformed(format!(
                            "call of {callee} passes {} arguments for {} parameters",
                            arguments.len(),
                            params.len()
                        )));
                    }
                    for (param, argument) in params.iter().zip(&arguments) {
                        let value = self.operand(*argument)?;
                        self.store.bind(param.result, value);
                    }
                    debug!(caller = %function, callee = %callee, "function call");
                    frames.last_mut().unwrap().pc = pc + 1;
                    frames.push(Frame {
                        function: callee,
                        pc: 0,
                        result: Some(result),
                    });
                    self.current_function = Some(callee);
                }

                Instruction::Return => {
                    frames.pop();
                    match frames.last() {
                        Some(parent) => self.current_function = Some(parent.function),
                        None => return Ok(None),
                    }
                }

                Instruction::ReturnValue { value } => {
                    let done = frames.pop().expect("frame stack never empty");
                    match frames.last() {
                        Some(parent) => {
                            self.current_function = Some(parent.function);
                            if let Some(dest) = done.result {
                                let returned = self.store.lookup(value)?;
                                self.store.bind(dest, returned);
                            }
                        }
                        None => return Ok(Some(value)),
                    }
                }

                other => {
                    self.exec_instruction(function, pc, other)?;
                    frames.last_mut().unwrap().pc += 1;
                }
            }
        }
    }

    /// Straight-line instructions: execute and bind, no control flow.
    fn exec_instruction(&mut self, function: Id, pc: usize, instr: Instruction) -> Result<()> {
        match instr {
            Instruction::Variable {
                result_type,
                result,
                initializer,
                ..
            } => {
                let cell = self.materialize_pointer(result, result_type)?;
                if let Some(init) = initializer {
                    let init_value = self.operand(init)?;
                    let target = dereference(&self.types, &self.store, cell)?;
                    let size = self.types.byte_size(target.type_id, &self.store)?;
                    let init_size = self.types.byte_size(init_value.type_id, &self.store)?;
                    if size != init_size {
                        return Err(Error::TypeMismatch {
                            message: format!(
                                "initializer of {result} is {init_size} bytes, variable holds {size}"
                            ),
                        });
                    }
                    self.store.copy(init_value.ptr, target.ptr, size)?;
                }
            }

            Instruction::Load {
                result, pointer, ..
            } => {
                // Lazy: the pointer value itself is bound; consumers
                // dereference at use.
                let value = self.store.lookup(pointer)?;
                self.store.bind(result, value);
            }

            Instruction::Store { pointer, object } => {
                let object_value = self.operand(object)?;
                self.store_through(pointer, object_value)?;
            }

            Instruction::AccessChain {
                result_type,
                result,
                base,
                indices,
            } => {
                let base_value = self.operand(base)?;
                let mut path = Vec::with_capacity(indices.len());
                for index in indices {
                    let index_value = self.operand(index)?;
                    path.push(self.store.read_u32(index_value.ptr)?);
                }
                let leaf = pointer_in_composite(&self.types, &self.store, base_value, &path)?;
                if !self.types.is_pointer(result_type)? {
                    return Err(Error::malformed(format!(
                        "access chain {result} has a non-pointer result type"
                    )));
                }
                let cell = self.store.alloc_value(result_type, POINTER_SIZE);
                self.store.write_ptr(cell.ptr, leaf.ptr)?;
                self.store.bind(result, cell);
            }

            Instruction::CompositeConstruct {
                result_type,
                result,
                constituents,
            } => {
                let size = self.types.byte_size(result_type, &self.store)?;
                let value = self.store.alloc_value(result_type, size);
                let mut cursor = 0;
                for constituent in constituents {
                    let part = self.store.lookup(constituent)?;
                    let part_size = self.types.byte_size(part.type_id, &self.store)?;
                    if cursor + part_size > size {
                        return Err(Error::TypeMismatch {
                            message: format!("constituents of {result} overflow the result type"),
                        });
                    }
                    self.store.copy(part.ptr, value.ptr.advanced(cursor), part_size)?;
                    cursor += part_size;
                }
                if cursor != size {
                    return Err(Error::TypeMismatch {
                        message: format!(
                            "constituents of {result} fill {cursor} of {size} bytes"
                        ),
                    });
                }
                self.store.bind(result, value);
            }

            Instruction::CompositeExtract {
                result_type,
                result,
                composite,
                indices,
            } => {
                let base = self.store.lookup(composite)?;
                let leaf = pointer_in_composite(&self.types, &self.store, base, &indices)?;
                let size = self.types.byte_size(result_type, &self.store)?;
                let value = self.store.alloc_value(result_type, size);
                self.store.copy(leaf.ptr, value.ptr, size)?;
                self.store.bind(result, value);
            }

            Instruction::CompositeInsert {
                result_type,
                result,
                object,
                composite,
                indices,
            } => {
                let base = self.operand(composite)?;
                let object_value = self.operand(object)?;
                let leaf = pointer_in_composite(&self.types, &self.store, base, &indices)?;
                let leaf_size = self.types.byte_size(leaf.type_id, &self.store)?;
                let object_size = self.types.byte_size(object_value.type_id, &self.store)?;
                if leaf_size != object_size {
                    return Err(Error::TypeMismatch {
                        message: format!(
                            "insert of {object_size} bytes into a {leaf_size}-byte member"
                        ),
                    });
                }
                // The addressed composite is mutated in place; the
                // result is a fresh copy taken after the mutation.
                self.store.copy(object_value.ptr, leaf.ptr, object_size)?;
                let size = self.types.byte_size(result_type, &self.store)?;
                let value = self.store.alloc_value(result_type, size);
                self.store.copy(base.ptr, value.ptr, size)?;
                self.store.bind(result, value);
            }

            Instruction::VectorShuffle {
                result_type,
                result,
                vector1,
                vector2,
                components,
            } => {
                let v1 = self.operand(vector1)?;
                let v2 = self.operand(vector2)?;
                let size = self.types.byte_size(result_type, &self.store)?;
                let value = self.store.alloc_value(result_type, size);
                let v1_count = self.types.element_count(v1.type_id, &self.store)?;
                for (i, &selector) in components.iter().enumerate() {
                    let source = if selector < v1_count {
                        index_member(&self.types, &self.store, v1, selector)?
                    } else {
                        index_member(&self.types, &self.store, v2, selector - v1_count)?
                    };
                    let dest = index_member(&self.types, &self.store, value, i as u32)?;
                    let component_size = self.types.byte_size(source.type_id, &self.store)?;
                    self.store.copy(source.ptr, dest.ptr, component_size)?;
                }
                self.store.bind(result, value);
            }

            Instruction::ExtInst {
                result_type,
                result,
                set,
                instruction,
                operands,
            } => {
                let mut args = Vec::with_capacity(operands.len());
                for operand in operands {
                    let value = self.operand(operand)?;
                    let size = self.types.byte_size(value.type_id, &self.store)?;
                    args.push(ExtOperand {
                        type_id: value.type_id,
                        bits: self.store.bytes(value.ptr, size)?.to_vec(),
                    });
                }
                let callable = self.extensions.lookup(set, instruction).ok_or_else(|| {
                    Error::malformed(format!(
                        "extension set {set} has no instruction {instruction}"
                    ))
                })?;
                trace!(set = %set, name = callable.name, "extended instruction");
                let bits = (callable.func)(result_type, &args);
                let size = self.types.byte_size(result_type, &self.store)?;
                if bits.len() != size as usize {
                    return Err(Error::TypeMismatch {
                        message: format!(
                            "extension {:?} returned {} bytes, result type needs {size}",
                            callable.name,
                            bits.len()
                        ),
                    });
                }
                let value = self.store.alloc_value(result_type, size);
                self.store.write(value.ptr, &bits)?;
                self.store.bind(result, value);
            }

            Instruction::IAdd { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::add_i32)?;
            }
            Instruction::ISub { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::sub_i32)?;
            }
            Instruction::IMul { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::mul_i32)?;
            }
            Instruction::SDiv { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::div_i32)?;
            }
            Instruction::FAdd { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::add_f32)?;
            }
            Instruction::FSub { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::sub_f32)?;
            }
            Instruction::FMul { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::mul_f32)?;
            }
            Instruction::FDiv { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &kernels::div_f32)?;
            }
            Instruction::SLessThan { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &|args| {
                    Ok(Scalar::Bool(kernels::cmp_i32(args[0], args[1])? == -1))
                })?;
            }
            Instruction::SGreaterThan { result_type, result, operand1, operand2 } => {
                self.binary_op(result_type, result, operand1, operand2, &|args| {
                    Ok(Scalar::Bool(kernels::cmp_i32(args[0], args[1])? == 1))
                })?;
            }

            Instruction::ConvertSToF { result_type, result, value } => {
                let operand = self.operand(value)?;
                let converted = do_op(
                    &self.types,
                    &mut self.store,
                    result_type,
                    &[operand],
                    &kernels::convert_s_to_f,
                )?;
                self.store.bind(result, converted);
            }
            Instruction::ConvertFToS { result_type, result, value } => {
                let operand = self.operand(value)?;
                let converted = do_op(
                    &self.types,
                    &mut self.store,
                    result_type,
                    &[operand],
                    &kernels::convert_f_to_s,
                )?;
                self.store.bind(result, converted);
            }

            Instruction::VectorTimesScalar {
                result_type,
                result,
                vector,
                scalar,
            } => {
                let scalar_value = self.operand(scalar)?;
                let factor = Scalar::read(&self.types, &self.store, scalar_value)?.as_f32()?;
                let vector_value = self.operand(vector)?;
                let value = do_op(
                    &self.types,
                    &mut self.store,
                    result_type,
                    &[vector_value],
                    &|args| Ok(Scalar::F32(args[0].as_f32()? * factor)),
                )?;
                self.store.bind(result, value);
            }

            Instruction::ImageSampleImplicitLod {
                result_type,
                result,
                sampled_image,
                coordinate,
                // LOD and bias are accepted and ignored.
                image_operands: _,
            } => {
                self.sample_image(result_type, result, sampled_image, coordinate)?;
            }

            other @ (Instruction::Nop
            | Instruction::Kill
            | Instruction::Phi { .. }
            | Instruction::Switch { .. }) => {
                return Err(Error::UnknownOpcode {
                    function,
                    pc,
                    mnemonic: other.mnemonic(),
                });
            }

            // Control flow is handled by the frame loop.
            Instruction::Label { .. }
            | Instruction::SelectionMerge { .. }
            | Instruction::LoopMerge { .. }
            | Instruction::Branch { .. }
            | Instruction::BranchConditional { .. }
            | Instruction::FunctionCall { .. }
            | Instruction::Return
            | Instruction::ReturnValue { .. } => unreachable!("handled by the frame loop"),
        }

        Ok(())
    }

    fn sample_image(
        &mut self,
        result_type: Id,
        result: Id,
        sampled_image: Id,
        coordinate: Id,
    ) -> Result<()> {
        let sampled = self.operand(sampled_image)?;
        let coord = self.operand(coordinate)?;

        let image_type = match self.types.get(sampled.type_id)? {
            TypeDesc::SampledImage { image } => *image,
            other => {
                return Err(Error::TypeMismatch {
                    message: format!("sample of a {} value", other.kind()),
                })
            }
        };
        let (dim, arrayed, is_sampled) = match self.types.get(image_type)? {
            TypeDesc::Image { dim, arrayed, sampled } => (*dim, *arrayed, *sampled),
            other => {
                return Err(Error::malformed(format!(
                    "sampled image wraps a {} type",
                    other.kind()
                )))
            }
        };
        if !is_sampled {
            return Err(Error::TypeMismatch {
                message: format!("image {image_type} is not sampled"),
            });
        }
        let coord_count = self.types.element_count(coord.type_id, &self.store)?;
        if coord_count < dim.rank() + arrayed as u32 {
            return Err(Error::TypeMismatch {
                message: format!(
                    "coordinate has {coord_count} components, image needs {}",
                    dim.rank() + arrayed as u32
                ),
            });
        }

        let record = SamplerRecord::decode(self.store.bytes(sampled.ptr, SamplerRecord::SIZE)?)?;
        let mut coords = Vec::with_capacity(record.dim_count as usize);
        for d in 0..record.dim_count {
            let component = index_member(&self.types, &self.store, coord, d)?;
            coords.push(self.store.read_f32(component.ptr)?);
        }
        let index = texel_index(&record, &coords)?;

        let size = self.types.byte_size(result_type, &self.store)?;
        if size % 4 != 0 {
            return Err(Error::TypeMismatch {
                message: format!("sample result type {result_type} is not float-shaped"),
            });
        }
        let texels = self
            .textures
            .get(record.texture as usize)
            .ok_or_else(|| Error::malformed(format!("unknown texture handle {}", record.texture)))?;
        let start = index * record.components as usize;
        let bits: Vec<u8> = texels
            .get(start..start + (size / 4) as usize)
            .ok_or_else(|| Error::malformed("sample reads past the end of texel storage"))?
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();

        let value = self.store.alloc_value(result_type, size);
        self.store.write(value.ptr, &bits)?;
        self.store.bind(result, value);
        Ok(())
    }

    /// Look up an operand and dereference it if it is a pointer.
    fn operand(&self, id: Id) -> Result<Value> {
        dereference(&self.types, &self.store, self.store.lookup(id)?)
    }

    fn binary_op(
        &mut self,
        result_type: Id,
        result: Id,
        operand1: Id,
        operand2: Id,
        kernel: kernels::Kernel<'_>,
    ) -> Result<()> {
        let op1 = self.operand(operand1)?;
        let op2 = self.operand(operand2)?;
        let value = do_op(&self.types, &mut self.store, result_type, &[op1, op2], kernel)?;
        self.store.bind(result, value);
        Ok(())
    }

    /// Allocate a pointee buffer plus a pointer cell addressing it and
    /// bind the cell under `result`.
    fn materialize_pointer(&mut self, result: Id, pointer_type: Id) -> Result<Value> {
        let pointee = self.types.pointee(pointer_type)?;
        let size = self.types.byte_size(pointee, &self.store)?;
        let data = self.store.alloc_value(pointee, size);
        let cell = self.store.alloc_value(pointer_type, POINTER_SIZE);
        self.store.write_ptr(cell.ptr, data.ptr)?;
        self.store.bind(result, cell);
        Ok(cell)
    }

    /// Write an object's bytes through a pointer, materializing the
    /// target variable on first store.
    fn store_through(&mut self, pointer: Id, object: Value) -> Result<()> {
        let binding = match self.store.try_lookup(pointer) {
            Some(value) => value,
            None => {
                let decl = self.variable_decl(pointer)?.clone();
                self.materialize_pointer(decl.result, decl.result_type)?
            }
        };
        if !self.types.is_pointer(binding.type_id)? {
            return Err(Error::malformed(format!("store through non-pointer {pointer}")));
        }
        let target = dereference(&self.types, &self.store, binding)?;
        let target_size = self.types.byte_size(target.type_id, &self.store)?;
        let object_size = self.types.byte_size(object.type_id, &self.store)?;
        if target_size != object_size {
            return Err(Error::TypeMismatch {
                message: format!(
                    "store of {object_size} bytes into a {target_size}-byte target"
                ),
            });
        }
        self.store.copy(object.ptr, target.ptr, target_size)
    }

    /// The declaration a store resolves against: the current function's
    /// locals first, then module globals.
    fn variable_decl(&self, id: Id) -> Result<&VariableDecl> {
        if let Some(function) = self.current_function {
            if let Some(decl) = self
                .program
                .functions
                .get(&function)
                .and_then(|def| def.variables.get(&id))
            {
                return Ok(decl);
            }
        }
        self.program
            .variables
            .get(&id)
            .ok_or_else(|| Error::malformed(format!("{id} is not a declared variable")))
    }

    fn instruction_at(&self, function: Id, pc: usize) -> Result<Instruction> {
        let def = self
            .program
            .functions
            .get(&function)
            .ok_or_else(|| Error::malformed(format!("undefined function {function}")))?;
        def.body
            .get(pc)
            .cloned()
            .ok_or_else(|| Error::malformed(format!("{function} ran off the end of its body")))
    }

    fn label_index(&self, function: Id, label: Id) -> Result<usize> {
        let def = self
            .program
            .functions
            .get(&function)
            .ok_or_else(|| Error::malformed(format!("undefined function {function}")))?;
        def.labels
            .get(&label)
            .copied()
            .ok_or_else(|| Error::malformed(format!("{function} has no label {label}")))
    }
}
