//! Parsed module representation and in-process builder.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::Id;
use crate::instr::{ConstantDef, Instruction};
use crate::types::{StorageClass, TypeDesc};

/// A variable declaration.
///
/// `result_type` is the variable's pointer type as the bytecode
/// declares it; the pointee is recovered through the type table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub result: Id,
    pub result_type: Id,
    pub storage: StorageClass,
    pub initializer: Option<Id>,
}

/// A formal parameter of a function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub result: Id,
    pub result_type: Id,
}

/// A function definition with its ordered body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub result: Id,
    pub function_type: Id,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Instruction>,
    /// Label id to instruction index, precomputed from `Label` ops.
    pub labels: IndexMap<Id, usize>,
    /// Function-local variable declarations, consulted when a store
    /// materializes a local.
    pub variables: IndexMap<Id, VariableDecl>,
}

/// An externally invocable function, executed in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub function: Id,
}

/// A parsed module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub types: IndexMap<Id, TypeDesc>,
    pub constants: IndexMap<Id, ConstantDef>,
    pub variables: IndexMap<Id, VariableDecl>,
    pub functions: IndexMap<Id, FunctionDef>,
    pub entry_points: Vec<EntryPoint>,
    /// Debug names attached to ids, used for embedder access.
    pub names: IndexMap<Id, String>,
    /// Imported extension sets: set id to set name.
    pub extension_imports: IndexMap<Id, String>,
}

impl Program {
    /// Resolve a debug name to the id it is attached to.
    pub fn id_of_name(&self, name: &str) -> Option<Id> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }
}

/// Assembles a [`Program`], handing out fresh result ids.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    next_id: u32,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            program: Program::default(),
            next_id: 1,
        }
    }

    /// Allocate the next unused result id.
    pub fn fresh_id(&mut self) -> Id {
        let id = Id(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn type_def(&mut self, desc: TypeDesc) -> Id {
        let id = self.fresh_id();
        self.program.types.insert(id, desc);
        id
    }

    pub fn constant(&mut self, def: ConstantDef) -> Id {
        let id = self.fresh_id();
        self.program.constants.insert(id, def);
        id
    }

    pub fn const_f32(&mut self, result_type: Id, value: f32) -> Id {
        self.constant(ConstantDef::Scalar {
            result_type,
            bits: value.to_le_bytes().to_vec(),
        })
    }

    pub fn const_i32(&mut self, result_type: Id, value: i32) -> Id {
        self.constant(ConstantDef::Scalar {
            result_type,
            bits: value.to_le_bytes().to_vec(),
        })
    }

    pub fn const_u32(&mut self, result_type: Id, value: u32) -> Id {
        self.constant(ConstantDef::Scalar {
            result_type,
            bits: value.to_le_bytes().to_vec(),
        })
    }

    pub fn const_bool(&mut self, result_type: Id, value: bool) -> Id {
        self.constant(ConstantDef::Bool { result_type, value })
    }

    pub fn const_composite(&mut self, result_type: Id, constituents: Vec<Id>) -> Id {
        self.constant(ConstantDef::Composite {
            result_type,
            constituents,
        })
    }

    pub fn global_variable(&mut self, result_type: Id, storage: StorageClass) -> Id {
        let id = self.fresh_id();
        self.program.variables.insert(
            id,
            VariableDecl {
                result: id,
                result_type,
                storage,
                initializer: None,
            },
        );
        id
    }

    /// Attach a debug name to an id.
    pub fn name(&mut self, id: Id, name: &str) {
        self.program.names.insert(id, name.to_string());
    }

    pub fn import_extension(&mut self, name: &str) -> Id {
        let id = self.fresh_id();
        self.program.extension_imports.insert(id, name.to_string());
        id
    }

    pub fn entry_point(&mut self, name: &str, function: Id) {
        self.program.entry_points.push(EntryPoint {
            name: name.to_string(),
            function,
        });
    }

    /// Start a function body; finish it with [`FunctionBuilder::finish`].
    pub fn function(&mut self, function_type: Id) -> FunctionBuilder<'_> {
        let result = self.fresh_id();
        FunctionBuilder {
            builder: self,
            def: FunctionDef {
                result,
                function_type,
                parameters: Vec::new(),
                body: Vec::new(),
                labels: IndexMap::new(),
                variables: IndexMap::new(),
            },
        }
    }

    pub fn build(self) -> Program {
        self.program
    }
}

/// Emits instructions into a function under construction.
///
/// Label indices are maintained as labels are placed, so branch targets
/// can be declared before the instruction they land on exists.
pub struct FunctionBuilder<'a> {
    builder: &'a mut ProgramBuilder,
    def: FunctionDef,
}

impl FunctionBuilder<'_> {
    /// The id the finished function will be registered under.
    pub fn id(&self) -> Id {
        self.def.result
    }

    pub fn fresh_id(&mut self) -> Id {
        self.builder.fresh_id()
    }

    /// Declare a formal parameter.
    pub fn parameter(&mut self, result_type: Id) -> Id {
        let result = self.builder.fresh_id();
        self.def.parameters.push(Parameter {
            result,
            result_type,
        });
        result
    }

    /// Declare a local variable and emit its `Variable` instruction.
    pub fn local_variable(&mut self, result_type: Id, storage: StorageClass) -> Id {
        let result = self.builder.fresh_id();
        self.def.variables.insert(
            result,
            VariableDecl {
                result,
                result_type,
                storage,
                initializer: None,
            },
        );
        self.emit(Instruction::Variable {
            result_type,
            result,
            storage,
            initializer: None,
        });
        result
    }

    /// Allocate a label id without placing it, for forward branches.
    pub fn new_label(&mut self) -> Id {
        self.builder.fresh_id()
    }

    /// Emit the `Label` instruction for a previously allocated id.
    pub fn place_label(&mut self, label: Id) {
        self.emit(Instruction::Label { result: label });
    }

    pub fn emit(&mut self, instruction: Instruction) {
        if let Instruction::Label { result } = instruction {
            self.def.labels.insert(result, self.def.body.len());
        }
        self.def.body.push(instruction);
    }

    /// Register the function and return its id.
    pub fn finish(self) -> Id {
        let id = self.def.result;
        self.builder.program.functions.insert(id, self.def);
        id
    }
}
