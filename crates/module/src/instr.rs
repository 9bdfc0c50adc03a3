//! Instruction set.
//!
//! Typed instructions as produced by the parser. Operands are result
//! ids; instructions that produce a value carry their result type and
//! result id explicitly.

use serde::{Deserialize, Serialize};

use crate::ids::Id;
use crate::types::StorageClass;

/// A function-body instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    // === Structure ===
    /// Marks a branch target. No effect when executed.
    Label { result: Id },
    /// Structured-control-flow hint. No effect when executed.
    SelectionMerge { merge: Id },
    /// Structured-control-flow hint. No effect when executed.
    LoopMerge { merge: Id, continue_target: Id },

    // === Control flow ===
    Branch { target: Id },
    BranchConditional { condition: Id, true_label: Id, false_label: Id },
    FunctionCall { result_type: Id, result: Id, function: Id, arguments: Vec<Id> },
    Return,
    ReturnValue { value: Id },

    // === Extended instructions ===
    ExtInst {
        result_type: Id,
        result: Id,
        set: Id,
        instruction: u32,
        operands: Vec<Id>,
    },

    // === Memory ===
    Variable {
        result_type: Id,
        result: Id,
        storage: StorageClass,
        initializer: Option<Id>,
    },
    Load { result_type: Id, result: Id, pointer: Id },
    Store { pointer: Id, object: Id },
    AccessChain { result_type: Id, result: Id, base: Id, indices: Vec<Id> },

    // === Composites ===
    CompositeConstruct { result_type: Id, result: Id, constituents: Vec<Id> },
    CompositeExtract { result_type: Id, result: Id, composite: Id, indices: Vec<u32> },
    CompositeInsert {
        result_type: Id,
        result: Id,
        object: Id,
        composite: Id,
        indices: Vec<u32>,
    },
    VectorShuffle {
        result_type: Id,
        result: Id,
        vector1: Id,
        vector2: Id,
        components: Vec<u32>,
    },

    // === Arithmetic and comparison ===
    IAdd { result_type: Id, result: Id, operand1: Id, operand2: Id },
    ISub { result_type: Id, result: Id, operand1: Id, operand2: Id },
    IMul { result_type: Id, result: Id, operand1: Id, operand2: Id },
    SDiv { result_type: Id, result: Id, operand1: Id, operand2: Id },
    FAdd { result_type: Id, result: Id, operand1: Id, operand2: Id },
    FSub { result_type: Id, result: Id, operand1: Id, operand2: Id },
    FMul { result_type: Id, result: Id, operand1: Id, operand2: Id },
    FDiv { result_type: Id, result: Id, operand1: Id, operand2: Id },
    SLessThan { result_type: Id, result: Id, operand1: Id, operand2: Id },
    SGreaterThan { result_type: Id, result: Id, operand1: Id, operand2: Id },
    ConvertSToF { result_type: Id, result: Id, value: Id },
    ConvertFToS { result_type: Id, result: Id, value: Id },
    VectorTimesScalar { result_type: Id, result: Id, vector: Id, scalar: Id },

    // === Images ===
    ImageSampleImplicitLod {
        result_type: Id,
        result: Id,
        sampled_image: Id,
        coordinate: Id,
        /// LOD and bias operands; accepted and ignored.
        image_operands: Vec<Id>,
    },

    // === Parsed but not executable ===
    Nop,
    Kill,
    Phi { result_type: Id, result: Id, operands: Vec<(Id, Id)> },
    Switch { selector: Id, default: Id, targets: Vec<(u32, Id)> },
}

impl Instruction {
    /// Static mnemonic for diagnostics and trace output.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Label { .. } => "Label",
            Instruction::SelectionMerge { .. } => "SelectionMerge",
            Instruction::LoopMerge { .. } => "LoopMerge",
            Instruction::Branch { .. } => "Branch",
            Instruction::BranchConditional { .. } => "BranchConditional",
            Instruction::FunctionCall { .. } => "FunctionCall",
            Instruction::Return => "Return",
            Instruction::ReturnValue { .. } => "ReturnValue",
            Instruction::ExtInst { .. } => "ExtInst",
            Instruction::Variable { .. } => "Variable",
            Instruction::Load { .. } => "Load",
            Instruction::Store { .. } => "Store",
            Instruction::AccessChain { .. } => "AccessChain",
            Instruction::CompositeConstruct { .. } => "CompositeConstruct",
            Instruction::CompositeExtract { .. } => "CompositeExtract",
            Instruction::CompositeInsert { .. } => "CompositeInsert",
            Instruction::VectorShuffle { .. } => "VectorShuffle",
            Instruction::IAdd { .. } => "IAdd",
            Instruction::ISub { .. } => "ISub",
            Instruction::IMul { .. } => "IMul",
            Instruction::SDiv { .. } => "SDiv",
            Instruction::FAdd { .. } => "FAdd",
            Instruction::FSub { .. } => "FSub",
            Instruction::FMul { .. } => "FMul",
            Instruction::FDiv { .. } => "FDiv",
            Instruction::SLessThan { .. } => "SLessThan",
            Instruction::SGreaterThan { .. } => "SGreaterThan",
            Instruction::ConvertSToF { .. } => "ConvertSToF",
            Instruction::ConvertFToS { .. } => "ConvertFToS",
            Instruction::VectorTimesScalar { .. } => "VectorTimesScalar",
            Instruction::ImageSampleImplicitLod { .. } => "ImageSampleImplicitLod",
            Instruction::Nop => "Nop",
            Instruction::Kill => "Kill",
            Instruction::Phi { .. } => "Phi",
            Instruction::Switch { .. } => "Switch",
        }
    }
}

/// A constant-table entry.
///
/// The constant table only admits the constant subset; payload and type
/// mismatches are caught when constants are materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantDef {
    /// Literal payload, little-endian, sized by the result type.
    Scalar { result_type: Id, bits: Vec<u8> },
    /// Constituent ids appended in declaration order.
    Composite { result_type: Id, constituents: Vec<Id> },
    /// True or false as a one-byte buffer.
    Bool { result_type: Id, value: bool },
}

impl ConstantDef {
    pub fn result_type(&self) -> Id {
        match self {
            ConstantDef::Scalar { result_type, .. }
            | ConstantDef::Composite { result_type, .. }
            | ConstantDef::Bool { result_type, .. } => *result_type,
        }
    }
}
