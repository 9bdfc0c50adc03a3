//! Runtime errors.

use thiserror::Error;

use specular_module::Id;

/// Runtime result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors.
///
/// Setup-phase failures (`ExtensionLoad`, `BadConstant`) abort before
/// any instruction runs; the rest abort the run at the faulting
/// instruction and unwind through the frame stack.
#[derive(Debug, Error)]
pub enum Error {
    #[error("extension set {name:?} (set {id}) could not be resolved")]
    ExtensionLoad { id: Id, name: String },

    #[error("constant {id}: {message}")]
    BadConstant { id: Id, message: String },

    #[error("unimplemented opcode {mnemonic} in function {function} at pc {pc}")]
    UnknownOpcode {
        function: Id,
        pc: usize,
        mnemonic: &'static str,
    },

    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    #[error("index {index} out of range for {type_id} with {limit} members")]
    IndexOutOfRange { type_id: Id, index: u32, limit: u32 },

    #[error("malformed module: {message}")]
    MalformedModule { message: String },
}

impl Error {
    /// Convenience constructor for the catch-all variant.
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedModule {
            message: message.into(),
        }
    }
}
