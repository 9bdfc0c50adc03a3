//! Result identifiers.
//!
//! Every definition in a module is assigned a 32-bit result id, unique
//! within that module. Id 0 is reserved and never names a definition.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-bit result id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Id(pub u32);

impl Id {
    /// The reserved null id.
    pub const NULL: Id = Id(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl From<u32> for Id {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
