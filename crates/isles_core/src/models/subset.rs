//! Partition selector for stage operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which partition of the dataset a stage operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subset {
    #[serde(rename = "train")]
    Train,
    #[serde(rename = "valid")]
    Validation,
}

impl Subset {
    /// Name used on the wire and in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Validation => "valid",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
