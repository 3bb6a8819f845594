// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for packing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a packing solve
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Boundary error: {0}")]
    Geometry(#[from] polybrick_geometry::Error),

    #[error("Tensor field parse error on line {line}: {reason}")]
    TensorFieldParse { line: usize, reason: String },

    #[error("Tensor field contains no tensors")]
    EmptyTensorField,

    #[error("{name} list has {found} entries, expected 1 or {expected}")]
    TensorListMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("No point inside the boundary found after {attempts} sampling attempts")]
    Sampling { attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
