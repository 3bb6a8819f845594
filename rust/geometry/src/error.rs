// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building boundary geometry
#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Boundary is not closed: {boundary_edges} boundary edges remain")]
    OpenBoundary { boundary_edges: usize },

    #[error("Boundary is non-manifold: {edges} edges are shared by more than two faces")]
    NonManifoldBoundary { edges: usize },

    #[error("Triangle index {index} out of range for {vertex_count} vertices")]
    InvalidIndex { index: u32, vertex_count: usize },

    #[error("Degenerate bounds: {0}")]
    DegenerateBounds(String),
}
