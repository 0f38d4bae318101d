// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for object graph operations.

use crate::keys::ObjectKey;
use crate::object::ObjectKind;

/// Result type alias for object graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading an object graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced object was not found in the arena.
    #[error("object not found: {0:?}")]
    ObjectNotFound(ObjectKey),

    /// A reference points at an object of the wrong kind.
    #[error("expected {expected} object, found {found}")]
    UnexpectedKind {
        expected: ObjectKind,
        found: ObjectKind,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
