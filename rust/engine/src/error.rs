// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for synchronization runs.
//!
//! Per-object errors ([`ConversionError::NotSupported`],
//! [`ConversionError::Failed`]) are caught by the dispatcher and recorded on
//! the object's record. Fatal errors ([`ConversionError::Cancelled`] and
//! unrecoverable host failures) abort the run.

use thiserror::Error;

use crate::host::ElementKind;
use crate::record::ConversionStatus;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Result type for calls into the element database
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Errors raised by the native element database.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("{operation} rejected with return code {code}")]
    Rejected { operation: String, code: i32 },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: ElementKind, name: String },

    /// The host can no longer be reached; nothing after this will succeed
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    pub fn rejected(operation: impl Into<String>, code: i32) -> Self {
        HostError::Rejected {
            operation: operation.into(),
            code,
        }
    }

    pub fn not_found(kind: ElementKind, name: impl Into<String>) -> Self {
        HostError::NotFound {
            kind,
            name: name.into(),
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, HostError::Unavailable(_))
    }
}

/// Errors that can occur while converting objects.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Conversion not supported: {0}")]
    NotSupported(String),

    #[error("Conversion failed: {0}")]
    Failed(String),

    /// A tabular edit cannot hold the new topology; resolved by recreating
    /// the element
    #[error("Structural integrity conflict: {0}")]
    StructuralIntegrityConflict(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Model error: {0}")]
    Model(#[from] structsync_model::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] structsync_geometry::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ConversionError {
    pub fn failed(message: impl Into<String>) -> Self {
        ConversionError::Failed(message.into())
    }

    /// Whether this error must abort the whole batch.
    pub fn is_fatal(&self) -> bool {
        match self {
            ConversionError::Cancelled => true,
            ConversionError::Host(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Status recorded for an object whose conversion raised this error.
    pub fn status(&self) -> ConversionStatus {
        match self {
            ConversionError::NotSupported(_) => ConversionStatus::Skipped,
            _ => ConversionStatus::Failed,
        }
    }
}
