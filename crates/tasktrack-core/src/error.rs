//! Error types for store operations.

use crate::item::{ItemId, ItemKind};
use chrono::NaiveDateTime;

/// Errors raised by `TaskStore` operations.
///
/// Every error is a deterministic function of store state plus the request;
/// a failed operation leaves the store exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No item of the requested kind carries this ID.
    #[error("{kind} not found: {id}")]
    NotFound { kind: ItemKind, id: ItemId },

    /// No item of any kind carries this ID.
    #[error("item not found: {0}")]
    UnknownItem(ItemId),

    /// The request itself is malformed (self-parenting, half-specified window, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested window overlaps an already scheduled item.
    #[error("time window {start} .. {end} for item {id} overlaps item {conflicting}")]
    TimeConflict {
        id: ItemId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        conflicting: ItemId,
    },
}

/// Coarse classification of a `StoreError`, for adapters that map errors
/// onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    TimeConflict,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } | StoreError::UnknownItem(_) => ErrorKind::NotFound,
            StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StoreError::TimeConflict { .. } => ErrorKind::TimeConflict,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidArgument(message.into())
    }
}
