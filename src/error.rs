//! Error handling module
//!
//! Defines custom error types for the voxel server.

use thiserror::Error;

use crate::object::{ActiveObjectType, ObjectId};

/// Main error type for the voxel server
#[derive(Error, Debug)]
pub enum VoxelError {
    /// Active object errors
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    /// Binary encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Inventory and item errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Scripting layer errors
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Active object lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    #[error("No free active object ids")]
    IdsExhausted,

    #[error("Object id {0} is already in use")]
    IdInUse(ObjectId),

    #[error("Objects of type {0:?} cannot be stored statically")]
    StaticNotAllowed(ActiveObjectType),

    #[error("Object {0} is not a player")]
    NotAPlayer(ObjectId),

    #[error("Player already connected: {0}")]
    PlayerAlreadyConnected(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(u16),

    #[error("Peer {0} already has a player")]
    PeerInUse(u16),

    #[error("Peer id 0 is reserved")]
    InvalidPeer,
}

/// Binary encoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid string encoding")]
    InvalidStringEncoding,

    #[error("String too long: {len} bytes (max: {max})")]
    StringTooLong { len: usize, max: usize },
}

/// Inventory and item errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Invalid slot: {0}")]
    InvalidSlot(usize),

    #[error("Inventory list not found: {0}")]
    ListNotFound(String),

    #[error("Invalid item string: {0}")]
    InvalidItemString(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),
}

/// Scripting layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Invalid entity name: {0}")]
    InvalidEntityName(String),

    #[error("Entity already registered: {0}")]
    AlreadyRegistered(String),
}

/// Result type alias for voxel server operations
pub type Result<T> = std::result::Result<T, VoxelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ObjectError::NotFound(42);
        assert_eq!(err.to_string(), "Object not found: 42");

        let err = SerializationError::UnexpectedEof {
            needed: 4,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected end of data: needed 4 bytes, 1 remaining"
        );

        let err = InventoryError::ListNotFound("main".to_string());
        assert_eq!(err.to_string(), "Inventory list not found: main");
    }

    #[test]
    fn test_error_conversion() {
        let err: VoxelError = ObjectError::StaticNotAllowed(ActiveObjectType::Player).into();
        assert!(matches!(
            err,
            VoxelError::Object(ObjectError::StaticNotAllowed(ActiveObjectType::Player))
        ));
        assert_eq!(
            err.to_string(),
            "Object error: Objects of type Player cannot be stored statically"
        );
    }
}
