//! Voxel Game Server Library
//!
//! This library provides the server-side active objects of a voxel game:
//! scripted entities, dropped items and player avatars, together with the
//! environment that steps them.
//!
//! ## Modules
//!
//! - `config` - Server configuration management
//! - `error` - Error types and result definitions
//! - `game` - World, players, items and map
//! - `net` - Binary encoding primitives
//! - `object` - Server active objects
//! - `script` - Entity scripting seam

pub mod config;
pub mod error;
pub mod game;
pub mod net;
pub mod object;
pub mod script;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{Result, VoxelError};
pub use game::world::{ServerEnvironment, WorldSettings};
pub use object::{LuaEntitySao, PlayerSao, ServerActiveObject};

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
