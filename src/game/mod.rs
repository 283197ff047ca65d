//! Game module
//!
//! This module contains the game logic behind the active objects:
//! - World management (environment step, object lifecycle)
//! - Player records and survival rules
//! - Items, inventories and tool capabilities
//! - The node map and collision

pub mod collision;
pub mod inventory;
pub mod item;
pub mod map;
pub mod math;
pub mod player;
pub mod survival;
pub mod tool;
pub mod world;
