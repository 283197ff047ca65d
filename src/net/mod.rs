//! Networking module
//!
//! The binary primitives objects use to encode their messages, initialization
//! data and static data.

pub mod buffer;
