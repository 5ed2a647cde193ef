//! Blockchain models.

pub use address::*;
pub use message::*;
pub use out_actions::*;

pub mod address;
pub mod message;
pub mod out_actions;
