//! Request handlers.

pub mod health;
pub mod upload;

pub use health::*;
pub use upload::*;
