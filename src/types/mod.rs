//! Message types shared by the conversation loop and model providers.

pub mod message;

pub use message::*;
