//! Shared protocol definitions for the duochat wire format.

pub mod codec;
pub mod event;
