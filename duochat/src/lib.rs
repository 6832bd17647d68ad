//! `duochat`: terminal client for two-person and small-group chat rooms.

pub mod app;
pub mod chat;
pub mod config;
pub mod net;
pub mod transport;
pub mod ui;
