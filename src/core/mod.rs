//! Core module - Configuration, events, and the desktop card model

pub mod config;
pub mod desktop;
pub mod events;
