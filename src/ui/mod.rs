//! Terminal UI components

pub mod chat;
pub mod theme;
