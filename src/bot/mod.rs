//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `commands`: slash-command parsing, callback tokens and the admin gate
//! - `message_handler`: routes incoming text, photo, and video messages
//! - `callback_handler`: handles inline keyboard callback queries
//! - `dialogue_manager`: flow step transitions and terminal catalog actions
//! - `ui_builder`: creates keyboards and formats messages

pub mod callback_handler;
pub mod commands;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;
