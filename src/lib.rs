//! # Vetrina Telegram Bot
//!
//! A Telegram bot that lets a single admin manage a storefront catalog
//! (products, categories, media) through multi-step chat flows. The catalog
//! is persisted as one JSON snapshot consumed by an external storefront
//! front-end.

pub mod bot;
pub mod catalog;
pub mod config;
pub mod context;
pub mod dialogue;
pub mod localization;
pub mod media;
