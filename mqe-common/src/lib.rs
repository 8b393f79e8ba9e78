//! # MQE Common Library
//!
//! Shared code for the meeting quality evaluation services:
//! - Meeting phase ordering (`Phase`)
//! - Event types (`MeetingEvent`) and the broadcast `EventBus`
//! - Configuration loading and root folder resolution
//! - Database initialization and schema
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod phase;
pub mod time;

pub use error::{Error, Result};
pub use phase::Phase;
