//! # rollcall-core
//!
//! Core types, traits, configuration, and error handling for rollcall.

pub mod config;
pub mod error;
pub mod mask;
pub mod message;
pub mod outcome;
pub mod traits;
