//! # rollcall-channels
//!
//! Agent transports (chat relay, web endpoints) and notifier backends.

pub mod console;
pub mod factory;
pub mod relay;
pub mod telegram;
pub mod utils;
pub mod web;
pub mod wecom;

pub use factory::ChannelFactory;
