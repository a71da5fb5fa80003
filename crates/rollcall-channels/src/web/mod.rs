//! Web endpoint binding.
//!
//! `HttpSession` is the reqwest-backed `WebSession`; `WebAgent` adapts any
//! `WebSession` to the `MessagingTransport` contract so HTTP check-in
//! endpoints run through the same orchestrator as chat bots.

mod agent;
mod render;
mod session;


pub use agent::WebAgent;
pub use render::{extract_csrf_token, render_body};
pub use session::HttpSession;
