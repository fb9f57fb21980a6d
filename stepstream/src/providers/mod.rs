//! Provider-backed steps.
//!
//! Providers are external collaborators: they own request construction and
//! response parsing for a language-model backend. This module only adapts them
//! to the [`Step`](crate::steps::Step) protocol and validates settings before
//! any request is made.

mod chat;
mod message;

pub use chat::{ChatProvider, ChatStep};
pub use message::{Message, Role};
