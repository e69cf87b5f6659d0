//! Domain types and pure logic of the Pixur client.
//!
//! Nothing in this crate performs I/O: network access goes through the
//! [`api::PixurApi`] trait and persistence through [`auth::SessionStore`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod comment;
pub mod config;
pub mod error;
pub mod flight;
pub mod pic;
mod wire;

// Re-export common error type
pub use error::{PixurError, Result};
