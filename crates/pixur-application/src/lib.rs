//! Application services for the pixur client.
//!
//! Services sit between front ends and the [`PixurApi`](pixur_core::api::PixurApi)
//! transport: [`AuthService`] owns the session, [`PicsService`] and
//! [`CommentsService`] wrap the picture endpoints, and [`view`] holds the
//! stateful view models built on top of them.

pub mod auth_service;
pub mod comments_service;
pub mod pics_service;
pub mod view;

#[cfg(test)]
mod testing;

pub use auth_service::AuthService;
pub use comments_service::CommentsService;
pub use pics_service::{CacheSummary, PicsService};
