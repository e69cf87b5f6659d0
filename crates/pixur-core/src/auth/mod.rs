//! Session material and the storage seam for it.

mod model;
mod store;

pub use model::{AuthState, AuthToken, Identity, PwtPayload, SessionData, TokenType};
pub use store::{MemorySessionStore, SessionStore};
