//! I/O adapters for the Pixur client: the HTTP API, session files, config
//! files and platform paths.

pub mod http_api;
pub mod paths;
pub mod session_store;
pub mod storage;

pub use http_api::HttpPixurApi;
pub use paths::PixurPaths;
pub use session_store::FileSessionStore;
pub use storage::ConfigStorage;
