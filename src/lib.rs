pub mod config;
pub mod discover;
pub mod http_client;

// re-export the types most callers need
pub use crate::config::{CirclAuth, FinderConfig};
pub use crate::discover::SubdomainFinder;
