//! Data model shared by the connwatch ingest, engine and API crates.

mod api;
mod connection;
mod primitives;
mod sort;

pub use api::*;
pub use connection::*;
pub use primitives::*;
pub use sort::*;
