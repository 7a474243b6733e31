//! Server and client registries (spec.md §4.2, §4.3)

pub mod client;
pub mod server;

pub use client::ClientRegistry;
pub use server::ServerRegistry;
