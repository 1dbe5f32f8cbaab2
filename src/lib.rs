//! Library crate for sub-scan-rs exposing reusable modules.
pub mod extract;
pub mod probe;
pub mod resolver;
pub mod scanner;
pub mod server;
pub mod target;
pub mod types;
pub mod wordlist;
