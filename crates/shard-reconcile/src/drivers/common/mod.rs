//! Utilities shared by the SQL drivers.
//!
//! - [`tls`]: `ssl_mode` handling for both drivers
//! - [`keyset`]: statement text for counts and keyset pages

pub mod keyset;
pub mod tls;

pub use tls::{SslMode, TlsBuilder};
