//! Remote address book access.
//!
//! The sync engine only needs the raw vCard payload of the whole address
//! book, so a remote is anything that can produce that text.

pub mod carddav;

use crate::error::Result;

/// Trait for remote server implementations
pub trait Remote {
    /// Fetch every contact of the address book as concatenated vCard text.
    fn fetch_address_data(&self) -> Result<String>;
}
