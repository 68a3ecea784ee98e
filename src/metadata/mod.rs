// Current-track metadata and the formats it arrives in
pub mod didl;
pub mod icy;
pub mod store;

pub use store::MetadataStore;

use thiserror::Error;

/// Errors raised while parsing incoming metadata
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// `StreamTitle='` present but no terminating `;`
    #[error("ICY StreamTitle tag is not terminated by ';'")]
    UnterminatedIcyTag,

    #[error("Invalid duration '{0}', expected HH:MM:SS")]
    InvalidDuration(String),
}
