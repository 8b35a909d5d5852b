//! Network-store error type.

use mrn_core::LinkId;
use thiserror::Error;

/// Errors produced by `mrn-net` validation.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("invalid lanes info on link {link}: {reason}")]
    InvalidLanesInfo { link: LinkId, reason: String },
}

pub type NetResult<T> = Result<T, NetError>;
