//! Error types surfaced by the discovery and swipe operations.

use crate::core::quota::QuotaKind;
use crate::models::ErrorResponse;
use crate::services::StoreError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use thiserror::Error;

/// Why a swipe transition was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActedReason {
    /// Passing after a like is not permitted
    PassAfterLike,
    /// An active match exists, unmatch is the reverse path
    ActiveMatch,
}

impl fmt::Display for ActedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActedReason::PassAfterLike => {
                write!(f, "You already liked this user, passing after a like is not permitted")
            }
            ActedReason::ActiveMatch => {
                write!(f, "You are matched with this user, use unmatch instead")
            }
        }
    }
}

/// Errors returned by discovery, swipe, quota and match operations
///
/// Every variant except `Store` and `Internal` is an expected outcome
/// for the caller, not a server fault.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("You cannot swipe on yourself")]
    SelfAction,

    #[error("Target user {0} not found")]
    TargetNotFound(String),

    #[error("{0}")]
    AlreadyActed(ActedReason),

    #[error("You cannot interact with this user")]
    Blocked,

    #[error("Daily {kind} quota exhausted, resets at {}", .reset_at.to_rfc3339_opts(SecondsFormat::Secs, true))]
    QuotaExhausted {
        kind: QuotaKind,
        reset_at: DateTime<Utc>,
    },

    #[error("{feature} is not available on your subscription tier")]
    TierNotAllowed { feature: &'static str },

    #[error("Invalid match reference: {0}")]
    InvalidMatchReference(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DiscoveryError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DiscoveryError::SelfAction => "self_action",
            DiscoveryError::TargetNotFound(_) => "target_not_found",
            DiscoveryError::AlreadyActed(_) => "already_acted",
            DiscoveryError::Blocked => "blocked",
            DiscoveryError::QuotaExhausted { .. } => "quota_exhausted",
            DiscoveryError::TierNotAllowed { .. } => "tier_not_allowed",
            DiscoveryError::InvalidMatchReference(_) => "invalid_match_reference",
            DiscoveryError::Store(_) | DiscoveryError::Internal(_) => "internal_error",
        }
    }

    /// True for outcomes the caller caused, which are not logged as errors
    pub fn is_expected(&self) -> bool {
        !matches!(self, DiscoveryError::Store(_) | DiscoveryError::Internal(_))
    }
}

impl ResponseError for DiscoveryError {
    fn status_code(&self) -> StatusCode {
        match self {
            DiscoveryError::SelfAction | DiscoveryError::AlreadyActed(_) => StatusCode::BAD_REQUEST,
            DiscoveryError::TargetNotFound(_) | DiscoveryError::InvalidMatchReference(_) => {
                StatusCode::NOT_FOUND
            }
            DiscoveryError::Blocked | DiscoveryError::TierNotAllowed { .. } => StatusCode::FORBIDDEN,
            DiscoveryError::QuotaExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            DiscoveryError::Store(_) | DiscoveryError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if !self.is_expected() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
        }

        // Internal details stay in the logs
        let message = if self.is_expected() {
            self.to_string()
        } else {
            "Internal server error, please retry".to_string()
        };

        let reset_at = match self {
            DiscoveryError::QuotaExhausted { reset_at, .. } => Some(*reset_at),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message,
            status_code: status.as_u16(),
            reset_at,
        })
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
