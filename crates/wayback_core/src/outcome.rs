use std::fmt;

/// Terminal result for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        filename: String,
    },
    Failure {
        filename: String,
        reason: FailureReason,
    },
}

impl Outcome {
    pub fn success(filename: impl Into<String>) -> Self {
        Outcome::Success {
            filename: filename.into(),
        }
    }

    pub fn failure(filename: impl Into<String>, reason: FailureReason) -> Self {
        Outcome::Failure {
            filename: filename.into(),
            reason,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn filename(&self) -> &str {
        match self {
            Outcome::Success { filename } | Outcome::Failure { filename, .. } => filename,
        }
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Short classification of why a target failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The archive holds no snapshot of the target.
    NotFound,
    HttpStatus(u16),
    Timeout,
    Network,
    InvalidUrl,
    InvalidResponse,
    Io,
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotFound => write!(f, "not found"),
            FailureReason::HttpStatus(code) => write!(f, "http {code}"),
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::Network => write!(f, "network error"),
            FailureReason::InvalidUrl => write!(f, "invalid url"),
            FailureReason::InvalidResponse => write!(f, "invalid response"),
            FailureReason::Io => write!(f, "io error"),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}
