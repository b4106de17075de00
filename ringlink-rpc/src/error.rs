use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RpcResult<T> = Result<T, RpcError>;

/// An error surfaced by the injected DAW-side collaborator.
///
/// The core never inspects the variant to decide on retries (the transport is assumed reliable,
/// see the concurrency model) — it only logs it and, depending on the call site, absorbs it or
/// propagates it to the one caller that's allowed to see it (the per-track builder, the parameter
/// switch).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RpcError {
    /// The remote object handle no longer refers to anything on the DAW side (track removed,
    /// project closed, parameter chain changed under us).
    Stale { message: String },
    /// The collaborator's transport returned something the core couldn't decode.
    Decode { message: String },
    /// Catch-all for collaborator-reported failures that don't fit the above.
    Other { message: String },
}

impl RpcError {
    pub fn stale(message: impl Into<String>) -> Self {
        Self::Stale {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Stale { message } | Self::Decode { message } | Self::Other { message } => {
                message
            }
        }
    }
}

impl Error for RpcError {}

impl Display for RpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<&str> for RpcError {
    fn from(message: &str) -> Self {
        Self::other(message)
    }
}
