//! Error types.
//!
//! Only structural problems surface as errors. Malformed upstream values are
//! recovered inside `recohere` and never reach the caller.

use thiserror::Error;

/// Errors raised by fastener accessors and capability lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FastenerError {
    /// A non-optional read found no value.
    #[error("fastener `{fastener}` has no value")]
    RequiredValueMissing { fastener: String },

    /// The fastener needs a capability its owner does not provide.
    #[error("fastener `{fastener}` requires a {capability}, but none is available")]
    MissingCapability {
        fastener: String,
        capability: &'static str,
    },

    /// An external value could not be parsed.
    #[error("failed to parse `{input}`: {reason}")]
    Parse { input: String, reason: String },
}

impl FastenerError {
    pub(crate) fn missing(fastener: &str) -> Self {
        FastenerError::RequiredValueMissing {
            fastener: fastener.to_string(),
        }
    }

    pub(crate) fn capability(fastener: &str, capability: &'static str) -> Self {
        FastenerError::MissingCapability {
            fastener: fastener.to_string(),
            capability,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FastenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_fastener() {
        let err = FastenerError::missing("width");
        assert_eq!(err.to_string(), "fastener `width` has no value");

        let err = FastenerError::capability("width", "constraint scope");
        assert_eq!(
            err.to_string(),
            "fastener `width` requires a constraint scope, but none is available"
        );
    }
}
