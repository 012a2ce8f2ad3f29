use thiserror::Error;

/// Top-level error type returned by ftquery builders, decoders and transports.
#[derive(Debug, Error)]
pub enum FtError {
    /// Invalid input supplied while configuring a query or command.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The engine reply did not have the shape the request implies.
    #[error("malformed reply: {message}")]
    MalformedReply { message: String },

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Configuration could not be read, parsed or expanded.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl FtError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn malformed_reply(message: impl Into<String>) -> Self {
        Self::MalformedReply {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type FtResult<T> = Result<T, FtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = FtError::invalid_argument("unknown geo unit: lightyear");
        assert_eq!(err.to_string(), "invalid argument: unknown geo unit: lightyear");

        let err = FtError::malformed_reply("5 elements do not divide into rows of 2");
        assert!(err.to_string().starts_with("malformed reply:"));
    }
}
