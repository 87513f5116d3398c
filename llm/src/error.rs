use thiserror::Error;

/// Transport-level failures from a generation service.
///
/// These travel inside `anyhow::Error`; callers that need to tell a rate
/// limit apart from other failures use `downcast_ref::<LlmError>()`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limit exceeded (limit: {}): {message}", limit.as_deref().unwrap_or("unknown"))]
    RateLimited {
        limit: Option<String>,
        message: String,
    },

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_display() {
        let err = LlmError::RateLimited {
            limit: Some("500".to_string()),
            message: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "rate limit exceeded (limit: 500): slow down");
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_rate_limit_without_header() {
        let err = LlmError::RateLimited {
            limit: None,
            message: "slow down".to_string(),
        };
        assert!(err.to_string().contains("limit: unknown"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = LlmError::Http {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        let llm = err.downcast_ref::<LlmError>().unwrap();
        assert!(!llm.is_rate_limit());
    }
}
