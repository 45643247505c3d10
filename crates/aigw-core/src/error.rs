use aigw_provider_core::ProviderError;
use serde::Serialize;

/// `{status_code, code, message, type}` — never carries internal exception
/// detail in `message` (`spec.md` §4.C, §7).
#[derive(Debug, Clone, Serialize)]
pub struct PublicError {
    #[serde(skip)]
    pub status_code: u16,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: &'static str,
}

impl PublicError {
    fn new(status_code: u16, code: &'static str, message: impl Into<String>, error_type: &'static str) -> Self {
        Self {
            status_code,
            code,
            message: message.into(),
            error_type,
        }
    }

    pub fn unknown_provider(name: &str) -> Self {
        Self::new(
            400,
            "unknown_provider",
            format!("unknown provider: {name}"),
            "invalid_request_error",
        )
    }

    pub fn provider_not_configured(name: &str) -> Self {
        Self::new(
            500,
            "provider_not_configured",
            format!("provider not configured: {name}"),
            "gateway_error",
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(400, "invalid_request", message.into(), "invalid_request_error")
    }

    pub fn unauthorized() -> Self {
        Self::new(401, "invalid_api_key", "invalid API key", "invalid_request_error")
    }

    pub fn rate_limited() -> Self {
        Self::new(429, "rate_limited", "rate limit exceeded", "rate_limit_error")
    }

    pub fn budget_exceeded() -> Self {
        Self::new(429, "budget_exceeded", "spend cap exceeded", "rate_limit_error")
    }

    pub fn not_found() -> Self {
        Self::new(404, "not_found", "resource not found", "invalid_request_error")
    }

    /// An infra/storage failure unrelated to anything the caller did — never
    /// the same thing as a real 429 (`spec.md` §7).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(500, "internal_error", message.into(), "gateway_error")
    }

    /// Maps a provider-call failure onto the §4.C classification table.
    pub fn from_provider_error(err: &ProviderError) -> Self {
        match err {
            ProviderError::Transport { .. } => {
                Self::new(502, "upstream_unreachable", "upstream unreachable", "upstream_error")
            }
            ProviderError::Upstream { status, .. } if (400..500).contains(status) => {
                Self::new(502, "upstream_4xx", "upstream rejected the request", "upstream_error")
            }
            ProviderError::Upstream { status, .. } if (500..600).contains(status) => {
                Self::new(502, "upstream_5xx", "upstream server error", "upstream_error")
            }
            ProviderError::Upstream { .. } => {
                Self::new(502, "upstream_error", "upstream error", "upstream_error")
            }
            ProviderError::InvalidRequest(msg) => Self::invalid_request(msg.clone()),
            ProviderError::Unsupported(_) | ProviderError::Other(_) => {
                Self::new(502, "provider_error", "provider error", "gateway_error")
            }
        }
    }

    /// `{"error":{"code":...,"message":...,"type":...}}` (`spec.md` §4.C).
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({ "error": self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape_matches_spec() {
        let err = PublicError::rate_limited();
        let envelope = err.to_envelope();
        assert_eq!(envelope["error"]["code"], "rate_limited");
        assert_eq!(envelope["error"]["type"], "rate_limit_error");
        assert!(envelope["error"]["status_code"].is_null());
    }

    #[test]
    fn upstream_5xx_maps_to_502() {
        let err = ProviderError::Upstream {
            status: 503,
            body: "boom".to_string(),
        };
        let mapped = PublicError::from_provider_error(&err);
        assert_eq!(mapped.status_code, 502);
        assert_eq!(mapped.code, "upstream_5xx");
        assert!(!mapped.message.contains("boom"));
    }
}
