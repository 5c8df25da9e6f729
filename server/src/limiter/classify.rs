//! Failure classification for calls to external providers.
//!
//! Pure inspection of an error's rendered text: no side effects, no I/O.
//! The executor uses the resulting flags to decide whether to retry, how
//! long to wait, and whether the failure counts against the circuit breaker.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([45]\d{2})\b").unwrap());
static RE_RETRY_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"retry[-_\s]?after[:\s=]+(\d+)").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct Classification {
    pub is_rate_limit: bool,
    pub is_timeout: bool,
    pub is_network_error: bool,
    pub is_transient: bool,
    pub is_permanent: bool,
    /// Server-supplied retry hint, in seconds.
    pub retry_after: Option<u64>,
}

impl Classification {
    pub fn should_retry(&self) -> bool {
        self.is_transient && !self.is_permanent
    }
}

/// Label a provider failure. Matches against the full error chain so that
/// context wrapped around a reqwest error still classifies correctly.
pub fn classify(err: &anyhow::Error) -> Classification {
    let text = format!("{err:#}").to_lowercase();

    let status = RE_STATUS
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok());

    let is_rate_limit = status == Some(429)
        || text.contains("rate limit")
        || text.contains("quota")
        || text.contains("throttl")
        || text.contains("too many requests");

    let is_timeout =
        text.contains("timed out") || text.contains("timeout") || text.contains("etimedout");

    let is_network_error = text.contains("econnrefused")
        || text.contains("econnreset")
        || text.contains("connection refused")
        || text.contains("connection reset")
        || text.contains("dns error")
        || text.contains("failed to lookup")
        || text.contains("fetch failed")
        || text.contains("network");

    let is_server_error = matches!(status, Some(500) | Some(502) | Some(503) | Some(504))
        || text.contains("internal server error")
        || text.contains("bad gateway")
        || text.contains("service unavailable");

    let is_permanent = matches!(status, Some(400) | Some(401) | Some(403))
        || text.contains("invalid api key")
        || text.contains("unauthorized")
        || text.contains("forbidden");

    let retry_after = RE_RETRY_AFTER
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());

    Classification {
        is_rate_limit,
        is_timeout,
        is_network_error,
        is_transient: is_rate_limit || is_timeout || is_network_error || is_server_error,
        is_permanent,
        retry_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_rate_limit_classification() {
        let class = classify(&anyhow!("429 Too Many Requests"));
        assert!(class.is_rate_limit);
        assert!(class.is_transient);
        assert!(!class.is_permanent);
        assert!(class.should_retry());

        let class = classify(&anyhow!("Requests rate limit exceeded"));
        assert!(class.is_rate_limit);
        assert!(class.should_retry());
    }

    #[test]
    fn test_timeout_classification() {
        let class = classify(&anyhow!("connect ETIMEDOUT 1.2.3.4:443"));
        assert!(class.is_timeout);
        assert!(!class.is_rate_limit);
        assert!(class.should_retry());

        let class = classify(&anyhow!("request timed out after 5000ms"));
        assert!(class.is_timeout);
        assert!(!class.is_permanent);
        assert!(class.should_retry());
    }

    #[test]
    fn test_network_classification() {
        let class = classify(&anyhow!("connect ECONNREFUSED 127.0.0.1:8080"));
        assert!(class.is_network_error);
        assert!(!class.is_timeout);
        assert!(class.should_retry());

        let class = classify(&anyhow!("dns error: failed to lookup address"));
        assert!(class.is_network_error);
        assert!(class.should_retry());
    }

    #[test]
    fn test_permanent_classification() {
        let class = classify(&anyhow!("401 Unauthorized"));
        assert!(class.is_permanent);
        assert!(!class.should_retry());

        let class = classify(&anyhow!("invalid api key provided"));
        assert!(class.is_permanent);
        assert!(!class.should_retry());

        let class = classify(&anyhow!("403 Forbidden"));
        assert!(class.is_permanent);
        assert!(!class.should_retry());
    }

    #[test]
    fn test_server_error_is_transient() {
        let class = classify(&anyhow!("chat api returned 503 Service Unavailable"));
        assert!(class.is_transient);
        assert!(!class.is_rate_limit);
        assert!(class.should_retry());

        let class = classify(&anyhow!("502 Bad Gateway"));
        assert!(class.should_retry());
    }

    #[test]
    fn test_retry_after_hint() {
        let class = classify(&anyhow!("429 rate limit exceeded, retry-after: 12"));
        assert!(class.is_rate_limit);
        assert_eq!(class.retry_after, Some(12));

        let class = classify(&anyhow!("429 Too Many Requests"));
        assert_eq!(class.retry_after, None);
    }

    #[test]
    fn test_unknown_error_is_not_retried() {
        let class = classify(&anyhow!("could not parse chat response"));
        assert!(!class.is_transient);
        assert!(!class.should_retry());
    }

    #[test]
    fn test_wrapped_error_chain() {
        let inner = anyhow!("429 Too Many Requests");
        let wrapped = inner.context("chat request failed");
        let class = classify(&wrapped);
        assert!(class.is_rate_limit);
    }
}
