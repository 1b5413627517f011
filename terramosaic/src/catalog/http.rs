//! HTTP client abstraction for testability.

use super::types::CatalogError;

/// Trait for the HTTP operations the catalog client needs.
///
/// This abstraction allows dependency injection and easier testing by
/// enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// POST a JSON body and return the response body as text.
    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, CatalogError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_timeout(30)
    }

    /// Creates a new ReqwestClient with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CatalogError::Unreachable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<String, CatalogError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| CatalogError::Unreachable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::QueryRejected(format!(
                "HTTP {} from {}",
                status, url
            )));
        }

        response
            .text()
            .map_err(|e| CatalogError::Unreachable(format!("failed to read response: {}", e)))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Mock HTTP client for testing.
    pub struct MockHttpClient {
        pub response: Result<String, String>,
    }

    impl HttpClient for MockHttpClient {
        fn post_json(&self, _url: &str, _body: &serde_json::Value) -> Result<String, CatalogError> {
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(msg) => Err(CatalogError::Unreachable(msg.clone())),
            }
        }
    }

    #[test]
    fn test_mock_client_success() {
        let mock = MockHttpClient {
            response: Ok("{}".to_string()),
        };
        let result = mock.post_json("http://example.com", &serde_json::json!({}));
        assert_eq!(result.unwrap(), "{}");
    }

    #[test]
    fn test_mock_client_error() {
        let mock = MockHttpClient {
            response: Err("connection refused".to_string()),
        };
        let result = mock.post_json("http://example.com", &serde_json::json!({}));
        assert!(matches!(result, Err(CatalogError::Unreachable(_))));
    }
}
