//! Retry policies and the retrying client decorator.

use super::{
    ClientError, ClientResult, DataSourceRequest, GetLoadBalancerRequest, ListPage, ListTagsRequest,
    OciClient, ReadRequest, TagPage,
};
use crate::config::RetryOptions;
use crate::value::AttrMap;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// How a facade retries one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Service the request goes to (e.g. "core", "object_storage")
    pub service: String,
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every retry
    pub base_delay: Duration,
    /// Upper bound for the delay between attempts
    pub max_delay: Duration,
    /// Whether 404 answers are retried (eventual consistency after writes)
    pub retry_not_found: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            service: String::new(),
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            retry_not_found: false,
        }
    }
}

impl RetryPolicy {
    /// Whether `error` is worth another attempt under this policy.
    #[must_use]
    pub fn is_retryable(&self, error: &ClientError) -> bool {
        match error {
            ClientError::Transport { .. } => true,
            ClientError::Malformed { .. } => false,
            ClientError::NotFound { .. } => self.retry_not_found,
            ClientError::Service { status, .. } => match *status {
                404 => self.retry_not_found,
                409 => self.service == "object_storage",
                429 => true,
                s => s >= 500,
            },
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Build the retry policy for a request.
///
/// Data source reads never retry 404: an object missing from a listing is
/// gone, not late.
#[must_use]
pub fn retry_policy(is_datasource_read: bool, service: &str, options: &RetryOptions) -> RetryPolicy {
    RetryPolicy {
        service: service.to_string(),
        max_attempts: options.max_attempts.max(1),
        base_delay: Duration::from_millis(options.base_delay_ms),
        max_delay: Duration::from_millis(options.max_delay_ms),
        retry_not_found: !is_datasource_read,
    }
}

/// Decorator applying the retry policy attached to each request.
#[derive(Debug, Clone)]
pub struct RetryingClient<C> {
    inner: C,
}

impl<C: OciClient> RetryingClient<C> {
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped client.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &'static str, mut call: F) -> ClientResult<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ClientResult<T>> + Send,
    T: Send,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts && policy.is_retryable(&error) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    operation,
                    service = %policy.service,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[async_trait]
impl<C: OciClient> OciClient for RetryingClient<C> {
    async fn list_data_source(&self, request: &DataSourceRequest) -> ClientResult<ListPage> {
        with_retry(&request.metadata.retry_policy, "list_data_source", || {
            self.inner.list_data_source(request)
        })
        .await
    }

    async fn read_data_source(&self, request: &DataSourceRequest) -> ClientResult<AttrMap> {
        with_retry(&request.metadata.retry_policy, "read_data_source", || {
            self.inner.read_data_source(request)
        })
        .await
    }

    async fn read_resource(&self, request: &ReadRequest) -> ClientResult<AttrMap> {
        with_retry(&request.metadata.retry_policy, "read_resource", || {
            self.inner.read_resource(request)
        })
        .await
    }

    async fn get_load_balancer(&self, request: &GetLoadBalancerRequest) -> ClientResult<serde_json::Value> {
        with_retry(&request.metadata.retry_policy, "get_load_balancer", || {
            self.inner.get_load_balancer(request)
        })
        .await
    }

    async fn list_tags(&self, request: &ListTagsRequest) -> ClientResult<TagPage> {
        with_retry(&request.metadata.retry_policy, "list_tags", || self.inner.list_tags(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockOciClient, RequestMetadata};
    use test_case::test_case;

    fn fast_options(max_attempts: u32) -> RetryOptions {
        RetryOptions {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    fn service_error(service: &str, status: u16) -> ClientError {
        ClientError::Service {
            service: service.to_string(),
            status,
            code: "Err".to_string(),
            message: "failure".to_string(),
        }
    }

    #[test_case("core", 429, true; "throttled")]
    #[test_case("core", 500, true; "server error")]
    #[test_case("core", 400, false; "bad request")]
    #[test_case("core", 409, false; "conflict outside object storage")]
    #[test_case("object_storage", 409, true; "conflict in object storage")]
    fn test_retryable_statuses(service: &str, status: u16, expected: bool) {
        let policy = retry_policy(true, service, &fast_options(3));
        assert_eq!(policy.is_retryable(&service_error(service, status)), expected);
    }

    #[test]
    fn test_not_found_depends_on_read_kind() {
        let missing = ClientError::NotFound {
            kind: "oci_core_instance".to_string(),
            id: "ocid1.instance.oc1..a".to_string(),
        };
        assert!(!retry_policy(true, "core", &fast_options(3)).is_retryable(&missing));
        assert!(retry_policy(false, "core", &fast_options(3)).is_retryable(&missing));
    }

    #[test]
    fn test_delay_is_exponential_and_capped() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let mut mock = MockOciClient::new();
        let mut calls = 0;
        mock.expect_list_data_source().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(service_error("core", 503))
            } else {
                Ok(ListPage::default())
            }
        });

        let client = RetryingClient::new(mock);
        let request = DataSourceRequest {
            datasource_class: "oci_core_vcns".to_string(),
            items_attr: "virtual_networks".to_string(),
            metadata: RequestMetadata {
                retry_policy: retry_policy(true, "core", &fast_options(3)),
            },
            ..DataSourceRequest::default()
        };

        assert!(client.list_data_source(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut mock = MockOciClient::new();
        mock.expect_read_resource()
            .times(2)
            .returning(|_| Err(ClientError::Transport { message: "reset".to_string() }));

        let client = RetryingClient::new(mock);
        let request = ReadRequest {
            resource_class: "oci_core_instance".to_string(),
            id: Some("ocid1.instance.oc1..a".to_string()),
            metadata: RequestMetadata {
                retry_policy: retry_policy(false, "core", &fast_options(2)),
            },
            ..ReadRequest::default()
        };

        let result = client.read_resource(&request).await;
        assert!(matches!(result, Err(ClientError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let mut mock = MockOciClient::new();
        mock.expect_list_tags()
            .times(1)
            .returning(|_| Err(service_error("identity", 401)));

        let client = RetryingClient::new(mock);
        let request = ListTagsRequest {
            tag_namespace_id: "ocid1.tagnamespace.oc1..a".to_string(),
            page: None,
            metadata: RequestMetadata {
                retry_policy: retry_policy(true, "identity", &fast_options(5)),
            },
        };

        assert!(client.list_tags(&request).await.is_err());
    }
}
