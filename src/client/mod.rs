//! Client facade.
//!
//! The discovery engine never talks to OCI directly. It issues typed requests
//! through the [`OciClient`] trait, and every request carries the retry
//! policy the facade must apply. Two implementations ship with the crate:
//!
//! - [`SnapshotClient`]: serves requests from a tenancy snapshot document
//! - [`RetryingClient`]: decorator applying each request's [`RetryPolicy`]
//!
//! A binding to the real OCI SDK implements the same trait.

mod retry;
mod snapshot;

pub use retry::{retry_policy, RetryPolicy, RetryingClient};
pub use snapshot::{Snapshot, SnapshotClient};

use crate::value::AttrMap;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a client facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The service answered with an error status.
    #[error("{service} service error {status} ({code}): {message}")]
    Service {
        /// Service name (e.g. "core")
        service: String,
        /// HTTP status code
        status: u16,
        /// Service error code
        code: String,
        /// Error message
        message: String,
    },

    /// The requested object does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// What was looked up (resource class or API object)
        kind: String,
        /// The identifier that was looked up
        id: String,
    },

    /// The request never got an answer.
    #[error("transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// The answer did not have the expected shape.
    #[error("malformed response: {message}")]
    Malformed {
        /// Error message
        message: String,
    },
}

impl ClientError {
    /// HTTP-like status of the failure, when it has one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Transport { .. } | Self::Malformed { .. } => None,
        }
    }
}

/// Result type for client calls.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Per-request metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestMetadata {
    /// Retry policy the facade applies to this request
    pub retry_policy: RetryPolicy,
}

/// List or read a Terraform data source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSourceRequest {
    /// Data source class (e.g. `oci_core_vcns`)
    pub datasource_class: String,
    /// Attribute of the data source holding the result list
    pub items_attr: String,
    /// Query parameters
    pub params: AttrMap,
    /// Page token from the previous response
    pub page: Option<String>,
    pub metadata: RequestMetadata,
}

/// One page of data source results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListPage {
    pub items: Vec<AttrMap>,
    /// Token for the next page; `None` on the last page
    pub next_page: Option<String>,
}

/// Read the full state of one resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadRequest {
    /// Terraform resource class (e.g. `oci_core_instance`)
    pub resource_class: String,
    /// Resource id, when the resource is addressed by id
    pub id: Option<String>,
    /// Additional lookup attributes (e.g. `tag_namespace_id` and `name`)
    pub params: AttrMap,
    pub metadata: RequestMetadata,
}

/// Fetch the raw load balancer object, listeners included.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetLoadBalancerRequest {
    pub load_balancer_id: String,
    pub metadata: RequestMetadata,
}

/// List tag definitions of a tag namespace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListTagsRequest {
    pub tag_namespace_id: String,
    pub page: Option<String>,
    pub metadata: RequestMetadata,
}

/// Summary of one tag definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagSummary {
    pub name: String,
    /// Everything else the list call returned
    pub raw: serde_json::Value,
}

/// One page of tag summaries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagPage {
    pub items: Vec<TagSummary>,
    pub next_page: Option<String>,
}

/// Operations the discovery engine needs from OCI.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OciClient: Send + Sync {
    /// List one page of a data source.
    async fn list_data_source(&self, request: &DataSourceRequest) -> ClientResult<ListPage>;

    /// Read a singular data source (e.g. `oci_core_vnic`).
    async fn read_data_source(&self, request: &DataSourceRequest) -> ClientResult<AttrMap>;

    /// Read the full state of a resource.
    async fn read_resource(&self, request: &ReadRequest) -> ClientResult<AttrMap>;

    /// Get the raw load balancer object.
    async fn get_load_balancer(&self, request: &GetLoadBalancerRequest) -> ClientResult<serde_json::Value>;

    /// List one page of tag definitions.
    async fn list_tags(&self, request: &ListTagsRequest) -> ClientResult<TagPage>;
}
