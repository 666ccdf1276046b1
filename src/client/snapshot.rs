//! Tenancy snapshot client.
//!
//! Serves the facade operations from a JSON or YAML document describing the
//! state of a tenancy:
//!
//! ```yaml
//! page_size: 2
//! data_sources:
//!   oci_core_vcns:
//!     - { id: ocid1.vcn.oc1..a, compartment_id: ocid1.compartment.oc1..root, display_name: vcn1 }
//! resources:
//!   oci_core_instance:
//!     ocid1.instance.oc1..a: { display_name: web }
//! singular_data_sources:
//!   oci_core_vnic:
//!     ocid1.vnic.oc1..a: { is_primary: true }
//! load_balancers:
//!   ocid1.loadbalancer.oc1..a: { listeners: { l1: { default_backend_set_name: bs1 } } }
//! tags:
//!   ocid1.tagnamespace.oc1..a: [ { name: env } ]
//! ```

use super::{
    ClientError, ClientResult, DataSourceRequest, GetLoadBalancerRequest, ListPage, ListTagsRequest,
    OciClient, ReadRequest, TagPage, TagSummary,
};
use crate::err;
use crate::error::{OciDiscoveryError, Result, ResultExt};
use crate::value::{attrs_from_json, AttrMap, AttrValue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

/// In-memory description of a tenancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Page size used to split list results; unset returns single pages
    pub page_size: Option<usize>,
    /// List results per data source class
    pub data_sources: BTreeMap<String, Vec<serde_json::Value>>,
    /// Full resource state per class, keyed by id
    pub resources: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    /// Singular data source results per class, keyed by lookup value
    pub singular_data_sources: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    /// Raw load balancer objects keyed by id
    pub load_balancers: BTreeMap<String, serde_json::Value>,
    /// Tag definitions keyed by tag namespace id
    pub tags: BTreeMap<String, Vec<serde_json::Value>>,
}

impl Snapshot {
    /// Load a snapshot from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(err!(FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).with_path(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let parsed = if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        };

        parsed.map_err(|e| {
            err!(SnapshotParse {
                path: path.to_path_buf(),
                message: e,
            })
        })
    }

    /// Parse a JSON snapshot document.
    pub fn from_json(content: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// Parse a YAML snapshot document.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Total number of objects across all sections.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.data_sources.values().map(Vec::len).sum::<usize>()
            + self.resources.values().map(BTreeMap::len).sum::<usize>()
            + self.singular_data_sources.values().map(BTreeMap::len).sum::<usize>()
            + self.load_balancers.len()
            + self.tags.values().map(Vec::len).sum::<usize>()
    }
}

/// Client answering every call from a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotClient {
    snapshot: Snapshot,
}

impl SnapshotClient {
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load the snapshot file and build a client over it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let snapshot = Snapshot::from_file(path)?;
        debug!(path = %path.display(), objects = snapshot.object_count(), "Loaded tenancy snapshot");
        Ok(Self::new(snapshot))
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn page<T: Clone>(&self, items: &[T], token: Option<&str>) -> ClientResult<(Vec<T>, Option<String>)> {
        let start = match token {
            None => 0,
            Some(t) => t.parse::<usize>().map_err(|_| ClientError::Malformed {
                message: format!("invalid page token '{t}'"),
            })?,
        };
        let Some(size) = self.snapshot.page_size.filter(|s| *s > 0) else {
            return Ok((items.iter().skip(start).cloned().collect(), None));
        };

        let end = (start + size).min(items.len());
        let page = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
        let next = (end < items.len()).then(|| end.to_string());
        Ok((page, next))
    }
}

/// An item matches when, for every query parameter, it either lacks the
/// attribute or holds an equal value.
fn matches_params(item: &AttrMap, params: &AttrMap) -> bool {
    params.iter().all(|(key, wanted)| match item.get(key) {
        None | Some(AttrValue::Null) => true,
        Some(actual) => values_equal(actual, wanted),
    })
}

/// Scalars compare by their text so `false` matches `"false"`.
fn values_equal(a: &AttrValue, b: &AttrValue) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (AttrValue::List(_) | AttrValue::Map(_), _) | (_, AttrValue::List(_) | AttrValue::Map(_)) => false,
        _ => a.to_string() == b.to_string(),
    }
}

fn with_id(mut attrs: AttrMap, id: &str) -> AttrMap {
    attrs
        .entry("id".to_string())
        .or_insert_with(|| AttrValue::from(id));
    attrs
}

#[async_trait]
impl OciClient for SnapshotClient {
    #[instrument(skip(self, request), fields(class = %request.datasource_class))]
    async fn list_data_source(&self, request: &DataSourceRequest) -> ClientResult<ListPage> {
        let matching: Vec<AttrMap> = self
            .snapshot
            .data_sources
            .get(&request.datasource_class)
            .map(|items| {
                items
                    .iter()
                    .map(attrs_from_json)
                    .filter(|item| matches_params(item, &request.params))
                    .collect()
            })
            .unwrap_or_default();

        let (items, next_page) = self.page(&matching, request.page.as_deref())?;
        debug!(returned = items.len(), has_next = next_page.is_some(), "Listed data source");
        Ok(ListPage { items, next_page })
    }

    async fn read_data_source(&self, request: &DataSourceRequest) -> ClientResult<AttrMap> {
        let not_found = || ClientError::NotFound {
            kind: request.datasource_class.clone(),
            id: request
                .params
                .values()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        };

        let entries = self
            .snapshot
            .singular_data_sources
            .get(&request.datasource_class)
            .ok_or_else(not_found)?;

        request
            .params
            .values()
            .filter_map(AttrValue::as_str)
            .find_map(|lookup| entries.get(lookup))
            .map(attrs_from_json)
            .ok_or_else(not_found)
    }

    async fn read_resource(&self, request: &ReadRequest) -> ClientResult<AttrMap> {
        let not_found = || ClientError::NotFound {
            kind: request.resource_class.clone(),
            id: request.id.clone().unwrap_or_else(|| {
                request
                    .params
                    .values()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("/")
            }),
        };

        let entries = self
            .snapshot
            .resources
            .get(&request.resource_class)
            .ok_or_else(not_found)?;

        match &request.id {
            Some(id) => entries
                .get(id)
                .map(|value| with_id(attrs_from_json(value), id))
                .ok_or_else(not_found),
            // Lookup by attributes: every parameter must be present and equal
            None => entries
                .iter()
                .map(|(id, value)| (id, attrs_from_json(value)))
                .find(|(_, attrs)| {
                    request
                        .params
                        .iter()
                        .all(|(k, v)| attrs.get(k).is_some_and(|actual| values_equal(actual, v)))
                })
                .map(|(id, attrs)| with_id(attrs, id))
                .ok_or_else(not_found),
        }
    }

    async fn get_load_balancer(&self, request: &GetLoadBalancerRequest) -> ClientResult<serde_json::Value> {
        self.snapshot
            .load_balancers
            .get(&request.load_balancer_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                kind: "load_balancer".to_string(),
                id: request.load_balancer_id.clone(),
            })
    }

    async fn list_tags(&self, request: &ListTagsRequest) -> ClientResult<TagPage> {
        let summaries = self
            .snapshot
            .tags
            .get(&request.tag_namespace_id)
            .map(|items| {
                items
                    .iter()
                    .map(|raw| {
                        let name = raw
                            .get("name")
                            .and_then(serde_json::Value::as_str)
                            .ok_or_else(|| ClientError::Malformed {
                                message: format!(
                                    "tag in namespace '{}' has no name",
                                    request.tag_namespace_id
                                ),
                            })?;
                        Ok(TagSummary {
                            name: name.to_string(),
                            raw: raw.clone(),
                        })
                    })
                    .collect::<ClientResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let (items, next_page) = self.page(&summaries, request.page.as_deref())?;
        Ok(TagPage { items, next_page })
    }
}

impl From<Snapshot> for SnapshotClient {
    fn from(snapshot: Snapshot) -> Self {
        Self::new(snapshot)
    }
}

impl std::str::FromStr for Snapshot {
    type Err = OciDiscoveryError;

    /// Parse a snapshot, trying JSON first and YAML second.
    fn from_str(content: &str) -> Result<Self> {
        Self::from_json(content)
            .or_else(|_| Self::from_yaml(content))
            .map_err(|e| {
                err!(SnapshotParse {
                    path: "<inline>".into(),
                    message: e,
                })
            })
    }
}
