use bytes::Bytes;
use serde::Serialize;

use crate::Projection;
use crate::ProjectionError;
use crate::Resource;
use crate::Result;

/// Minimal tracked object for replica and controller tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResource {
    pub namespace: String,
    pub name: String,
    pub revision: u64,
}

impl TestResource {
    pub fn new(
        namespace: &str,
        name: &str,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            revision: 1,
        }
    }

    pub fn with_revision(
        mut self,
        revision: u64,
    ) -> Self {
        self.revision = revision;
        self
    }
}

impl Resource for TestResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Projection whose every render fails
pub struct FailingProjection;

impl Projection<TestResource> for FailingProjection {
    fn render_list(
        &self,
        _items: &[TestResource],
    ) -> Result<Bytes> {
        Err(ProjectionError::Transform("list rejected".to_string()).into())
    }

    fn render_detail(
        &self,
        _item: Option<&TestResource>,
    ) -> Result<Bytes> {
        Err(ProjectionError::Transform("detail rejected".to_string()).into())
    }

    fn render_yaml(
        &self,
        _item: Option<&TestResource>,
    ) -> Result<Bytes> {
        Err(ProjectionError::Transform("yaml rejected".to_string()).into())
    }
}

/// Decodes a JSON list payload into `(namespace, name, revision)` triples
pub fn decode_list(payload: &Bytes) -> Vec<(String, String, u64)> {
    let value: serde_json::Value = serde_json::from_slice(payload).expect("list payload is JSON");
    value
        .as_array()
        .expect("list payload is an array")
        .iter()
        .map(|item| {
            (
                item["namespace"].as_str().unwrap_or_default().to_string(),
                item["name"].as_str().unwrap_or_default().to_string(),
                item["revision"].as_u64().unwrap_or_default(),
            )
        })
        .collect()
}
