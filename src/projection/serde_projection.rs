use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use super::Projection;
use crate::Result;

/// Maps a collection snapshot onto the JSON value published for list streams
pub type ListTransform<R> = Arc<dyn Fn(&[R]) -> Result<serde_json::Value> + Send + Sync>;

/// Payload published on a detail stream once its item is gone
pub const MISSING_DETAIL_PAYLOAD: &[u8] = b"{}";

/// Projection built on the objects' own serde representation.
///
/// Lists go through an optional transform (per-kind column shaping), details
/// are plain JSON and manifests are YAML.
pub struct SerdeProjection<R> {
    list_transform: Option<ListTransform<R>>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Default for SerdeProjection<R> {
    fn default() -> Self {
        Self {
            list_transform: None,
            _marker: PhantomData,
        }
    }
}

impl<R> SerdeProjection<R>
where
    R: Serialize + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_transform<F>(
        mut self,
        transform: F,
    ) -> Self
    where
        F: Fn(&[R]) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        self.list_transform = Some(Arc::new(transform));
        self
    }
}

impl<R> Projection<R> for SerdeProjection<R>
where
    R: Serialize + Send + Sync + 'static,
{
    fn render_list(
        &self,
        items: &[R],
    ) -> Result<Bytes> {
        let data = match &self.list_transform {
            Some(transform) => serde_json::to_vec(&transform(items)?)?,
            None => serde_json::to_vec(items)?,
        };
        Ok(Bytes::from(data))
    }

    fn render_detail(
        &self,
        item: Option<&R>,
    ) -> Result<Bytes> {
        match item {
            Some(item) => Ok(Bytes::from(serde_json::to_vec(item)?)),
            None => Ok(Bytes::from_static(MISSING_DETAIL_PAYLOAD)),
        }
    }

    fn render_yaml(
        &self,
        item: Option<&R>,
    ) -> Result<Bytes> {
        match item {
            Some(item) => Ok(Bytes::from(serde_yaml::to_string(item)?)),
            None => Ok(Bytes::new()),
        }
    }
}
