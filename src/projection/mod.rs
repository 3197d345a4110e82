//! Projection producers: pure functions turning replica state into the
//! serialized list, detail and YAML payloads published on each stream.

mod serde_projection;
pub use serde_projection::*;


use bytes::Bytes;

use crate::Result;

/// Per-kind rendering rules.
///
/// Implementations must be side-effect free. A failed render skips the
/// publish for that cycle; the next change renders again.
pub trait Projection<R>: Send + Sync + 'static {
    /// Renders a full collection snapshot
    fn render_list(
        &self,
        items: &[R],
    ) -> Result<Bytes>;

    /// Renders one item; `None` when the item no longer exists
    fn render_detail(
        &self,
        item: Option<&R>,
    ) -> Result<Bytes>;

    /// Renders the raw manifest; `None` when the item no longer exists
    fn render_yaml(
        &self,
        item: Option<&R>,
    ) -> Result<Bytes>;
}
