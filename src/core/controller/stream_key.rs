use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::YAML_STREAM_SUFFIX;
use crate::Error;
use crate::Result;
use crate::StreamError;

/// Connection + cluster pair a controller is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterRef {
    /// Connection (kubeconfig) identifier
    pub config: String,
    pub cluster: String,
}

impl ClusterRef {
    pub fn new(
        config: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            config: config.into(),
            cluster: cluster.into(),
        }
    }

    /// `config-cluster`
    pub fn key_prefix(&self) -> String {
        format!("{}-{}", self.config, self.cluster)
    }

    /// Idempotency flag key: `config-cluster-cacheKey`
    pub fn idempotency_key(
        &self,
        controller_cache_key: &str,
    ) -> String {
        format!("{}-{}", self.key_prefix(), controller_cache_key)
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.config, self.cluster)
    }
}

/// Identity of a publishable channel
///
/// Item keys derive from an object's namespace and name, so renaming an
/// object yields a new key and the old one simply stops receiving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey(String);

impl StreamKey {
    /// Collection stream: `config-cluster-kind`
    pub fn collection(
        cluster: &ClusterRef,
        kind: &str,
    ) -> Self {
        Self(format!("{}-{}", cluster.key_prefix(), kind))
    }

    /// Item detail stream: `namespace-name`
    pub fn detail(
        namespace: &str,
        name: &str,
    ) -> Self {
        Self(format!("{}-{}", namespace, name))
    }

    /// Item manifest stream: `namespace-name-yaml`
    pub fn yaml(
        namespace: &str,
        name: &str,
    ) -> Self {
        Self(format!("{}-{}-{}", namespace, name, YAML_STREAM_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StreamKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StreamKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for StreamKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Representation a subscriber asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteType {
    List,
    Details,
    Yaml,
}

impl RouteType {
    /// Key of the stream serving this route.
    ///
    /// Item routes need `namespace` (empty for cluster-scoped kinds) and
    /// `name`.
    pub fn stream_key(
        &self,
        cluster: &ClusterRef,
        kind: &str,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Result<StreamKey> {
        match self {
            RouteType::List => Ok(StreamKey::collection(cluster, kind)),
            RouteType::Details | RouteType::Yaml => {
                let name = name
                    .filter(|n| !n.is_empty())
                    .ok_or(StreamError::MissingParameter("name"))?;
                let namespace = namespace.unwrap_or_default();
                Ok(match self {
                    RouteType::Yaml => StreamKey::yaml(namespace, name),
                    _ => StreamKey::detail(namespace, name),
                })
            }
        }
    }
}

impl FromStr for RouteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "list" => Ok(RouteType::List),
            "details" => Ok(RouteType::Details),
            "yaml" => Ok(RouteType::Yaml),
            other => Err(StreamError::UnknownRoute(other.to_string()).into()),
        }
    }
}
