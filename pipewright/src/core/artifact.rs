//! Artifact handles passed between pipeline stages.

use crate::utils::generate_uuid;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// An opaque token for a named output produced by exactly one stage.
///
/// Handles are allocated by the producing stage's constructor and passed
/// by reference to consumers; cloning shares identity, so the handle a
/// consumer holds is reference-identical to the producer's. Consumers
/// address contents only through [`ArtifactHandle::at_path`], never by
/// raw storage location.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    inner: Arc<ArtifactInner>,
}

#[derive(Debug)]
struct ArtifactInner {
    id: String,
    name: String,
    producer: String,
}

impl ArtifactHandle {
    /// Allocates a fresh handle. Only stage constructors mint handles.
    pub(crate) fn new(producer: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ArtifactInner {
                id: generate_uuid().to_string(),
                name: name.into(),
                producer: producer.into(),
            }),
        }
    }

    /// Returns the unique artifact id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Returns the logical artifact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the name of the stage that produced this artifact.
    #[must_use]
    pub fn producer(&self) -> &str {
        &self.inner.producer
    }

    /// Returns a path to a file inside this artifact.
    #[must_use]
    pub fn at_path(&self, path: impl Into<String>) -> ArtifactPath {
        ArtifactPath {
            artifact: self.clone(),
            path: path.into(),
        }
    }

    /// Returns true if both handles refer to the same allocation.
    #[must_use]
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ArtifactHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ArtifactHandle {}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}

impl Serialize for ArtifactHandle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ArtifactHandle", 3)?;
        state.serialize_field("id", &self.inner.id)?;
        state.serialize_field("name", &self.inner.name)?;
        state.serialize_field("producer", &self.inner.producer)?;
        state.end()
    }
}

/// A relative path inside an artifact.
///
/// This is the only way consumers reference artifact contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPath {
    /// The artifact the path points into.
    pub artifact: ArtifactHandle,
    /// Relative path within the artifact.
    pub path: String,
}

impl ArtifactPath {
    /// Returns a `artifact-name::path` location string.
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}::{}", self.artifact.name(), self.path)
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location())
    }
}
