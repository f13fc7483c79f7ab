//! Object identity: the unique name of a simulation object and a cheap
//! handle pairing that name with its type's class-level metadata.

use std::sync::Arc;

use super::registration::{ClassPriority, TypeInfo};

/// The unique name of a simulation object within one engine.
///
/// Names double as the final tie-break of the event order, so they are
/// compared as strings. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(Arc<str>);

impl ObjectId {
    #[inline]
    pub fn new(name: &str) -> Self {
        ObjectId(Arc::from(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(name: &str) -> Self {
        ObjectId::new(name)
    }
}

impl From<String> for ObjectId {
    fn from(name: String) -> Self {
        ObjectId(Arc::from(name))
    }
}

impl From<&ObjectId> for ObjectId {
    fn from(id: &ObjectId) -> Self {
        id.clone()
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to a registered simulation object as seen by events: its
/// name plus the metadata of its type.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    id: ObjectId,
    info: Arc<TypeInfo>,
}

impl ObjectHandle {
    pub(crate) fn new(id: ObjectId, info: Arc<TypeInfo>) -> Self {
        ObjectHandle { id, info }
    }

    #[inline]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    #[inline]
    pub fn info(&self) -> &Arc<TypeInfo> {
        &self.info
    }

    #[inline]
    pub fn class_priority(&self) -> ClassPriority {
        self.info.class_priority()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.info.type_name()
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.info.type_name(), self.id)
    }
}
