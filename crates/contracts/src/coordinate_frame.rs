//! CoordinateFrame - Cheap-to-clone handle to a world coordinate system
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Handle to the coordinate system that poses are resolved against.
///
/// The streamer never interprets the handle; it only passes it back to the
/// pose service with every query. Cloning only increments a reference count.
///
/// # Examples
/// ```
/// use contracts::CoordinateFrame;
///
/// let world: CoordinateFrame = "world".into();
/// let same = world.clone();
/// assert_eq!(world, same);
/// assert_eq!(world.name(), "world");
/// ```
#[derive(Clone)]
pub struct CoordinateFrame(Arc<str>);

impl CoordinateFrame {
    /// Create a new frame handle from its name.
    #[inline]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Name the pose service knows this frame by.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CoordinateFrame {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for CoordinateFrame {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoordinateFrame({:?})", self.0)
    }
}

impl PartialEq for CoordinateFrame {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for CoordinateFrame {}

impl PartialEq<&str> for CoordinateFrame {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Hash for CoordinateFrame {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for CoordinateFrame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CoordinateFrame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
