//! Store configuration

use serde::{Deserialize, Serialize};

/// What synthesis does when a named member lands on a key that is already
/// generated in the same category, or a constant would point at two keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Fail synthesis with [`SynthError`](crate::SynthError)
    #[default]
    Reject,
    /// Keep the later entry and log a warning
    Overwrite,
}

/// Configuration for a [`Store`](crate::Store)
///
/// # Example
///
/// ```
/// use modstore_core::{CollisionPolicy, StoreConfig};
///
/// let config = StoreConfig::from_json(r#"{ "strict": false }"#).unwrap();
/// assert!(!config.strict);
/// assert_eq!(config.collisions, CollisionPolicy::Reject);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Unknown mutation/action names are errors instead of logged no-ops
    pub strict: bool,
    /// Collision handling during synthesis
    pub collisions: CollisionPolicy,
    /// Buffered mutation events per subscriber before it lags, clamped to
    /// `1..=MAX_EVENT_CAPACITY`
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strict: true,
            collisions: CollisionPolicy::Reject,
            event_capacity: 256,
        }
    }
}

impl StoreConfig {
    /// Non-strict config: unknown names are logged and ignored
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Default::default()
        }
    }

    /// Set the collision policy
    pub fn with_collisions(mut self, collisions: CollisionPolicy) -> Self {
        self.collisions = collisions;
        self
    }

    /// Set the subscriber buffer size
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
