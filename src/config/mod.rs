//! # Configuration Module
//!
//! Runtime tuning knobs for the streaming engine. The engine itself is
//! data-driven: everything an embedding application might want to trade
//! between memory and view distance lives in [`StreamerConfig`], which can be
//! built in code or deserialized from JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a configuration document cannot be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document was malformed or had fields of the wrong type.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tuning parameters for the chunk streaming engine.
///
/// Every field has a sensible default, so partial JSON documents work:
/// unknown fields are rejected, missing fields fall back to
/// [`StreamerConfig::default`].
///
/// # Examples
///
/// ```
/// use voxel_streamer::config::StreamerConfig;
///
/// let config = StreamerConfig::from_json(r#"{ "render_distance": 512.0 }"#).unwrap();
/// assert_eq!(config.render_distance, 512.0);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamerConfig {
    /// Planar distance from the observer, in world units, inside which chunks
    /// are admitted. Admission tests squared distance against the square of
    /// this value.
    pub render_distance: f32,
    /// Ceiling on simultaneously loaded chunks. This bounds the dense
    /// buffer-index space; exceeding it is a configuration error and aborts
    /// chunk creation loudly.
    pub max_active_chunks: usize,
    /// Number of build worker threads. `0` selects half of the available
    /// hardware threads (minimum one); mesh building is background work and
    /// should leave headroom for the render thread.
    pub worker_count: usize,
    /// Capacity of the shared voxel-field cache, in fields. The cache is a
    /// strict bound: inserting over capacity evicts the least recently used
    /// field.
    pub field_cache_capacity: usize,
    /// Maximum number of chunk builds allowed in flight at once. The growth
    /// step dispatches no new creations while this many builds are
    /// outstanding.
    pub build_ceiling: usize,
    /// Initial logical capacity of the shared mesh buffers, in faces. The
    /// region allocator grows this on demand.
    pub initial_buffer_capacity: u64,
    /// Whether buffer regions and indices of destroyed chunks are released
    /// one frame late. Required whenever the embedding renderer reuses last
    /// frame's visibility results (temporal occlusion coherence).
    pub deferred_release: bool,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        StreamerConfig {
            render_distance: 256.0,
            max_active_chunks: 4096,
            worker_count: 0,
            field_cache_capacity: 64,
            build_ceiling: 8,
            initial_buffer_capacity: 1 << 20,
            deferred_release: true,
        }
    }
}

impl StreamerConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// # Arguments
    /// * `json` - The JSON text to parse
    ///
    /// # Returns
    /// The parsed configuration, or [`ConfigError`] if the document is
    /// malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolves the effective worker-thread count.
    ///
    /// A configured value of `0` selects half of the available hardware
    /// threads, and the result is never less than one.
    pub fn effective_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count;
        }
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        (parallelism / 2).max(1)
    }
}
