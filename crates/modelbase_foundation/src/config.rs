//! Configuration for the persistence engine.

use crate::identity::MAX_SESSION_ID;
use crate::{Error, Result};

/// Default size up to which binary payloads are embedded in their owner's document.
pub const DEFAULT_INLINE_THRESHOLD: usize = 1_000_000;

/// Default size of one overflow chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Configuration shared by the stores and the entity graph.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Session scope for identifier issuance.
    pub session_id: u16,

    /// Service scope for identifier issuance.
    pub service_id: u16,

    /// Payloads up to this many bytes are stored inline.
    pub inline_threshold: usize,

    /// Size of the chunks an overflowing payload is split into.
    pub chunk_size: usize,

    /// Owning-service tag written for entities that do not set one.
    pub default_owner: String,

    /// Tolerance used when compressing vectors without an explicit one.
    pub default_tolerance: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            session_id: 1,
            service_id: 1,
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_owner: "Model".to_owned(),
            default_tolerance: 0.0,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for tests: tiny threshold and chunks so the
    /// overflow path is exercised with small payloads.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            inline_threshold: 64,
            chunk_size: 16,
            ..Self::default()
        }
    }

    /// Builder method to set the session id.
    #[must_use]
    pub fn with_session_id(mut self, session_id: u16) -> Self {
        self.session_id = session_id;
        self
    }

    /// Builder method to set the service id.
    #[must_use]
    pub fn with_service_id(mut self, service_id: u16) -> Self {
        self.service_id = service_id;
        self
    }

    /// Builder method to set the inline threshold.
    #[must_use]
    pub fn with_inline_threshold(mut self, bytes: usize) -> Self {
        self.inline_threshold = bytes;
        self
    }

    /// Builder method to set the chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Builder method to set the default owner tag.
    #[must_use]
    pub fn with_default_owner(mut self, owner: impl Into<String>) -> Self {
        self.default_owner = owner.into();
        self
    }

    /// Builder method to set the default compression tolerance.
    #[must_use]
    pub fn with_default_tolerance(mut self, tolerance: f64) -> Self {
        self.default_tolerance = tolerance;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation for a zero chunk size, a session id
    /// outside the identifier layout, or a negative or non-finite tolerance.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::precondition("chunk size must be positive"));
        }
        if self.session_id > MAX_SESSION_ID {
            return Err(Error::precondition(format!(
                "session id {} exceeds {MAX_SESSION_ID}",
                self.session_id
            )));
        }
        if !(self.default_tolerance >= 0.0 && self.default_tolerance.is_finite()) {
            return Err(Error::precondition("tolerance must be finite and non-negative"));
        }
        Ok(())
    }
}
