//! Error handling for the nodepool library
//!
//! The error surface is deliberately narrow: required lookups that miss,
//! positional access past the end of a container, rejected configuration
//! and cursors that outlived the table generation they were taken from or
//! were handed to a map they did not come from.
//! Memory exhaustion is not represented here; it aborts through the global
//! allocator.

use thiserror::Error;

/// Main error type for the nodepool library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodePoolError {
    /// A required lookup (`at`, `at_mut`) did not find its key
    #[error("Not found: {what}")]
    NotFound {
        /// Description of what was looked up
        what: String,
    },

    /// Index out of bounds access
    #[error("Out of bounds: index {index}, size {size}")]
    OutOfBounds {
        /// The invalid index
        index: usize,
        /// The valid size/length
        size: usize,
    },

    /// Configuration or parameter errors
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the rejected parameter
        message: String,
    },

    /// A cursor was used after the table it points into changed shape
    #[error("Stale cursor: taken at generation {cursor}, map is at generation {current}")]
    StaleCursor {
        /// Generation recorded in the cursor
        cursor: u64,
        /// Current generation of the map
        current: u64,
    },

    /// A cursor taken from one map was handed to another
    #[error("Foreign cursor: taken from map {cursor_map}, used on map {map}")]
    ForeignCursor {
        /// Identity of the map the cursor was taken from
        cursor_map: u64,
        /// Identity of the map it was used on
        map: u64,
    },
}

impl NodePoolError {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, size: usize) -> Self {
        Self::OutOfBounds { index, size }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a stale cursor error
    pub fn stale_cursor(cursor: u64, current: u64) -> Self {
        Self::StaleCursor { cursor, current }
    }

    /// Create a foreign cursor error
    pub fn foreign_cursor(cursor_map: u64, map: u64) -> Self {
        Self::ForeignCursor { cursor_map, map }
    }

    /// Check if this is a recoverable error
    ///
    /// A miss or a stale cursor can be retried with a fresh lookup; bad
    /// indices and bad parameters are programming errors.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::StaleCursor { .. } => true,
            Self::OutOfBounds { .. } => false,
            Self::InvalidParameter { .. } => false,
            Self::ForeignCursor { .. } => false,
        }
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "lookup",
            Self::OutOfBounds { .. } => "bounds",
            Self::InvalidParameter { .. } => "config",
            Self::StaleCursor { .. } => "cursor",
            Self::ForeignCursor { .. } => "cursor",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NodePoolError>;

/// Assert that an index is within bounds
#[inline]
pub fn check_bounds(index: usize, size: usize) -> Result<()> {
    if index >= size {
        Err(NodePoolError::out_of_bounds(index, size))
    } else {
        Ok(())
    }
}
