//! Built-in position sources.

use crate::geo::Position;

use super::{LocateOptions, LocationError, PositionSource};

/// A source that always reports the same, already known position.
///
/// Used when the fix comes from outside the process, e.g. coordinates read
/// off a phone or typed in by the user.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    position: Position,
}

impl FixedPosition {
    /// Create a source reporting `position`.
    #[must_use]
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

#[async_trait::async_trait]
impl PositionSource for FixedPosition {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn current_position(
        &self,
        _options: &LocateOptions,
    ) -> std::result::Result<Position, LocationError> {
        Ok(self.position)
    }
}

/// A source for hosts without any geolocation capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait::async_trait]
impl PositionSource for NoGeolocation {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn current_position(
        &self,
        _options: &LocateOptions,
    ) -> std::result::Result<Position, LocationError> {
        Err(LocationError::unavailable(
            "geolocation is not supported on this platform",
        ))
    }
}
