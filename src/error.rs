use thiserror::Error;

use crate::provider::PlatformError;

/// Classified geolocation failures. The `Display` text of each kind is the
/// user-facing message; the raw platform message travels separately on
/// [`GeolocationError`] for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationErrorKind {
    #[error("Location permission was denied. Allow location access to see nearby resources.")]
    PermissionDenied,
    #[error("Your position could not be determined.")]
    PositionUnavailable,
    #[error("Timed out waiting for a location fix.")]
    Timeout,
    #[error("Location services are not available on this device.")]
    Unsupported,
    #[error("Unexpected error while locating you.")]
    Unknown,
}

#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct GeolocationError {
    kind: GeolocationErrorKind,
    raw_message: String,
}

impl GeolocationError {
    pub fn new(kind: GeolocationErrorKind, raw_message: impl Into<String>) -> Self {
        Self { kind, raw_message: raw_message.into() }
    }

    /// Maps the device API's numeric error codes (1 permission denied,
    /// 2 position unavailable, 3 timeout) onto the typed taxonomy.
    pub fn from_platform(err: &PlatformError) -> Self {
        let kind = match err.code {
            1 => GeolocationErrorKind::PermissionDenied,
            2 => GeolocationErrorKind::PositionUnavailable,
            3 => GeolocationErrorKind::Timeout,
            _ => GeolocationErrorKind::Unknown,
        };
        Self::new(kind, err.message.clone())
    }

    pub fn kind(&self) -> GeolocationErrorKind {
        self.kind
    }

    /// The platform's own message, kept verbatim for diagnostics.
    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    pub fn user_message(&self) -> String {
        self.kind.to_string()
    }

    /// Terminal for the current attempt: the caller should fall back to the
    /// default coordinate instead of retrying at lower accuracy.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            GeolocationErrorKind::PermissionDenied | GeolocationErrorKind::Unsupported
        )
    }
}
