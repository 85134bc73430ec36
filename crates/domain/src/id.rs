//! Device identifiers.
//!
//! Devices are identified by the opaque string their firmware reports
//! (`METER-001`, `EV-42`, …). The same id space is used independently for
//! meters and vehicles; a meter and a vehicle may share an id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest accepted device id, in characters.
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// Identifier of a meter or a vehicle charger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap a raw device id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDeviceId`] for blank input and
    /// [`ValidationError::DeviceIdTooLong`] past [`MAX_DEVICE_ID_LEN`].
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyDeviceId);
        }
        if raw.chars().count() > MAX_DEVICE_ID_LEN {
            return Err(ValidationError::DeviceIdTooLong {
                max: MAX_DEVICE_ID_LEN,
            });
        }
        Ok(Self(raw))
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_regular_device_id() {
        let id = DeviceId::new("METER-001").unwrap();
        assert_eq!(id.as_str(), "METER-001");
        assert_eq!(id.to_string(), "METER-001");
    }

    #[test]
    fn should_reject_blank_device_id() {
        assert_eq!(DeviceId::new("   "), Err(ValidationError::EmptyDeviceId));
        assert_eq!(DeviceId::new(""), Err(ValidationError::EmptyDeviceId));
    }

    #[test]
    fn should_reject_device_id_longer_than_limit() {
        let raw = "x".repeat(MAX_DEVICE_ID_LEN + 1);
        assert!(matches!(
            DeviceId::new(raw),
            Err(ValidationError::DeviceIdTooLong { .. })
        ));
    }

    #[test]
    fn should_deserialize_as_plain_string() {
        let id: DeviceId = serde_json::from_str("\"EV-42\"").unwrap();
        assert_eq!(id.as_str(), "EV-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"EV-42\"");
    }

    #[test]
    fn should_fail_deserialization_for_empty_string() {
        let result: Result<DeviceId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
