//! Data-quality tag carried by status and history rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quality assessment attached to a stored reading.
///
/// Ingestion always writes [`Valid`](Self::Valid); the other tags are set
/// by later validation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    #[default]
    Valid,
    Anomaly,
    Missing,
}

impl DataQuality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Anomaly => "anomaly",
            Self::Missing => "missing",
        }
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored quality tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data quality tag: {0}")]
pub struct UnknownDataQuality(pub String);

impl FromStr for DataQuality {
    type Err = UnknownDataQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Self::Valid),
            "anomaly" => Ok(Self::Anomaly),
            "missing" => Ok(Self::Missing),
            other => Err(UnknownDataQuality(other.to_string())),
        }
    }
}
