//! Stop identifiers and records shared by the map and operator sides.

use std::fmt;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::config::{GROUP_REF_LEN, MISSING_REF, STOP_REF_LEN};

/// Display name of a stop, e.g. `"Marszałkowska 01"`.
pub type StopName = String;

/// Route reference code shared across variants of the same line.
pub type RouteRef = String;

/// Opaque stop identifier: a four-character group code plus a two-character
/// post number, or the missing sentinel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopRef(String);

impl StopRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The "no identifier known" sentinel.
    pub fn missing() -> Self {
        Self(MISSING_REF.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_missing(&self) -> bool {
        self.0 == MISSING_REF
    }

    /// Whether the identifier has the expected six-character shape.
    pub fn is_well_formed(&self) -> bool {
        self.0.chars().count() == STOP_REF_LEN
    }

    /// The stop-group part of the identifier, `None` for the sentinel and
    /// other short values.
    pub fn group_code(&self) -> Option<&str> {
        self.0.get(..GROUP_REF_LEN)
    }
}

impl fmt::Display for StopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StopRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StopRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One observed stop: identifier plus display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StopRecord {
    pub stop_ref: StopRef,
    pub name: StopName,
}

impl StopRecord {
    pub fn new(stop_ref: impl Into<StopRef>, name: impl Into<StopName>) -> Self {
        Self {
            stop_ref: stop_ref.into(),
            name: name.into(),
        }
    }
}

/// A stop with a known geographic location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocatedStop {
    pub stop_ref: StopRef,
    pub name: StopName,
    pub lat: f64,
    pub lon: f64,
}

impl LocatedStop {
    pub fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}
