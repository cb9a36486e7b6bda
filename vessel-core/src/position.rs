//! Position candidates and geographic helpers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which source slot produced a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    /// Vessel detail page scrape
    Primary,
    /// Bounding-box nearby-vessels query
    Secondary,
    /// Real-time position stream
    Tertiary,
    /// No usable position
    #[default]
    None,
}

impl SourceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Primary => "primary",
            SourceName::Secondary => "secondary",
            SourceName::Tertiary => "tertiary",
            SourceName::None => "none",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position reported by a single source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionCandidate {
    pub latitude: f64,
    pub longitude: f64,
    /// Speed over ground (knots)
    pub speed_over_ground: Option<f64>,
    /// Course over ground (degrees)
    pub course_over_ground: Option<f64>,
    /// Minutes since the source observed this fix
    pub observed_age_minutes: u32,
    pub source: SourceName,
    /// The source's own timestamp text, if it reports one
    pub reported_at: Option<String>,
}

impl PositionCandidate {
    pub fn new(source: SourceName, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            speed_over_ground: None,
            course_over_ground: None,
            observed_age_minutes: crate::STALE_AGE_MINUTES,
            source,
            reported_at: None,
        }
    }

    pub fn with_motion(mut self, sog: Option<f64>, cog: Option<f64>) -> Self {
        self.speed_over_ground = sog;
        self.course_over_ground = cog;
        self
    }

    pub fn with_age(mut self, minutes: u32) -> Self {
        self.observed_age_minutes = minutes;
        self
    }

    pub fn reported_at(mut self, timestamp: impl Into<String>) -> Self {
        self.reported_at = Some(timestamp.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        is_valid_coordinates(self.latitude, self.longitude)
    }

    /// Significant decimal digits across both coordinates
    pub fn precision(&self) -> usize {
        count_decimals(self.latitude) + count_decimals(self.longitude)
    }
}

/// Latitude in [-90, 90] and longitude in [-180, 180]
pub fn is_valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Count decimal places of a value's shortest textual form, ignoring trailing zeros
pub fn count_decimals(value: f64) -> usize {
    let text = value.to_string();
    match text.split_once('.') {
        Some((_, fraction)) => fraction.trim_end_matches('0').len(),
        None => 0,
    }
}

/// Rectangular latitude/longitude window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Square window of `pad` degrees around a point, clamped to valid ranges
    pub fn around(latitude: f64, longitude: f64, pad: f64) -> Self {
        Self {
            min_lat: (latitude - pad).max(-90.0),
            max_lat: (latitude + pad).min(90.0),
            min_lon: (longitude - pad).max(-180.0),
            max_lon: (longitude + pad).min(180.0),
        }
    }

    pub fn globe() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lon..=self.max_lon).contains(&longitude)
    }

    /// Corner pairs `[[lat, lon], [lat, lon]]` as used by stream subscriptions
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.min_lat, self.min_lon], [self.max_lat, self.max_lon]]
    }
}
