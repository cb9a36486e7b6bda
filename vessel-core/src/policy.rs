//! Position reconciliation policy
//!
//! Chooses one position out of up to three candidates:
//! - a live stream fix always wins when valid
//! - a bounding-box fix replaces a missing or stale primary
//! - a more precise bounding-box fix replaces a primary that is not fresh
//! - otherwise the primary stands

use serde::{Deserialize, Serialize};

use crate::{PositionCandidate, SourceName, DEFAULT_FRESHNESS_FLOOR, DEFAULT_STALENESS_THRESHOLD};

/// Tunable thresholds for source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Primary age (minutes) above which any bounding-box fix is preferred
    pub staleness_threshold_minutes: u32,
    /// Primary age (minutes) at or below which precision never overrides it
    pub freshness_floor_minutes: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_minutes: DEFAULT_STALENESS_THRESHOLD,
            freshness_floor_minutes: DEFAULT_FRESHNESS_FLOOR,
        }
    }
}

/// The candidates gathered for a single lookup
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub primary: Option<PositionCandidate>,
    pub secondary: Option<PositionCandidate>,
    pub tertiary: Option<PositionCandidate>,
}

impl Candidates {
    /// Place a candidate into the slot named by its source
    pub fn insert(&mut self, candidate: PositionCandidate) {
        let slot = match candidate.source {
            SourceName::Primary => &mut self.primary,
            SourceName::Secondary => &mut self.secondary,
            SourceName::Tertiary => &mut self.tertiary,
            SourceName::None => return,
        };
        if slot.is_none() {
            *slot = Some(candidate);
        }
    }
}

/// Why a candidate won
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    LiveFeed,
    PrimaryStale,
    MorePrecise,
    Primary,
}

/// The position chosen for a lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_over_ground: Option<f64>,
    pub course_over_ground: Option<f64>,
    pub source: SourceName,
    pub reported_at: Option<String>,
    pub selection: Selection,
}

impl MergedPosition {
    /// Build from the winner; motion the winner omits falls back to the primary's
    fn from_winner(
        winner: &PositionCandidate,
        primary: Option<&PositionCandidate>,
        selection: Selection,
    ) -> Self {
        Self {
            latitude: winner.latitude,
            longitude: winner.longitude,
            speed_over_ground: winner
                .speed_over_ground
                .or_else(|| primary.and_then(|p| p.speed_over_ground)),
            course_over_ground: winner
                .course_over_ground
                .or_else(|| primary.and_then(|p| p.course_over_ground)),
            source: winner.source,
            reported_at: winner.reported_at.clone(),
            selection,
        }
    }
}

/// Select the position to report, or `None` when no candidate is usable
pub fn reconcile(candidates: &Candidates, config: &PolicyConfig) -> Option<MergedPosition> {
    // Motion fallback uses the primary even when its coordinates are unusable
    let primary_any = candidates.primary.as_ref();
    let primary = primary_any.filter(|c| c.is_valid());
    let secondary = candidates.secondary.as_ref().filter(|c| c.is_valid());
    let tertiary = candidates.tertiary.as_ref().filter(|c| c.is_valid());

    if let Some(live) = tertiary {
        return Some(MergedPosition::from_winner(live, primary_any, Selection::LiveFeed));
    }

    if let Some(bbox) = secondary {
        match primary {
            None => {
                return Some(MergedPosition::from_winner(
                    bbox,
                    primary_any,
                    Selection::PrimaryStale,
                ));
            }
            Some(p) if p.observed_age_minutes > config.staleness_threshold_minutes => {
                return Some(MergedPosition::from_winner(
                    bbox,
                    primary_any,
                    Selection::PrimaryStale,
                ));
            }
            Some(p)
                if bbox.precision() > p.precision()
                    && p.observed_age_minutes > config.freshness_floor_minutes =>
            {
                return Some(MergedPosition::from_winner(bbox, primary_any, Selection::MorePrecise));
            }
            Some(_) => {}
        }
    }

    primary.map(|p| MergedPosition::from_winner(p, primary_any, Selection::Primary))
}
