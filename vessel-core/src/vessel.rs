//! Vessel identity and the merged lookup report

use serde::{Deserialize, Serialize};

use crate::{Imo, MergedPosition, SourceName};

/// Identity and static particulars scraped for one vessel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    pub imo: Imo,
    pub name: String,
    pub mmsi: Option<String>,
    pub flag: Option<String>,
    pub ship_type: String,
    pub destination: String,
    pub draught: String,
    pub deadweight: Option<String>,
    pub gross_tonnage: Option<String>,
    pub year_built: Option<String>,
    pub length_overall: Option<String>,
    pub beam: Option<String>,
}

impl VesselRecord {
    /// A record with only the identifier known
    pub fn placeholder(imo: Imo) -> Self {
        let name = format!("IMO {imo}");
        Self {
            imo,
            name,
            mmsi: None,
            flag: None,
            ship_type: String::new(),
            destination: String::new(),
            draught: String::new(),
            deadweight: None,
            gross_tonnage: None,
            year_built: None,
            length_overall: None,
            beam: None,
        }
    }
}

/// JSON body returned by the vessel lookup endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselReport {
    pub found: bool,
    pub imo: String,
    pub vessel_name: Option<String>,
    pub mmsi: Option<String>,
    pub ship_type: Option<String>,
    pub flag: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub sog: Option<f64>,
    pub cog: Option<f64>,
    pub destination: Option<String>,
    pub last_pos_utc: Option<String>,
    pub ais_source: SourceName,
    pub draught_m: Option<String>,
    pub deadweight_t: Option<String>,
    pub gross_tonnage: Option<String>,
    pub year_of_build: Option<String>,
    pub length_overall_m: Option<String>,
    pub beam_m: Option<String>,
    pub error: Option<String>,
}

impl VesselReport {
    /// Merge a scraped record with the reconciled position.
    ///
    /// `last_pos_utc` is the primary page's timestamp; a winning source that
    /// reports its own timestamp replaces it. With no position every
    /// position field is empty and `ais_source` is `none`.
    pub fn found(
        record: VesselRecord,
        position: Option<MergedPosition>,
        last_pos_utc: Option<String>,
    ) -> Self {
        let (lat, lon, sog, cog, source, last_pos_utc) = match position {
            Some(p) => (
                Some(p.latitude),
                Some(p.longitude),
                p.speed_over_ground,
                p.course_over_ground,
                p.source,
                p.reported_at.or(last_pos_utc),
            ),
            None => (None, None, None, None, SourceName::None, last_pos_utc),
        };

        Self {
            found: true,
            imo: record.imo.to_string(),
            vessel_name: Some(record.name),
            mmsi: record.mmsi,
            ship_type: Some(record.ship_type),
            flag: record.flag,
            lat,
            lon,
            sog,
            cog,
            destination: Some(record.destination),
            last_pos_utc,
            ais_source: source,
            draught_m: Some(record.draught),
            deadweight_t: record.deadweight,
            gross_tonnage: record.gross_tonnage,
            year_of_build: record.year_built,
            length_overall_m: record.length_overall,
            beam_m: record.beam,
            error: None,
        }
    }

    /// A `found: false` body carrying an error message
    pub fn not_found(imo: &str, error: impl Into<String>) -> Self {
        Self {
            found: false,
            imo: imo.to_string(),
            vessel_name: None,
            mmsi: None,
            ship_type: None,
            flag: None,
            lat: None,
            lon: None,
            sog: None,
            cog: None,
            destination: None,
            last_pos_utc: None,
            ais_source: SourceName::None,
            draught_m: None,
            deadweight_t: None,
            gross_tonnage: None,
            year_of_build: None,
            length_overall_m: None,
            beam_m: None,
            error: Some(error.into()),
        }
    }

    pub fn has_position(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Selection;

    fn record() -> VesselRecord {
        let mut record = VesselRecord::placeholder(Imo::parse("9074729").unwrap());
        record.name = "EVER GIVEN".to_string();
        record.mmsi = Some("353136000".to_string());
        record
    }

    #[test]
    fn test_report_without_position_keeps_identity() {
        let report = VesselReport::found(record(), None, Some("5 min ago".to_string()));
        assert!(report.found);
        assert!(!report.has_position());
        assert_eq!(report.ais_source, SourceName::None);
        assert_eq!(report.vessel_name.as_deref(), Some("EVER GIVEN"));
        assert_eq!(report.mmsi.as_deref(), Some("353136000"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ais_source"], "none");
        assert!(json["lat"].is_null());
    }

    #[test]
    fn test_report_uses_winner_timestamp() {
        let merged = MergedPosition {
            latitude: 30.0,
            longitude: 32.5,
            speed_over_ground: Some(11.0),
            course_over_ground: None,
            source: SourceName::Tertiary,
            reported_at: Some("2026-10-14 09:00:00 +0000 UTC".to_string()),
            selection: Selection::LiveFeed,
        };
        let report = VesselReport::found(record(), Some(merged), Some("2 hours ago".to_string()));
        assert_eq!(report.lat, Some(30.0));
        assert_eq!(report.ais_source, SourceName::Tertiary);
        assert_eq!(report.last_pos_utc.as_deref(), Some("2026-10-14 09:00:00 +0000 UTC"));
    }

    #[test]
    fn test_not_found_body() {
        let report = VesselReport::not_found("9074729", "Vessel not found");
        assert!(!report.found);
        assert_eq!(report.error.as_deref(), Some("Vessel not found"));
    }

    #[test]
    fn test_placeholder_name() {
        let record = VesselRecord::placeholder(Imo::parse("9074729").unwrap());
        assert_eq!(record.name, "IMO 9074729");
    }
}
