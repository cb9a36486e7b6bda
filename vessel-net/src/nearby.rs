//! Bounding-box nearby-vessels query
//!
//! Asks the map endpoint for every vessel inside a window and picks out the
//! row matching our MMSI.

use chrono::Datelike;
use reqwest::header::REFERER;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use vessel_core::{BoundingBox, PositionCandidate, SourceName};

use crate::{HttpConfig, NetError};

/// Map filter blob, sent JSON-encoded in the `filters` parameter
#[derive(Debug, Serialize)]
struct MapFilters {
    vtypes: &'static str,
    ports: &'static str,
    minsog: u32,
    maxsog: u32,
    minsz: u32,
    maxsz: u32,
    minyr: i32,
    maxyr: i32,
    status: &'static str,
    mapflt_from: &'static str,
    mapflt_dest: &'static str,
}

impl Default for MapFilters {
    fn default() -> Self {
        Self {
            vtypes: ",0,3,4,6,7,8,9,10,11,12,13",
            ports: "1",
            minsog: 0,
            maxsog: 60,
            minsz: 0,
            maxsz: 500,
            minyr: 1950,
            maxyr: chrono::Utc::now().year(),
            status: "",
            mapflt_from: "",
            mapflt_dest: "",
        }
    }
}

/// Query parameters for a window
fn query_params(window: &BoundingBox) -> Result<Vec<(&'static str, String)>, NetError> {
    let filters = serde_json::to_string(&MapFilters::default())
        .map_err(|e| NetError::Malformed(e.to_string()))?;

    Ok(vec![
        ("type", "json".to_string()),
        ("minlat", window.min_lat.to_string()),
        ("maxlat", window.max_lat.to_string()),
        ("minlon", window.min_lon.to_string()),
        ("maxlon", window.max_lon.to_string()),
        ("zoom", "15".to_string()),
        ("selid", "-1".to_string()),
        ("seltype", "0".to_string()),
        ("timecode", "-1".to_string()),
        ("filters", filters),
    ])
}

/// Look up one vessel inside a window
pub async fn query_nearby(
    client: &Client,
    config: &HttpConfig,
    mmsi: &str,
    window: &BoundingBox,
) -> Result<Option<PositionCandidate>, NetError> {
    let params = query_params(window)?;

    debug!("Querying nearby vessels for MMSI {} in {:?}", mmsi, window);

    let response = client
        .get(&config.nearby_url)
        .query(&params)
        .header(REFERER, &config.nearby_referer)
        .timeout(config.nearby_timeout())
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                NetError::Timeout(config.nearby_timeout_secs)
            } else {
                NetError::Request(e)
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!("Nearby query returned status: {}", status);
        return Err(NetError::Status {
            url: config.nearby_url.clone(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    let candidate = parse_nearby(&body, mmsi)?;

    // The map occasionally lists a stale row from outside the requested window
    Ok(candidate.filter(|c| {
        let inside = window.contains(c.latitude, c.longitude);
        if !inside {
            warn!(
                "Nearby fix ({}, {}) for MMSI {} lies outside the query window",
                c.latitude, c.longitude, mmsi
            );
        }
        inside
    }))
}

/// Parse the line-based listing.
///
/// The first two lines are headers. Each following row is tab separated
/// (whitespace when no tab is present) with MMSI in column 2 and
/// lat, lon, sog, cog in columns 4 to 7.
pub fn parse_nearby(body: &str, mmsi: &str) -> Result<Option<PositionCandidate>, NetError> {
    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < 3 {
        return Ok(None);
    }

    let target = mmsi.trim();

    for line in &lines[2..] {
        let parts: Vec<&str> = if line.contains('\t') {
            line.split('\t').collect()
        } else {
            line.split_whitespace().collect()
        };

        if parts.len() < 7 || parts[2].trim() != target {
            continue;
        }

        let latitude = parse_column(parts[4], "lat")?;
        let longitude = parse_column(parts[5], "lon")?;
        let sog = optional_column(parts.get(6).copied(), "sog")?;
        let cog = optional_column(parts.get(7).copied(), "cog")?;

        return Ok(Some(
            PositionCandidate::new(SourceName::Secondary, latitude, longitude)
                .with_motion(sog, cog),
        ));
    }

    Ok(None)
}

fn parse_column(raw: &str, name: &str) -> Result<f64, NetError> {
    raw.trim()
        .parse()
        .map_err(|_| NetError::Malformed(format!("bad {name} column: {raw:?}")))
}

fn optional_column(raw: Option<&str>, name: &str) -> Result<Option<f64>, NetError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_column(v, name).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = "1\n\
        2026-10-14 09:30\n\
        0\t1\t257000000\tNORDIC\t59.9\t10.7\t3.1\t88\n\
        0\t1\t353136000\tEVER GIVEN\t51.92441\t4.47771\t12.4\t246\n";

    #[test]
    fn test_parse_matching_row() {
        let c = parse_nearby(LISTING, "353136000").unwrap().unwrap();
        assert_eq!(c.source, SourceName::Secondary);
        assert_eq!((c.latitude, c.longitude), (51.92441, 4.47771));
        assert_eq!(c.speed_over_ground, Some(12.4));
        assert_eq!(c.course_over_ground, Some(246.0));
        assert_eq!(c.observed_age_minutes, vessel_core::STALE_AGE_MINUTES);
    }

    #[test]
    fn test_parse_whitespace_rows_without_cog() {
        let body = "h1\nh2\n0 1 353136000 X 1.5 2.5 7\n";
        let c = parse_nearby(body, "353136000").unwrap().unwrap();
        assert_eq!(c.speed_over_ground, Some(7.0));
        assert_eq!(c.course_over_ground, None);
    }

    #[test]
    fn test_parse_no_match_or_short_body() {
        assert!(parse_nearby(LISTING, "111111111").unwrap().is_none());
        assert!(parse_nearby("only\nheaders\n", "353136000").unwrap().is_none());
        assert!(parse_nearby("", "353136000").unwrap().is_none());
    }

    #[test]
    fn test_parse_bad_coordinates() {
        let body = "h1\nh2\n0\t1\t353136000\tX\tnorth\t4.4\t1\t2\n";
        assert!(matches!(parse_nearby(body, "353136000"), Err(NetError::Malformed(_))));
    }

    #[test]
    fn test_query_params_window() {
        let params = query_params(&BoundingBox::around(10.0, 20.0, 1.0)).unwrap();
        let get = |k: &str| params.iter().find(|(n, _)| *n == k).map(|(_, v)| v.clone()).unwrap();
        assert_eq!(get("minlat"), "9");
        assert_eq!(get("maxlon"), "21");
        assert!(get("filters").contains("\"maxsog\":60"));
    }

    #[tokio::test]
    async fn test_query_nearby_against_mock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/map"))
            .and(query_param("type", "json"))
            .and(header("referer", "https://www.myshiptracking.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let config = HttpConfig {
            nearby_url: format!("{}/map", server.uri()),
            ..Default::default()
        };
        let client = crate::build_client(&config).unwrap();
        let window = BoundingBox::around(51.9, 4.5, 0.9);
        let c = query_nearby(&client, &config, "353136000", &window).await.unwrap();
        assert!(c.is_some());
    }

    #[tokio::test]
    async fn test_query_nearby_drops_fix_outside_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/map"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let config = HttpConfig {
            nearby_url: format!("{}/map", server.uri()),
            ..Default::default()
        };
        let client = crate::build_client(&config).unwrap();
        let window = BoundingBox::around(10.0, 20.0, 0.9);
        let c = query_nearby(&client, &config, "353136000", &window).await.unwrap();
        assert!(c.is_none());
    }

    #[tokio::test]
    async fn test_query_nearby_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = HttpConfig {
            nearby_url: format!("{}/map", server.uri()),
            ..Default::default()
        };
        let client = crate::build_client(&config).unwrap();
        let result = query_nearby(&client, &config, "1", &BoundingBox::globe()).await;
        assert!(matches!(result, Err(NetError::Status { status: 500, .. })));
    }
}
