//! Vessel detail page scraper
//!
//! Fetches a vessel's detail page and extracts identity fields, the static
//! particulars tables and the embedded AIS position blob.

use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

use vessel_core::{parse_age_minutes, Imo, PositionCandidate, SourceName, VesselRecord};

use crate::{HttpConfig, NetError};

/// Everything read off one detail page
#[derive(Debug, Clone)]
pub struct VesselPage {
    pub record: VesselRecord,
    /// Position from the embedded blob, aged by `last_pos_utc`
    pub candidate: Option<PositionCandidate>,
    /// Free-text position timestamp shown on the page
    pub last_pos_utc: Option<String>,
}

/// Tables holding label/value rows, merged in this order
const TABLE_CLASSES: &[&str] = &["tpt1", "tptfix", "vessel-info-table", "aparams"];

const LABEL_CLASSES: &[&str] = &["tpc1", "tpx1", "n3"];
const VALUE_CLASSES: &[&str] = &["tpc2", "tpx2", "v3"];

/// Fetch and parse the detail page for an IMO number
pub async fn fetch_vessel_page(
    client: &Client,
    config: &HttpConfig,
    imo: &Imo,
) -> Result<VesselPage, NetError> {
    let url = config.page_url(imo.as_str());
    debug!("Fetching vessel page: {}", url);

    let response = config
        .retry
        .send(|| client.get(&url).timeout(config.page_timeout()))
        .await?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(NetError::NotFound(format!("IMO {imo}")));
    }
    if !status.is_success() {
        warn!("Vessel page {} returned status: {}", url, status);
        return Err(NetError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let html = response.text().await?;
    Ok(parse_vessel_page(&html, imo.clone()))
}

/// Parse a detail page document
pub fn parse_vessel_page(html: &str, imo: Imo) -> VesselPage {
    let document = Html::parse_document(html);

    let mut fields = BTreeMap::new();
    for class in TABLE_CLASSES {
        fields.extend(extract_table(&document, class));
    }

    let last_pos_utc = select_attr(&document, "svg.ttt1.info", "data-title");
    let candidate = extract_position(&document, &imo).map(|c| {
        c.with_age(parse_age_minutes(last_pos_utc.as_deref()))
    });

    let mut record = VesselRecord::placeholder(imo);
    if let Some(name) = select_text(&document, "h1.title").filter(|n| !n.is_empty()) {
        record.name = name;
    }
    record.mmsi = extract_mmsi(&document, &fields);
    record.flag = select_attr(&document, "div.title-flag-icon", "title");
    record.destination = select_text(&document, "div.vi__r1.vi__sbt a._npNa").unwrap_or_default();
    record.ship_type =
        first_field(&fields, &["Ship type", "Type", "Vessel type"]).unwrap_or_default();
    record.draught = first_field(&fields, &["Current draught", "Draught"])
        .or_else(|| draught_from_text(&document))
        .unwrap_or_default();
    record.deadweight = first_field(&fields, &["Deadweight", "DWT"]);
    record.gross_tonnage = first_field(&fields, &["Gross Tonnage"]);
    record.year_built = first_field(&fields, &["Year of Build"]);
    record.length_overall = first_field(&fields, &["Length Overall"]);
    record.beam = first_field(&fields, &["Beam"]);

    VesselPage {
        record,
        candidate,
        last_pos_utc,
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect::<String>()
}

fn select_text(document: &Html, css: &str) -> Option<String> {
    document.select(&selector(css)).next().map(element_text)
}

fn select_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    document
        .select(&selector(css))
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
}

fn has_class_like(el: &ElementRef<'_>, needles: &[&str]) -> bool {
    el.value()
        .classes()
        .any(|class| needles.iter().any(|n| class.contains(n)))
}

/// Label/value pairs from every table carrying `class`
fn extract_table(document: &Html, class: &str) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    let table_selector = selector(&format!(".{class}"));
    let row_selector = selector("tr");

    for table in document.select(&table_selector) {
        for row in table.select(&row_selector) {
            let cells: Vec<ElementRef<'_>> =
                row.descendants().filter_map(ElementRef::wrap).collect();
            let label_el = cells.iter().find(|el| has_class_like(el, LABEL_CLASSES));
            let value_el = cells.iter().find(|el| has_class_like(el, VALUE_CLASSES));

            let (Some(label_el), Some(value_el)) = (label_el, value_el) else {
                continue;
            };

            // Only the label's own text nodes; nested tooltips are skipped
            let label = label_el
                .children()
                .filter_map(|child| match child.value() {
                    Node::Text(text) => Some(text.trim().to_string()),
                    _ => None,
                })
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
                .replace(':', "")
                .trim()
                .to_string();

            if !label.is_empty() {
                data.insert(label, element_text(*value_el));
            }
        }
    }

    data
}

fn first_field(fields: &BTreeMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| fields.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn script_mmsi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"MMSI\s*=\s*(\d+)").expect("static regex"))
}

fn draught_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:draught|draft)\s+(?:of\s+)?(\d+(?:\.\d+)?)\s*m")
            .expect("static regex")
    })
}

/// MMSI from inline scripts, then from the particulars tables
fn extract_mmsi(document: &Html, fields: &BTreeMap<String, String>) -> Option<String> {
    for script in document.select(&selector("script")) {
        let body = script.text().collect::<String>();
        if let Some(caps) = script_mmsi_regex().captures(&body) {
            return Some(caps[1].to_string());
        }
    }

    if let Some(mmsi) = first_field(fields, &["MMSI"]) {
        return Some(mmsi);
    }

    fields
        .iter()
        .filter(|(k, _)| k.to_uppercase().contains("MMSI"))
        .map(|(_, v)| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn draught_from_text(document: &Html) -> Option<String> {
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    draught_regex().captures(&text).map(|caps| format!("{} m", &caps[1]))
}

/// Position blob stored as JSON in `div#djson[data-json]`
fn extract_position(document: &Html, imo: &Imo) -> Option<PositionCandidate> {
    let raw = select_attr(document, "div#djson", "data-json")?;

    let blob: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse position blob for IMO {}: {}", imo, e);
            return None;
        }
    };

    let latitude = json_number(&blob["ship_lat"])?;
    let longitude = json_number(&blob["ship_lon"])?;

    Some(
        PositionCandidate::new(SourceName::Primary, latitude, longitude)
            .with_motion(json_number(&blob["ship_sog"]), json_number(&blob["ship_cog"])),
    )
}

/// Numbers may arrive as JSON numbers or numeric strings
fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
