//! Standard places response (SPR): a flat summary of a WOF record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::FeatureError, feature::WofFeature};

const DATA_URI_ROOT: &str = "https://data.whosonfirst.org/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardPlacesResponse {
    #[serde(rename = "wof:id")]
    pub id: i64,
    #[serde(rename = "wof:parent_id")]
    pub parent_id: i64,
    #[serde(rename = "wof:name")]
    pub name: String,
    #[serde(rename = "wof:placetype")]
    pub placetype: String,
    #[serde(rename = "wof:country")]
    pub country: String,
    #[serde(rename = "wof:repo")]
    pub repo: String,
    #[serde(rename = "wof:path")]
    pub path: String,
    #[serde(rename = "wof:superseded_by")]
    pub superseded_by: Vec<i64>,
    #[serde(rename = "wof:supersedes")]
    pub supersedes: Vec<i64>,
    #[serde(rename = "mz:uri")]
    pub uri: String,
    #[serde(rename = "mz:latitude")]
    pub latitude: f64,
    #[serde(rename = "mz:longitude")]
    pub longitude: f64,
    #[serde(rename = "mz:min_latitude")]
    pub min_latitude: f64,
    #[serde(rename = "mz:min_longitude")]
    pub min_longitude: f64,
    #[serde(rename = "mz:max_latitude")]
    pub max_latitude: f64,
    #[serde(rename = "mz:max_longitude")]
    pub max_longitude: f64,
    #[serde(rename = "mz:is_current")]
    pub is_current: i64,
    #[serde(rename = "mz:is_ceased")]
    pub is_ceased: i64,
    #[serde(rename = "mz:is_deprecated")]
    pub is_deprecated: i64,
    #[serde(rename = "mz:is_superseded")]
    pub is_superseded: i64,
    #[serde(rename = "mz:is_superseding")]
    pub is_superseding: i64,
    #[serde(rename = "wof:lastmodified")]
    pub last_modified: i64,
}

impl StandardPlacesResponse {
    pub fn from_feature(feature: &WofFeature) -> Result<Self, FeatureError> {
        let id = feature.id().ok_or(FeatureError::InvalidProperty("wof:id"))?;

        let string_prop = |key: &str| {
            feature
                .property(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let int_prop = |key: &str, default: i64| {
            feature
                .property(key)
                .and_then(Value::as_i64)
                .unwrap_or(default)
        };
        let ids_prop = |key: &str| -> Vec<i64> {
            feature
                .property(key)
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default()
        };

        let (latitude, longitude) = centroid(feature);
        let [min_longitude, min_latitude, max_longitude, max_latitude] =
            bbox(feature).unwrap_or([longitude, latitude, longitude, latitude]);

        let superseded_by = ids_prop("wof:superseded_by");
        let supersedes = ids_prop("wof:supersedes");
        let path = id_to_path(id);

        Ok(Self {
            id,
            parent_id: int_prop("wof:parent_id", -1),
            name: string_prop("wof:name"),
            placetype: string_prop("wof:placetype"),
            country: string_prop("wof:country"),
            repo: string_prop("wof:repo"),
            uri: format!("{DATA_URI_ROOT}{path}"),
            path,
            is_superseded: i64::from(!superseded_by.is_empty()),
            is_superseding: i64::from(!supersedes.is_empty()),
            superseded_by,
            supersedes,
            latitude,
            longitude,
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
            is_current: int_prop("mz:is_current", -1),
            is_ceased: i64::from(edtf_is_set(feature.property("edtf:cessation"))),
            is_deprecated: i64::from(edtf_is_set(feature.property("edtf:deprecated"))),
            last_modified: int_prop("wof:lastmodified", 0),
        })
    }
}

/// `101736545` -> `101/736/545/101736545.geojson`
pub fn id_to_path(id: i64) -> String {
    let digits = id.to_string();
    let mut parts: Vec<&str> = Vec::new();
    let mut rest = digits.as_str();
    while rest.len() > 3 {
        let (head, tail) = rest.split_at(3);
        parts.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        parts.push(rest);
    }
    format!("{}/{}.geojson", parts.join("/"), digits)
}

fn centroid(feature: &WofFeature) -> (f64, f64) {
    let coord = |key: &str| feature.property(key).and_then(Value::as_f64);
    match (coord("lbl:latitude"), coord("lbl:longitude")) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => (
            coord("geom:latitude").unwrap_or_default(),
            coord("geom:longitude").unwrap_or_default(),
        ),
    }
}

/// Returns `[minx, miny, maxx, maxy]` from `geom:bbox` or the top-level bbox.
fn bbox(feature: &WofFeature) -> Option<[f64; 4]> {
    if let Some(s) = feature.property("geom:bbox").and_then(Value::as_str) {
        let values: Vec<f64> = s
            .split(',')
            .filter_map(|v| v.trim().parse().ok())
            .collect();
        if let Ok(b) = <[f64; 4]>::try_from(values) {
            return Some(b);
        }
    }

    let values: Vec<f64> = feature
        .bbox()?
        .as_array()?
        .iter()
        .filter_map(Value::as_f64)
        .collect();
    <[f64; 4]>::try_from(values).ok()
}

/// EDTF "unknown" markers count as unset.
fn edtf_is_set(value: Option<&Value>) -> bool {
    match value.and_then(Value::as_str) {
        Some(s) => !matches!(s, "" | "u" | "uuuu"),
        None => false,
    }
}
