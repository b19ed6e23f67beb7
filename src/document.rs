//! Validated parsing of raw source documents.
//!
//! The upstream source wraps the interesting payload in up to two nested
//! container blocks and mixes numbers, numeric strings, and empty strings
//! freely. Everything the normalizer consumes is pulled out here in a single
//! pass into [`ReachSource`], so every missing-key and wrong-shape error
//! surfaces at this one boundary as [`MalformedSourceDocument`].

use serde_json::Value;

use crate::{geometry::Polyline, warn_document};

const CONTAINER_VIEW_BLOCK: &str = "CContainerViewJSON_view";
const MAIN_GADGET_BLOCK: &str = "CRiverMainGadgetJSON_main";
// The source really does spell it this way.
const GAUGE_SUMMARY_BLOCK: &str = "guagesummary";

#[derive(Debug, thiserror::Error)]
pub enum MalformedSourceDocument {
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("missing required block: {0}")]
    MissingBlock(&'static str),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("type mismatch at {key}: expected {expected}, got {got}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        got: Value,
    },
    #[error("coordinate out of range: ({x}, {y})")]
    CoordinateOutOfRange { x: f64, y: f64 },
    #[error("geometry path has too few vertices: {vertices}")]
    DegeneratePath { vertices: usize },
    #[error("geometry has no coordinates")]
    EmptyGeometry,
    #[error("unknown geometry type: {0}")]
    UnknownGeometryType(String),
}

/// Typed intermediate between the raw nested document and a
/// [`Reach`](crate::reach::Reach). Owns nothing from the raw document.
#[derive(Debug, Clone)]
pub struct ReachSource {
    pub reach_id: i64,
    pub river: Option<String>,
    pub section: Option<String>,
    pub description: Option<String>,
    pub abstract_md: Option<String>,
    pub class: Option<String>,
    pub length_miles: Option<f64>,
    /// Put-in position as (longitude, latitude).
    pub putin: Option<(f64, f64)>,
    /// Take-out position as (longitude, latitude).
    pub takeout: Option<(f64, f64)>,
    pub edited: Option<chrono::NaiveDateTime>,
    pub geometry: Polyline,
    pub gauge: Option<GaugeBlock>,
}

#[derive(Debug, Clone, Default)]
pub struct GaugeBlock {
    pub gauge_id: Option<String>,
    pub units: Option<String>,
    pub metric: Option<String>,
    pub reading: Option<f64>,
    pub ranges: Vec<crate::gauge::GaugeRange>,
}

impl ReachSource {
    /// The single validated parse step. Pure: identical input documents
    /// always produce identical sources.
    pub fn from_value(document: &Value) -> Result<Self, crate::ErrorDetail> {
        let main = peel(document);
        let main = main
            .as_object()
            .ok_or(MalformedSourceDocument::NotAnObject)?;
        let info = match main.get("info") {
            Some(Value::Object(info)) => info,
            Some(other) => {
                return Err(MalformedSourceDocument::TypeMismatch {
                    key: "info".into(),
                    expected: "object",
                    got: other.clone(),
                }
                .into());
            }
            None => return Err(MalformedSourceDocument::MissingBlock("info").into()),
        };

        let reach_id = require_i64(info, "id")?;

        let putin = match (opt_f64(info, "plon")?, opt_f64(info, "plat")?) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        };
        let takeout = match (opt_f64(info, "tlon")?, opt_f64(info, "tlat")?) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        };

        let edited = opt_string(info, "edited")?.and_then(|raw| {
            match chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S") {
                Ok(edited) => Some(edited),
                Err(_) => {
                    warn_document!("unparseable edited stamp: {raw:?}");
                    None
                }
            }
        });

        let geometry = match info.get("geom") {
            Some(geom) if !geom.is_null() => Polyline::from_geojson(geom)?,
            _ => return Err(MalformedSourceDocument::MissingBlock("geom").into()),
        };

        Ok(Self {
            reach_id,
            river: opt_string(info, "river")?,
            section: opt_string(info, "section")?,
            description: opt_string(info, "description_md")?,
            abstract_md: opt_string(info, "abstract_md")?,
            class: opt_string(info, "class")?,
            length_miles: lenient_f64(info, "length"),
            putin,
            takeout,
            edited,
            geometry,
            gauge: parse_gauge(main)?,
        })
    }
}

/// Bore down to the main payload block. The source serves the same data in
/// three shapes: a full container view, a bare main gadget block, or the
/// payload itself.
fn peel(document: &Value) -> &Value {
    if let Some(view) = document.get(CONTAINER_VIEW_BLOCK) {
        view.get(MAIN_GADGET_BLOCK).unwrap_or(view)
    } else if let Some(main) = document.get(MAIN_GADGET_BLOCK) {
        main
    } else {
        document
    }
}

fn parse_gauge(
    main: &serde_json::Map<String, Value>,
) -> Result<Option<GaugeBlock>, MalformedSourceDocument> {
    let summary = match main.get(GAUGE_SUMMARY_BLOCK) {
        Some(Value::Object(summary)) => Some(summary),
        _ => None,
    };
    // The gauge block arrives either as a single object or as a list with
    // the most relevant gauge first.
    let gauges = match main.get("gauges") {
        Some(Value::Object(gauges)) => Some(gauges),
        Some(Value::Array(list)) => list.first().and_then(Value::as_object),
        _ => None,
    };
    if summary.is_none() && gauges.is_none() {
        return Ok(None);
    }

    let mut block = GaugeBlock::default();
    if let Some(gauges) = gauges {
        block.gauge_id = lenient_string(gauges, "gauge_id");
        block.units = opt_string(gauges, "gauge_units")?;
        block.metric = lenient_string(gauges, "gauge_metric");
        block.reading = lenient_f64(gauges, "gauge_reading");
    }
    if let Some(ranges) = summary.and_then(|s| s.get("ranges")).and_then(Value::as_array) {
        for entry in ranges {
            let Some(entry) = entry.as_object() else {
                warn_document!("skipping non-object gauge range entry");
                continue;
            };
            block.ranges.push(crate::gauge::GaugeRange {
                index_min: lenient_string(entry, "range_min"),
                value_min: lenient_f64(entry, "min"),
                index_max: lenient_string(entry, "range_max"),
                value_max: lenient_f64(entry, "max"),
            });
        }
    }
    Ok(Some(block))
}

fn require_i64(
    obj: &serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<i64, MalformedSourceDocument> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(MalformedSourceDocument::MissingField(key)),
        Some(Value::Number(n)) => n.as_i64().ok_or(MalformedSourceDocument::TypeMismatch {
            key: key.into(),
            expected: "integer",
            got: Value::Number(n.clone()),
        }),
        Some(Value::String(s)) => {
            s.trim()
                .parse()
                .map_err(|_| MalformedSourceDocument::TypeMismatch {
                    key: key.into(),
                    expected: "integer",
                    got: Value::String(s.clone()),
                })
        }
        Some(other) => Err(MalformedSourceDocument::TypeMismatch {
            key: key.into(),
            expected: "integer",
            got: other.clone(),
        }),
    }
}

/// Strings arrive with empty meaning absent.
fn opt_string(
    obj: &serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, MalformedSourceDocument> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(MalformedSourceDocument::TypeMismatch {
            key: key.into(),
            expected: "string",
            got: other.clone(),
        }),
    }
}

/// Like [`opt_string`], but tolerates numeric values (gauge identifiers come
/// through as bare numbers in some documents).
fn lenient_string(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers that must parse when present: JSON numbers or numeric strings.
fn opt_f64(
    obj: &serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<Option<f64>, MalformedSourceDocument> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            s.trim()
                .parse()
                .map(Some)
                .map_err(|_| MalformedSourceDocument::TypeMismatch {
                    key: key.into(),
                    expected: "number",
                    got: Value::String(s.clone()),
                })
        }
        Some(other) => Err(MalformedSourceDocument::TypeMismatch {
            key: key.into(),
            expected: "number",
            got: other.clone(),
        }),
    }
}

/// Numbers where junk is a data-quality nuisance, not a structural error:
/// anything unusable is reported as a warning and read as absent.
fn lenient_f64(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => match s.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn_document!("ignoring non-numeric {key}: {s:?}");
                None
            }
        },
        _ => None,
    }
}
