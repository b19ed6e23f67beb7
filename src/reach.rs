//! The record normalizer: one raw source document in, one [`Reach`] out.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::{
    document::ReachSource,
    gauge,
    geometry::{Point, Polyline},
    text, warn_document,
};

/// Maximum length of the derived abstract, in characters.
const ABSTRACT_LIMIT: usize = 500;

/// A single flat attribute cell. Dates go over the wire as epoch
/// milliseconds, which is what the destination layer stores.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Integer(i64),
    Double(f64),
    String(String),
    Date(chrono::NaiveDateTime),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Date(_) => "date",
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Double(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Date(value) => serializer.serialize_i64(value.and_utc().timestamp_millis()),
        }
    }
}

impl From<Option<String>> for AttributeValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::String)
    }
}

impl From<Option<f64>> for AttributeValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Double)
    }
}

impl From<Option<i64>> for AttributeValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<chrono::NaiveDateTime>> for AttributeValue {
    fn from(value: Option<chrono::NaiveDateTime>) -> Self {
        value.map_or(Self::Null, Self::Date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    PutIn,
    TakeOut,
    Intermediate,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PutIn => "putin",
            Self::TakeOut => "takeout",
            Self::Intermediate => "intermediate",
        }
    }
}

/// A named point along a reach. Immutable once built; owned by its reach.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachPoint {
    pub reach_id: i64,
    pub kind: AccessKind,
    pub name: Option<String>,
    pub note: Option<String>,
    pub elevation: Option<f64>,
    pub geometry: Point,
}

impl ReachPoint {
    /// Stable identifier tag; deliberately derived rather than random so
    /// re-normalizing the same document reproduces it.
    pub fn tag(&self) -> String {
        format!("{}_access_{}", self.reach_id, self.kind.as_str())
    }
}

/// The central entity: a named river segment with a flat attribute mapping
/// and a WGS84 polyline. Built once from a source document, read many times,
/// never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Reach {
    reach_id: i64,
    attributes: IndexMap<String, AttributeValue>,
    geometry: Polyline,
    points: Vec<ReachPoint>,
}

impl Reach {
    /// Normalize one raw source document.
    ///
    /// Pure function of its input: no clocks, no randomness, no I/O, so
    /// re-ingesting a previously processed document cannot drift the
    /// resulting record.
    pub fn from_document(document: &serde_json::Value) -> Result<Self, crate::ErrorDetail> {
        Self::from_source(ReachSource::from_value(document)?)
    }

    fn from_source(source: ReachSource) -> Result<Self, crate::ErrorDetail> {
        let reach_id = source.reach_id;

        let mut points = Vec::new();
        if let Some((lon, lat)) = source.putin {
            points.push(ReachPoint {
                reach_id,
                kind: AccessKind::PutIn,
                name: None,
                note: None,
                elevation: None,
                geometry: Point::wgs84(lon, lat)?,
            });
        }
        if let Some((lon, lat)) = source.takeout {
            points.push(ReachPoint {
                reach_id,
                kind: AccessKind::TakeOut,
                name: None,
                note: None,
                elevation: None,
                geometry: Point::wgs84(lon, lat)?,
            });
        }

        let river = source.river.as_deref().map(text::remove_backslashes);
        let section = source.section.as_deref().map(text::remove_backslashes);
        let name = match (river.as_deref(), section.as_deref()) {
            (Some(river), Some(section)) => Some(format!("{river} {section}")),
            (Some(river), None) => Some(river.to_owned()),
            (None, Some(section)) => Some(section.to_owned()),
            (None, None) => None,
        };

        // Combined class strings of literal "none" mean unrated.
        let difficulty = source
            .class
            .filter(|class| !class.eq_ignore_ascii_case("none"));
        let parts = difficulty.as_deref().and_then(|combined| {
            let parts = difficulty_parts(combined);
            if parts.is_none() {
                warn_document!("unparseable difficulty class: {combined:?}");
            }
            parts
        });
        let filter = parts
            .as_ref()
            .and_then(|parts| parts.maximum.as_deref())
            .and_then(difficulty_filter);

        let abstract_text = source.abstract_md.clone().or_else(|| {
            source
                .description
                .as_deref()
                .map(|description| text::abbreviate(description, ABSTRACT_LIMIT))
        });

        let gauge = source.gauge.as_ref();
        let ranges = gauge.map(|g| g.ranges.as_slice()).unwrap_or_default();
        let breakpoints = gauge::breakpoints(ranges);
        let observation = gauge.and_then(|g| g.reading);
        let runnable = match observation {
            Some(observation) if !ranges.is_empty() => {
                Some(i64::from(gauge::runnable(ranges, observation)))
            }
            _ => None,
        };
        let stage = if gauge.is_some() {
            gauge::stage(ranges, observation).map(str::to_owned)
        } else {
            None
        };

        let mut attributes = IndexMap::new();
        attributes.insert("reach_id".to_owned(), AttributeValue::Integer(reach_id));
        attributes.insert("river".to_owned(), river.into());
        attributes.insert("section".to_owned(), section.into());
        attributes.insert("name".to_owned(), name.into());
        attributes.insert("description".to_owned(), source.description.into());
        attributes.insert("abstract".to_owned(), abstract_text.into());
        attributes.insert("difficulty".to_owned(), difficulty.into());
        attributes.insert(
            "difficulty_minimum".to_owned(),
            parts.as_ref().and_then(|p| p.minimum.clone()).into(),
        );
        attributes.insert(
            "difficulty_maximum".to_owned(),
            parts.as_ref().and_then(|p| p.maximum.clone()).into(),
        );
        attributes.insert(
            "difficulty_outlier".to_owned(),
            parts.as_ref().and_then(|p| p.outlier.clone()).into(),
        );
        attributes.insert("difficulty_filter".to_owned(), filter.into());
        attributes.insert("length_miles".to_owned(), source.length_miles.into());
        attributes.insert(
            "gauge_id".to_owned(),
            gauge.and_then(|g| g.gauge_id.clone()).into(),
        );
        attributes.insert(
            "gauge_units".to_owned(),
            gauge.and_then(|g| g.units.clone()).into(),
        );
        attributes.insert(
            "gauge_metric".to_owned(),
            gauge.and_then(|g| g.metric.clone()).into(),
        );
        attributes.insert("gauge_observation".to_owned(), observation.into());
        attributes.insert(
            "gauge_min".to_owned(),
            breakpoints.first().map(|bp| bp.value).into(),
        );
        attributes.insert(
            "gauge_max".to_owned(),
            breakpoints.last().map(|bp| bp.value).into(),
        );
        attributes.insert("gauge_runnable".to_owned(), runnable.into());
        attributes.insert("gauge_stage".to_owned(), stage.into());
        attributes.insert("edited".to_owned(), source.edited.into());

        Ok(Self {
            reach_id,
            attributes,
            geometry: source.geometry,
            points,
        })
    }

    pub fn reach_id(&self) -> i64 {
        self.reach_id
    }

    /// Flat attribute mapping for tabular export. The key set and order are
    /// identical for every reach; absent source data is an explicit
    /// [`AttributeValue::Null`], never a missing key.
    pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn geometry(&self) -> &Polyline {
        &self.geometry
    }

    pub fn points(&self) -> &[ReachPoint] {
        &self.points
    }

    pub fn putin(&self) -> Option<&ReachPoint> {
        self.points.iter().find(|p| p.kind == AccessKind::PutIn)
    }

    pub fn takeout(&self) -> Option<&ReachPoint> {
        self.points.iter().find(|p| p.kind == AccessKind::TakeOut)
    }

    pub fn extent(&self) -> (f64, f64, f64, f64) {
        self.geometry.extent()
    }

    pub fn centroid(&self) -> Point {
        self.geometry.centroid()
    }
}

#[cfg(test)]
impl Reach {
    /// Assemble a reach from raw parts, bypassing normalization. Only for
    /// exercising collection-level checks the normalizer can never trip.
    pub(crate) fn synthetic(
        reach_id: i64,
        attributes: IndexMap<String, AttributeValue>,
        geometry: Polyline,
    ) -> Self {
        Self {
            reach_id,
            attributes,
            geometry,
            points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyParts {
    pub minimum: Option<String>,
    pub maximum: Option<String>,
    pub outlier: Option<String>,
}

static DIFFICULTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:((?:VI|IV|V|III|II|I|5\.\d)[+-]?)-)?((?:VI|IV|V|III|II|I|5\.\d)[+-]?)(?:\(((?:VI|IV|V|III|II|I|5\.\d)[+-]?)\))?",
    )
    .unwrap()
});

/// Split a combined class string like `IV-V(V+)` into minimum, maximum, and
/// outlier parts. The maximum is the only mandatory part.
pub fn difficulty_parts(combined: &str) -> Option<DifficultyParts> {
    let caps = DIFFICULTY.captures(combined.trim())?;
    let part = |index| caps.get(index).map(|m| m.as_str().to_owned());
    Some(DifficultyParts {
        minimum: part(1),
        maximum: part(2),
        outlier: part(3),
    })
}

/// Numeric filter value for a single difficulty grade, placed just above the
/// bare grade so range filters of the form `<= n.1` capture it.
pub fn difficulty_filter(maximum: &str) -> Option<f64> {
    let (grade, adjust) = match maximum.as_bytes().last().copied() {
        Some(b'+') => (&maximum[..maximum.len() - 1], 0.3),
        Some(b'-') => (&maximum[..maximum.len() - 1], -0.1),
        _ => (maximum, 0.1),
    };
    let base = match grade {
        "I" => 1.0,
        "II" => 2.0,
        "III" => 3.0,
        "IV" => 4.0,
        "V" => 5.0,
        "VI" => 6.0,
        bedrock if bedrock.starts_with("5.") => bedrock.parse().ok()?,
        _ => return None,
    };
    Some(base + adjust)
}
