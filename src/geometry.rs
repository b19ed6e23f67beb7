//! WGS84 geometry primitives for reach features.
//!
//! The pipeline never reprojects: source geometry must already be in
//! WGS84 (EPSG:4326) and is only tagged, validated, and carried through.

use serde::Serialize;
use serde_json::Value;

use crate::document::MalformedSourceDocument;

pub const WGS84_WKID: u32 = 4326;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

pub const WGS84: SpatialReference = SpatialReference { wkid: WGS84_WKID };

#[derive(Debug, thiserror::Error)]
#[error("unsupported spatial reference: expected WKID {WGS84_WKID}, got {found}")]
pub struct UnsupportedSpatialReference {
    pub found: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "spatialReference")]
    pub spatial_reference: SpatialReference,
}

impl Point {
    pub fn wgs84(x: f64, y: f64) -> Result<Self, MalformedSourceDocument> {
        validate_position(x, y)?;
        Ok(Self {
            x,
            y,
            spatial_reference: WGS84,
        })
    }
}

/// Polyline in WGS84. Vertex order and path structure are exactly those of
/// the source document: normalization never resamples or simplifies, so the
/// same input always yields the same vertices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub paths: Vec<Vec<[f64; 2]>>,
    #[serde(rename = "spatialReference")]
    pub spatial_reference: SpatialReference,
}

impl Polyline {
    /// Build from the source's embedded GeoJSON geometry value.
    ///
    /// Accepts `LineString` and `MultiLineString`. An explicit `crs` or
    /// `spatialReference` member must denote WGS84; an absent one means
    /// WGS84, which is what GeoJSON prescribes.
    pub fn from_geojson(value: &Value) -> Result<Self, crate::ErrorDetail> {
        let obj = value
            .as_object()
            .ok_or_else(|| MalformedSourceDocument::TypeMismatch {
                key: "geom".into(),
                expected: "object",
                got: value.clone(),
            })?;
        check_spatial_reference(obj)?;

        let geometry_type = match obj.get("type") {
            Some(Value::String(t)) => t.as_str(),
            _ => return Err(MalformedSourceDocument::MissingField("type").into()),
        };
        let coordinates = obj
            .get("coordinates")
            .ok_or(MalformedSourceDocument::MissingField("coordinates"))?;

        let paths = match geometry_type {
            "LineString" => vec![parse_path(coordinates)?],
            "MultiLineString" => {
                let parts = coordinates.as_array().ok_or_else(|| {
                    MalformedSourceDocument::TypeMismatch {
                        key: "coordinates".into(),
                        expected: "array",
                        got: coordinates.clone(),
                    }
                })?;
                if parts.is_empty() {
                    return Err(MalformedSourceDocument::EmptyGeometry.into());
                }
                parts
                    .iter()
                    .map(parse_path)
                    .collect::<Result<Vec<_>, _>>()?
            }
            other => {
                return Err(MalformedSourceDocument::UnknownGeometryType(other.to_owned()).into());
            }
        };

        Ok(Self {
            paths,
            spatial_reference: WGS84,
        })
    }

    pub fn vertices(&self) -> impl Iterator<Item = &[f64; 2]> {
        self.paths.iter().flatten()
    }

    pub fn vertex_count(&self) -> usize {
        self.paths.iter().map(Vec::len).sum()
    }

    /// Extent as (xmin, ymin, xmax, ymax).
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let mut vertices = self.vertices();
        // Construction guarantees at least one path with two vertices.
        let first = vertices.next().copied().unwrap_or_default();
        vertices.fold(
            (first[0], first[1], first[0], first[1]),
            |(xmin, ymin, xmax, ymax), v| {
                (
                    xmin.min(v[0]),
                    ymin.min(v[1]),
                    xmax.max(v[0]),
                    ymax.max(v[1]),
                )
            },
        )
    }

    /// Midpoint of the extent.
    pub fn centroid(&self) -> Point {
        let (xmin, ymin, xmax, ymax) = self.extent();
        Point {
            x: (xmax - xmin) / 2.0 + xmin,
            y: (ymax - ymin) / 2.0 + ymin,
            spatial_reference: self.spatial_reference,
        }
    }
}

fn parse_path(value: &Value) -> Result<Vec<[f64; 2]>, MalformedSourceDocument> {
    let positions = value
        .as_array()
        .ok_or_else(|| MalformedSourceDocument::TypeMismatch {
            key: "coordinates".into(),
            expected: "array of positions",
            got: value.clone(),
        })?;
    if positions.is_empty() {
        return Err(MalformedSourceDocument::EmptyGeometry);
    }
    let mut path = Vec::with_capacity(positions.len());
    for position in positions {
        let pair = position
            .as_array()
            .filter(|p| p.len() >= 2)
            .ok_or_else(|| MalformedSourceDocument::TypeMismatch {
                key: "coordinates".into(),
                expected: "position pair",
                got: position.clone(),
            })?;
        // Trailing elevation values are dropped; the destination layer is 2D.
        let (x, y) = match (pair[0].as_f64(), pair[1].as_f64()) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(MalformedSourceDocument::TypeMismatch {
                    key: "coordinates".into(),
                    expected: "numeric position",
                    got: position.clone(),
                });
            }
        };
        validate_position(x, y)?;
        path.push([x, y]);
    }
    if path.len() < 2 {
        return Err(MalformedSourceDocument::DegeneratePath {
            vertices: path.len(),
        });
    }
    Ok(path)
}

fn validate_position(x: f64, y: f64) -> Result<(), MalformedSourceDocument> {
    if x.is_finite() && y.is_finite() && (-180.0..=180.0).contains(&x) && (-90.0..=90.0).contains(&y)
    {
        Ok(())
    } else {
        Err(MalformedSourceDocument::CoordinateOutOfRange { x, y })
    }
}

/// Reject any geometry that carries an explicit non-WGS84 reference rather
/// than mis-tagging it.
fn check_spatial_reference(
    obj: &serde_json::Map<String, Value>,
) -> Result<(), UnsupportedSpatialReference> {
    if let Some(crs) = obj.get("crs") {
        let name = match crs {
            Value::String(name) => Some(name.as_str()),
            Value::Object(crs) => crs
                .get("properties")
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str),
            _ => None,
        };
        let Some(name) = name else {
            return Err(UnsupportedSpatialReference {
                found: crs.to_string(),
            });
        };
        if !is_wgs84_name(name) {
            return Err(UnsupportedSpatialReference { found: name.into() });
        }
    }
    if let Some(sr) = obj.get("spatialReference") {
        let wkid = sr.get("wkid").and_then(Value::as_u64);
        if wkid != Some(u64::from(WGS84_WKID)) {
            return Err(UnsupportedSpatialReference {
                found: sr.to_string(),
            });
        }
    }
    Ok(())
}

fn is_wgs84_name(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "EPSG:4326" | "URN:OGC:DEF:CRS:EPSG::4326" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" | "CRS84" | "WGS84"
    )
}
