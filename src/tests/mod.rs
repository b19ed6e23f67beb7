mod geometry;
mod normalize;

use std::path::Path;

use serde_json::json;

use crate::geometry::{Polyline, WGS84};

pub(crate) fn load_fixture(name: &str) -> serde_json::Value {
    let path = Path::new("src/tests/fixtures").join(name);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read fixture {}: {e}", path.display()));
    serde_json::from_str(&raw).unwrap()
}

pub(crate) fn test_polyline() -> Polyline {
    Polyline {
        paths: vec![vec![[-105.0, 39.0], [-105.1, 39.1]]],
        spatial_reference: WGS84,
    }
}

/// A well-formed document with the given extra info fields merged in.
pub(crate) fn minimal_document(info_extra: serde_json::Value) -> serde_json::Value {
    let mut info = json!({
        "id": 42,
        "river": "Test River",
        "section": "Lower Gorge",
        "geom": {
            "type": "LineString",
            "coordinates": [[-105.0, 39.0], [-105.1, 39.1]]
        }
    });
    if let (Some(info), Some(extra)) = (info.as_object_mut(), info_extra.as_object()) {
        for (key, value) in extra {
            info.insert(key.clone(), value.clone());
        }
    }
    json!({ "CRiverMainGadgetJSON_main": { "info": info } })
}
