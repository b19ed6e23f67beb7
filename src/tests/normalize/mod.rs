use serde_json::json;

use crate::{
    ErrorDetail,
    document::MalformedSourceDocument,
    geometry::WGS84_WKID,
    reach::{AttributeValue, Reach, difficulty_filter, difficulty_parts},
    warning,
};

use super::{load_fixture, minimal_document};

#[test]
fn normalizes_fixture_document() {
    let reach = Reach::from_document(&load_fixture("reach_00003411.json")).unwrap();

    let attributes = reach.attributes();
    assert_eq!(attributes["reach_id"], AttributeValue::Integer(3411));
    assert_eq!(
        attributes["river"],
        AttributeValue::String("Little White Salmon".into())
    );
    assert_eq!(
        attributes["section"],
        AttributeValue::String("Gorge (Lower)".into())
    );
    assert_eq!(
        attributes["name"],
        AttributeValue::String("Little White Salmon Gorge (Lower)".into())
    );
    // Description is carried through unmodified; the derived abstract is
    // cleaned plain text.
    assert_eq!(
        attributes["description"],
        AttributeValue::String(
            "<p>A  classic  basalt gorge run with continuous class V boulder \
             gardens and several distinct drops.</p>"
                .into()
        )
    );
    assert_eq!(
        attributes["abstract"],
        AttributeValue::String(
            "A classic basalt gorge run with continuous class V boulder \
             gardens and several distinct drops."
                .into()
        )
    );
    assert_eq!(
        attributes["difficulty"],
        AttributeValue::String("IV-V(V+)".into())
    );
    assert_eq!(
        attributes["difficulty_minimum"],
        AttributeValue::String("IV".into())
    );
    assert_eq!(
        attributes["difficulty_maximum"],
        AttributeValue::String("V".into())
    );
    assert_eq!(
        attributes["difficulty_outlier"],
        AttributeValue::String("V+".into())
    );
    assert_eq!(attributes["difficulty_filter"], AttributeValue::Double(5.1));
    assert_eq!(attributes["length_miles"], AttributeValue::Double(4.5));
    assert_eq!(attributes["gauge_id"], AttributeValue::String("4578".into()));
    assert_eq!(attributes["gauge_units"], AttributeValue::String("ft".into()));
    assert_eq!(
        attributes["gauge_metric"],
        AttributeValue::String("stage".into())
    );
    assert_eq!(attributes["gauge_observation"], AttributeValue::Double(2.9));
    assert_eq!(attributes["gauge_min"], AttributeValue::Double(2.2));
    assert_eq!(attributes["gauge_max"], AttributeValue::Double(4.0));
    assert_eq!(attributes["gauge_runnable"], AttributeValue::Integer(1));
    assert_eq!(
        attributes["gauge_stage"],
        AttributeValue::String("medium".into())
    );
    assert_eq!(
        attributes["edited"],
        AttributeValue::Date(
            chrono::NaiveDate::from_ymd_opt(2023, 5, 14)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        )
    );

    assert_eq!(reach.geometry().vertex_count(), 3);
    assert_eq!(reach.geometry().spatial_reference.wkid, WGS84_WKID);

    let putin = reach.putin().unwrap();
    assert_eq!(putin.geometry.x, -121.6453);
    assert_eq!(putin.geometry.y, 45.7261);
    assert_eq!(putin.tag(), "3411_access_putin");
    let takeout = reach.takeout().unwrap();
    assert_eq!(takeout.tag(), "3411_access_takeout");
    assert_eq!(reach.points().len(), 2);
}

#[test]
fn normalization_is_idempotent() {
    let document = load_fixture("reach_00003411.json");
    let first = Reach::from_document(&document).unwrap();
    let second = Reach::from_document(&document).unwrap();
    assert_eq!(first, second);
}

#[test]
fn round_trip_known_document() {
    let reach = Reach::from_document(&minimal_document(json!({}))).unwrap();

    assert_eq!(
        reach.attributes()["reach_id"],
        AttributeValue::Integer(42)
    );
    assert_eq!(
        reach.attributes()["river"],
        AttributeValue::String("Test River".into())
    );
    assert_eq!(
        reach.attributes()["section"],
        AttributeValue::String("Lower Gorge".into())
    );
    assert_eq!(
        reach.geometry().paths,
        vec![vec![[-105.0, 39.0], [-105.1, 39.1]]]
    );
    assert_eq!(reach.geometry().spatial_reference.wkid, WGS84_WKID);
}

#[test]
fn wrapper_shapes_normalize_identically() {
    let bare = minimal_document(json!({}))["CRiverMainGadgetJSON_main"].clone();
    let gadget = json!({ "CRiverMainGadgetJSON_main": bare.clone() });
    let container = json!({ "CContainerViewJSON_view": gadget.clone() });

    let from_bare = Reach::from_document(&bare).unwrap();
    let from_gadget = Reach::from_document(&gadget).unwrap();
    let from_container = Reach::from_document(&container).unwrap();
    assert_eq!(from_bare, from_gadget);
    assert_eq!(from_bare, from_container);
}

#[test]
fn absent_optional_fields_keep_their_keys() {
    let with = Reach::from_document(&minimal_document(
        json!({ "description_md": "a short run" }),
    ))
    .unwrap();
    let without = Reach::from_document(&minimal_document(json!({}))).unwrap();

    let with_keys: Vec<&String> = with.attributes().keys().collect();
    let without_keys: Vec<&String> = without.attributes().keys().collect();
    assert_eq!(with_keys, without_keys);

    assert_eq!(
        with.attributes()["description"],
        AttributeValue::String("a short run".into())
    );
    assert_eq!(without.attributes()["description"], AttributeValue::Null);
    // An empty string in the source reads the same as an absent field.
    let empty = Reach::from_document(&minimal_document(json!({ "description_md": "" }))).unwrap();
    assert_eq!(empty.attributes()["description"], AttributeValue::Null);
}

#[test]
fn missing_geometry_is_malformed() {
    let mut document = minimal_document(json!({}));
    document["CRiverMainGadgetJSON_main"]["info"]
        .as_object_mut()
        .unwrap()
        .remove("geom");
    let error = Reach::from_document(&document).unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::MissingBlock("geom"))
    ));
}

#[test]
fn missing_info_block_is_malformed() {
    let error = Reach::from_document(&json!({ "CRiverMainGadgetJSON_main": {} })).unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::MissingBlock("info"))
    ));
}

#[test]
fn missing_identifier_is_malformed() {
    let mut document = minimal_document(json!({}));
    document["CRiverMainGadgetJSON_main"]["info"]
        .as_object_mut()
        .unwrap()
        .remove("id");
    let error = Reach::from_document(&document).unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::MissingField("id"))
    ));
}

#[test]
fn foreign_spatial_reference_is_rejected() {
    let document = minimal_document(json!({
        "geom": {
            "type": "LineString",
            "coordinates": [[-105.0, 39.0], [-105.1, 39.1]],
            "crs": { "type": "name", "properties": { "name": "EPSG:3857" } }
        }
    }));
    let error = Reach::from_document(&document).unwrap_err();
    assert!(matches!(error, ErrorDetail::SpatialReference(_)));
}

#[test]
fn unrated_class_is_null() {
    let reach = Reach::from_document(&minimal_document(json!({ "class": "none" }))).unwrap();
    assert_eq!(reach.attributes()["difficulty"], AttributeValue::Null);
    assert_eq!(
        reach.attributes()["difficulty_maximum"],
        AttributeValue::Null
    );
}

#[test]
fn reach_without_access_points_is_valid() {
    let reach = Reach::from_document(&minimal_document(json!({}))).unwrap();
    assert!(reach.points().is_empty());
    assert!(reach.putin().is_none());
    assert!(reach.takeout().is_none());
}

#[test]
fn bad_edited_stamp_warns_and_normalizes() {
    let document = minimal_document(json!({ "edited": "last tuesday" }));
    let (reach, warnings) = warning::scoped(|| Reach::from_document(&document));
    let reach = reach.unwrap();
    assert_eq!(reach.attributes()["edited"], AttributeValue::Null);
    assert!(warnings.iter().any(|w| w.contains("edited stamp")));
}

#[test]
fn difficulty_parts_decompose() {
    let parts = difficulty_parts("IV-V(V+)").unwrap();
    assert_eq!(parts.minimum.as_deref(), Some("IV"));
    assert_eq!(parts.maximum.as_deref(), Some("V"));
    assert_eq!(parts.outlier.as_deref(), Some("V+"));

    let bare = difficulty_parts("IV").unwrap();
    assert_eq!(bare.minimum, None);
    assert_eq!(bare.maximum.as_deref(), Some("IV"));
    assert_eq!(bare.outlier, None);

    let range = difficulty_parts("II-III").unwrap();
    assert_eq!(range.minimum.as_deref(), Some("II"));
    assert_eq!(range.maximum.as_deref(), Some("III"));

    let bedrock = difficulty_parts("5.2").unwrap();
    assert_eq!(bedrock.maximum.as_deref(), Some("5.2"));

    assert!(difficulty_parts("unknown").is_none());
}

#[test]
fn difficulty_filter_values() {
    assert_eq!(difficulty_filter("IV"), Some(4.1));
    assert_eq!(difficulty_filter("IV+"), Some(4.3));
    assert_eq!(difficulty_filter("IV-"), Some(3.9));
    assert_eq!(difficulty_filter("V"), Some(5.1));
    assert_eq!(difficulty_filter("5.2"), Some(5.3));
    assert_eq!(difficulty_filter("VII"), None);
}
