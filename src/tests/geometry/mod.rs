use serde_json::json;

use crate::{
    ErrorDetail,
    document::MalformedSourceDocument,
    geometry::{Polyline, WGS84_WKID},
};

fn line(coordinates: serde_json::Value) -> serde_json::Value {
    json!({ "type": "LineString", "coordinates": coordinates })
}

#[test]
fn parses_a_line_string() {
    let polyline =
        Polyline::from_geojson(&line(json!([[-105.0, 39.0], [-105.1, 39.1]]))).unwrap();
    assert_eq!(polyline.paths.len(), 1);
    assert_eq!(polyline.vertex_count(), 2);
    assert_eq!(polyline.paths[0], vec![[-105.0, 39.0], [-105.1, 39.1]]);
    assert_eq!(polyline.spatial_reference.wkid, WGS84_WKID);
}

#[test]
fn parses_a_multi_line_string() {
    let polyline = Polyline::from_geojson(&json!({
        "type": "MultiLineString",
        "coordinates": [
            [[-105.0, 39.0], [-105.1, 39.1]],
            [[-105.2, 39.2], [-105.3, 39.3], [-105.4, 39.4]]
        ]
    }))
    .unwrap();
    assert_eq!(polyline.paths.len(), 2);
    assert_eq!(polyline.vertex_count(), 5);
}

#[test]
fn drops_elevation_values() {
    let polyline =
        Polyline::from_geojson(&line(json!([[-105.0, 39.0, 2400.0], [-105.1, 39.1, 2300.0]])))
            .unwrap();
    assert_eq!(polyline.paths[0], vec![[-105.0, 39.0], [-105.1, 39.1]]);
}

#[test]
fn rejects_out_of_range_coordinates() {
    let error =
        Polyline::from_geojson(&line(json!([[-105.0, 95.0], [-105.1, 39.1]]))).unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::CoordinateOutOfRange { .. })
    ));
}

#[test]
fn rejects_degenerate_paths() {
    let error = Polyline::from_geojson(&line(json!([[-105.0, 39.0]]))).unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::DegeneratePath { vertices: 1 })
    ));
}

#[test]
fn rejects_empty_geometry() {
    let error = Polyline::from_geojson(&json!({
        "type": "MultiLineString",
        "coordinates": []
    }))
    .unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::EmptyGeometry)
    ));
    let error = Polyline::from_geojson(&line(json!([]))).unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::EmptyGeometry)
    ));
}

#[test]
fn rejects_unknown_geometry_types() {
    let error = Polyline::from_geojson(&json!({
        "type": "Point",
        "coordinates": [-105.0, 39.0]
    }))
    .unwrap_err();
    assert!(matches!(
        error,
        ErrorDetail::Malformed(MalformedSourceDocument::UnknownGeometryType(_))
    ));
}

#[test]
fn accepts_wgs84_spelled_any_way() {
    for crs in [
        json!("EPSG:4326"),
        json!("urn:ogc:def:crs:OGC:1.3:CRS84"),
        json!({ "type": "name", "properties": { "name": "EPSG:4326" } }),
    ] {
        let mut geom = line(json!([[-105.0, 39.0], [-105.1, 39.1]]));
        geom["crs"] = crs;
        assert!(Polyline::from_geojson(&geom).is_ok());
    }
    let mut geom = line(json!([[-105.0, 39.0], [-105.1, 39.1]]));
    geom["spatialReference"] = json!({ "wkid": 4326 });
    assert!(Polyline::from_geojson(&geom).is_ok());
}

#[test]
fn rejects_foreign_spatial_references() {
    let mut geom = line(json!([[-105.0, 39.0], [-105.1, 39.1]]));
    geom["crs"] = json!({ "type": "name", "properties": { "name": "EPSG:3857" } });
    assert!(matches!(
        Polyline::from_geojson(&geom).unwrap_err(),
        ErrorDetail::SpatialReference(_)
    ));

    let mut geom = line(json!([[-105.0, 39.0], [-105.1, 39.1]]));
    geom["spatialReference"] = json!({ "wkid": 3857 });
    assert!(matches!(
        Polyline::from_geojson(&geom).unwrap_err(),
        ErrorDetail::SpatialReference(_)
    ));
}

#[test]
fn extent_and_centroid() {
    let polyline =
        Polyline::from_geojson(&line(json!([[-105.0, 39.0], [-105.1, 39.1]]))).unwrap();
    let (xmin, ymin, xmax, ymax) = polyline.extent();
    assert_eq!((xmin, ymin, xmax, ymax), (-105.1, 39.0, -105.0, 39.1));

    let centroid = polyline.centroid();
    assert!((centroid.x - (-105.05)).abs() < 1e-9);
    assert!((centroid.y - 39.05).abs() < 1e-9);
    assert_eq!(centroid.spatial_reference.wkid, WGS84_WKID);
}
