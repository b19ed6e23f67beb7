//! Publish collaborator: a narrow client for the hosted feature service.
//!
//! Two endpoints only: register the derived layer definition, then POST
//! feature batches to the layer. Strictly sequential, no retry, no
//! partial-success bookkeeping; a failed request fails the run.

use std::num::NonZeroUsize;

use serde_json::json;
use url::Url;

use crate::{
    ErrorDetail, export,
    export::UploadBatch,
    progress::{BatchPhase, ProgressReporter},
    reach::Reach,
    schema::{LayerSchema, OBJECTID_FIELD},
};

pub struct FeatureServiceClient {
    client: reqwest::Client,
    service_url: Url,
    token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub batches: usize,
    pub features: usize,
}

impl FeatureServiceClient {
    pub fn new(service_url: Url, token: Option<String>) -> Result<Self, ErrorDetail> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            service_url,
            token,
        })
    }

    /// Register the derived schema as a polyline layer on the service.
    pub async fn add_to_definition(
        &self,
        layer_name: &str,
        schema: &LayerSchema,
    ) -> Result<(), ErrorDetail> {
        let definition = json!({
            "layers": [{
                "name": layer_name,
                "type": "Feature Layer",
                "geometryType": "esriGeometryPolyline",
                "objectIdField": OBJECTID_FIELD,
                "spatialReference": { "wkid": crate::geometry::WGS84_WKID },
                "fields": schema.wire_fields(),
            }],
        });
        let url = self.endpoint(&["addToDefinition"])?;
        let body = self
            .post(
                url,
                &[("f", "json"), ("addToDefinition", &definition.to_string())],
            )
            .await?;
        check_service_response(&body)?;
        Ok(())
    }

    /// Submit one batch of features; returns how many the service accepted.
    pub async fn add_features(
        &self,
        layer_id: u32,
        batch: &UploadBatch,
    ) -> Result<usize, ErrorDetail> {
        let features = serde_json::to_string(&batch.records)
            .map_err(|e| ErrorDetail::Service(format!("could not serialize features: {e}")))?;
        let url = self.endpoint(&[&layer_id.to_string(), "addFeatures"])?;
        let body = self
            .post(url, &[("f", "json"), ("features", &features)])
            .await?;
        check_service_response(&body)?;

        let results = body
            .get("addResults")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| ErrorDetail::Service("response carries no addResults".into()))?;
        let added = results
            .iter()
            .filter(|r| r.get("success").and_then(serde_json::Value::as_bool) == Some(true))
            .count();
        if added != batch.len() {
            return Err(ErrorDetail::Service(format!(
                "service accepted {added} of {} features",
                batch.len()
            )));
        }
        Ok(added)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ErrorDetail> {
        let mut url = self.service_url.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorDetail::Service("service URL cannot be a base".into()))?
            .extend(segments);
        Ok(url)
    }

    async fn post(
        &self,
        url: Url,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, ErrorDetail> {
        let mut form: Vec<(&str, &str)> = form.to_vec();
        if let Some(token) = &self.token {
            form.push(("token", token));
        }
        let response = self.client.post(url).form(&form).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// The service reports most failures inside a 200 body.
fn check_service_response(body: &serde_json::Value) -> Result<(), ErrorDetail> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unspecified error");
        return Err(ErrorDetail::Service(message.to_owned()));
    }
    Ok(())
}

/// Drive a full publish: derive the schema once over the complete
/// collection, register the layer, then upload batches in order.
pub async fn publish_reaches(
    client: &FeatureServiceClient,
    layer_name: &str,
    layer_id: u32,
    reaches: &[Reach],
    chunk_size: NonZeroUsize,
    progress: &dyn ProgressReporter,
) -> Result<PublishSummary, ErrorDetail> {
    progress.set_phase(BatchPhase::DerivingSchema);
    let schema = LayerSchema::derive(reaches)?;

    progress.set_phase(BatchPhase::CreatingLayer);
    client.add_to_definition(layer_name, &schema).await?;

    progress.set_phase(BatchPhase::Uploading);
    let batches_total = reaches.len().div_ceil(chunk_size.get());
    let mut summary = PublishSummary {
        batches: 0,
        features: 0,
    };
    for batch in export::batch(export::export_records(reaches), chunk_size) {
        summary.features += client.add_features(layer_id, &batch).await?;
        summary.batches += 1;
        progress.set_upload_progress(summary.batches, batches_total, summary.features);
    }
    Ok(summary)
}
