//! Hosted detection API client.
//!
//! Request: `POST {endpoint}/{model_id}?api_key=...` with the frame as a
//! base64 JPEG body. Response: `{"predictions": [{x, y, width, height,
//! class, confidence}, ...]}` with center-anchored pixel boxes.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::{prelude::BASE64_STANDARD, Engine};
use serde::Deserialize;
use url::Url;

use super::Classifier;
use crate::config::InferenceSettings;
use crate::detect::{Detection, InferenceResult};
use crate::error::InferenceError;
use crate::frame::Frame;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Blocking HTTP classifier backed by a `ureq` agent.
pub struct HttpClassifier {
    agent: ureq::Agent,
    /// Carries the API key; never logged.
    url: Url,
    jpeg_quality: u8,
}

impl HttpClassifier {
    pub fn new(settings: &InferenceSettings) -> Result<Self> {
        let url = classify_url(&settings.endpoint, &settings.model_id, &settings.api_key)?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT.min(settings.timeout))
            .timeout_read(settings.timeout)
            .timeout_write(settings.timeout)
            .build();
        log::info!(
            "classifier: model {} at {}",
            settings.model_id,
            settings.endpoint
        );
        Ok(Self {
            agent,
            url,
            jpeg_quality: settings.jpeg_quality,
        })
    }
}

impl Classifier for HttpClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<InferenceResult, InferenceError> {
        let jpeg = frame
            .encode_jpeg(self.jpeg_quality)
            .map_err(|err| InferenceError::Encode(err.to_string()))?;
        let body = BASE64_STANDARD.encode(&jpeg);
        log::debug!(
            "classifier: posting {}x{} frame ({} jpeg bytes)",
            frame.width,
            frame.height,
            jpeg.len()
        );

        let response = match self
            .agent
            .post(self.url.as_str())
            .set("Content-Type", "application/x-www-form-urlencoded")
            .send_string(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(InferenceError::Status {
                    status,
                    body: excerpt(&body),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(InferenceError::Transport(transport.to_string()));
            }
        };

        let text = response
            .into_string()
            .map_err(|err| InferenceError::Transport(format!("read response: {}", err)))?;
        parse_predictions(&text)
    }
}

/// Build the per-model request URL.
pub fn classify_url(endpoint: &str, model_id: &str, api_key: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint).context("parse inference endpoint")?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "unsupported inference endpoint scheme '{}'; expected http(s)",
            url.scheme()
        ));
    }
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("inference endpoint cannot carry a model path"))?;
        segments.pop_if_empty();
        for part in model_id.split('/').filter(|part| !part.is_empty()) {
            segments.push(part);
        }
    }
    url.query_pairs_mut().append_pair("api_key", api_key);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    class: String,
    confidence: f64,
}

impl From<Prediction> for Detection {
    fn from(p: Prediction) -> Self {
        // Pixel coordinates truncate toward zero.
        Detection {
            class: p.class,
            confidence: p.confidence.clamp(0.0, 1.0) as f32,
            x: p.x as i32,
            y: p.y as i32,
            width: p.width as i32,
            height: p.height as i32,
        }
    }
}

/// Decode a response body into detections, preserving service order.
pub fn parse_predictions(body: &str) -> Result<InferenceResult, InferenceError> {
    let response: PredictionResponse =
        serde_json::from_str(body).map_err(|err| InferenceError::Response(err.to_string()))?;
    Ok(InferenceResult::new(
        response
            .predictions
            .into_iter()
            .map(Detection::from)
            .collect(),
    ))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "time": 0.084,
        "image": {"width": 640, "height": 480},
        "predictions": [
            {"x": 100.7, "y": 100.2, "width": 50.9, "height": 50.0,
             "class": "plastic", "confidence": 0.92, "class_id": 3},
            {"x": 300.0, "y": 220.0, "width": 80.0, "height": 40.0,
             "class": "metal", "confidence": 0.41, "class_id": 1}
        ]
    }"#;

    #[test]
    fn url_joins_model_path_and_key() {
        let url = classify_url(
            "https://detect.roboflow.com",
            "garbage-classification-3/2",
            "secret",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://detect.roboflow.com/garbage-classification-3/2?api_key=secret"
        );
    }

    #[test]
    fn url_keeps_endpoint_prefix() {
        let url = classify_url("http://localhost:9001/infer/", "waste/7", "k").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9001/infer/waste/7?api_key=k");
    }

    #[test]
    fn url_rejects_non_http_schemes() {
        assert!(classify_url("ftp://example.com", "m/1", "k").is_err());
        assert!(classify_url("not a url", "m/1", "k").is_err());
    }

    #[test]
    fn predictions_decode_in_service_order() {
        let result = parse_predictions(RESPONSE).unwrap();
        assert_eq!(result.len(), 2);
        let first = &result.detections[0];
        assert_eq!(first.class, "plastic");
        assert_eq!((first.x, first.y, first.width, first.height), (100, 100, 50, 50));
        assert!((first.confidence - 0.92).abs() < 1e-6);
        assert_eq!(result.best().unwrap().class, "plastic");
    }

    #[test]
    fn missing_predictions_is_empty_result() {
        let result = parse_predictions(r#"{"time": 0.1}"#).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let body = r#"{"predictions": [{"x": 1, "y": 1, "width": 2, "height": 2,
            "class": "glass", "confidence": 1.7}]}"#;
        let result = parse_predictions(body).unwrap();
        assert_eq!(result.detections[0].confidence, 1.0);
    }

    #[test]
    fn malformed_body_is_response_error() {
        assert!(matches!(
            parse_predictions("<html>bad gateway</html>"),
            Err(InferenceError::Response(_))
        ));
    }

    #[test]
    fn long_error_bodies_are_cut() {
        let body = "x".repeat(500);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY_CHARS + 1);
    }
}
