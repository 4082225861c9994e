// src/api/client.rs
use image::DynamicImage;
use log::info;
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use std::time::Duration;

use super::connector::{PredictError, Predictor};

/// Hosted model endpoint used when no URL is given on the CLI or via
/// the HELMET_API_URL environment variable.
pub const DEFAULT_SERVER_URL: &str = "https://bhavyapatel9-helmet-detector.hf.space";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ServerStatus {
    message: String,
}

/// Blocking HTTP client for the detection server.
pub struct PredictionClient {
    base_url: String,
    client: Client,
}

impl PredictionClient {
    pub fn new(server_url: &str) -> Result<Self, PredictError> {
        Self::with_timeout(server_url, REQUEST_TIMEOUT)
    }

    /// Same as `new` but with an explicit connect/request timeout.
    pub fn with_timeout(server_url: &str, timeout: Duration) -> Result<Self, PredictError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(classify)?;

        Ok(Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Probe the server root and return its status message.
    pub fn check_server(&self) -> Result<String, PredictError> {
        let url = format!("{}/", self.base_url);
        let response = self.client.get(&url).send().map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(PredictError::Server { status, message });
        }

        let status: ServerStatus = response.json().map_err(classify)?;
        Ok(status.message)
    }
}

impl Predictor for PredictionClient {
    fn predict(&self, image_data: &[u8], file_name: &str) -> Result<DynamicImage, PredictError> {
        let part = multipart::Part::bytes(image_data.to_vec())
            .file_name(file_name.to_string())
            .mime_str("image/*")
            .map_err(classify)?;
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/predict/", self.base_url);
        info!("POST {} ({} bytes, {})", url, image_data.len(), file_name);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(PredictError::Server { status, message });
        }

        let body = response.bytes().map_err(classify)?;
        let annotated = image::load_from_memory(&body)?;
        info!(
            "Annotated image received: {}x{}",
            annotated.width(),
            annotated.height()
        );
        Ok(annotated)
    }
}

fn classify(e: reqwest::Error) -> PredictError {
    if e.is_timeout() {
        PredictError::Timeout(e)
    } else {
        PredictError::Network(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_fixture() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 30, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut buf),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        buf
    }

    fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    // The client is blocking, so it has to run off the test runtime.
    async fn predict_against(
        server_url: String,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<DynamicImage, PredictError> {
        tokio::task::spawn_blocking(move || {
            let client = PredictionClient::with_timeout(&server_url, timeout).unwrap();
            client.predict(&payload, "photo.png")
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn success_displays_decoded_response_image() {
        let server = MockServer::start().await;
        let annotated = png_fixture();
        Mock::given(method("POST"))
            .and(path("/predict/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(annotated.clone()))
            .mount(&server)
            .await;

        let result = predict_against(server.uri(), png_fixture(), Duration::from_secs(5))
            .await
            .unwrap();

        let expected = image::load_from_memory(&annotated).unwrap();
        assert_eq!(result.to_rgba8().as_raw(), expected.to_rgba8().as_raw());
    }

    #[tokio::test]
    async fn sends_exactly_one_request_with_exact_file_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_fixture()))
            .mount(&server)
            .await;

        let payload = png_fixture();
        predict_against(server.uri(), payload.clone(), Duration::from_secs(5))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);

        let body = &requests[0].body;
        assert!(contains_subslice(body, &payload));
        assert!(contains_subslice(body, b"name=\"file\""));
        assert!(contains_subslice(body, b"filename=\"photo.png\""));
        assert!(contains_subslice(body, b"image/*"));
    }

    #[tokio::test]
    async fn server_error_carries_status_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = predict_against(server.uri(), png_fixture(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            PredictError::Server { status, message } => {
                assert_eq!(status.as_u16(), 500);
                assert!(message.contains("busy"));
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unanswered_request_is_timeout_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let err = predict_against(server.uri(), png_fixture(), Duration::from_millis(250))
            .await
            .unwrap_err();

        assert!(matches!(err, PredictError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn garbage_response_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
            .mount(&server)
            .await;

        let err = predict_against(server.uri(), png_fixture(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, PredictError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn check_server_returns_status_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Helmet Detection API is running!"
            })))
            .mount(&server)
            .await;

        let url = server.uri();
        let message = tokio::task::spawn_blocking(move || {
            let client = PredictionClient::with_timeout(&url, Duration::from_secs(5)).unwrap();
            client.check_server()
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(message, "Helmet Detection API is running!");
    }
}
