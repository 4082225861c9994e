// src/api/connector.rs
use image::DynamicImage;
use reqwest::StatusCode;
use std::path::Path;
use thiserror::Error;

/// Everything that can go wrong during one submission. A failed submission
/// is terminal; the caller re-enables manual resubmission and nothing is
/// retried automatically.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("could not read image file: {0}")]
    Read(#[from] std::io::Error),
    #[error("request timed out: {0}")]
    Timeout(reqwest::Error),
    #[error("request failed: {0}")]
    Network(reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("response is not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Trait defining the interface for prediction backends
pub trait Predictor: Send + Sync {
    /// Submit one image and return the annotated image the server sends back.
    fn predict(&self, image_data: &[u8], file_name: &str) -> Result<DynamicImage, PredictError>;

    /// Read a local file and submit its bytes, preserving the filename.
    fn predict_file(&self, path: &Path) -> Result<DynamicImage, PredictError> {
        let image_data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.png");
        self.predict(&image_data, file_name)
    }
}
