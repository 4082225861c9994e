// src/acquire/camera.rs
use image::{DynamicImage, RgbaImage};
use log::info;
use screenshots::Screen;

use super::{storage_dir, AcquireError, SelectedImage, Source};

/// Capture one frame from the primary device and write it to a
/// time-stamped file in the private picture directory. The path is known
/// as soon as the capture completes.
pub fn capture_photo() -> Result<SelectedImage, AcquireError> {
    let screens = Screen::all().map_err(|e| AcquireError::Capture(e.to_string()))?;
    let screen = screens.first().ok_or(AcquireError::NoDevice)?;

    info!("Capturing from primary device");
    let frame = screen
        .capture()
        .map_err(|e| AcquireError::Capture(e.to_string()))?;

    let width = frame.width() as u32;
    let height = frame.height() as u32;

    // The capture buffer is BGRA
    let buffer = frame.as_raw().to_vec();
    let mut rgba_buffer = Vec::with_capacity(buffer.len());
    for chunk in buffer.chunks(4) {
        if chunk.len() == 4 {
            rgba_buffer.push(chunk[2]); // R
            rgba_buffer.push(chunk[1]); // G
            rgba_buffer.push(chunk[0]); // B
            rgba_buffer.push(chunk[3]); // A
        }
    }

    let rgba = RgbaImage::from_raw(width, height, rgba_buffer)
        .ok_or_else(|| AcquireError::Capture("invalid frame buffer".to_string()))?;
    let photo = DynamicImage::ImageRgba8(rgba);

    let dir = storage_dir()?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("photo_{}.png", stamp));
    photo.save_with_format(&path, image::ImageFormat::Png)?;

    info!("Photo captured: {}x{} -> {}", width, height, path.display());
    Ok(SelectedImage::from_path(path, Source::Camera))
}
