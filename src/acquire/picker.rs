// src/acquire/picker.rs
use log::info;

use super::ContentRef;

/// Open the native image picker. `None` means the user dismissed the
/// dialog, which is not an error on the submission path.
pub fn pick_image() -> Option<ContentRef> {
    let path = rfd::FileDialog::new()
        .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "webp"])
        .set_title("Choose a photo")
        .pick_file()?;

    info!("Picked {}", path.display());
    Some(ContentRef::Path(path))
}

/// Read an image off the clipboard. Clipboard content is not file-backed,
/// so the returned reference has to be staged before upload.
#[cfg(feature = "clipboard")]
pub fn clipboard_image() -> Result<ContentRef, super::AcquireError> {
    use super::AcquireError;
    use arboard::Clipboard;
    use image::{DynamicImage, RgbaImage};

    let mut clipboard = Clipboard::new().map_err(|e| AcquireError::Clipboard(e.to_string()))?;
    let raw = clipboard
        .get_image()
        .map_err(|e| AcquireError::Clipboard(e.to_string()))?;

    let rgba = RgbaImage::from_raw(raw.width as u32, raw.height as u32, raw.bytes.into_owned())
        .ok_or_else(|| AcquireError::Clipboard("invalid clipboard buffer".to_string()))?;

    let mut data = Vec::new();
    DynamicImage::ImageRgba8(rgba).write_to(
        &mut std::io::Cursor::new(&mut data),
        image::ImageOutputFormat::Png,
    )?;

    let file_name = format!(
        "clipboard_{}.png",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    info!("Clipboard image read ({} bytes)", data.len());
    Ok(ContentRef::Bytes { file_name, data })
}
