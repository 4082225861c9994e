// src/session.rs
use crate::acquire::SelectedImage;

/// Submission lifecycle owned by the UI controller. At most one image is
/// selected at a time, and at most one submission is in flight; the submit
/// control stays disabled until the in-flight attempt finishes.
#[derive(Clone, Debug, Default)]
pub enum Session {
    #[default]
    Idle,
    Selected(SelectedImage),
    Uploading {
        image: SelectedImage,
        next: Option<SelectedImage>,
    },
}

impl Session {
    /// Adopt a new selection, replacing (and dropping) any prior one.
    /// The most recent selection always wins. While an upload is in flight
    /// the new selection is stashed; the session stays in Uploading until
    /// `finish_upload`, so a reselection can never re-enable submission
    /// under a running request.
    pub fn select(&mut self, image: SelectedImage) {
        match self {
            Session::Uploading { next, .. } => *next = Some(image),
            _ => *self = Session::Selected(image),
        }
    }

    /// Move to Uploading. Returns the image to submit, or `None` when
    /// nothing is selected or a submission is already in flight.
    pub fn begin_upload(&mut self) -> Option<SelectedImage> {
        match self {
            Session::Selected(image) => {
                let image = image.clone();
                *self = Session::Uploading {
                    image: image.clone(),
                    next: None,
                };
                Some(image)
            }
            _ => None,
        }
    }

    /// Re-enable submission after a completed attempt, success or failure.
    /// A selection stashed while the upload was in flight takes over.
    pub fn finish_upload(&mut self) {
        if let Session::Uploading { image, next } = self {
            let replacement = next.take().unwrap_or_else(|| image.clone());
            *self = Session::Selected(replacement);
        }
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        match self {
            Session::Idle => None,
            Session::Selected(image) => Some(image),
            Session::Uploading { image, next } => next.as_ref().or(Some(image)),
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(self, Session::Selected(_))
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self, Session::Uploading { .. })
    }

    pub fn clear(&mut self) {
        *self = Session::Idle;
    }
}
