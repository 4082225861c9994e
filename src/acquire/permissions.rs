// src/acquire/permissions.rs
use log::warn;
use std::fmt;

use super::AcquireError;

/// OS capabilities the acquirer needs before acting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Camera,
    MediaRead,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Camera => write!(f, "camera"),
            Capability::MediaRead => write!(f, "media read"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Grant {
    Granted,
    Denied(String),
}

/// Check-then-request seam over the platform's permission handling.
/// Desktop platforms have no runtime prompt, so `request` resolves the same
/// way as `check`; the seam keeps denial paths testable.
pub trait CapabilityBroker {
    fn check(&self, capability: Capability) -> Grant;

    fn request(&self, capability: Capability) -> Grant {
        self.check(capability)
    }

    /// Single call-site entry point: check, request if missing, abort on
    /// denial. Nothing is scheduled for retry after a denial.
    fn ensure(&self, capability: Capability) -> Result<(), AcquireError> {
        if let Grant::Granted = self.check(capability) {
            return Ok(());
        }
        match self.request(capability) {
            Grant::Granted => Ok(()),
            Grant::Denied(reason) => {
                warn!("{} capability denied: {}", capability, reason);
                Err(AcquireError::PermissionDenied(capability))
            }
        }
    }
}

pub struct DesktopBroker;

impl CapabilityBroker for DesktopBroker {
    fn check(&self, capability: Capability) -> Grant {
        match capability {
            Capability::Camera => match screenshots::Screen::all() {
                Ok(screens) if !screens.is_empty() => Grant::Granted,
                Ok(_) => Grant::Denied("no capture device present".to_string()),
                Err(e) => Grant::Denied(e.to_string()),
            },
            // Completing the native picker dialog is itself the user's grant.
            Capability::MediaRead => Grant::Granted,
        }
    }
}
