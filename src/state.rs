//! Application phase state machine.
//!
//! The UI is a linear flow: idle → processing → result or failed, with manual
//! resets back to idle. The phase is a single sum type so that contradictory
//! combinations (an error while a result is shown, a spinner over a result)
//! cannot be represented at all.

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

/// One uploaded or generated image: raw bytes plus the MIME type they arrived
/// with. Replaced wholesale on every new upload or reset, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageState {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ImageState {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Self-describing inline representation (`data:<mime>;base64,<data>`),
    /// the format the page feeds straight into `<img src>`.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.data)
        )
    }

    /// Filename offered by the download button, derived from the MIME subtype.
    /// An absent subtype falls back to `png`.
    pub fn download_filename(&self) -> String {
        let subtype = self
            .mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty())
            .unwrap_or("png");
        format!("resultado.{subtype}")
    }
}

impl std::fmt::Debug for ImageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageState")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Where the application currently is in the upload → result flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Processing {
        original: ImageState,
    },
    Result {
        original: ImageState,
        generated: ImageState,
    },
    Failed {
        message: String,
    },
}

/// Owns the phase plus a generation epoch. Every transition that leaves
/// `Processing` bumps the epoch, so a generation that was in flight at that
/// moment can no longer land: its `complete`/`fail` carries the old epoch and
/// is discarded. Without this, a slow response could resurrect a result after
/// the user already reset.
pub struct Controller {
    phase: Phase,
    epoch: u64,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Start processing an upload. Allowed from any state; an upload that
    /// arrives while another generation is in flight simply supersedes it.
    /// Returns the epoch the caller must present when the generation settles.
    pub fn begin(&mut self, original: ImageState) -> u64 {
        self.epoch += 1;
        self.phase = Phase::Processing { original };
        self.epoch
    }

    /// A generation finished. Ignored unless `epoch` is still current and the
    /// phase is still `Processing`. The generated image inherits the
    /// original's MIME type: the service echoes pixels, not containers.
    pub fn complete(&mut self, epoch: u64, generated_data: Vec<u8>) {
        if epoch != self.epoch {
            return;
        }
        if let Phase::Processing { original } = &self.phase {
            let generated = ImageState::new(generated_data, original.mime_type.clone());
            self.phase = Phase::Result {
                original: original.clone(),
                generated,
            };
        }
    }

    /// A generation failed. Same staleness rule as [`Controller::complete`].
    pub fn fail(&mut self, epoch: u64, message: impl Into<String>) {
        if epoch != self.epoch {
            return;
        }
        if matches!(self.phase, Phase::Processing { .. }) {
            self.phase = Phase::Failed {
                message: message.into(),
            };
        }
    }

    /// The upload itself could not be read, so there is nothing in flight to
    /// wait for. Ends whatever was happening and shows the error.
    pub fn fail_read(&mut self, message: impl Into<String>) {
        self.epoch += 1;
        self.phase = Phase::Failed {
            message: message.into(),
        };
    }

    /// Back to idle, dropping both images. Bumps the epoch so anything still
    /// in flight is orphaned.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.phase = Phase::Idle;
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire form of [`Phase`] for the front end: images become data URLs, the
/// result carries its derived download filename.
#[derive(Debug, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PhaseView {
    Idle,
    Processing {
        original: String,
    },
    Result {
        original: String,
        generated: String,
        filename: String,
    },
    Failed {
        message: String,
    },
}

impl PhaseView {
    pub fn of(phase: &Phase) -> Self {
        match phase {
            Phase::Idle => PhaseView::Idle,
            Phase::Processing { original } => PhaseView::Processing {
                original: original.data_url(),
            },
            Phase::Result {
                original,
                generated,
            } => PhaseView::Result {
                original: original.data_url(),
                generated: generated.data_url(),
                filename: generated.download_filename(),
            },
            Phase::Failed { message } => PhaseView::Failed {
                message: message.clone(),
            },
        }
    }
}
