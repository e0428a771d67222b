use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{PensignError, PensignResult};

/// Transition observed between two presence probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// The artifact became reachable since the previous poll
    Attached,
    /// The artifact stopped being reachable since the previous poll
    Detached,
}

/// Presence watcher for the private artifact on removable media
///
/// Wraps a single path and turns repeated probes into attach/detach edges.
/// The watcher holds no OS handles; each poll is an independent filesystem
/// probe, so unplugging the media between polls is observed on the next
/// call, never earlier.
#[derive(Debug, Clone)]
pub struct MediaWatcher {
    artifact_path: PathBuf,
    last_present: Option<bool>,
}

impl MediaWatcher {
    /// Watch `artifact_path` for presence changes
    ///
    /// The first [`poll`](Self::poll) establishes the baseline and reports
    /// an edge only if the artifact is present, so a watcher started with
    /// the media already attached fires `Attached` once.
    pub fn new<P: Into<PathBuf>>(artifact_path: P) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            last_present: None,
        }
    }

    /// Path this watcher probes
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Probe the artifact path right now
    pub fn is_present(&self) -> bool {
        self.artifact_path.is_file()
    }

    /// Probe and report the edge since the previous poll, if any
    ///
    /// Returns `None` while the presence state is unchanged. Absent on the
    /// very first poll is treated as the steady state, not a detach.
    pub fn poll(&mut self) -> Option<MediaEvent> {
        let present = self.is_present();
        let event = match (self.last_present, present) {
            (Some(false) | None, true) => Some(MediaEvent::Attached),
            (Some(true), false) => Some(MediaEvent::Detached),
            _ => None,
        };
        self.last_present = Some(present);

        if let Some(event) = event {
            info!(
                "removable media {:?} at {}",
                event,
                self.artifact_path.display()
            );
        }
        event
    }

    /// Guard for decryption and signing: fail unless the artifact is here
    ///
    /// # Errors
    ///
    /// `ArtifactUnavailable` when the artifact path does not resolve to a
    /// file. Callers retry after the user reattaches the media; nothing is
    /// cached, so a reattach is picked up by the next call.
    pub fn require_present(&self) -> PensignResult<()> {
        require_present(&self.artifact_path)
    }
}

/// One-shot presence guard, for callers without a watcher
pub fn require_present(artifact_path: &Path) -> PensignResult<()> {
    if artifact_path.is_file() {
        Ok(())
    } else {
        debug!(
            "private artifact not reachable at {}",
            artifact_path.display()
        );
        Err(PensignError::ArtifactUnavailable {
            path: artifact_path.display().to_string(),
        })
    }
}
