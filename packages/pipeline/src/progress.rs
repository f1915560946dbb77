//! Stage-level progress events.
//!
//! [`crate::run`] announces its plan, then every stage as it starts and
//! completes. Rendering lives elsewhere (the CLI draws an `indicatif` bar);
//! tests use [`NullProgress`] or record the events.

use std::path::Path;
use std::sync::Arc;

use crate::Stage;

/// Receives pipeline stage events. Shared behind an `Arc`, so it must be
/// `Send + Sync`.
pub trait StageProgress: Send + Sync {
    /// The stages about to run, in execution order.
    fn planned(&self, stages: &[Stage]);

    /// `stage` has started.
    fn started(&self, stage: Stage);

    /// `stage` has finished and its outputs are written.
    fn completed(&self, stage: Stage);

    /// Every planned stage ran; outputs are under `out_dir`.
    fn finished(&self, out_dir: &Path);
}

/// Ignores every event.
pub struct NullProgress;

impl StageProgress for NullProgress {
    fn planned(&self, _stages: &[Stage]) {}
    fn started(&self, _stage: Stage) {}
    fn completed(&self, _stage: Stage) {}
    fn finished(&self, _out_dir: &Path) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn StageProgress> {
    Arc::new(NullProgress)
}
