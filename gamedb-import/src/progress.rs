//! Progress reporting for batch passes.

/// Receives progress updates while a batch pass walks its listings.
pub trait IngestProgress {
    /// Called after each listing is processed.
    fn on_listing(&self, current: usize, total: usize, name: &str);

    /// Called when a pass starts (e.g., "Organizing 120 listings").
    fn on_phase(&self, message: &str);

    /// Called when the pass is complete.
    fn on_complete(&self, message: &str);
}

/// Discards all updates.
pub struct SilentProgress;

impl IngestProgress for SilentProgress {
    fn on_listing(&self, _current: usize, _total: usize, _name: &str) {}
    fn on_phase(&self, _message: &str) {}
    fn on_complete(&self, _message: &str) {}
}

/// Reports through the `log` crate.
pub struct LogProgress;

impl IngestProgress for LogProgress {
    fn on_listing(&self, current: usize, total: usize, name: &str) {
        if current.is_multiple_of(50) || current == total {
            log::info!("  [{}/{}] {}", current, total, name);
        }
    }

    fn on_phase(&self, message: &str) {
        log::info!("{}", message);
    }

    fn on_complete(&self, message: &str) {
        log::info!("{}", message);
    }
}
