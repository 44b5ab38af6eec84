//! CLI-specific progress handling for butterfly-edges
//!
//! Record sources have no known length up front, so progress is a spinner
//! counting processed records.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Creates a spinner counting records
pub fn create_record_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} records {msg}")
    {
        pb.set_style(style);
    }
    pb
}

/// Progress of an import run
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    pub fn new(message: &str) -> Self {
        let pb = create_record_spinner();
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        Self { pb }
    }

    /// Progress manager that draws nothing
    pub fn hidden() -> Self {
        let pb = create_record_spinner();
        pb.set_draw_target(ProgressDrawTarget::hidden());
        Self { pb }
    }

    pub fn set_stage(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    pub fn record(&self) {
        self.pb.inc(1);
    }

    pub fn records(&self) -> u64 {
        self.pb.position()
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_counts_records() {
        let manager = ProgressManager::hidden();
        manager.record();
        manager.record();
        manager.set_stage("edges.xml");
        assert_eq!(manager.records(), 2);
        manager.finish();
    }

    #[test]
    fn test_spinner_has_no_length() {
        let pb = create_record_spinner();
        assert!(pb.length().is_none());
        pb.finish();
    }
}
