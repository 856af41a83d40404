//! Aggregate transfer progress.

/// Caption shown once every byte is sent and the server is working.
pub const PROCESSING_CAPTION: &str = "Processing";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressReporter {
    visible: bool,
    percent: f64,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Hide the bars and reset the fill.
    pub fn hide(&mut self) {
        self.visible = false;
        self.percent = 0.0;
    }

    pub fn update(&mut self, percent: f64) {
        let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
        if percent < self.percent {
            log::debug!("Progress went backwards: {:.1} -> {:.1}", self.percent, percent);
        }
        self.percent = percent;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// CSS width of the fill, e.g. `42.5%`.
    pub fn width(&self) -> String {
        format!("{}%", self.percent)
    }

    pub fn caption(&self) -> String {
        if self.percent >= 100.0 {
            PROCESSING_CAPTION.to_string()
        } else {
            format!("{}%", self.percent.floor() as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption() {
        let mut progress = ProgressReporter::new();
        progress.update(0.0);
        assert_eq!(progress.caption(), "0%");
        progress.update(42.7);
        assert_eq!(progress.caption(), "42%");
        progress.update(99.0);
        assert_eq!(progress.caption(), "99%");
        progress.update(100.0);
        assert_eq!(progress.caption(), "Processing");
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut progress = ProgressReporter::new();
        progress.update(140.0);
        assert_eq!(progress.percent(), 100.0);
        progress.update(f64::NAN);
        assert_eq!(progress.caption(), "0%");
        progress.update(-3.0);
        assert_eq!(progress.percent(), 0.0);
    }

    #[test]
    fn test_hide_resets() {
        let mut progress = ProgressReporter::new();
        progress.show();
        progress.update(60.0);
        assert!(progress.is_visible());
        progress.hide();
        assert!(!progress.is_visible());
        assert_eq!(progress.width(), "0%");
    }
}
