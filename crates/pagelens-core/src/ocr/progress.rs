//! Recognition progress reporting.

/// Receiver of recognition progress, in percent.
pub trait ProgressSink {
    fn on_progress(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn on_progress(&mut self, percent: u8) {
        self(percent)
    }
}

/// Adapts raw backend progress into well-formed caller notifications.
///
/// Values are clamped to 0..=100 and never go backwards. [`finish`] always
/// delivers a final 100, whether or not the backend already reported it.
///
/// [`finish`]: ProgressMonitor::finish
pub struct ProgressMonitor<'a> {
    sink: &'a mut dyn ProgressSink,
    last: Option<u8>,
}

impl<'a> ProgressMonitor<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self { sink, last: None }
    }

    /// Forward a backend value.
    pub fn report(&mut self, percent: i32) {
        let percent = percent.clamp(0, 100) as u8;
        let percent = self.last.map_or(percent, |last| percent.max(last));
        self.last = Some(percent);
        self.sink.on_progress(percent);
    }

    /// Deliver the terminal notification.
    pub fn finish(self) {
        self.sink.on_progress(100);
    }
}

impl ProgressSink for ProgressMonitor<'_> {
    fn on_progress(&mut self, percent: u8) {
        self.report(percent as i32);
    }
}
