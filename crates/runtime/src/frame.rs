use foundation::time::Time;

/// Metadata for one completed draw pass.
///
/// Small and pure so a sequence of frames can be recorded and compared.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based draw index for this chart.
    pub index: u64,
    /// Engine time at the start of the draw.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, time: Time) -> Self {
        Self { index, time }
    }
}

/// What a draw pass reports back to the scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DrawStatus {
    /// Some visible tiles were missing; another pass is owed once they land.
    pub tiles_pending: bool,
}
