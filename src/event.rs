//! Infection event records and the sinks that receive them.

use crate::error::SimError;
use crate::run::RunState;

/// One row of output: what happened at one step of one replicate.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EventRecord {
    pub eps: f64,
    /// Only the intermediate model sweeps variance.
    pub var: Option<f64>,
    /// 1-based replicate number within the sweep point.
    pub run: u32,
    /// 1-based step number within the replicate.
    pub step: usize,
    pub vaccinated: bool,
    pub efficacy: f64,
    pub time: f64,
    /// `false` for the padding rows written after the susceptible pool is exhausted.
    pub infected: bool,
}

/// Receives the records of a run as they are produced. `observe` additionally sees the full
/// state of the run: once before the first step and once after every step.
pub trait EventSink {
    fn record(&mut self, record: &EventRecord) -> Result<(), SimError>;

    fn observe(&mut self, _state: &RunState) {}
}

impl EventSink for Vec<EventRecord> {
    fn record(&mut self, record: &EventRecord) -> Result<(), SimError> {
        self.push(*record);
        Ok(())
    }
}
