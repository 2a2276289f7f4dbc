//! Shared application state

use crate::advisor::Advisor;
use std::time::Instant;

pub struct AppState {
    pub advisor: Advisor,

    /// Server start time, for the health probe
    pub start_time: Instant,
}

impl AppState {
    pub fn new(advisor: Advisor) -> Self {
        Self {
            advisor,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
