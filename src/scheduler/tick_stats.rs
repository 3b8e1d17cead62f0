use std::collections::VecDeque;
use std::time::Duration;

/// Rolling window of physics tick durations
#[derive(Debug, Clone)]
pub struct TickStats {
    window: usize,
    samples: VecDeque<Duration>,
    window_total: Duration,
    ticks: u64,
    overruns: u64,
}

impl TickStats {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            window_total: Duration::ZERO,
            ticks: 0,
            overruns: 0,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.window_total -= oldest;
            }
        }
        self.samples.push_back(duration);
        self.window_total += duration;
        self.ticks += 1;
    }

    /// Count a pass that ran past its tick budget
    pub fn record_overrun(&mut self) {
        self.overruns += 1;
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Ticks recorded since start, including those out of the window
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.window_total / self.samples.len() as u32)
    }

    /// Ticks per second the average tick duration would allow
    pub fn ticks_per_second(&self) -> Option<f64> {
        let average = self.average()?.as_secs_f64();
        if average <= 0.0 {
            return None;
        }
        Some(1.0 / average)
    }
}
