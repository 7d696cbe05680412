use std::collections::{HashMap, VecDeque};

/// Fixed-capacity sliding window of latency samples per platform.
pub struct LatencyWindow {
    capacity: usize,
    windows: HashMap<String, VecDeque<f64>>,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            windows: HashMap::new(),
        }
    }

    pub fn add(&mut self, name: &str, latency_ms: f64) {
        let window = self
            .windows
            .entry(name.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        if window.len() == self.capacity {
            window.pop_front();
        }
        window.push_back(latency_ms);
    }

    /// Average over the window, ignoring non-positive samples.
    pub fn average(&self, name: &str) -> Option<f64> {
        let window = self.windows.get(name)?;
        let mut sum = 0.0;
        let mut count = 0usize;
        for sample in window.iter().filter(|v| **v > 0.0) {
            sum += sample;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(sum / count as f64)
    }

    pub fn averages(&self) -> HashMap<String, Option<f64>> {
        self.windows
            .keys()
            .map(|name| (name.clone(), self.average(name)))
            .collect()
    }
}
