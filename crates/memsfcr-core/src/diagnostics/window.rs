//! Sliding sample history

use std::collections::VecDeque;

use super::Metric;
use crate::decoder::Sample;

/// Fixed-capacity FIFO of admitted samples
#[derive(Debug, Clone)]
pub struct Window {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Window {
    /// Create a window, capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest when full
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Maximum number of samples held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True until a sample is admitted
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether there is a full window of history
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Oldest sample still held
    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    /// Most recently admitted sample
    pub fn newest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Values of one metric across the window, oldest first
    pub fn series(&self, metric: Metric) -> Vec<f64> {
        self.samples.iter().map(|s| metric.value(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rpm: i32) -> Sample {
        Sample {
            engine_rpm: rpm,
            ..Sample::default()
        }
    }

    #[test]
    fn test_minimum_capacity() {
        let mut window = Window::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(sample(800));
        window.push(sample(900));
        assert_eq!(window.len(), 1);
        assert_eq!(window.newest().map(|s| s.engine_rpm), Some(900));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut window = Window::new(3);
        for rpm in [100, 200, 300, 400] {
            window.push(sample(rpm));
        }
        assert!(window.is_full());
        assert_eq!(window.series(Metric::EngineRpm), vec![200.0, 300.0, 400.0]);
        assert_eq!(window.oldest().map(|s| s.engine_rpm), Some(200));
    }
}
