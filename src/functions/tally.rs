/// Running sum and count of the values that contributed to an average.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    sum: f64,
    count: u64,
}

impl Tally {
    /// Adds `value` as if it had been seen `times` times.
    pub fn add(&mut self, value: f64, times: u64) {
        self.sum += value * times as f64;
        self.count += times;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Arithmetic mean of the contributed values. Returns 0.0 when nothing
    /// contributed.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }
}
