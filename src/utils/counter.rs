//! A simple counter for tracking extraction results.

/// A counter for tracking extraction results.
#[derive(Debug, Default)]
pub struct Counter {
    ok: usize,
    skipped: usize,
    warning: usize,
}

impl Counter {
    /// Creates a new Counter instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count of decoded assets.
    pub fn inc_ok(&mut self) {
        self.ok += 1;
    }

    /// Increments the count of assets that could not be decoded.
    pub fn inc_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Increments the count of warnings.
    pub fn inc_warning(&mut self) {
        self.warning += 1;
    }

    pub fn ok(&self) -> usize {
        self.ok
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn warnings(&self) -> usize {
        self.warning
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OK: {}, Skipped: {}, Warning: {}",
            self.ok, self.skipped, self.warning,
        )
    }
}

#[test]
fn test_counter_display() {
    let mut counter = Counter::new();
    counter.inc_ok();
    counter.inc_ok();
    counter.inc_skipped();
    counter.inc_warning();
    assert_eq!(counter.to_string(), "OK: 2, Skipped: 1, Warning: 1");
}
