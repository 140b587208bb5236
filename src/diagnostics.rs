//! Warnings collected while extracting a batch of assets.
//!
//! Recoverable failures are recorded here and logged, so a caller can tell
//! exactly which asset failed and why while the rest of the batch carries on.
use crate::error::Error;
use crate::utils::counter::Counter;
use tracing::warn;

/// One recoverable failure.
#[derive(Debug)]
pub struct Warning {
    /// The asset the failure is about, e.g. a file name or a sprite name.
    pub subject: String,
    pub error: Error,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.error)
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    counter: Counter,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning that does not cost a decoded asset.
    pub fn warn(&mut self, subject: impl Into<String>, error: Error) {
        let warning = Warning {
            subject: subject.into(),
            error,
        };
        warn!("{}", warning);
        self.counter.inc_warning();
        self.warnings.push(warning);
    }

    /// Records an asset that was skipped because it could not be decoded.
    pub fn skip(&mut self, subject: impl Into<String>, error: Error) {
        self.counter.inc_skipped();
        self.warn(subject, error);
    }

    /// Records a successfully decoded asset.
    pub fn decoded(&mut self) {
        self.counter.inc_ok();
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[test]
fn test_diagnostics_tracks_warnings() {
    let mut diag = Diagnostics::new();
    diag.decoded();
    diag.skip("Wolf01", Error::UnrecognizedSpriteType(7));
    diag.warn("v2datai3.dda", Error::MissingArchive(3));
    assert_eq!(diag.warnings().len(), 2);
    assert_eq!(diag.warnings()[0].subject, "Wolf01");
    assert!(matches!(
        diag.warnings()[0].error,
        Error::UnrecognizedSpriteType(7)
    ));
    assert_eq!(diag.counter().to_string(), "OK: 1, Skipped: 1, Warning: 2");
    assert!(!diag.is_clean());
}
