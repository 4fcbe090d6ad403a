//! Load progress events.
//!
//! The loader never renders anything itself. It reports what it is doing
//! per feature to a [`LoadProgress`] sink: an `indicatif` bar in the CLI,
//! [`NullProgress`] everywhere else.

use crate::LoadReport;

/// Receives events from [`crate::load_accidents_with`] and
/// [`crate::parse_accidents_with`].
pub trait LoadProgress: Send + Sync {
    /// The file at `path` is being read.
    fn reading(&self, path: &std::path::Path);

    /// The collection holds `total` features; parsing starts.
    fn parsing(&self, total: u64);

    /// One feature was handled. `kept` is false when it was skipped.
    fn feature(&self, kept: bool);

    /// Parsing finished with the given counts.
    fn finished(&self, report: &LoadReport);
}

/// Discards every event.
pub struct NullProgress;

impl LoadProgress for NullProgress {
    fn reading(&self, _path: &std::path::Path) {}
    fn parsing(&self, _total: u64) {}
    fn feature(&self, _kept: bool) {}
    fn finished(&self, _report: &LoadReport) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{LoadOptions, parse_accidents_with};

    #[derive(Default)]
    struct Recorder {
        total: Mutex<u64>,
        kept: Mutex<u64>,
        skipped: Mutex<u64>,
        report: Mutex<Option<LoadReport>>,
    }

    impl LoadProgress for Recorder {
        fn reading(&self, _path: &std::path::Path) {}

        fn parsing(&self, total: u64) {
            *self.total.lock().unwrap() = total;
        }

        fn feature(&self, kept: bool) {
            let counter = if kept { &self.kept } else { &self.skipped };
            *counter.lock().unwrap() += 1;
        }

        fn finished(&self, report: &LoadReport) {
            *self.report.lock().unwrap() = Some(*report);
        }
    }

    #[test]
    fn events_match_the_load_report() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": null, "properties": {"AccidentUID": "X"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [8.54, 47.37]},
             "properties": {"AccidentUID": "A", "AccidentYear": 2021, "AccidentMonth": 3,
               "AccidentSeverityCategory": "as3", "CantonCode": "ZH",
               "AccidentType": "at0", "RoadType": "rt433"}}
        ]}"#;
        let recorder = Recorder::default();
        let dataset = parse_accidents_with(json, LoadOptions::default(), &recorder).unwrap();

        assert_eq!(*recorder.total.lock().unwrap(), 2);
        assert_eq!(*recorder.kept.lock().unwrap(), 1);
        assert_eq!(*recorder.skipped.lock().unwrap(), 1);
        assert_eq!(*recorder.report.lock().unwrap(), Some(dataset.report));
    }
}
