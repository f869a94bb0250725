//! Interface to the statistics sink that accumulates observables.

/// Append-only accumulator of named observables.
///
/// Fills are commutative: the order of fills into the same observable
/// carries no meaning, so independent workers may keep private sinks and
/// merge them.
pub trait StatisticsSink {
    /// Adds one entry to a 1-D observable.
    fn fill_1d(&mut self, name: &str, x: f64) {
        self.fill_1d_weighted(name, x, 1.0);
    }

    /// Adds a weighted entry to a 1-D observable.
    fn fill_1d_weighted(&mut self, name: &str, x: f64, weight: f64);

    /// Adds one entry to a 2-D observable.
    fn fill_2d(&mut self, name: &str, x: f64, y: f64);
}

impl<S: StatisticsSink + ?Sized> StatisticsSink for &mut S {
    fn fill_1d(&mut self, name: &str, x: f64) {
        (**self).fill_1d(name, x);
    }

    fn fill_1d_weighted(&mut self, name: &str, x: f64, weight: f64) {
        (**self).fill_1d_weighted(name, x, weight);
    }

    fn fill_2d(&mut self, name: &str, x: f64, y: f64) {
        (**self).fill_2d(name, x, y);
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatisticsSink for NullSink {
    fn fill_1d_weighted(&mut self, _name: &str, _x: f64, _weight: f64) {}

    fn fill_2d(&mut self, _name: &str, _x: f64, _y: f64) {}
}

/// Composes an observable name from its kind, stage suffix and category label.
///
/// An empty stage suffix yields `kind_label`; otherwise `kind_suffix_label`.
pub fn observable_name(kind: &str, stage_suffix: &str, label: &str) -> String {
    if stage_suffix.is_empty() {
        format!("{kind}_{label}")
    } else {
        format!("{kind}_{stage_suffix}_{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observable_name() {
        assert_eq!(observable_name("dLOR", "", "oPs"), "dLOR_oPs");
        assert_eq!(
            observable_name("dLOR", "afterTOT", "3 hit evts"),
            "dLOR_afterTOT_3 hit evts"
        );
    }
}
