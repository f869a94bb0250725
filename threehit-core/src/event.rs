//! Coincidence events and the time windows that carry them.

use crate::error::{Error, Result};
use crate::hit::{Hit, TruthHit};

/// A group of hits attributed to one physical annihilation or decay.
///
/// The core analysis only inspects three-hit events, but events of any
/// multiplicity flow through the window so that single-hit and
/// multi-hit tallies can be kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    hits: Vec<Hit>,
}

impl Event {
    /// Creates an event from its hits, preserving their order.
    #[must_use]
    pub fn new(hits: Vec<Hit>) -> Self {
        Self { hits }
    }

    /// Returns the hits.
    #[inline]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Returns the number of hits.
    #[inline]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the event holds no hits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns the hits as a fixed triple, if the event has exactly three.
    #[inline]
    pub fn as_triple(&self) -> Option<&[Hit; 3]> {
        self.hits.as_slice().try_into().ok()
    }

    /// Returns the hits as a fixed triple.
    ///
    /// # Errors
    /// Returns [`Error::NotThreeHits`] for any other multiplicity.
    pub fn triple(&self) -> Result<&[Hit; 3]> {
        self.as_triple().ok_or(Error::NotThreeHits(self.hits.len()))
    }
}

impl FromIterator<Hit> for Event {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

/// Ordered sequence of events built from one acquisition time window.
#[derive(Debug, Clone, Default)]
pub struct TimeWindow {
    events: Vec<Event>,
}

impl TimeWindow {
    /// Creates a window from events in arrival order.
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Appends an event.
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Returns the events in arrival order.
    #[inline]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns the number of events.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the window holds no events.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Truth records of a simulated time window, addressed by index.
#[derive(Debug, Clone, Default)]
pub struct TruthWindow {
    hits: Vec<TruthHit>,
}

impl TruthWindow {
    /// Creates a truth window.
    #[must_use]
    pub fn new(hits: Vec<TruthHit>) -> Self {
        Self { hits }
    }

    /// Returns the number of truth hits.
    #[inline]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the window holds no truth hits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Looks up a truth hit by index.
    ///
    /// # Errors
    /// Returns [`Error::TruthIndexOutOfRange`] if `index` is past the end.
    pub fn get(&self, index: usize) -> Result<&TruthHit> {
        self.hits.get(index).ok_or(Error::TruthIndexOutOfRange {
            index,
            len: self.hits.len(),
        })
    }

    /// Resolves the truth records behind three hits, in hit order.
    ///
    /// # Errors
    /// Fails if any hit lacks a truth link or points outside the window.
    pub fn resolve(&self, hits: &[Hit; 3]) -> Result<[TruthHit; 3]> {
        let mut resolved = [TruthHit::new(0, 0); 3];
        for (slot, (i, hit)) in resolved.iter_mut().zip(hits.iter().enumerate()) {
            let index = hit.truth_index.ok_or(Error::MissingTruthLink { hit: i })?;
            *slot = *self.get(index)?;
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn hit(truth: Option<usize>) -> Hit {
        let hit = Hit::new(Vector3::new(40.0, 0.0, 0.0), 0.0, 200.0, 10.0);
        match truth {
            Some(index) => hit.with_truth_index(index),
            None => hit,
        }
    }

    #[test]
    fn test_triple_access() {
        let event: Event = (0..3).map(|_| hit(None)).collect();
        assert_eq!(event.len(), 3);
        assert!(event.as_triple().is_some());

        let pair = Event::new(vec![hit(None), hit(None)]);
        assert!(pair.as_triple().is_none());
        assert!(matches!(pair.triple(), Err(Error::NotThreeHits(2))));
    }

    #[test]
    fn test_resolve_truth() {
        let truth = TruthWindow::new(vec![
            TruthHit::new(1, 3),
            TruthHit::new(1, 3),
            TruthHit::new(2, 103),
        ]);
        let hits = [hit(Some(2)), hit(Some(0)), hit(Some(1))];
        let resolved = truth.resolve(&hits).unwrap();
        assert_eq!(resolved[0].vertex_index, 2);
        assert_eq!(resolved[0].multiplicity.code(), 103);
        assert_eq!(resolved[1].vertex_index, 1);
    }

    #[test]
    fn test_resolve_missing_link() {
        let truth = TruthWindow::new(vec![TruthHit::new(1, 3)]);
        let hits = [hit(Some(0)), hit(None), hit(Some(0))];
        assert!(matches!(
            truth.resolve(&hits),
            Err(Error::MissingTruthLink { hit: 1 })
        ));

        let hits = [hit(Some(0)), hit(Some(0)), hit(Some(5))];
        assert!(matches!(
            truth.resolve(&hits),
            Err(Error::TruthIndexOutOfRange { index: 5, len: 1 })
        ));
    }
}
