//! Event categories and their display labels.
//!
//! A category has a stable numeric identifier (used as the bin of the
//! category-count histogram) and a stable key. Display labels, which end
//! up in observable names, live in a separate immutable [`LabelTable`]
//! chosen once from the [`AnalysisMode`].

use serde::{Deserialize, Serialize};

/// Mutually exclusive physics category of a three-hit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventCategory {
    /// Not (yet) classified; doubles as the all-events aggregate.
    Unclassified,
    /// Three photons from one ortho-positronium decay.
    OrthoPositronium,
    /// Three back-to-back-family photons from one vertex.
    ParaPositronium,
    /// Two decay photons plus one of them scattered.
    OpsAndScatter,
    /// Back-to-back pair plus one of them scattered.
    BackToBackAndScatter,
    /// Back-to-back pair plus the prompt photon.
    BackToBackAndPrompt,
    /// Two decay photons plus the prompt photon.
    OpsAndPrompt,
    /// Decay photon, prompt photon and the scattered prompt.
    OpsAndScatteredPrompt,
    /// Decay photon, its scatter and the prompt photon.
    OpsScatterAndPrompt,
    /// Back-to-back photon and two generations of its scatter.
    BackToBackAndDoubleScatter,
    /// Decay photon and two generations of its scatter.
    OpsAndDoubleScatter,
    /// Back-to-back photon, its scatter and the prompt photon.
    BackToBackScatterAndPrompt,
    /// Back-to-back photon, prompt photon and the scattered prompt.
    BackToBackPromptAndScatter,
    /// Prompt photon and two generations of its scatter.
    PromptAndDoubleScatter,
    /// Prompt, back-to-back and a doubly scattered prompt.
    BackToBackPromptDoubleScatter,
    /// Prompt, back-to-back and a doubly scattered back-to-back photon.
    PromptBackToBackDoubleScatter,
    /// No composite pattern; all three from one vertex.
    AllThreeSameVertex,
    /// No composite pattern; exactly two from one vertex.
    TwoSameVertex,
    /// No composite pattern; three different vertices.
    NoneSameVertex,
    /// Catch-all bucket; the vertex fallback never assigns it.
    Other,
}

impl EventCategory {
    /// Every category, in identifier order.
    pub const ALL: [Self; 20] = [
        Self::Unclassified,
        Self::OrthoPositronium,
        Self::ParaPositronium,
        Self::OpsAndScatter,
        Self::BackToBackAndScatter,
        Self::BackToBackAndPrompt,
        Self::OpsAndPrompt,
        Self::OpsAndScatteredPrompt,
        Self::OpsScatterAndPrompt,
        Self::BackToBackAndDoubleScatter,
        Self::OpsAndDoubleScatter,
        Self::BackToBackScatterAndPrompt,
        Self::BackToBackPromptAndScatter,
        Self::PromptAndDoubleScatter,
        Self::BackToBackPromptDoubleScatter,
        Self::PromptBackToBackDoubleScatter,
        Self::AllThreeSameVertex,
        Self::TwoSameVertex,
        Self::NoneSameVertex,
        Self::Other,
    ];

    /// Stable numeric identifier, starting at 1.
    ///
    /// Never derived from the enum layout, so reordering variants does not
    /// move histogram bins.
    pub fn id(self) -> u8 {
        match self {
            Self::Unclassified => 1,
            Self::OrthoPositronium => 2,
            Self::ParaPositronium => 3,
            Self::OpsAndScatter => 4,
            Self::BackToBackAndScatter => 5,
            Self::BackToBackAndPrompt => 6,
            Self::OpsAndPrompt => 7,
            Self::OpsAndScatteredPrompt => 8,
            Self::OpsScatterAndPrompt => 9,
            Self::BackToBackAndDoubleScatter => 10,
            Self::OpsAndDoubleScatter => 11,
            Self::BackToBackScatterAndPrompt => 12,
            Self::BackToBackPromptAndScatter => 13,
            Self::PromptAndDoubleScatter => 14,
            Self::BackToBackPromptDoubleScatter => 15,
            Self::PromptBackToBackDoubleScatter => 16,
            Self::AllThreeSameVertex => 17,
            Self::TwoSameVertex => 18,
            Self::NoneSameVertex => 19,
            Self::Other => 20,
        }
    }

    /// Stable machine-readable key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::OrthoPositronium => "ops",
            Self::ParaPositronium => "pps",
            Self::OpsAndScatter => "ops_and_scatter",
            Self::BackToBackAndScatter => "b2b_and_scatter",
            Self::BackToBackAndPrompt => "b2b_and_prompt",
            Self::OpsAndPrompt => "ops_and_prompt",
            Self::OpsAndScatteredPrompt => "ops_and_scattered_prompt",
            Self::OpsScatterAndPrompt => "ops_scatter_and_prompt",
            Self::BackToBackAndDoubleScatter => "b2b_and_2scatter",
            Self::OpsAndDoubleScatter => "ops_and_2scatter",
            Self::BackToBackScatterAndPrompt => "b2b_scatter_and_prompt",
            Self::BackToBackPromptAndScatter => "b2b_prompt_and_scatter",
            Self::PromptAndDoubleScatter => "prompt_and_2scatter",
            Self::BackToBackPromptDoubleScatter => "b2b_prompt_2scatter",
            Self::PromptBackToBackDoubleScatter => "prompt_b2b_2scatter",
            Self::AllThreeSameVertex => "all_same_vertex",
            Self::TwoSameVertex => "two_same_vertex",
            Self::NoneSameVertex => "none_same_vertex",
            Self::Other => "other",
        }
    }

    /// Looks a category up by its identifier.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|category| category.id() == id)
    }
}

/// Whether truth information accompanies the analysed windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Monte-Carlo input with a truth window per time window.
    Simulation,
    /// Measured data; every event stays in the aggregate category.
    #[default]
    Data,
}

const SIMULATION_LABELS: &[(EventCategory, &str)] = &[
    (EventCategory::Unclassified, "3 hit evts"),
    (EventCategory::OrthoPositronium, "oPs"),
    (EventCategory::ParaPositronium, "pPs"),
    (EventCategory::OpsAndScatter, "oPs and scattered photon"),
    (EventCategory::BackToBackAndScatter, "back-to-back and scattered photon"),
    (EventCategory::BackToBackAndPrompt, "back-to-back and prompt photon"),
    (EventCategory::OpsAndPrompt, "oPs and prompt photon"),
    (EventCategory::OpsAndScatteredPrompt, "o-Ps, prompt, sactter prompt"),
    (EventCategory::OpsScatterAndPrompt, "o-Ps, scatter, prompt"),
    (EventCategory::OpsAndDoubleScatter, "oPs and 2 scattered photon"),
    (EventCategory::BackToBackAndDoubleScatter, "back-to-back and 2 scattered photon"),
    (EventCategory::BackToBackScatterAndPrompt, "b2b, b2b scattered and prompt"),
    (EventCategory::BackToBackPromptAndScatter, "b2b, prompt and prompt scatter"),
    (EventCategory::PromptAndDoubleScatter, "prompt and 2 scattered prompt"),
    (EventCategory::PromptBackToBackDoubleScatter, "prmt, b2b, b2b-doubleScat"),
    (EventCategory::BackToBackPromptDoubleScatter, "b2b, prmt, prmt-doubleScat"),
    (EventCategory::AllThreeSameVertex, "3g from same vtx"),
    (EventCategory::TwoSameVertex, "Any two from same vtx"),
    (EventCategory::NoneSameVertex, "all from different vtx"),
    (EventCategory::Other, "other evts"),
];

const DATA_LABELS: &[(EventCategory, &str)] = &[(EventCategory::Unclassified, "3 hit evts")];

/// Immutable category → display label mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTable {
    entries: &'static [(EventCategory, &'static str)],
}

impl LabelTable {
    /// Labels for every category (simulation runs).
    #[must_use]
    pub fn simulation() -> Self {
        Self {
            entries: SIMULATION_LABELS,
        }
    }

    /// Labels for measured data: only the aggregate category exists.
    #[must_use]
    pub fn data() -> Self {
        Self {
            entries: DATA_LABELS,
        }
    }

    /// Picks the table for an analysis mode.
    #[must_use]
    pub fn for_mode(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::Simulation => Self::simulation(),
            AnalysisMode::Data => Self::data(),
        }
    }

    /// Returns the display label of a category, if the table knows it.
    pub fn get(&self, category: EventCategory) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, label)| *label)
    }

    /// Returns the display label, falling back to the stable key.
    pub fn label(&self, category: EventCategory) -> &'static str {
        self.get(category).unwrap_or_else(|| category.key())
    }

    /// Iterates over the categories and labels in the table.
    pub fn iter(&self) -> impl Iterator<Item = (EventCategory, &'static str)> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_and_round_trip() {
        let ids: HashSet<u8> = EventCategory::ALL.iter().map(|c| c.id()).collect();
        assert_eq!(ids.len(), EventCategory::ALL.len());
        for category in EventCategory::ALL {
            assert_eq!(EventCategory::from_id(category.id()), Some(category));
        }
        assert_eq!(EventCategory::from_id(0), None);
    }

    #[test]
    fn test_simulation_table_covers_every_category() {
        let table = LabelTable::simulation();
        for category in EventCategory::ALL {
            assert!(table.get(category).is_some(), "{category:?} has no label");
        }
        assert_eq!(table.label(EventCategory::OrthoPositronium), "oPs");
    }

    #[test]
    fn test_labels_match_published_histogram_names() {
        let table = LabelTable::simulation();
        assert_eq!(
            table.label(EventCategory::OpsAndScatteredPrompt),
            "o-Ps, prompt, sactter prompt"
        );
        assert_eq!(table.label(EventCategory::OpsScatterAndPrompt), "o-Ps, scatter, prompt");
        assert_eq!(table.label(EventCategory::Other), "other evts");
    }

    #[test]
    fn test_data_table_only_has_aggregate() {
        let table = LabelTable::for_mode(AnalysisMode::Data);
        assert_eq!(table.iter().count(), 1);
        assert_eq!(table.label(EventCategory::Unclassified), "3 hit evts");
        assert_eq!(table.get(EventCategory::OrthoPositronium), None);
        assert_eq!(table.label(EventCategory::OrthoPositronium), "ops");
    }
}
