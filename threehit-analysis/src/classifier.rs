//! Monte-Carlo truth classification of three-hit events.
//!
//! Classification looks only at the generated-gamma multiplicity code and
//! the vertex index of each hit's truth record. Composite topologies are
//! described by a declarative [`RULES`] table: a code pattern, the set of
//! hit orderings it may match under, and the vertex constraint on the
//! reordered hits. Rules are evaluated in table order and the last match
//! wins; every match is recorded so ambiguity stays observable.

use log::warn;
use threehit_core::{EventCategory, TruthHit};

/// Hit orderings a rule is tried under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermutationSet {
    /// Hit order as given.
    Identity,
    /// The three cyclic-style orderings `{0,1,2}`, `{0,2,1}`, `{1,2,0}`.
    Cyclic,
    /// All six orderings.
    All,
}

impl PermutationSet {
    const IDENTITY: [[usize; 3]; 1] = [[0, 1, 2]];
    const CYCLIC: [[usize; 3]; 3] = [[0, 1, 2], [0, 2, 1], [1, 2, 0]];
    const ALL: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    /// The orderings in evaluation order.
    pub fn orderings(self) -> &'static [[usize; 3]] {
        match self {
            Self::Identity => &Self::IDENTITY,
            Self::Cyclic => &Self::CYCLIC,
            Self::All => &Self::ALL,
        }
    }
}

/// Vertex requirement on the reordered hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexConstraint {
    /// No requirement.
    None,
    /// All three hits share one vertex.
    AllEqual,
    /// The first two reordered hits share a vertex.
    FirstTwoEqual,
}

impl VertexConstraint {
    fn holds(self, vertices: [i32; 3]) -> bool {
        match self {
            Self::None => true,
            Self::AllEqual => vertices[0] == vertices[1] && vertices[1] == vertices[2],
            Self::FirstTwoEqual => vertices[0] == vertices[1],
        }
    }
}

/// One composite-topology pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// Multiplicity codes required in reordered hit order.
    pub codes: [i32; 3],
    /// Orderings tried.
    pub permutations: PermutationSet,
    /// Vertex requirement checked on the reordered hits.
    pub vertices: VertexConstraint,
    /// Category assigned on match.
    pub category: EventCategory,
}

impl Rule {
    const fn new(
        codes: [i32; 3],
        permutations: PermutationSet,
        vertices: VertexConstraint,
        category: EventCategory,
    ) -> Self {
        Self {
            codes,
            permutations,
            vertices,
            category,
        }
    }

    /// True if the rule matches under any of its orderings.
    pub fn matches(&self, codes: [i32; 3], vertices: [i32; 3]) -> bool {
        self.permutations.orderings().iter().any(|order| {
            order.map(|i| codes[i]) == self.codes && self.vertices.holds(order.map(|i| vertices[i]))
        })
    }
}

use EventCategory as C;
use PermutationSet as P;
use VertexConstraint as V;

/// Composite-topology rules in evaluation order.
pub const RULES: [Rule; 15] = [
    Rule::new([3, 3, 3], P::Identity, V::AllEqual, C::OrthoPositronium),
    Rule::new([2, 2, 2], P::Identity, V::AllEqual, C::ParaPositronium),
    Rule::new([3, 3, 103], P::Cyclic, V::FirstTwoEqual, C::OpsAndScatter),
    Rule::new([2, 2, 102], P::Cyclic, V::FirstTwoEqual, C::BackToBackAndScatter),
    Rule::new([2, 2, 1], P::Cyclic, V::FirstTwoEqual, C::BackToBackAndPrompt),
    Rule::new([3, 3, 1], P::Cyclic, V::FirstTwoEqual, C::OpsAndPrompt),
    Rule::new([3, 103, 203], P::All, V::None, C::OpsAndDoubleScatter),
    Rule::new([3, 1, 101], P::All, V::None, C::OpsAndScatteredPrompt),
    Rule::new([3, 103, 1], P::All, V::None, C::OpsScatterAndPrompt),
    Rule::new([2, 102, 202], P::All, V::None, C::BackToBackAndDoubleScatter),
    Rule::new([1, 101, 201], P::All, V::None, C::PromptAndDoubleScatter),
    Rule::new([2, 102, 1], P::All, V::None, C::BackToBackScatterAndPrompt),
    Rule::new([2, 1, 101], P::All, V::None, C::BackToBackPromptAndScatter),
    Rule::new([1, 2, 202], P::All, V::None, C::PromptBackToBackDoubleScatter),
    Rule::new([1, 2, 201], P::All, V::None, C::BackToBackPromptDoubleScatter),
];

/// Outcome of classifying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Final category.
    pub category: EventCategory,
    /// Categories of every rule that matched, in evaluation order.
    pub matches: Vec<EventCategory>,
}

impl Classification {
    /// True when more than one rule matched.
    pub fn is_ambiguous(&self) -> bool {
        self.matches.len() > 1
    }
}

/// Assigns a category from the truth records of an event's three hits.
#[derive(Debug, Clone, Copy)]
pub struct VertexTopologyClassifier {
    rules: &'static [Rule],
}

impl Default for VertexTopologyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexTopologyClassifier {
    /// Creates a classifier over the standard rule table.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: &RULES }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    /// Classifies an event. Total: always yields a category.
    pub fn classify(&self, truth: &[TruthHit; 3]) -> Classification {
        let codes = truth.each_ref().map(|t| t.multiplicity.code());
        let vertices = truth.each_ref().map(|t| t.vertex_index);

        let mut category = EventCategory::Unclassified;
        let mut matches = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.matches(codes, vertices)) {
            if category != EventCategory::Unclassified {
                warn!(
                    "ambiguous truth topology codes={codes:?} vertices={vertices:?}: {:?} overrides {category:?}",
                    rule.category
                );
            }
            category = rule.category;
            matches.push(rule.category);
        }

        if category == EventCategory::Unclassified {
            category = fallback_category(vertices);
        }

        Classification { category, matches }
    }
}

/// Category for events no composite rule describes, from vertex sharing alone.
///
/// Only index equality matters, never the index value.
pub fn fallback_category(vertices: [i32; 3]) -> EventCategory {
    let [v1, v2, v3] = vertices;
    if v1 == v2 && v2 == v3 {
        EventCategory::AllThreeSameVertex
    } else if v1 == v2 || v2 == v3 || v1 == v3 {
        EventCategory::TwoSameVertex
    } else {
        EventCategory::NoneSameVertex
    }
}
