//! Rewrite actions and the catalogue the agents choose from.
use crate::error::RequeryError;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// A query rewrite.
///
/// Actions are plain data so that trajectories and checkpoints can record which rewrite
/// was taken without holding a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewriteAction {
    /// Appends `suffix` to the query, separated by a single space.
    Append {
        /// Name used in logs.
        label: String,
        /// Words to append.
        suffix: String,
    },

    /// Replaces every occurrence of `pattern` with `replacement`.
    ///
    /// Matching is on raw substrings, not on tokens.
    Replace {
        /// Name used in logs.
        label: String,
        /// Substring to look for.
        pattern: String,
        /// Substitute.
        replacement: String,
    },

    /// Leaves the query unchanged.
    NoOp,
}

impl RewriteAction {
    /// Appending action.
    pub fn append(label: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::Append {
            label: label.into(),
            suffix: suffix.into(),
        }
    }

    /// Substring replacement action.
    pub fn replace(
        label: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::Replace {
            label: label.into(),
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    /// Applies the rewrite to `query`.
    pub fn apply(&self, query: &str) -> String {
        match self {
            Self::Append { suffix, .. } => format!("{} {}", query, suffix),
            Self::Replace {
                pattern,
                replacement,
                ..
            } => query.replace(pattern.as_str(), replacement),
            Self::NoOp => query.to_string(),
        }
    }

    /// Name of the action.
    pub fn name(&self) -> &str {
        match self {
            Self::Append { label, .. } | Self::Replace { label, .. } => label,
            Self::NoOp => "no_op",
        }
    }

    /// Returns `true` for the identity action.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

/// Ordered, immutable set of rewrite actions.
///
/// Actions are referred to by their index in the catalogue everywhere else in the
/// library: probability vectors, value tables and transitions all use the same indices.
/// A catalogue always contains the identity action so that a policy can choose to keep
/// the query as it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RewriteAction>", into = "Vec<RewriteAction>")]
pub struct ActionCatalogue {
    actions: Vec<RewriteAction>,
}

impl ActionCatalogue {
    /// Builds a catalogue, failing if no [`RewriteAction::NoOp`] is present.
    pub fn new(actions: Vec<RewriteAction>) -> Result<Self, RequeryError> {
        if !actions.iter().any(RewriteAction::is_identity) {
            return Err(RequeryError::MissingIdentityAction);
        }
        Ok(Self { actions })
    }

    /// The number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always `false`, a valid catalogue holds at least the identity action.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the action at `index`.
    pub fn get(&self, index: usize) -> Result<&RewriteAction, RequeryError> {
        self.actions.get(index).ok_or(RequeryError::InvalidAction {
            index,
            count: self.actions.len(),
        })
    }

    /// Applies the action at `index` to `query`.
    pub fn apply(&self, index: usize, query: &str) -> Result<String, RequeryError> {
        Ok(self.get(index)?.apply(query))
    }

    /// Index of the first identity action.
    pub fn identity_index(&self) -> usize {
        self.actions
            .iter()
            .position(RewriteAction::is_identity)
            .unwrap_or_default()
    }

    /// Iterates over the actions in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, RewriteAction> {
        self.actions.iter()
    }
}

impl Default for ActionCatalogue {
    /// The medical-domain catalogue.
    fn default() -> Self {
        Self {
            actions: vec![
                RewriteAction::append("add_domain_terms", "type 2 metformin first line treatment"),
                RewriteAction::append(
                    "add_guideline_terms",
                    "clinical guideline recommended therapy",
                ),
                RewriteAction::replace("expand_acronyms", "dm", "diabetes mellitus"),
                RewriteAction::NoOp,
            ],
        }
    }
}

impl TryFrom<Vec<RewriteAction>> for ActionCatalogue {
    type Error = RequeryError;

    fn try_from(actions: Vec<RewriteAction>) -> Result<Self, Self::Error> {
        Self::new(actions)
    }
}

impl From<ActionCatalogue> for Vec<RewriteAction> {
    fn from(catalogue: ActionCatalogue) -> Self {
        catalogue.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue() {
        let catalogue = ActionCatalogue::default();
        assert_eq!(catalogue.len(), 4);
        assert_eq!(catalogue.identity_index(), 3);

        let names: Vec<_> = catalogue.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            ["add_domain_terms", "add_guideline_terms", "expand_acronyms", "no_op"]
        );
    }

    #[test]
    fn test_apply() {
        let catalogue = ActionCatalogue::default();
        assert_eq!(
            catalogue.apply(0, "treatment for diabetes").unwrap(),
            "treatment for diabetes type 2 metformin first line treatment"
        );
        assert_eq!(
            catalogue.apply(2, "dm treatment").unwrap(),
            "diabetes mellitus treatment"
        );
        assert_eq!(catalogue.apply(3, "dm treatment").unwrap(), "dm treatment");
    }

    #[test]
    fn test_invalid_index() {
        let catalogue = ActionCatalogue::default();
        match catalogue.apply(4, "q") {
            Err(RequeryError::InvalidAction { index, count }) => {
                assert_eq!((index, count), (4, 4));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_identity_required() {
        let actions = vec![RewriteAction::append("more", "words")];
        assert!(matches!(
            ActionCatalogue::new(actions),
            Err(RequeryError::MissingIdentityAction)
        ));
    }

    #[test]
    fn test_yaml_round_trip_validates() {
        let yaml = serde_yaml::to_string(&ActionCatalogue::default()).unwrap();
        let catalogue: ActionCatalogue = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(catalogue, ActionCatalogue::default());

        let bad = serde_yaml::to_string(&vec![RewriteAction::append("a", "b")]).unwrap();
        assert!(serde_yaml::from_str::<ActionCatalogue>(&bad).is_err());
    }
}
