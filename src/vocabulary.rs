use std::collections::HashMap;

/// Labels of the road sign dataset, in class id order
pub const ROAD_SIGN_LABELS: &[&str] = &["trafficlight", "stop", "speedlimit", "crosswalk"];

/// Closed, ordered mapping from class label to class id.
///
/// The id of a label is its position in the list it was built from. Lookups of
/// labels outside the table fail; the table is never extended on the fly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    labels: Vec<String>,
    ids: HashMap<String, usize>,
}

impl ClassVocabulary {
    /// Build a vocabulary from an ordered label list. Duplicates keep their first id.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut ids = HashMap::new();
        for label in labels {
            let label = label.into();
            if ids.contains_key(&label) {
                log::warn!("Duplicate label '{}' in class list ignored", label);
                continue;
            }
            ids.insert(label.clone(), ordered.len());
            ordered.push(label);
        }
        Self {
            labels: ordered,
            ids,
        }
    }

    /// The built-in four class road sign table
    pub fn road_signs() -> Self {
        Self::new(ROAD_SIGN_LABELS.iter().copied())
    }

    /// The given labels, or the road sign table when none are given
    pub fn from_label_list(labels: &[String]) -> Self {
        if labels.is_empty() {
            Self::road_signs()
        } else {
            Self::new(labels.iter().cloned())
        }
    }

    pub fn class_id(&self, label: &str) -> Option<usize> {
        self.ids.get(label).copied()
    }

    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for ClassVocabulary {
    fn default() -> Self {
        Self::road_signs()
    }
}
