//! Label definitions used to summarise votes.

use serde::{Deserialize, Serialize};

/// A voting label with its permitted range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelType {
    pub name: String,
    pub min: i16,
    pub max: i16,
}

impl LabelType {
    pub fn new(name: &str, min: i16, max: i16) -> Self {
        LabelType {
            name: name.to_string(),
            min,
            max,
        }
    }
}

/// The labels a change is voted on, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTypes(pub Vec<LabelType>);

impl LabelTypes {
    pub fn get(&self, name: &str) -> Option<&LabelType> {
        self.0.iter().find(|l| l.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelType> {
        self.0.iter()
    }
}

impl Default for LabelTypes {
    fn default() -> Self {
        LabelTypes(vec![
            LabelType::new("Code-Review", -2, 2),
            LabelType::new("Verified", -1, 1),
        ])
    }
}
