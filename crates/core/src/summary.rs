use serde::{Deserialize, Serialize};

/// Post-activity reflection: three free-text answers, each with optional photos.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryData {
    pub answer1: String,
    pub answer2: String,
    pub answer3: String,
    pub photos1: Vec<String>,
    pub photos2: Vec<String>,
    pub photos3: Vec<String>,
}

impl SummaryData {
    pub fn is_empty(&self) -> bool {
        self.answer1.is_empty()
            && self.answer2.is_empty()
            && self.answer3.is_empty()
            && self.photos1.is_empty()
            && self.photos2.is_empty()
            && self.photos3.is_empty()
    }

    /// `None` when nothing was written, matching how the collector expects
    /// an absent summary.
    pub fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}
