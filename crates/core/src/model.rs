use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// One glossary term with its taxonomy and related material, in the shape
/// returned to API consumers. Field order is the serialization order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlossaryDocument {
    pub term: Option<String>,
    pub definition: Option<String>,
    pub domain: Option<String>,
    pub kind: Option<String>,
    pub courses: Vec<CourseEntry>,
    /// Directly associated weblinks, passed through as the store returns them.
    pub weblinks: Vec<Value>,
}

/// A course linked to a glossary term. A course with several weblinks is
/// represented by one entry per weblink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseEntry {
    pub title: Option<String>,
    pub short_form: Option<String>,
    pub hve_credits: Option<Number>,
    pub weblink: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryPage {
    pub total: u64,
    pub page: u64,
    pub limit: u32,
    pub data: Vec<GlossaryDocument>,
}

impl GlossaryDocument {
    pub fn term_or_empty(&self) -> &str {
        self.term.as_deref().unwrap_or("")
    }
}
