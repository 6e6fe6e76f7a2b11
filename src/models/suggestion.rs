use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionType {
    Query,
    Category,
    Product,
    Vendor,
}

/// Identifiers that let a suggestion act without a text search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionMetadata {
    pub id: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSuggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub count: Option<u64>,
    pub highlight: Option<String>,
    pub metadata: Option<SuggestionMetadata>,
}

impl SearchSuggestion {
    #[must_use]
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SuggestionType::Query,
            count: None,
            highlight: None,
            metadata: None,
        }
    }
}
