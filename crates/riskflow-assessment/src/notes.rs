use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use riskflow_core::ShortId;

/// A free-standing annotation attached to an assessment, independent of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: ShortId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
}

impl Note {
    /// New note with a generated id and the current date.
    pub fn new(title: impl Into<String>, text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: ShortId::new(),
            title: title.into(),
            text: text.into(),
            author: author.into(),
            date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note() {
        let n = Note::new("Read-across", "Analogue found", "mp");
        assert_eq!(n.id.as_str().len(), 10);
        assert_eq!(n.author, "mp");
    }

    #[test]
    fn test_missing_text_fields_default() {
        let n: Note = serde_yaml::from_str("id: ABC\ndate: 2024-03-01T10:00:00Z\n").unwrap();
        assert_eq!(n.id.as_str(), "ABC");
        assert!(n.title.is_empty());
    }
}
