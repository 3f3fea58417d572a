//! Stances the user bookmarks while reading results

use super::Stance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved stance, tagged with the question it came from.
///
/// Identified by the stance id; saving the same stance twice keeps the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    pub id: String,
    pub query: String,
    pub stance: Stance,
    pub saved_at: DateTime<Utc>,
}

impl SavedItem {
    pub fn new(query: impl Into<String>, stance: Stance) -> Self {
        Self {
            id: stance.id.clone(),
            query: query.into(),
            stance,
            saved_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Paper;

    #[test]
    fn id_follows_stance_and_wire_form_is_camel_case() {
        let stance = Stance {
            id: "s-1".into(),
            summary: "for".into(),
            quote: "q".into(),
            paper: Paper::new("10.1/a", "A", vec![], 2020, "abstract"),
        };
        let item = SavedItem::new("Is X effective?", stance);
        assert_eq!(item.id, "s-1");

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["query"], "Is X effective?");
        assert!(json["savedAt"].is_string());
        let back: SavedItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
