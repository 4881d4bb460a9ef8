// =============================================================================
// collection.rs - THE AGGREGATOR
// =============================================================================
//
// Records go in one at a time, in the order the walker visited their pages,
// and come out exactly once as a pretty-printed JSON array. Nothing gets
// reordered, edited or removed in between.
// =============================================================================

use std::path::Path;

use tracing::{debug, info};

use crate::error::PersistError;
use crate::models::CardRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    records: Vec<CardRecord>,
}

impl Collection {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one finished record. There is no way to get it back out mutably.
    pub fn push(&mut self, record: CardRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    /// Serialize the whole ordered array with 2-space indentation.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Write the document to `path` in one go, replacing whatever was there.
    pub async fn persist(&self, path: &Path) -> Result<(), PersistError> {
        let json = self.to_json()?;
        debug!(path = %path.display(), bytes = json.len(), "Writing card collection");

        tokio::fs::write(path, json.as_bytes())
            .await
            .map_err(|source| PersistError::Io { path: path.to_path_buf(), source })?;

        info!(
            path = %path.display(),
            records = self.records.len(),
            "Card collection written - {} cards safely in the binder",
            self.records.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardType, Color, GAME_TAG};
    use uuid::Uuid;

    fn record(set_code: &str) -> CardRecord {
        CardRecord {
            name: format!("Card {set_code}"),
            set_code: set_code.to_string(),
            title_code: set_code.split('/').next().unwrap().to_string(),
            rarity: "C".into(),
            card_type: CardType::Character,
            level: 0,
            cost: None,
            color: Color::Green,
            power: 500,
            soul: 1,
            triggers: vec![],
            text: String::new(),
            traits: String::new(),
            image_url: String::new(),
            game: GAME_TAG,
        }
    }

    #[test]
    fn test_push_preserves_order() {
        let mut collection = Collection::new();
        assert!(collection.is_empty());
        collection.push(record("TSK/S70-E001"));
        collection.push(record("TSK/S70-E002"));
        collection.push(record("TSK/S70-E003"));
        let codes: Vec<_> = collection.records().iter().map(|r| r.set_code.as_str()).collect();
        assert_eq!(codes, vec!["TSK/S70-E001", "TSK/S70-E002", "TSK/S70-E003"]);
    }

    #[test]
    fn test_json_is_an_indented_array() {
        let mut collection = Collection::new();
        collection.push(record("TSK/S70-E001"));
        let json = collection.to_json().unwrap();
        assert!(json.starts_with("[\n  {\n    \"name\""));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["title_code"], "TSK");
        assert_eq!(parsed[0]["game"], "WS");
    }

    #[test]
    fn test_empty_collection_serializes_to_empty_array() {
        assert_eq!(Collection::new().to_json().unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_persist_overwrites_existing_document() {
        let dir = std::env::temp_dir().join(format!("ws-collection-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("data.json");
        tokio::fs::write(&path, "stale").await.unwrap();

        let mut collection = Collection::new();
        collection.push(record("TSK/S70-E001"));
        collection.push(record("TSK/S70-E002"));
        collection.persist(&path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["set_code"], "TSK/S70-E002");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_into_missing_directory_fails() {
        let path = std::env::temp_dir()
            .join(format!("ws-missing-{}", Uuid::new_v4()))
            .join("data.json");
        let err = Collection::new().persist(&path).await.unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }
}
