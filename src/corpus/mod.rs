// src/corpus/mod.rs — Read-only in-memory document store
//
// The full documents the search passages were chunked from, keyed by
// document id. Built offline by the ingestion pipeline; this side only
// reads.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::infra::errors::DossierError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    pub date: String,
    pub link: String,
}

#[derive(Debug)]
pub struct DocumentStore {
    docs: HashMap<String, Document>,
}

impl DocumentStore {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let docs = documents.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self { docs }
    }

    /// Load a corpus from a JSON array of documents.
    pub fn load(path: &Path) -> Result<Self, DossierError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DossierError::Corpus(format!("cannot read {}: {e}", path.display()))
        })?;
        let documents: Vec<Document> = serde_json::from_str(&content)
            .map_err(|e| DossierError::Corpus(format!("invalid corpus JSON: {e}")))?;
        Ok(Self::from_documents(documents))
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.docs.get(id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            title: format!("Title {id}"),
            text: format!("Body {id}"),
            date: "1893-05-02".into(),
            link: format!("https://records.example/{id}"),
        }
    }

    #[test]
    fn test_from_documents_keys_by_id() {
        let store = DocumentStore::from_documents(vec![doc("d1"), doc("d2")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("d1").unwrap().title, "Title d1");
        assert!(store.get("d3").is_none());
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&vec![doc("d1")]).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let store = DocumentStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("d1").unwrap().date, "1893-05-02");
    }

    #[test]
    fn test_load_missing_file_is_corpus_error() {
        let err = DocumentStore::load(Path::new("/nonexistent/corpus.json")).unwrap_err();
        assert!(matches!(err, DossierError::Corpus(_)));
    }

    #[test]
    fn test_load_invalid_json_is_corpus_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let err = DocumentStore::load(file.path()).unwrap_err();
        assert!(matches!(err, DossierError::Corpus(_)));
    }

    #[test]
    fn test_empty_store() {
        let store = DocumentStore::from_documents(vec![]);
        assert!(store.is_empty());
    }
}
