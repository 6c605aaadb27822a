use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use crate::core::Document;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid data file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-document JSON persistence.
///
/// `load` and `save` touch the file directly. Handlers go through `read` and
/// `update`, which hold the store mutex for the full load/mutate/save cycle so
/// two requests in the same process cannot interleave their rewrites.
pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, writing the empty default first when the file does
    /// not exist yet. Absent top-level collections come back empty.
    pub async fn load(&self) -> Result<Document, StoreError> {
        let exists = fs::try_exists(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        if !exists {
            tracing::info!(path = %self.path.display(), "creating data file with empty collections");
            self.save(&Document::default()).await?;
        }
        let raw = fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Rewrites the whole file. The document is written to a sibling temp
    /// file first and renamed into place.
    pub async fn save(&self, document: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        let bytes = to_pretty_json(document)?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| self.io_error(source))
    }

    pub async fn read(&self) -> Result<Document, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Load, apply `mutate`, and save. Nothing is written when `mutate` fails.
    pub async fn update<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let output = mutate(&mut document)?;
        self.save(&document).await?;
        Ok(output)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Entry, FixedAmounts, LedgerError, update_expense};
    use serde_json::{Value, json};
    use std::fs as std_fs;
    use tempfile::tempdir;

    fn read_json(path: &Path) -> Value {
        let raw = std_fs::read_to_string(path).expect("data file readable");
        serde_json::from_str(&raw).expect("data file is json")
    }

    #[tokio::test]
    async fn load_creates_default_document_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("dados.json");
        let store = JsonStore::new(&path);

        let document = store.load().await.expect("load succeeds");
        assert_eq!(document, Document::default());
        assert_eq!(
            read_json(&path),
            json!({
                "investimentos": [],
                "gastos": [],
                "ganhos": [],
                "fixos": { "ganhos": 0, "gastos": 0 }
            })
        );
    }

    #[tokio::test]
    async fn load_backfills_missing_key_and_keeps_the_rest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados.json");
        std_fs::write(
            &path,
            r#"{"investimentos": [], "gastos": [{"nome": "Luz", "valor": 120, "data": "2024-01-10"}], "ganhos": []}"#,
        )
        .unwrap();
        let store = JsonStore::new(&path);

        let document = store.load().await.expect("load succeeds");
        assert_eq!(document.fixed, FixedAmounts::default());
        assert_eq!(
            document.expenses,
            vec![Entry {
                name: "Luz".to_string(),
                amount: 120.0,
                date: "2024-01-10".to_string(),
                ..Entry::default()
            }]
        );
    }

    #[tokio::test]
    async fn save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados.json");
        std_fs::write(
            &path,
            r#"{"metas": {"reserva": 10000}, "gastos": [{"nome": "Luz", "valor": 120, "categoria": "casa"}]}"#,
        )
        .unwrap();
        let store = JsonStore::new(&path);

        let document = store.load().await.unwrap();
        store.save(&document).await.unwrap();
        let saved = read_json(&path);
        assert_eq!(saved["metas"], json!({"reserva": 10000}));
        assert_eq!(
            saved["gastos"],
            json!([{"nome": "Luz", "valor": 120, "data": "", "categoria": "casa"}])
        );
    }

    #[tokio::test]
    async fn save_writes_indented_utf8_with_whole_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados.json");
        let store = JsonStore::new(&path);
        let mut document = Document::default();
        document.incomes.push(Entry {
            name: "Salário".to_string(),
            amount: 5000.0,
            date: "2024-01-05".to_string(),
            ..Entry::default()
        });

        store.save(&document).await.unwrap();
        let raw = std_fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Salário"));
        assert!(raw.contains("\n    \"investimentos\""));
        assert!(raw.contains("\"valor\": 5000,"));
        assert!(!dir.path().join("dados.json.tmp").exists());
    }

    #[tokio::test]
    async fn load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados.json");
        std_fs::write(&path, "{ not json").unwrap();
        let store = JsonStore::new(&path);

        let err = store.load().await.expect_err("malformed file");
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[derive(Debug)]
    #[allow(dead_code)]
    enum TestError {
        Store,
        Ledger(LedgerError),
    }

    impl From<StoreError> for TestError {
        fn from(_: StoreError) -> Self {
            TestError::Store
        }
    }

    #[tokio::test]
    async fn failed_update_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados.json");
        let store = JsonStore::new(&path);
        store.load().await.unwrap();
        let before = std_fs::read_to_string(&path).unwrap();

        let result = store
            .update(|doc| {
                doc.fixed.income_total = 1.0;
                update_expense(doc, "Internet", 100.0)
                    .map(|_| ())
                    .map_err(TestError::Ledger)
            })
            .await;
        assert!(matches!(result, Err(TestError::Ledger(_))));
        assert_eq!(std_fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn update_persists_successful_mutation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados.json");
        let store = JsonStore::new(&path);

        let fixed = store
            .update(|doc| {
                doc.fixed.income_total = 8000.0;
                Ok::<_, StoreError>(doc.fixed)
            })
            .await
            .unwrap();
        assert_eq!(fixed.income_total, 8000.0);
        assert_eq!(store.read().await.unwrap().fixed.income_total, 8000.0);
    }
}
