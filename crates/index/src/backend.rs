use crate::IndexError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value storage underneath the corpus index.
///
/// Keys are submission ids; values are encoded [`CorpusEntry`](crate::CorpusEntry)
/// bytes. Every call may fail, which the engine treats as the corpus being
/// temporarily unavailable.
pub trait CorpusBackend: Send + Sync {
    /// Insert or replace the bytes stored under `key`.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError>;
    /// Retrieve the bytes stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;
    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), IndexError>;
    /// Visit every stored value.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;
    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

/// An in-memory backend using a `RwLock` around a `HashMap`.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CorpusBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let guard = self
            .records
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let guard = self
            .records
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for value in guard.values() {
            visitor(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let backend = InMemoryBackend::new();
        backend.put("a", b"one").expect("put");
        assert_eq!(backend.get("a").expect("get"), Some(b"one".to_vec()));
        assert_eq!(backend.len(), 1);

        backend.delete("a").expect("delete");
        backend.delete("missing").expect("deleting a missing key is fine");
        assert!(backend.get("a").expect("get").is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn scan_visits_every_value() {
        let backend = InMemoryBackend::new();
        backend.put("a", b"1").unwrap();
        backend.put("b", b"22").unwrap();

        let mut total = 0;
        backend
            .scan(&mut |bytes| {
                total += bytes.len();
                Ok(())
            })
            .expect("scan");
        assert_eq!(total, 3);
    }

    #[test]
    fn scan_stops_on_visitor_error() {
        let backend = InMemoryBackend::new();
        backend.put("a", b"1").unwrap();
        let err = backend
            .scan(&mut |_| Err(IndexError::backend("stop")))
            .unwrap_err();
        assert!(matches!(err, IndexError::Backend(_)));
    }
}
