//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use index::{CorpusBackend, CorpusIndex, IndexError, InMemoryBackend};
use plagiarism::{CheckRequest, EngineConfig, JobsConfig, PlagiarismEngine, Scope};

pub const WAIT: Duration = Duration::from_secs(20);

pub const ESSAY: &str = "The industrial revolution transformed rural economies into \
    manufacturing centers. Steam power enabled factories to operate far from rivers. \
    Workers migrated to cities in search of steady wages and new opportunities.";

pub const OTHER_ESSAY: &str = "Coral reefs support a quarter of marine species despite \
    covering a tiny fraction of the ocean floor. Rising water temperatures cause bleaching \
    events that threaten entire ecosystems.";

/// Small fast configuration for tests.
pub fn test_config() -> EngineConfig {
    EngineConfig::default().with_jobs(
        JobsConfig::new()
            .with_workers(4)
            .with_queue_capacity(64)
            .with_timeout(Duration::from_secs(10))
            .with_backoff(Duration::from_millis(5), Duration::from_millis(20), false),
    )
}

pub fn request(id: &str, text: &str) -> CheckRequest {
    CheckRequest::new(id, format!("student-{id}"), Scope::new("cs101", "essay-1"), text)
}

pub fn engine_on(config: EngineConfig, backend: Arc<dyn CorpusBackend>) -> PlagiarismEngine {
    let index = CorpusIndex::with_backend(config.index.clone(), backend).expect("index");
    PlagiarismEngine::with_index(config, Arc::new(index)).expect("engine")
}

/// In-memory backend whose reads can be made slow.
///
/// Slow reads are counted, along with how many ran at the same time.
#[derive(Default)]
pub struct SlowBackend {
    inner: InMemoryBackend,
    slow: AtomicBool,
    delay_ms: AtomicUsize,
    slow_reads: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Self {
        let backend = Self::default();
        backend
            .delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
        backend
    }

    pub fn set_slow(&self, slow: bool) {
        self.slow.store(slow, Ordering::SeqCst);
    }

    pub fn stored(&self) -> usize {
        self.inner.len()
    }

    pub fn slow_reads(&self) -> usize {
        self.slow_reads.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl CorpusBackend for SlowBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        if self.slow.load(Ordering::SeqCst) {
            self.slow_reads.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            let ms = self.delay_ms.load(Ordering::SeqCst) as u64;
            std::thread::sleep(Duration::from_millis(ms));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.inner.delete(key)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.inner.scan(visitor)
    }
}

/// In-memory backend whose first `failures` writes fail.
pub struct FlakyBackend {
    inner: InMemoryBackend,
    failures_left: AtomicUsize,
    pub puts: AtomicUsize,
}

impl FlakyBackend {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: InMemoryBackend::new(),
            failures_left: AtomicUsize::new(failures),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl CorpusBackend for FlakyBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(IndexError::backend("storage unavailable"));
        }
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.inner.delete(key)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.inner.scan(visitor)
    }
}

/// In-memory backend whose writes block until the gate opens.
#[derive(Default)]
pub struct GatedBackend {
    inner: InMemoryBackend,
    open: Mutex<bool>,
    opened: Condvar,
}

impl GatedBackend {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl CorpusBackend for GatedBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.inner.delete(key)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        self.inner.scan(visitor)
    }
}
