//! Student identifiers.
//!
//! Идентификатор — непрозрачная строка; уникальность обеспечивается только
//! размером пространства (UUID v4), проверки по таблице нет.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh identifiers. Thread-safe.
pub trait IdSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4, hyphenated lowercase (default for the service).
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic ids in UUID shape: 00000000-0000-4000-8000-<counter:012x>.
/// Удобен для тестов.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn starting_at(n: u64) -> Self {
        Self {
            next: AtomicU64::new(n),
        }
    }
}

impl IdSource for SequentialIds {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("00000000-0000-4000-8000-{:012x}", n & 0xFFFF_FFFF_FFFF)
    }
}
