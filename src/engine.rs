//! Knowledge Engine - 불변 스냅샷 서빙 + 원자적 리로드
//!
//! 단일 작성자 / 다중 독자 모델:
//! - 질의(`answer_query`, `search_medicines`)는 현재 스냅샷의 `Arc`만 복제한 뒤
//!   잠금 없이 계산합니다.
//! - 리로드는 새 스냅샷을 별도로 구축한 뒤 포인터 교체 한 번으로 공개합니다.
//! - 리로드가 실패하면 이전 스냅샷이 계속 서빙됩니다.

use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::knowledge::{
    Answer, KnowledgeBase, KnowledgeStats, LoadError, Medicine, MedicineSearchIndex, RawTables,
    RecommendationComposer, TableSource,
};

// ============================================================================
// Snapshot
// ============================================================================

/// 불변 스냅샷
#[derive(Debug)]
pub struct Snapshot {
    pub kb: KnowledgeBase,
    pub medicine_index: MedicineSearchIndex,
    /// 원시 테이블 지문 (SHA-256)
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    /// 1부터 시작, 리로드 성공마다 증가
    pub generation: u64,
}

impl Snapshot {
    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            generation: self.generation,
            fingerprint: self.fingerprint.clone(),
            loaded_at: self.loaded_at,
            stats: self.kb.stats(),
        }
    }
}

/// 스냅샷 요약 (상태 출력용)
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub generation: u64,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    pub stats: KnowledgeStats,
}

/// 리로드 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// 새 스냅샷 공개
    Reloaded { generation: u64, fingerprint: String },
    /// 소스 변경 없음 (`reload_if_changed`)
    Unchanged,
}

// ============================================================================
// KnowledgeEngine
// ============================================================================

/// 지식 엔진
pub struct KnowledgeEngine {
    source: Box<dyn TableSource>,
    config: EngineConfig,
    composer: RecommendationComposer,
    current: RwLock<Arc<Snapshot>>,
    /// 리로드 직렬화 (공개 순서 보장)
    reload_lock: Mutex<()>,
}

impl KnowledgeEngine {
    /// 소스에서 초기 로드
    pub fn open(source: Box<dyn TableSource>, config: EngineConfig) -> Result<Self, LoadError> {
        let tables = source.read_tables()?;
        let snapshot = build_snapshot(source.as_ref(), tables, 1)?;

        Ok(Self {
            composer: RecommendationComposer::new(&config),
            source,
            config,
            current: RwLock::new(Arc::new(snapshot)),
            reload_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// 현재 스냅샷
    pub fn snapshot(&self) -> Arc<Snapshot> {
        // 보호 값은 항상 완성된 Arc이므로 poison은 무시해도 안전
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// 증상 질의 답변 (매칭 실패도 정상 답변)
    pub fn answer_query(&self, text: &str) -> Answer {
        let snapshot = self.snapshot();
        self.composer.answer(&snapshot.kb, text)
    }

    /// 약재 검색
    pub fn search_medicines(&self, text: &str) -> Vec<Medicine> {
        let snapshot = self.snapshot();
        match self.config.search_limit {
            Some(limit) => snapshot.medicine_index.search_limited(text, limit),
            None => snapshot.medicine_index.search(text),
        }
    }

    /// 무조건 리로드
    ///
    /// 실패하면 에러를 반환하고 이전 스냅샷을 유지합니다.
    pub fn reload(&self) -> Result<ReloadOutcome, LoadError> {
        self.reload_inner(false)
    }

    /// 소스 지문이 바뀐 경우에만 리로드
    pub fn reload_if_changed(&self) -> Result<ReloadOutcome, LoadError> {
        self.reload_inner(true)
    }

    fn reload_inner(&self, only_if_changed: bool) -> Result<ReloadOutcome, LoadError> {
        let _serial = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.snapshot();

        let built = self.source.read_tables().and_then(|tables| {
            if only_if_changed && tables.fingerprint() == previous.fingerprint {
                return Ok(None);
            }
            build_snapshot(self.source.as_ref(), tables, previous.generation + 1).map(Some)
        });

        let snapshot = match built {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("Knowledge source unchanged ({})", previous.fingerprint);
                return Ok(ReloadOutcome::Unchanged);
            }
            Err(e) => {
                tracing::warn!(
                    "Reload from {} failed, keeping generation {}: {}",
                    self.source.describe(),
                    previous.generation,
                    e
                );
                return Err(e);
            }
        };

        let outcome = ReloadOutcome::Reloaded {
            generation: snapshot.generation,
            fingerprint: snapshot.fingerprint.clone(),
        };

        {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            *guard = Arc::new(snapshot);
        }

        tracing::info!("Published knowledge snapshot: {:?}", outcome);
        Ok(outcome)
    }
}

/// 원시 테이블로 스냅샷 구축
fn build_snapshot(
    source: &dyn TableSource,
    tables: RawTables,
    generation: u64,
) -> Result<Snapshot, LoadError> {
    let fingerprint = tables.fingerprint();
    let kb = KnowledgeBase::from_tables(&tables)?;
    let medicine_index = MedicineSearchIndex::build(&kb);

    tracing::info!("Loaded knowledge base from {}: {}", source.describe(), kb.stats());

    Ok(Snapshot {
        kb,
        medicine_index,
        fingerprint,
        loaded_at: Utc::now(),
        generation,
    })
}

// ============================================================================
// Tests
// ============================================================================
