//! ayur-kb - 증상 기반 아유르베다 진단 지식 엔진
//!
//! 질병/증상/원인/치료/약재 테이블을 불변 스냅샷으로 로드하고,
//! 자유 텍스트 증상 질의에 대한 진단 답변과 약재 검색을 제공합니다.

pub mod cli;
pub mod config;
pub mod engine;
pub mod knowledge;

// Re-exports
pub use config::{get_data_dir, resolve_source_path, EngineConfig};
pub use engine::{KnowledgeEngine, ReloadOutcome, Snapshot, SnapshotInfo};
pub use knowledge::{
    source_for_path, tokenize, Answer, CsvDirSource, Diagnosis, KnowledgeBase, LoadError,
    LoadWarning, MatchWeights, Medicine, MedicineRecommendation, MedicineSearchIndex,
    SqliteSource, TableSource,
};
