//! Knowledge 모듈 - 증상 기반 진단 지식 엔진
//!
//! - Source: CSV 디렉토리 / SQLite에서 여섯 테이블 읽기
//! - Store: 검증된 불변 지식베이스 (외래 키, 조인 캐시)
//! - Tokenizer + Matcher: 증상 단어 가중 점수와 결정적 순위
//! - Composer: 진단, 치료, 약재 추천 답변 조립
//! - Medicine: 약재 이름/제형 부분 문자열 검색

mod composer;
mod error;
mod matcher;
mod medicine;
mod model;
mod source;
mod store;
mod tokenizer;

// Re-exports
pub use composer::{
    Answer, Candidate, Diagnosis, MedicineRecommendation, RecommendationComposer,
    GUIDANCE_MESSAGE,
};
pub use error::{LoadError, LoadWarning};
pub use matcher::{
    DiseaseMatch, DiseaseRanker, MatchWeights, RankedDisease, Selection, SymptomMatcher,
};
pub use medicine::MedicineSearchIndex;
pub use model::{
    Cause, Disease, DiseaseMedicineLink, Dosha, Medicine, MedicineForm, MedicineRole, Stage,
    Symptom, SymptomCategory, Treatment,
};
pub use source::{
    source_for_path, CsvDirSource, RawRow, RawTables, SqliteSource, TableKind, TableSource,
};
pub use store::{DiseaseEntry, Evidence, KnowledgeBase, KnowledgeStats, TermProfile};
pub use tokenizer::{is_stop_word, tokenize};

#[cfg(test)]
pub(crate) use store::tests::sample_tables;
