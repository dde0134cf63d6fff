//! 설정 모듈
//!
//! 엔진 파라미터와 데이터 위치를 결정합니다.
//!
//! 소스 결정 순서:
//! 1. `--source` 인자
//! 2. `AYUR_KB_SOURCE` 환경변수
//! 3. `~/.ayur-kb/knowledge.db` (존재하면)
//! 4. `~/.ayur-kb/tables/` (CSV 디렉토리)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::knowledge::MatchWeights;

/// 소스 경로 환경변수
pub const SOURCE_ENV: &str = "AYUR_KB_SOURCE";

/// 최소 진단 점수 환경변수
pub const MIN_SCORE_ENV: &str = "AYUR_KB_MIN_SCORE";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.ayur-kb/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ayur-kb")
}

/// 지식베이스 소스 경로 결정
pub fn resolve_source_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(SOURCE_ENV) {
        if !path.trim().is_empty() {
            tracing::debug!("Using knowledge source from {}", SOURCE_ENV);
            return PathBuf::from(path);
        }
    }

    default_source_in(&get_data_dir())
}

/// 데이터 디렉토리 안의 기본 소스 (DB 우선, 없으면 CSV 디렉토리)
fn default_source_in(data_dir: &Path) -> PathBuf {
    let db_path = data_dir.join("knowledge.db");
    if db_path.is_file() {
        db_path
    } else {
        data_dir.join("tables")
    }
}

// ============================================================================
// Logging
// ============================================================================

/// 로그 필터 (`RUST_LOG`가 있으면 그대로 따르고, 없거나 잘못되면 INFO)
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

// ============================================================================
// Engine Config
// ============================================================================

/// 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 근거 종류별 가중치
    pub weights: MatchWeights,
    /// 진단으로 인정할 최소 점수 (기본 3 = Vital 단어 1개)
    pub min_score: u32,
    /// 진단 외에 함께 보여줄 후보 수
    pub max_alternatives: usize,
    /// 약재 검색 결과 상한 (None이면 제한 없음)
    pub search_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            min_score: 3,
            max_alternatives: 3,
            search_limit: None,
        }
    }
}

impl EngineConfig {
    /// 엄격한 설정 (Vital 단어 2개 이상 필요, 대체 후보 없음)
    pub fn strict() -> Self {
        Self {
            min_score: 6,
            max_alternatives: 0,
            ..Self::default()
        }
    }

    /// 기본값에 환경변수 덮어쓰기
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(MIN_SCORE_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(score) => config.min_score = score,
                Err(e) => tracing::warn!("Ignoring invalid {}={:?}: {}", MIN_SCORE_ENV, raw, e),
            }
        }

        config
    }
}

// ============================================================================
// Tests
// ============================================================================
