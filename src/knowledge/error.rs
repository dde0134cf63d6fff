//! 로드 에러 및 경고 타입
//!
//! - `LoadError`: 치명적 (로드/리로드 실패, 이전 스냅샷 유지)
//! - `LoadWarning`: 복구 가능 (잘못된 행 건너뜀)

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::source::TableKind;

/// 지식베이스 로드 실패
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// 소스를 읽을 수 없음 (파일 없음, DB 열기 실패, 테이블 없음 등)
    #[error("cannot read knowledge source {source_desc}: {reason}")]
    Unreadable { source_desc: String, reason: String },

    /// 질병 테이블에 유효한 행이 없음
    #[error("knowledge source contains no diseases")]
    EmptySource,

    /// 외래 키가 존재하지 않는 행을 가리킴
    #[error("{table} row {row_id}: {column} '{target}' does not exist")]
    DanglingReference {
        table: TableKind,
        row_id: String,
        column: &'static str,
        target: String,
    },

    /// 외래 키가 잘못된 형식이라 건너뛴 행을 가리킴
    #[error(
        "{table} row {row_id}: {column} '{target}' refers to a malformed {target_table} row \
         (line {target_line}) that was skipped"
    )]
    SkippedReference {
        table: TableKind,
        row_id: String,
        column: &'static str,
        target: String,
        target_table: TableKind,
        target_line: u64,
    },

    /// 같은 테이블에 동일한 ID가 두 번 등장
    #[error("{table}: duplicate id '{id}'")]
    DuplicateId { table: TableKind, id: String },
}

impl LoadError {
    pub(crate) fn unreadable(source_desc: impl Into<String>, reason: impl fmt::Display) -> Self {
        LoadError::Unreadable {
            source_desc: source_desc.into(),
            reason: reason.to_string(),
        }
    }
}

/// 잘못된 행 경고 (행은 건너뛰고 로드는 계속)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadWarning {
    pub table: TableKind,
    /// 소스 내 행 번호 (CSV는 헤더 포함 1-based, SQLite는 rowid)
    pub line: u64,
    pub reason: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} line {}: {}", self.table, self.line, self.reason)
    }
}
