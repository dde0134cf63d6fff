//! 테이블 소스 - 여섯 개의 원시 테이블 읽기
//!
//! 지식베이스는 두 가지 소스에서 로드할 수 있습니다:
//! - CSV 디렉토리 (`diseases.csv`, `symptoms.csv`, ...)
//! - SQLite 데이터베이스 (포털이 사용하는 관계형 저장소)
//!
//! 소스는 타입 없는 행만 반환하고, 검증은 `KnowledgeBase`가 담당합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::error::LoadError;

// ============================================================================
// Table Kinds
// ============================================================================

/// 지식베이스 테이블 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TableKind {
    Disease,
    Symptom,
    Cause,
    Treatment,
    Medicine,
    DiseaseMedicineLink,
}

impl TableKind {
    /// 로드 순서 (부모 테이블 먼저)
    pub const ALL: [TableKind; 6] = [
        TableKind::Disease,
        TableKind::Symptom,
        TableKind::Cause,
        TableKind::Treatment,
        TableKind::Medicine,
        TableKind::DiseaseMedicineLink,
    ];

    /// 테이블 이름 (SQLite 테이블명, CSV 파일명 stem)
    pub fn table_name(&self) -> &'static str {
        match self {
            TableKind::Disease => "diseases",
            TableKind::Symptom => "symptoms",
            TableKind::Cause => "causes",
            TableKind::Treatment => "treatments",
            TableKind::Medicine => "medicines",
            TableKind::DiseaseMedicineLink => "disease_medicines",
        }
    }

    /// 컬럼 목록 (순서 고정)
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Disease => &[
                "id",
                "name",
                "traditional_name",
                "dosha",
                "body_region",
                "description",
            ],
            TableKind::Symptom => &["id", "disease_id", "category", "description"],
            TableKind::Cause => &["id", "disease_id", "description"],
            TableKind::Treatment => &["id", "disease_id", "description"],
            TableKind::Medicine => &[
                "id",
                "name",
                "dosage",
                "frequency",
                "form",
                "vehicle",
                "brand",
            ],
            TableKind::DiseaseMedicineLink => {
                &["id", "disease_id", "medicine_id", "role", "stage"]
            }
        }
    }

    pub fn csv_file_name(&self) -> String {
        format!("{}.csv", self.table_name())
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

// ============================================================================
// Raw Rows
// ============================================================================

/// 원시 행 (검증 전)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 소스 내 위치 (경고 메시지용)
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }
}

/// 여섯 테이블의 원시 행 묶음
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTables {
    tables: BTreeMap<TableKind, Vec<RawRow>>,
}

impl RawTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: TableKind, rows: Vec<RawRow>) {
        self.tables.insert(kind, rows);
    }

    /// 테이블 행 조회 (없으면 빈 슬라이스)
    pub fn rows(&self, kind: TableKind) -> &[RawRow] {
        self.tables.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 소스 내용 지문 (SHA-256 hex)
    ///
    /// 같은 데이터를 두 번 읽으면 같은 지문이 나옵니다.
    /// 리로드 시 변경 여부 판단에 사용합니다.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for kind in TableKind::ALL {
            hasher.update(kind.table_name().as_bytes());
            hasher.update([0x1e]);
            for row in self.rows(kind) {
                for field in &row.fields {
                    hasher.update((field.len() as u64).to_le_bytes());
                    hasher.update(field.as_bytes());
                }
                hasher.update([0x1d]);
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TableSource Trait
// ============================================================================

/// 테이블 소스 트레이트
///
/// 엔진은 소스를 읽기 전용으로 취급합니다.
pub trait TableSource: Send + Sync {
    /// 여섯 테이블 전체 읽기
    fn read_tables(&self) -> Result<RawTables, LoadError>;

    /// 로그용 위치 설명
    fn describe(&self) -> String;
}

/// 경로에서 소스 결정
///
/// 디렉토리면 CSV, `.db` / `.sqlite` / `.sqlite3` 파일이면 SQLite.
pub fn source_for_path(path: &Path) -> Result<Box<dyn TableSource>, LoadError> {
    if path.is_dir() {
        return Ok(Box::new(CsvDirSource::new(path)));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("db") | Some("sqlite") | Some("sqlite3") => Ok(Box::new(SqliteSource::new(path))),
        _ => Err(LoadError::unreadable(
            path.display().to_string(),
            "expected a CSV directory or a .db/.sqlite file",
        )),
    }
}

// ============================================================================
// CSV Directory Source
// ============================================================================

/// CSV 디렉토리 소스
///
/// 각 파일은 헤더 행을 가지며 건너뜁니다.
/// 필드 수 검증은 스토어에서 하므로 여기서는 flexible 모드로 읽습니다.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_table(&self, kind: TableKind) -> Result<Vec<RawRow>, LoadError> {
        let path = self.dir.join(kind.csv_file_name());
        let desc = path.display().to_string();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| LoadError::unreadable(&desc, e))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| LoadError::unreadable(&desc, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let fields = record.iter().map(str::to_string).collect();
            rows.push(RawRow::new(line, fields));
        }

        tracing::debug!("Read {} rows from {}", rows.len(), desc);
        Ok(rows)
    }
}

impl TableSource for CsvDirSource {
    fn read_tables(&self) -> Result<RawTables, LoadError> {
        if !self.dir.is_dir() {
            return Err(LoadError::unreadable(self.describe(), "not a directory"));
        }

        let mut tables = RawTables::new();
        for kind in TableKind::ALL {
            tables.insert(kind, self.read_table(kind)?);
        }
        Ok(tables)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.dir.display())
    }
}

// ============================================================================
// SQLite Source
// ============================================================================

/// SQLite 소스 (읽기 전용)
///
/// 포털이 쓰는 관계형 저장소의 여섯 테이블을 rowid 순서로 읽습니다.
/// NULL 셀은 빈 문자열로 읽히고, 필수 필드면 검증 단계에서 걸러집니다.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    db_path: PathBuf,
}

impl SqliteSource {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection, LoadError> {
        if !self.db_path.is_file() {
            return Err(LoadError::unreadable(self.describe(), "database file not found"));
        }

        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| LoadError::unreadable(self.describe(), e))
    }

    fn read_table(&self, conn: &Connection, kind: TableKind) -> rusqlite::Result<Vec<RawRow>> {
        let columns = kind.columns();
        let sql = format!(
            "SELECT rowid, {} FROM {} ORDER BY rowid",
            columns.join(", "),
            kind.table_name()
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let rowid: i64 = row.get(0)?;
                let mut fields = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    fields.push(read_text(row, i + 1)?);
                }
                Ok(RawRow::new(rowid as u64, fields))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

impl TableSource for SqliteSource {
    fn read_tables(&self) -> Result<RawTables, LoadError> {
        let conn = self.open()?;

        let mut tables = RawTables::new();
        for kind in TableKind::ALL {
            let rows = self
                .read_table(&conn, kind)
                .map_err(|e| LoadError::unreadable(format!("{} ({})", self.describe(), kind), e))?;
            tracing::debug!("Read {} rows from table {}", rows.len(), kind);
            tables.insert(kind, rows);
        }
        Ok(tables)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }
}

/// 셀을 문자열로 읽기 (숫자 컬럼도 허용, NULL은 빈 문자열)
fn read_text(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<String> {
    use rusqlite::types::ValueRef;

    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).trim().to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_csv_dir(dir: &Path) {
        std::fs::write(
            dir.join("diseases.csv"),
            "id,name,traditional_name,dosha,body_region,description\n\
             D001,Fever,Jwara,Pitta,Whole body,Raised temperature\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("symptoms.csv"),
            "id,disease_id,category,description\n\
             S001,D001,Vital,\"High body temperature, chills\"\n\
             S002,D001\n",
        )
        .unwrap();
        std::fs::write(dir.join("causes.csv"), "id,disease_id,description\n").unwrap();
        std::fs::write(dir.join("treatments.csv"), "id,disease_id,description\n").unwrap();
        std::fs::write(
            dir.join("medicines.csv"),
            "id,name,dosage,frequency,form,vehicle,brand\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("disease_medicines.csv"),
            "id,disease_id,medicine_id,role,stage\n",
        )
        .unwrap();
    }

    #[test]
    fn test_csv_source_reads_rows() {
        let dir = TempDir::new().unwrap();
        write_csv_dir(dir.path());

        let tables = CsvDirSource::new(dir.path()).read_tables().unwrap();
        assert_eq!(tables.rows(TableKind::Disease).len(), 1);

        let symptoms = tables.rows(TableKind::Symptom);
        assert_eq!(symptoms.len(), 2);
        assert_eq!(symptoms[0].fields[3], "High body temperature, chills");
        // 필드 수가 부족한 행도 그대로 반환 (검증은 스토어 몫)
        assert_eq!(symptoms[1].fields.len(), 2);
        assert_eq!(symptoms[1].line, 3);
    }

    #[test]
    fn test_csv_source_missing_file() {
        let dir = TempDir::new().unwrap();
        write_csv_dir(dir.path());
        std::fs::remove_file(dir.path().join("medicines.csv")).unwrap();

        let err = CsvDirSource::new(dir.path()).read_tables().unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { .. }));
    }

    #[test]
    fn test_sqlite_source_reads_rows() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("kb.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE diseases (id TEXT, name TEXT, traditional_name TEXT, dosha TEXT, body_region TEXT, description TEXT);
                 CREATE TABLE symptoms (id TEXT, disease_id TEXT, category TEXT, description TEXT);
                 CREATE TABLE causes (id TEXT, disease_id TEXT, description TEXT);
                 CREATE TABLE treatments (id TEXT, disease_id TEXT, description TEXT);
                 CREATE TABLE medicines (id TEXT, name TEXT, dosage TEXT, frequency TEXT, form TEXT, vehicle TEXT, brand TEXT);
                 CREATE TABLE disease_medicines (id TEXT, disease_id TEXT, medicine_id TEXT, role TEXT, stage TEXT);
                 INSERT INTO diseases VALUES ('D001', 'Fever', 'Jwara', 'Pitta', 'Whole body', NULL);
                 INSERT INTO medicines VALUES ('M001', 'Sudarshan Churna', 3, 'Twice daily', 'churna', 'warm water', 'Baidyanath');",
            )
            .unwrap();
        }

        let tables = SqliteSource::new(&db_path).read_tables().unwrap();
        let diseases = tables.rows(TableKind::Disease);
        assert_eq!(diseases.len(), 1);
        assert_eq!(diseases[0].fields[0], "D001");
        assert_eq!(diseases[0].fields[5], "");

        let medicines = tables.rows(TableKind::Medicine);
        assert_eq!(medicines[0].fields[2], "3");
    }

    #[test]
    fn test_sqlite_source_missing_table() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("empty.db");
        Connection::open(&db_path)
            .unwrap()
            .execute_batch("CREATE TABLE diseases (id TEXT)")
            .unwrap();

        let err = SqliteSource::new(&db_path).read_tables().unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { .. }));
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let mut a = RawTables::new();
        a.insert(
            TableKind::Disease,
            vec![RawRow::new(2, vec!["D001".to_string(), "Fever".to_string()])],
        );
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut c = RawTables::new();
        c.insert(
            TableKind::Disease,
            vec![RawRow::new(2, vec!["D001".to_string(), "Fevers".to_string()])],
        );
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_source_for_path() {
        let dir = TempDir::new().unwrap();
        assert!(source_for_path(dir.path()).unwrap().describe().starts_with("csv:"));

        let db = dir.path().join("kb.sqlite");
        assert!(source_for_path(&db).unwrap().describe().starts_with("sqlite:"));

        let other = dir.path().join("kb.json");
        assert!(source_for_path(&other).is_err());
    }
}
