//! 엔진 통합 테스트 - data/tables 샘플 데이터셋 기준

use std::path::{Path, PathBuf};

use ayur_kb::knowledge::{MedicineRole, TableKind};
use ayur_kb::{
    CsvDirSource, EngineConfig, KnowledgeBase, KnowledgeEngine, LoadError, ReloadOutcome,
    SqliteSource, TableSource,
};
use rusqlite::Connection;
use tempfile::TempDir;

fn sample_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("tables")
}

fn sample_engine() -> KnowledgeEngine {
    KnowledgeEngine::open(
        Box::new(CsvDirSource::new(&sample_dir())),
        EngineConfig::default(),
    )
    .unwrap()
}

/// 샘플 CSV를 임시 디렉토리로 복사
fn copy_sample(dir: &Path) {
    for kind in TableKind::ALL {
        let name = kind.csv_file_name();
        std::fs::copy(sample_dir().join(&name), dir.join(&name)).unwrap();
    }
}

#[test]
fn test_fever_scenario() {
    let engine = sample_engine();
    let answer = engine.answer_query("I have high body temperature and fatigue");

    let diagnosis = answer.diagnosis.expect("fever should be diagnosed");
    assert_eq!(diagnosis.name, "Fever");
    assert!(diagnosis
        .treatments
        .iter()
        .any(|t| t == "Langhana (Fasting)"));

    let sudarshan = diagnosis
        .medicines
        .iter()
        .position(|m| m.medicine.name == "Sudarshan Churna")
        .expect("Sudarshan Churna should be recommended");
    let first_supportive = diagnosis
        .medicines
        .iter()
        .position(|m| m.role == MedicineRole::Supportive)
        .unwrap();
    assert!(sudarshan < first_supportive);
}

#[test]
fn test_no_overlap_is_unresolved() {
    let engine = sample_engine();
    let answer = engine.answer_query("asdf qwer");

    assert!(answer.diagnosis.is_none());
    assert!(!answer.message.is_empty());

    let blank = engine.answer_query("   ");
    assert!(blank.diagnosis.is_none());
    assert_eq!(blank.message, answer.message);
}

#[test]
fn test_vital_symptom_text_resolves_to_its_disease() {
    let engine = sample_engine();
    let snapshot = engine.snapshot();

    let mut checked = 0;
    for entry in snapshot.kb.diseases() {
        for symptom in entry.symptoms.iter().filter(|s| s.category.is_vital()) {
            let answer = engine.answer_query(&symptom.description);
            let diagnosis = answer.diagnosis.unwrap_or_else(|| {
                panic!("{:?} should resolve", symptom.description)
            });
            assert_eq!(diagnosis.disease_id, entry.disease.id);
            checked += 1;
        }
    }
    assert!(checked >= 5);
}

#[test]
fn test_medicine_search() {
    let engine = sample_engine();

    assert!(engine.search_medicines("").is_empty());
    assert_eq!(engine.search_medicines("triph"), engine.search_medicines("TRIPH"));

    let names: Vec<String> = engine
        .search_medicines("churna")
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names.len(), 6);
    // 이름 접두 매칭이 없으므로 전부 알파벳 순
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    let tablets = engine.search_medicines("tablet");
    assert_eq!(tablets.len(), 2);
    assert_eq!(tablets[0].name, "Guduchi Tablet");
}

#[test]
fn test_load_idempotent() {
    let source = CsvDirSource::new(&sample_dir());
    let a = KnowledgeBase::load(&source).unwrap();
    let b = KnowledgeBase::load(&source).unwrap();
    assert_eq!(a, b);
    assert!(a.warnings().is_empty());
}

#[test]
fn test_dangling_link_fails_load() {
    let dir = TempDir::new().unwrap();
    copy_sample(dir.path());
    std::fs::write(
        dir.path().join("disease_medicines.csv"),
        "id,disease_id,medicine_id,role,stage\nL001,D404,M001,Curative,Acute\n",
    )
    .unwrap();

    let err = KnowledgeBase::load(&CsvDirSource::new(dir.path())).unwrap_err();
    assert!(matches!(err, LoadError::DanglingReference { .. }));
}

#[test]
fn test_tie_prefers_smaller_id() {
    let dir = TempDir::new().unwrap();
    copy_sample(dir.path());
    std::fs::write(
        dir.path().join("diseases.csv"),
        "id,name,traditional_name,dosha,body_region,description\n\
         D200,Dry Cough,Vataja Kasa,Vata,Chest,\n\
         D100,Wet Cough,Kaphaja Kasa,Kapha,Chest,\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("symptoms.csv"),
        "id,disease_id,category,description\n\
         S1,D200,Vital,Persistent cough\n\
         S2,D100,Vital,Cough with phlegm\n",
    )
    .unwrap();
    for kind in [
        TableKind::Cause,
        TableKind::Treatment,
        TableKind::DiseaseMedicineLink,
    ] {
        let header = kind.columns().join(",");
        std::fs::write(dir.path().join(kind.csv_file_name()), format!("{}\n", header)).unwrap();
    }

    let engine = KnowledgeEngine::open(
        Box::new(CsvDirSource::new(dir.path())),
        EngineConfig::default(),
    )
    .unwrap();

    let answer = engine.answer_query("cough");
    assert_eq!(answer.diagnosis.unwrap().disease_id, "D100");
    assert_eq!(answer.alternatives[0].disease_id, "D200");
}

#[test]
fn test_malformed_rows_are_warnings() {
    let dir = TempDir::new().unwrap();
    copy_sample(dir.path());
    let mut symptoms = std::fs::read_to_string(dir.path().join("symptoms.csv")).unwrap();
    symptoms.push_str("S099,D008\n");
    std::fs::write(dir.path().join("symptoms.csv"), symptoms).unwrap();

    let kb = KnowledgeBase::load(&CsvDirSource::new(dir.path())).unwrap();
    assert_eq!(kb.warnings().len(), 1);
    assert_eq!(kb.warnings()[0].table, TableKind::Symptom);
}

#[test]
fn test_reload_after_edit_and_failed_reload() {
    let dir = TempDir::new().unwrap();
    copy_sample(dir.path());

    let engine = KnowledgeEngine::open(
        Box::new(CsvDirSource::new(dir.path())),
        EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(engine.reload_if_changed().unwrap(), ReloadOutcome::Unchanged);
    assert!(engine.search_medicines("brahmi").is_empty());

    let mut medicines = std::fs::read_to_string(dir.path().join("medicines.csv")).unwrap();
    medicines.push_str("M011,Brahmi Vati,1 tablet,At bedtime,tablet,warm milk,Dabur\n");
    std::fs::write(dir.path().join("medicines.csv"), medicines).unwrap();

    let outcome = engine.reload_if_changed().unwrap();
    assert!(matches!(outcome, ReloadOutcome::Reloaded { generation: 2, .. }));
    assert_eq!(engine.search_medicines("brahmi").len(), 1);

    // 소스 파일 삭제 -> 리로드 실패, 이전 스냅샷 유지
    std::fs::remove_file(dir.path().join("causes.csv")).unwrap();
    assert!(matches!(engine.reload(), Err(LoadError::Unreadable { .. })));
    assert_eq!(engine.snapshot().generation, 2);
    assert_eq!(engine.search_medicines("brahmi").len(), 1);
}

#[test]
fn test_sqlite_and_csv_sources_agree() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("knowledge.db");
    let csv = CsvDirSource::new(&sample_dir());
    let tables = csv.read_tables().unwrap();

    {
        let conn = Connection::open(&db_path).unwrap();
        for kind in TableKind::ALL {
            let columns = kind.columns();
            conn.execute(
                &format!(
                    "CREATE TABLE {} ({})",
                    kind.table_name(),
                    columns
                        .iter()
                        .map(|c| format!("{} TEXT", c))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                [],
            )
            .unwrap();

            let placeholders = vec!["?"; columns.len()].join(", ");
            let sql = format!("INSERT INTO {} VALUES ({})", kind.table_name(), placeholders);
            for row in tables.rows(kind) {
                conn.execute(&sql, rusqlite::params_from_iter(row.fields.iter()))
                    .unwrap();
            }
        }
    }

    let sqlite = SqliteSource::new(&db_path);
    assert_eq!(
        KnowledgeBase::load(&sqlite).unwrap(),
        KnowledgeBase::load(&csv).unwrap()
    );
    assert_eq!(
        sqlite.read_tables().unwrap().fingerprint(),
        tables.fingerprint()
    );
}
