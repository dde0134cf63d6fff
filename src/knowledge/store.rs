//! Knowledge Store - 원시 테이블을 검증된 불변 지식베이스로 변환
//!
//! 여섯 테이블(질병, 증상, 원인, 치료, 약재, 질병-약재 연결)을 읽어
//! 타입 레코드로 검증하고, 조인 결과를 미리 캐시합니다.
//!
//! - 필드 수가 맞지 않거나 필수 값이 빈 행: 건너뛰고 경고 기록
//! - 외래 키가 없는 행, 중복 ID: 로드 전체 실패 (`LoadError`)
//! - 구축 후에는 변경 불가. 갱신은 새 지식베이스를 만들어 교체합니다.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use super::error::{LoadError, LoadWarning};
use super::model::{
    Cause, Disease, DiseaseMedicineLink, Dosha, Medicine, MedicineForm, MedicineRole, Stage,
    Symptom, SymptomCategory, Treatment,
};
use super::source::{RawRow, RawTables, TableKind, TableSource};
use super::tokenizer::tokenize;

// ============================================================================
// Term Profile
// ============================================================================

/// 검색어의 근거 종류 (약한 것부터)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Evidence {
    /// 원인 설명에서 나온 단어
    Cause,
    /// Vital 이외 분류의 증상 설명에서 나온 단어
    Symptom,
    /// Vital 증상 설명에서 나온 단어
    VitalSymptom,
}

/// 질병별 검색어 프로필
///
/// 증상/원인 설명의 토큰 합집합. 같은 단어가 여러 곳에 나오면
/// 가장 강한 근거만 남깁니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermProfile {
    terms: BTreeMap<String, Evidence>,
}

impl TermProfile {
    fn build(symptoms: &[Symptom], causes: &[Cause]) -> Self {
        let mut profile = Self::default();

        for symptom in symptoms {
            let evidence = if symptom.category.is_vital() {
                Evidence::VitalSymptom
            } else {
                Evidence::Symptom
            };
            profile.absorb(&symptom.description, evidence);
        }

        for cause in causes {
            profile.absorb(&cause.description, Evidence::Cause);
        }

        profile
    }

    fn absorb(&mut self, text: &str, evidence: Evidence) {
        for term in tokenize(text) {
            let slot = self.terms.entry(term).or_insert(evidence);
            if evidence > *slot {
                *slot = evidence;
            }
        }
    }

    /// 단어의 근거 종류
    pub fn evidence(&self, term: &str) -> Option<Evidence> {
        self.terms.get(term).copied()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

// ============================================================================
// Types
// ============================================================================

/// 질병과 하위 레코드 (미리 조인됨)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseEntry {
    pub disease: Disease,
    pub symptoms: Vec<Symptom>,
    pub causes: Vec<Cause>,
    pub treatments: Vec<Treatment>,
    profile: TermProfile,
}

impl DiseaseEntry {
    fn new(disease: Disease) -> Self {
        Self {
            disease,
            symptoms: Vec::new(),
            causes: Vec::new(),
            treatments: Vec::new(),
            profile: TermProfile::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.disease.id
    }

    pub fn profile(&self) -> &TermProfile {
        &self.profile
    }
}

/// 지식베이스 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeStats {
    pub disease_count: usize,
    pub symptom_count: usize,
    pub cause_count: usize,
    pub treatment_count: usize,
    pub medicine_count: usize,
    pub link_count: usize,
    pub warning_count: usize,
}

impl fmt::Display for KnowledgeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} diseases, {} symptoms, {} causes, {} treatments, {} medicines, {} links ({} warnings)",
            self.disease_count,
            self.symptom_count,
            self.cause_count,
            self.treatment_count,
            self.medicine_count,
            self.link_count,
            self.warning_count
        )
    }
}

// ============================================================================
// KnowledgeBase
// ============================================================================

/// 불변 지식베이스
///
/// 같은 입력으로 두 번 로드하면 구조적으로 동일한 값이 나옵니다 (`PartialEq`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    diseases: BTreeMap<String, DiseaseEntry>,
    medicines: BTreeMap<String, Medicine>,
    links: BTreeMap<String, Vec<DiseaseMedicineLink>>,
    warnings: Vec<LoadWarning>,
}

impl KnowledgeBase {
    /// 소스에서 로드
    pub fn load(source: &dyn TableSource) -> Result<Self, LoadError> {
        let tables = source.read_tables()?;
        let kb = Self::from_tables(&tables)?;

        tracing::info!("Loaded knowledge base from {}: {}", source.describe(), kb.stats());

        Ok(kb)
    }

    /// 원시 테이블에서 구축
    pub fn from_tables(tables: &RawTables) -> Result<Self, LoadError> {
        let mut builder = Builder::default();

        builder.load_diseases(tables.rows(TableKind::Disease))?;
        if builder.diseases.is_empty() {
            return Err(LoadError::EmptySource);
        }

        builder.load_symptoms(tables.rows(TableKind::Symptom))?;
        builder.load_causes(tables.rows(TableKind::Cause))?;
        builder.load_treatments(tables.rows(TableKind::Treatment))?;
        builder.load_medicines(tables.rows(TableKind::Medicine))?;
        builder.load_links(tables.rows(TableKind::DiseaseMedicineLink))?;

        Ok(builder.finish())
    }

    /// ID로 질병 조회
    pub fn disease(&self, id: &str) -> Option<&DiseaseEntry> {
        self.diseases.get(id)
    }

    /// 전체 질병 (ID 오름차순)
    pub fn diseases(&self) -> impl Iterator<Item = &DiseaseEntry> {
        self.diseases.values()
    }

    pub fn medicine(&self, id: &str) -> Option<&Medicine> {
        self.medicines.get(id)
    }

    /// 전체 약재 (ID 오름차순)
    pub fn medicines(&self) -> impl Iterator<Item = &Medicine> {
        self.medicines.values()
    }

    /// 질병의 약재 연결 목록
    pub fn links_for(&self, disease_id: &str) -> &[DiseaseMedicineLink] {
        self.links.get(disease_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 질병에 연결된 약재 (연결 정보 포함)
    ///
    /// 외래 키는 로드 시점에 검증되었으므로 누락은 발생하지 않습니다.
    pub fn linked_medicines<'a>(
        &'a self,
        disease_id: &str,
    ) -> impl Iterator<Item = (&'a DiseaseMedicineLink, &'a Medicine)> + 'a {
        self.links_for(disease_id)
            .iter()
            .filter_map(move |link| self.medicines.get(&link.medicine_id).map(|m| (link, m)))
    }

    /// 로드 중 건너뛴 행 경고
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn stats(&self) -> KnowledgeStats {
        let mut stats = KnowledgeStats {
            disease_count: self.diseases.len(),
            medicine_count: self.medicines.len(),
            link_count: self.links.values().map(Vec::len).sum(),
            warning_count: self.warnings.len(),
            ..Default::default()
        };

        for entry in self.diseases.values() {
            stats.symptom_count += entry.symptoms.len();
            stats.cause_count += entry.causes.len();
            stats.treatment_count += entry.treatments.len();
        }

        stats
    }
}

// ============================================================================
// Builder
// ============================================================================

/// 로드 중간 상태
#[derive(Default)]
struct Builder {
    diseases: BTreeMap<String, DiseaseEntry>,
    medicines: BTreeMap<String, Medicine>,
    links: BTreeMap<String, Vec<DiseaseMedicineLink>>,
    child_ids: HashMap<TableKind, BTreeSet<String>>,
    /// 잘못된 형식으로 건너뛴 행의 ID -> 행 번호
    skipped: HashMap<TableKind, HashMap<String, u64>>,
    warnings: Vec<LoadWarning>,
}

impl Builder {
    /// 필드 수와 필수 값 검사. 실패하면 경고를 남기고 None.
    fn check<'r>(&mut self, kind: TableKind, row: &'r RawRow) -> Option<&'r [String]> {
        let expected = kind.columns().len();
        if row.fields.len() != expected {
            self.malformed(
                kind,
                row,
                format!("expected {} fields, found {}", expected, row.fields.len()),
            );
            return None;
        }

        for &idx in required_columns(kind) {
            if row.fields[idx].trim().is_empty() {
                self.malformed(kind, row, format!("empty {}", kind.columns()[idx]));
                return None;
            }
        }

        Some(&row.fields)
    }

    fn malformed(&mut self, table: TableKind, row: &RawRow, reason: String) {
        let warning = LoadWarning {
            table,
            line: row.line,
            reason,
        };
        tracing::warn!("Skipping malformed row: {}", warning);
        self.warnings.push(warning);

        if let Some(id) = row.fields.first().map(|f| f.trim()).filter(|f| !f.is_empty()) {
            self.skipped
                .entry(table)
                .or_default()
                .insert(id.to_string(), row.line);
        }
    }

    /// 하위 테이블 ID 중복 검사
    fn claim_id(&mut self, kind: TableKind, id: &str) -> Result<(), LoadError> {
        let seen = self.child_ids.entry(kind).or_default();
        if !seen.insert(id.to_string()) {
            return Err(LoadError::DuplicateId {
                table: kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 외래 키로 질병 엔트리 조회
    fn parent(
        &mut self,
        kind: TableKind,
        row_id: &str,
        disease_id: &str,
    ) -> Result<&mut DiseaseEntry, LoadError> {
        let skipped = &self.skipped;
        self.diseases.get_mut(disease_id).ok_or_else(|| {
            missing_reference(skipped, kind, row_id, "disease_id", TableKind::Disease, disease_id)
        })
    }

    fn load_diseases(&mut self, rows: &[RawRow]) -> Result<(), LoadError> {
        let kind = TableKind::Disease;
        for row in rows {
            let Some(f) = self.check(kind, row) else {
                continue;
            };

            let disease = Disease {
                id: f[0].clone(),
                name: f[1].clone(),
                traditional_name: f[2].clone(),
                dosha: Dosha::parse(&f[3]),
                body_region: f[4].clone(),
                description: f[5].clone(),
            };

            if self.diseases.contains_key(&disease.id) {
                return Err(LoadError::DuplicateId {
                    table: kind,
                    id: disease.id,
                });
            }
            self.diseases.insert(disease.id.clone(), DiseaseEntry::new(disease));
        }
        Ok(())
    }

    fn load_symptoms(&mut self, rows: &[RawRow]) -> Result<(), LoadError> {
        let kind = TableKind::Symptom;
        for row in rows {
            let Some(f) = self.check(kind, row) else {
                continue;
            };

            let symptom = Symptom {
                id: f[0].clone(),
                disease_id: f[1].clone(),
                category: SymptomCategory::parse(&f[2]),
                description: f[3].clone(),
            };

            self.claim_id(kind, &symptom.id)?;
            self.parent(kind, &symptom.id, &symptom.disease_id)?
                .symptoms
                .push(symptom);
        }
        Ok(())
    }

    fn load_causes(&mut self, rows: &[RawRow]) -> Result<(), LoadError> {
        let kind = TableKind::Cause;
        for row in rows {
            let Some(f) = self.check(kind, row) else {
                continue;
            };

            let cause = Cause {
                id: f[0].clone(),
                disease_id: f[1].clone(),
                description: f[2].clone(),
            };

            self.claim_id(kind, &cause.id)?;
            self.parent(kind, &cause.id, &cause.disease_id)?
                .causes
                .push(cause);
        }
        Ok(())
    }

    fn load_treatments(&mut self, rows: &[RawRow]) -> Result<(), LoadError> {
        let kind = TableKind::Treatment;
        for row in rows {
            let Some(f) = self.check(kind, row) else {
                continue;
            };

            let treatment = Treatment {
                id: f[0].clone(),
                disease_id: f[1].clone(),
                description: f[2].clone(),
            };

            self.claim_id(kind, &treatment.id)?;
            self.parent(kind, &treatment.id, &treatment.disease_id)?
                .treatments
                .push(treatment);
        }
        Ok(())
    }

    fn load_medicines(&mut self, rows: &[RawRow]) -> Result<(), LoadError> {
        let kind = TableKind::Medicine;
        for row in rows {
            let Some(f) = self.check(kind, row) else {
                continue;
            };

            let medicine = Medicine {
                id: f[0].clone(),
                name: f[1].clone(),
                dosage: f[2].clone(),
                frequency: f[3].clone(),
                form: MedicineForm::parse(&f[4]),
                vehicle: f[5].clone(),
                brand: f[6].clone(),
            };

            if self.medicines.contains_key(&medicine.id) {
                return Err(LoadError::DuplicateId {
                    table: kind,
                    id: medicine.id,
                });
            }
            self.medicines.insert(medicine.id.clone(), medicine);
        }
        Ok(())
    }

    /// 질병-약재 연결 로드
    ///
    /// 같은 (disease_id, medicine_id, role) 조합은 하나로 합치고,
    /// 나중에 로드된 행이 이깁니다.
    fn load_links(&mut self, rows: &[RawRow]) -> Result<(), LoadError> {
        let kind = TableKind::DiseaseMedicineLink;
        for row in rows {
            let Some(f) = self.check(kind, row) else {
                continue;
            };

            let Some(role) = MedicineRole::parse(&f[3]) else {
                self.malformed(kind, row, format!("unknown role '{}'", f[3]));
                continue;
            };

            let link = DiseaseMedicineLink {
                id: f[0].clone(),
                disease_id: f[1].clone(),
                medicine_id: f[2].clone(),
                role,
                stage: Stage::parse(&f[4]),
            };

            self.claim_id(kind, &link.id)?;
            self.parent(kind, &link.id, &link.disease_id)?;
            if !self.medicines.contains_key(&link.medicine_id) {
                return Err(missing_reference(
                    &self.skipped,
                    kind,
                    &link.id,
                    "medicine_id",
                    TableKind::Medicine,
                    &link.medicine_id,
                ));
            }

            let group = self.links.entry(link.disease_id.clone()).or_default();
            match group
                .iter_mut()
                .find(|l| l.medicine_id == link.medicine_id && l.role == link.role)
            {
                Some(existing) => {
                    tracing::debug!(
                        "Link {} replaces duplicate {} ({} -> {})",
                        link.id,
                        existing.id,
                        link.disease_id,
                        link.medicine_id
                    );
                    *existing = link;
                }
                None => group.push(link),
            }
        }
        Ok(())
    }

    fn finish(mut self) -> KnowledgeBase {
        for entry in self.diseases.values_mut() {
            entry.profile = TermProfile::build(&entry.symptoms, &entry.causes);
        }

        KnowledgeBase {
            diseases: self.diseases,
            medicines: self.medicines,
            links: self.links,
            warnings: self.warnings,
        }
    }
}

/// 해석되지 않는 외래 키 에러
///
/// 대상 ID가 잘못된 형식으로 건너뛴 행이면 그 행을 알려줍니다.
fn missing_reference(
    skipped: &HashMap<TableKind, HashMap<String, u64>>,
    table: TableKind,
    row_id: &str,
    column: &'static str,
    target_table: TableKind,
    target: &str,
) -> LoadError {
    match skipped.get(&target_table).and_then(|ids| ids.get(target)) {
        Some(&target_line) => LoadError::SkippedReference {
            table,
            row_id: row_id.to_string(),
            column,
            target: target.to_string(),
            target_table,
            target_line,
        },
        None => LoadError::DanglingReference {
            table,
            row_id: row_id.to_string(),
            column,
            target: target.to_string(),
        },
    }
}

/// 비어 있으면 안 되는 컬럼 인덱스
fn required_columns(kind: TableKind) -> &'static [usize] {
    match kind {
        TableKind::Disease => &[0, 1],
        TableKind::Symptom => &[0, 1, 3],
        TableKind::Cause => &[0, 1, 2],
        TableKind::Treatment => &[0, 1, 2],
        TableKind::Medicine => &[0, 1],
        TableKind::DiseaseMedicineLink => &[0, 1, 2, 3],
    }
}

// ============================================================================
// Tests
// ============================================================================
