//! 지식베이스 레코드 타입
//!
//! 질병, 증상, 원인, 치료, 약재, 질병-약재 연결 테이블의 타입 정의입니다.
//! 모든 ID는 데이터 소스가 부여한 불변 문자열 키입니다 (예: `D008`, `M006`).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Enums
// ============================================================================

/// 도샤 (체질 친화도)
///
/// 세 가지 기본 도샤와 그 조합. 알 수 없는 값은 원문 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dosha {
    Vata,
    Pitta,
    Kapha,
    VataPitta,
    PittaKapha,
    VataKapha,
    Tridosha,
    Other(String),
}

impl Dosha {
    /// 문자열에서 파싱 (대소문자, 구분자, 순서 무시)
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        let mut parts: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|p| !p.is_empty())
            .collect();
        parts.sort_unstable();
        parts.dedup();

        match parts.as_slice() {
            ["vata"] => Dosha::Vata,
            ["pitta"] => Dosha::Pitta,
            ["kapha"] => Dosha::Kapha,
            ["pitta", "vata"] | ["vatapitta"] => Dosha::VataPitta,
            ["kapha", "pitta"] | ["pittakapha"] => Dosha::PittaKapha,
            ["kapha", "vata"] | ["vatakapha"] => Dosha::VataKapha,
            ["tridosha"] | ["kapha", "pitta", "vata"] => Dosha::Tridosha,
            _ => Dosha::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for Dosha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dosha::Vata => f.write_str("Vata"),
            Dosha::Pitta => f.write_str("Pitta"),
            Dosha::Kapha => f.write_str("Kapha"),
            Dosha::VataPitta => f.write_str("Vata-Pitta"),
            Dosha::PittaKapha => f.write_str("Pitta-Kapha"),
            Dosha::VataKapha => f.write_str("Vata-Kapha"),
            Dosha::Tridosha => f.write_str("Tridosha"),
            Dosha::Other(s) => f.write_str(s),
        }
    }
}

/// 증상 분류
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymptomCategory {
    /// 활력 징후 (가장 강한 진단 신호)
    Vital,
    General,
    Other(String),
}

impl SymptomCategory {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "vital" => SymptomCategory::Vital,
            "general" => SymptomCategory::General,
            _ => SymptomCategory::Other(raw.trim().to_string()),
        }
    }

    pub fn is_vital(&self) -> bool {
        matches!(self, SymptomCategory::Vital)
    }
}

/// 약재 제형
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedicineForm {
    Churna,
    Kashayam,
    Tablet,
    Ghrita,
    Taila,
    Arishta,
    Other(String),
}

impl MedicineForm {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "churna" | "churnam" => MedicineForm::Churna,
            "kashayam" | "kashaya" => MedicineForm::Kashayam,
            "tablet" | "vati" | "gutika" => MedicineForm::Tablet,
            "ghrita" | "ghritam" => MedicineForm::Ghrita,
            "taila" | "thailam" | "oil" => MedicineForm::Taila,
            "arishta" | "asava" => MedicineForm::Arishta,
            _ => MedicineForm::Other(raw.trim().to_string()),
        }
    }

    /// 검색용 이름 (소문자)
    pub fn as_str(&self) -> &str {
        match self {
            MedicineForm::Churna => "churna",
            MedicineForm::Kashayam => "kashayam",
            MedicineForm::Tablet => "tablet",
            MedicineForm::Ghrita => "ghrita",
            MedicineForm::Taila => "taila",
            MedicineForm::Arishta => "arishta",
            MedicineForm::Other(s) => s,
        }
    }
}

impl fmt::Display for MedicineForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 질병 대비 약재 역할
///
/// 정렬 순서: Curative < Supportive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MedicineRole {
    Curative,
    Supportive,
}

impl MedicineRole {
    /// 알 수 없는 역할은 None (행 자체가 잘못된 것으로 취급)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "curative" => Some(MedicineRole::Curative),
            "supportive" => Some(MedicineRole::Supportive),
            _ => None,
        }
    }
}

impl fmt::Display for MedicineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MedicineRole::Curative => f.write_str("Curative"),
            MedicineRole::Supportive => f.write_str("Supportive"),
        }
    }
}

/// 질병 단계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Acute,
    Chronic,
    Convalescence,
    Maintenance,
    Other(String),
}

impl Stage {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "acute" => Stage::Acute,
            "chronic" => Stage::Chronic,
            "convalescence" | "convalescent" => Stage::Convalescence,
            "maintenance" => Stage::Maintenance,
            _ => Stage::Other(raw.trim().to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Stage::Acute => 0,
            Stage::Chronic => 1,
            Stage::Convalescence => 2,
            Stage::Maintenance => 3,
            Stage::Other(_) => 4,
        }
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Stage::Other(a), Stage::Other(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Acute => f.write_str("Acute"),
            Stage::Chronic => f.write_str("Chronic"),
            Stage::Convalescence => f.write_str("Convalescence"),
            Stage::Maintenance => f.write_str("Maintenance"),
            Stage::Other(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// 질병
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    pub id: String,
    /// 영문 이름
    pub name: String,
    /// 전통 명칭 (산스크리트)
    pub traditional_name: String,
    pub dosha: Dosha,
    /// 영향받는 신체 부위
    pub body_region: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub id: String,
    pub disease_id: String,
    pub category: SymptomCategory,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    pub id: String,
    pub disease_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    pub disease_id: String,
    pub description: String,
}

/// 약재 (질병과 독립적, 연결 테이블로만 관계 형성)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub form: MedicineForm,
    /// 복용 매개체 (예: "warm water")
    pub vehicle: String,
    pub brand: String,
}

/// 질병-약재 연결 (다대다)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseMedicineLink {
    pub id: String,
    pub disease_id: String,
    pub medicine_id: String,
    pub role: MedicineRole,
    pub stage: Stage,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dosha_parse() {
        assert_eq!(Dosha::parse("Vata"), Dosha::Vata);
        assert_eq!(Dosha::parse(" PITTA "), Dosha::Pitta);
        assert_eq!(Dosha::parse("Pitta-Vata"), Dosha::VataPitta);
        assert_eq!(Dosha::parse("vata pitta"), Dosha::VataPitta);
        assert_eq!(Dosha::parse("Kapha/Pitta"), Dosha::PittaKapha);
        assert_eq!(Dosha::parse("Tridosha"), Dosha::Tridosha);
        assert_eq!(Dosha::parse("Vata-Pitta-Kapha"), Dosha::Tridosha);
        assert_eq!(Dosha::parse("Rakta"), Dosha::Other("Rakta".to_string()));
        assert_eq!(Dosha::VataKapha.to_string(), "Vata-Kapha");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(MedicineRole::parse("curative"), Some(MedicineRole::Curative));
        assert_eq!(MedicineRole::parse("Supportive"), Some(MedicineRole::Supportive));
        assert_eq!(MedicineRole::parse("optional"), None);
        assert!(MedicineRole::Curative < MedicineRole::Supportive);
    }

    #[test]
    fn test_stage_order() {
        let mut stages = vec![
            Stage::Other("Relapse".to_string()),
            Stage::Maintenance,
            Stage::Acute,
            Stage::Other("Onset".to_string()),
            Stage::Convalescence,
        ];
        stages.sort();
        assert_eq!(
            stages,
            vec![
                Stage::Acute,
                Stage::Convalescence,
                Stage::Maintenance,
                Stage::Other("Onset".to_string()),
                Stage::Other("Relapse".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_and_category_parse() {
        assert_eq!(MedicineForm::parse("Churna"), MedicineForm::Churna);
        assert_eq!(MedicineForm::parse("vati"), MedicineForm::Tablet);
        assert_eq!(MedicineForm::parse("Syrup").as_str(), "Syrup");
        assert!(SymptomCategory::parse("VITAL").is_vital());
        assert_eq!(SymptomCategory::parse("general"), SymptomCategory::General);
        assert!(!SymptomCategory::parse("Digestive").is_vital());
    }
}
