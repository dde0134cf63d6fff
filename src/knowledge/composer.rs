//! 답변 조립 - 토큰화 → 점수 → 순위 → 진단/치료/약재 추천
//!
//! 확신할 수 있는 매칭이 없으면 에러가 아니라 진단 없는 안내 답변을 반환합니다.

use serde::Serialize;

use crate::config::EngineConfig;

use super::matcher::{DiseaseRanker, RankedDisease, Selection, SymptomMatcher};
use super::model::{Dosha, Medicine, MedicineRole, Stage};
use super::store::{DiseaseEntry, KnowledgeBase};
use super::tokenizer::tokenize;

/// 매칭 실패 시 안내 메시지
pub const GUIDANCE_MESSAGE: &str = "I could not match your description to a condition in the \
knowledge base. Please describe your symptoms in more detail (for example body temperature, \
pain, digestion or sleep) or consult an Ayurvedic practitioner.";

// ============================================================================
// Types
// ============================================================================

/// 질의 답변
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// 원문 질의
    pub query: String,
    /// 진단 (매칭 실패 시 None)
    pub diagnosis: Option<Diagnosis>,
    /// 임계값을 넘은 다른 후보
    pub alternatives: Vec<Candidate>,
    /// 사용자에게 보여줄 요약 또는 안내 문구
    pub message: String,
}

impl Answer {
    pub fn is_resolved(&self) -> bool {
        self.diagnosis.is_some()
    }

    fn unresolved(query: &str) -> Self {
        Self {
            query: query.to_string(),
            diagnosis: None,
            alternatives: vec![],
            message: GUIDANCE_MESSAGE.to_string(),
        }
    }
}

/// 진단 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub disease_id: String,
    pub name: String,
    pub traditional_name: String,
    pub dosha: Dosha,
    pub body_region: String,
    pub score: u32,
    pub matched_terms: Vec<String>,
    /// 치료 설명 (소스 순서)
    pub treatments: Vec<String>,
    /// 약재 추천 (Curative → Supportive, 이후 단계 순)
    pub medicines: Vec<MedicineRecommendation>,
}

/// 역할/단계가 붙은 약재 추천
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedicineRecommendation {
    pub medicine: Medicine,
    pub role: MedicineRole,
    pub stage: Stage,
}

/// 대체 후보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub disease_id: String,
    pub name: String,
    pub score: u32,
}

// ============================================================================
// RecommendationComposer
// ============================================================================

/// 답변 조립기
#[derive(Debug, Clone, Copy)]
pub struct RecommendationComposer {
    ranker: DiseaseRanker,
    max_alternatives: usize,
}

impl RecommendationComposer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ranker: DiseaseRanker::new(SymptomMatcher::new(config.weights), config.min_score),
            max_alternatives: config.max_alternatives,
        }
    }

    /// 질의에 대한 답변
    ///
    /// 빈 문자열이나 공백만 있는 질의도 안내 답변으로 처리합니다.
    pub fn answer(&self, kb: &KnowledgeBase, query: &str) -> Answer {
        let terms = tokenize(query);
        let ranked = self.ranker.rank(&terms, kb);

        let top = match self.ranker.select(&ranked) {
            Selection::Resolved(top) => top,
            Selection::Unresolved => {
                tracing::debug!(
                    "Unresolved query ({} terms, {} candidates)",
                    terms.len(),
                    ranked.len()
                );
                return Answer::unresolved(query);
            }
        };

        let diagnosis = compose_diagnosis(kb, top);
        let alternatives = ranked
            .iter()
            .skip(1)
            .take_while(|r| r.score >= self.ranker.min_score())
            .take(self.max_alternatives)
            .map(|r| Candidate {
                disease_id: r.disease_id().to_string(),
                name: r.entry.disease.name.clone(),
                score: r.score,
            })
            .collect();

        tracing::debug!(
            "Resolved query to {} (score={})",
            diagnosis.disease_id,
            diagnosis.score
        );

        Answer {
            query: query.to_string(),
            message: summarize(&diagnosis),
            diagnosis: Some(diagnosis),
            alternatives,
        }
    }
}

fn compose_diagnosis(kb: &KnowledgeBase, top: &RankedDisease<'_>) -> Diagnosis {
    let entry: &DiseaseEntry = top.entry;
    let disease = &entry.disease;

    let mut medicines: Vec<MedicineRecommendation> = kb
        .linked_medicines(&disease.id)
        .map(|(link, medicine)| MedicineRecommendation {
            medicine: medicine.clone(),
            role: link.role,
            stage: link.stage.clone(),
        })
        .collect();

    medicines.sort_by(|a, b| {
        a.role
            .cmp(&b.role)
            .then_with(|| a.stage.cmp(&b.stage))
            .then_with(|| {
                a.medicine
                    .name
                    .to_lowercase()
                    .cmp(&b.medicine.name.to_lowercase())
            })
            .then_with(|| a.medicine.id.cmp(&b.medicine.id))
    });

    Diagnosis {
        disease_id: disease.id.clone(),
        name: disease.name.clone(),
        traditional_name: disease.traditional_name.clone(),
        dosha: disease.dosha.clone(),
        body_region: disease.body_region.clone(),
        score: top.score,
        matched_terms: top.matched_terms.clone(),
        treatments: entry
            .treatments
            .iter()
            .map(|t| t.description.clone())
            .collect(),
        medicines,
    }
}

/// 진단 요약 문구
fn summarize(diagnosis: &Diagnosis) -> String {
    let mut message = format!("Your symptoms most closely match {}", diagnosis.name);
    if !diagnosis.traditional_name.is_empty() {
        message.push_str(&format!(" ({})", diagnosis.traditional_name));
    }
    message.push_str(&format!(", associated with {} dosha.", diagnosis.dosha));

    if !diagnosis.treatments.is_empty() {
        message.push_str(&format!(
            " Suggested treatment: {}.",
            diagnosis.treatments.join("; ")
        ));
    }

    if !diagnosis.medicines.is_empty() {
        let names: Vec<String> = diagnosis
            .medicines
            .iter()
            .map(|m| format!("{} ({}, {})", m.medicine.name, m.role, m.stage))
            .collect();
        message.push_str(&format!(" Medicines: {}.", names.join(", ")));
    }

    message.push_str(" Please confirm with a practitioner before starting any medicine.");
    message
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::source::{RawRow, TableKind};
    use crate::knowledge::store::tests::sample_tables;

    fn sample_kb() -> KnowledgeBase {
        KnowledgeBase::from_tables(&sample_tables()).unwrap()
    }

    #[test]
    fn test_fever_scenario() {
        let kb = sample_kb();
        let composer = RecommendationComposer::new(&EngineConfig::default());

        let answer = composer.answer(&kb, "I have high body temperature and fatigue");
        assert!(answer.is_resolved());

        let diagnosis = answer.diagnosis.as_ref().unwrap();
        assert_eq!(diagnosis.name, "Fever");
        assert_eq!(diagnosis.dosha, Dosha::Pitta);
        assert!(diagnosis.treatments.contains(&"Langhana (Fasting)".to_string()));
        assert_eq!(
            diagnosis.matched_terms,
            vec!["body", "fatigue", "high", "temperature"]
        );

        let names: Vec<&str> = diagnosis
            .medicines
            .iter()
            .map(|m| m.medicine.name.as_str())
            .collect();
        // Curative(Sudarshan) 먼저, Supportive(Amrutarishta) 나중
        assert_eq!(names, vec!["Sudarshan Churna", "Amrutarishta"]);
        assert_eq!(diagnosis.medicines[0].role, MedicineRole::Curative);
        assert_eq!(diagnosis.medicines[0].stage, Stage::Acute);
        assert!(answer.message.contains("Fever"));
    }

    #[test]
    fn test_unresolved_queries() {
        let kb = sample_kb();
        let composer = RecommendationComposer::new(&EngineConfig::default());

        for query in ["asdf qwer", "", "   \n\t", "exposure to cold"] {
            let answer = composer.answer(&kb, query);
            assert!(!answer.is_resolved(), "query {:?} should be unresolved", query);
            assert!(answer.alternatives.is_empty());
            assert_eq!(answer.message, GUIDANCE_MESSAGE);
        }
    }

    #[test]
    fn test_medicine_order_by_stage() {
        let mut tables = sample_tables();
        let row = |line, fields: &[&str]| {
            RawRow::new(line, fields.iter().map(|f| f.to_string()).collect())
        };
        tables.insert(
            TableKind::DiseaseMedicineLink,
            vec![
                row(2, &["L1", "D008", "M007", "Supportive", "Convalescence"]),
                row(3, &["L2", "D008", "M010", "Curative", "Chronic"]),
                row(4, &["L3", "D008", "M006", "Curative", "Acute"]),
                row(5, &["L4", "D008", "M010", "Supportive", "Acute"]),
            ],
        );
        let kb = KnowledgeBase::from_tables(&tables).unwrap();
        let composer = RecommendationComposer::new(&EngineConfig::default());

        let answer = composer.answer(&kb, "high temperature");
        let order: Vec<(&str, MedicineRole)> = answer
            .diagnosis
            .as_ref()
            .unwrap()
            .medicines
            .iter()
            .map(|m| (m.medicine.id.as_str(), m.role))
            .collect();

        assert_eq!(
            order,
            vec![
                ("M006", MedicineRole::Curative),
                ("M010", MedicineRole::Curative),
                ("M010", MedicineRole::Supportive),
                ("M007", MedicineRole::Supportive),
            ]
        );
    }

    #[test]
    fn test_alternatives_above_threshold() {
        let kb = sample_kb();
        let composer = RecommendationComposer::new(&EngineConfig::default());

        // D008: temperature (3), D010: heaviness + stomach (4)
        let answer = composer.answer(&kb, "temperature with heaviness in stomach");
        assert_eq!(answer.diagnosis.as_ref().unwrap().disease_id, "D010");
        assert_eq!(
            answer.alternatives,
            vec![Candidate {
                disease_id: "D008".to_string(),
                name: "Fever".to_string(),
                score: 3,
            }]
        );

        let strict = RecommendationComposer::new(&EngineConfig {
            max_alternatives: 0,
            ..EngineConfig::default()
        });
        let answer = strict.answer(&kb, "temperature with heaviness in stomach");
        assert!(answer.alternatives.is_empty());
    }

    #[test]
    fn test_answer_serializes() {
        let kb = sample_kb();
        let composer = RecommendationComposer::new(&EngineConfig::default());

        let json = serde_json::to_value(composer.answer(&kb, "high body temperature")).unwrap();
        assert_eq!(json["diagnosis"]["name"], "Fever");
        assert_eq!(json["diagnosis"]["medicines"][0]["role"], "Curative");

        let json = serde_json::to_value(composer.answer(&kb, "asdf")).unwrap();
        assert!(json["diagnosis"].is_null());
    }
}
