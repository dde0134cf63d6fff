//! 약재 검색 인덱스
//!
//! 증상 매칭과 독립적으로, 약재 이름과 제형에 대한 대소문자 무시 부분 문자열 검색.
//!
//! 순위:
//! 1. 이름이 질의로 시작하는 약재
//! 2. 그 외 (이름 중간 또는 제형에 포함)
//!
//! 같은 등급 안에서는 이름 알파벳 순. 빈 질의는 빈 결과 (전체 목록 노출 방지).

use super::model::Medicine;
use super::store::KnowledgeBase;

/// 검색용 정규화 엔트리
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedMedicine {
    name_key: String,
    form_key: String,
    medicine: Medicine,
}

/// 매칭 등급 (작을수록 우선)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    NamePrefix,
    Elsewhere,
}

/// 약재 검색 인덱스 (스냅샷마다 한 번 구축)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicineSearchIndex {
    /// 이름 알파벳 순으로 정렬된 엔트리
    entries: Vec<IndexedMedicine>,
}

impl MedicineSearchIndex {
    /// 지식베이스의 약재 카탈로그로 구축
    pub fn build(kb: &KnowledgeBase) -> Self {
        Self::from_medicines(kb.medicines().cloned())
    }

    pub fn from_medicines(medicines: impl IntoIterator<Item = Medicine>) -> Self {
        let mut entries: Vec<IndexedMedicine> = medicines
            .into_iter()
            .map(|medicine| IndexedMedicine {
                name_key: medicine.name.to_lowercase(),
                form_key: medicine.form.as_str().to_lowercase(),
                medicine,
            })
            .collect();

        entries.sort_by(|a, b| {
            a.name_key
                .cmp(&b.name_key)
                .then_with(|| a.medicine.id.cmp(&b.medicine.id))
        });

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 약재 검색 (결과 수 제한 없음)
    pub fn search(&self, query: &str) -> Vec<Medicine> {
        self.search_limited(query, usize::MAX)
    }

    /// 약재 검색 (최대 `limit`건)
    pub fn search_limited(&self, query: &str, limit: usize) -> Vec<Medicine> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return vec![];
        }

        let mut hits: Vec<(MatchTier, &IndexedMedicine)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                if entry.name_key.starts_with(&needle) {
                    Some((MatchTier::NamePrefix, entry))
                } else if entry.name_key.contains(&needle) || entry.form_key.contains(&needle) {
                    Some((MatchTier::Elsewhere, entry))
                } else {
                    None
                }
            })
            .collect();

        // entries가 이미 이름순이므로 안정 정렬로 등급만 나눕니다
        hits.sort_by_key(|(tier, _)| *tier);

        tracing::debug!("Medicine search {:?}: {} hits", needle, hits.len());

        hits.into_iter()
            .take(limit)
            .map(|(_, entry)| entry.medicine.clone())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
