//! 증상 매칭 및 질병 순위
//!
//! 질의 단어를 각 질병의 검색어 프로필과 비교해 가중 점수를 계산하고,
//! 결정적인 순서로 정렬합니다.
//!
//! - Vital 증상 단어: 3점
//! - 그 외 증상 단어: 2점
//! - 원인 단어: 1점
//!
//! 동점이면 질병 ID 오름차순 (리로드 간 삽입 순서는 보장되지 않음).

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::store::{DiseaseEntry, Evidence, KnowledgeBase};

// ============================================================================
// Weights
// ============================================================================

/// 근거 종류별 가중치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub vital: u32,
    pub symptom: u32,
    pub cause: u32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            vital: 3,
            symptom: 2,
            cause: 1,
        }
    }
}

impl MatchWeights {
    pub fn weight(&self, evidence: Evidence) -> u32 {
        match evidence {
            Evidence::VitalSymptom => self.vital,
            Evidence::Symptom => self.symptom,
            Evidence::Cause => self.cause,
        }
    }
}

// ============================================================================
// SymptomMatcher
// ============================================================================

/// 단일 질병 매칭 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiseaseMatch {
    pub score: u32,
    /// 프로필과 겹친 질의 단어 (정렬됨)
    pub matched_terms: Vec<String>,
}

/// 증상 매처
#[derive(Debug, Clone, Copy, Default)]
pub struct SymptomMatcher {
    weights: MatchWeights,
}

impl SymptomMatcher {
    pub fn new(weights: MatchWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> MatchWeights {
        self.weights
    }

    /// 질병 점수 계산
    ///
    /// 서로 다른 질의 단어마다 프로필에서 찾은 근거의 가중치를 합산합니다.
    pub fn score(&self, query_terms: &BTreeSet<String>, entry: &DiseaseEntry) -> DiseaseMatch {
        let profile = entry.profile();
        let mut result = DiseaseMatch::default();

        for term in query_terms {
            if let Some(evidence) = profile.evidence(term) {
                result.score += self.weights.weight(evidence);
                result.matched_terms.push(term.clone());
            }
        }

        result
    }
}

// ============================================================================
// DiseaseRanker
// ============================================================================

/// 순위가 매겨진 질병
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedDisease<'a> {
    pub entry: &'a DiseaseEntry,
    pub score: u32,
    pub matched_terms: Vec<String>,
}

impl RankedDisease<'_> {
    pub fn disease_id(&self) -> &str {
        self.entry.id()
    }
}

/// 순위 선택 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'r, 'a> {
    /// 임계값 이상인 최상위 질병
    Resolved(&'r RankedDisease<'a>),
    /// 확신할 수 있는 매칭 없음
    Unresolved,
}

/// 질병 순위기
#[derive(Debug, Clone, Copy)]
pub struct DiseaseRanker {
    matcher: SymptomMatcher,
    min_score: u32,
}

impl DiseaseRanker {
    pub fn new(matcher: SymptomMatcher, min_score: u32) -> Self {
        Self { matcher, min_score }
    }

    pub fn min_score(&self) -> u32 {
        self.min_score
    }

    /// 전체 질병 순위
    ///
    /// 점수 0인 질병은 제외. 점수 내림차순, 동점은 ID 오름차순.
    pub fn rank<'a>(
        &self,
        query_terms: &BTreeSet<String>,
        kb: &'a KnowledgeBase,
    ) -> Vec<RankedDisease<'a>> {
        if query_terms.is_empty() {
            return vec![];
        }

        let mut ranked: Vec<RankedDisease<'a>> = kb
            .diseases()
            .filter_map(|entry| {
                let m = self.matcher.score(query_terms, entry);
                (m.score > 0).then(|| RankedDisease {
                    entry,
                    score: m.score,
                    matched_terms: m.matched_terms,
                })
            })
            .collect();

        ranked.sort_by(compare_ranked);

        tracing::debug!(
            "Ranked {} candidate diseases for {} query terms",
            ranked.len(),
            query_terms.len()
        );

        ranked
    }

    /// 최상위 후보 선택 (임계값 미만이면 Unresolved)
    pub fn select<'r, 'a>(&self, ranked: &'r [RankedDisease<'a>]) -> Selection<'r, 'a> {
        match ranked.first() {
            Some(top) if top.score >= self.min_score => Selection::Resolved(top),
            _ => Selection::Unresolved,
        }
    }
}

fn compare_ranked(a: &RankedDisease<'_>, b: &RankedDisease<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.disease_id().cmp(b.disease_id()))
}

// ============================================================================
// Tests
// ============================================================================
