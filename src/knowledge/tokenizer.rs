//! 토크나이저 - 자유 텍스트를 정규화된 검색어 집합으로 변환
//!
//! 증상 매칭과 질병 프로필 구축에 같은 규칙을 사용합니다.

use std::collections::BTreeSet;

/// 최소 토큰 길이 (문자 수)
pub const MIN_TOKEN_CHARS: usize = 2;

/// 불용어 (관사, 조동사, 대명사, 접속사, 전치사)
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "being", "but", "by", "can", "do", "does", "for", "from", "had", "has", "have",
    "having", "he", "her", "his", "how", "if", "in", "into", "is", "it", "its", "me", "my",
    "no", "not", "of", "on", "or", "our", "she", "so", "some", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "to", "too", "up", "very", "was", "we",
    "were", "what", "when", "which", "while", "who", "with", "you", "your",
];

/// 불용어 여부
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// 텍스트를 검색어 집합으로 변환
///
/// - 소문자화
/// - 영숫자가 아닌 문자는 구분자로 취급 (구두점 제거)
/// - 공백 분할
/// - 2자 미만 토큰, 불용어 제거
///
/// 같은 입력은 항상 같은 집합을 반환합니다. 반복된 단어는 하나로 합쳐집니다.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
