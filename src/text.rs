//! 텍스트 유틸리티 (UTF-8 안전 자르기)

/// 표시용 텍스트 자르기
///
/// 줄바꿈을 공백으로 바꾸고, `max_chars` 문자를 넘으면 잘라서 `...`을 붙입니다.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 문자 수 기준으로 앞부분만 남김 (줄임표 없음)
///
/// 임베딩 입력 예산처럼 원문 그대로 보내야 하는 경우에 사용합니다.
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
