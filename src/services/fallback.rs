use once_cell::sync::Lazy;
use regex::Regex;

/// Canned answers, in priority order. The first keyword contained in the
/// message wins, so overlapping keywords must be listed most specific first.
pub const FALLBACK_TABLE: &[(&str, &str)] = &[
    (
        "신자유주의",
        "신자유주의는 1970년대 후반부터 시작된 경제 이론 및 정책으로, 시장의 자유화, 규제 완화, 민영화, 재정 긴축 등을 특징으로 합니다. 주요 이론가로는 프리드리히 하이에크, 밀턴 프리드먼 등이 있으며, 레이건(미국)과 대처(영국) 정부에서 본격적으로 도입되었습니다.",
    ),
    (
        "하이에크",
        "프리드리히 하이에크(Friedrich Hayek)는 오스트리아 출신의 경제학자이자 정치철학자로, 신자유주의의 주요 이론적 기반을 제공했습니다.",
    ),
    (
        "밀턴 프리드먼",
        "밀턴 프리드먼(Milton Friedman)은 미국의 경제학자로 시카고 학파의 중요한 인물입니다. 그는 통화주의(Monetarism)를 주창하며, 정부 개입을 최소화하고 시장의 자율성을 강조했습니다.",
    ),
];

pub const GREETING_REPLY: &str = "안녕하세요! 저는 신자유주의에 대한 정보를 제공하는 AI 챗봇입니다.";
pub const NO_INFORMATION_REPLY: &str = "죄송합니다. 해당 주제에 대한 정보가 없습니다.";
pub const SERVICE_ERROR_REPLY: &str = "죄송합니다. 서비스 처리 중 오류가 발생했습니다.";
pub const DEGRADED_SUFFIX: &str = " (백업 응답)";

static GREETING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"안녕|반가워|시작|도움|소개").expect("greeting pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Keyword(usize),
    Greeting,
    Unknown,
}

pub fn detect_intent(msg: &str) -> Intent {
    let msg_lower = msg.to_lowercase();

    if let Some(idx) = FALLBACK_TABLE
        .iter()
        .position(|(keyword, _)| msg_lower.contains(&keyword.to_lowercase()))
    {
        Intent::Keyword(idx)
    } else if GREETING.is_match(&msg_lower) {
        Intent::Greeting
    } else {
        Intent::Unknown
    }
}

/// Deterministic answer used when the live pipeline is not configured.
pub fn respond(msg: &str) -> String {
    match detect_intent(msg) {
        Intent::Keyword(idx) => FALLBACK_TABLE[idx].1.to_string(),
        Intent::Greeting => GREETING_REPLY.to_string(),
        Intent::Unknown => NO_INFORMATION_REPLY.to_string(),
    }
}

/// Answer substituted when the live pipeline failed mid-request.
pub fn degraded(msg: &str) -> String {
    match detect_intent(msg) {
        Intent::Keyword(idx) => format!("{}{}", FALLBACK_TABLE[idx].1, DEGRADED_SUFFIX),
        Intent::Greeting | Intent::Unknown => SERVICE_ERROR_REPLY.to_string(),
    }
}
