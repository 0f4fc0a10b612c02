use kakao_rag_chatbot::services::fallback::{
    DEGRADED_SUFFIX, FALLBACK_TABLE, GREETING_REPLY, Intent, NO_INFORMATION_REPLY,
    SERVICE_ERROR_REPLY, degraded, detect_intent, respond,
};

#[test]
fn test_detect_intent() {
    assert_eq!(detect_intent("신자유주의가 뭐야"), Intent::Keyword(0));
    assert_eq!(detect_intent("하이에크는 누구야"), Intent::Keyword(1));
    assert_eq!(detect_intent("밀턴 프리드먼 설명해줘"), Intent::Keyword(2));
    assert_eq!(detect_intent("안녕"), Intent::Greeting);
    assert_eq!(detect_intent("도움이 필요해"), Intent::Greeting);
    assert_eq!(detect_intent("오늘 날씨는?"), Intent::Unknown);
}

#[test]
fn test_keyword_answer_is_exact_table_entry() {
    assert_eq!(respond("신자유주의가 뭐야"), FALLBACK_TABLE[0].1);
    assert_eq!(respond("하이에크"), FALLBACK_TABLE[1].1);
}

#[test]
fn test_greeting_and_unknown() {
    assert_eq!(respond("안녕"), GREETING_REPLY);
    assert_eq!(respond("반가워요"), GREETING_REPLY);
    assert_eq!(respond("오늘 날씨는?"), NO_INFORMATION_REPLY);
}

#[test]
fn test_first_keyword_in_table_order_wins() {
    // Both keywords present; table order decides, not position in the message.
    assert_eq!(respond("하이에크와 신자유주의"), FALLBACK_TABLE[0].1);
    assert_eq!(respond("안녕 밀턴 프리드먼"), FALLBACK_TABLE[2].1);
}

#[test]
fn test_respond_is_deterministic() {
    for msg in ["신자유주의", "안녕", "무작위 문장", ""] {
        assert_eq!(respond(msg), respond(msg));
        assert!(!respond(msg).is_empty());
    }
}

#[test]
fn test_degraded_answers() {
    assert_eq!(
        degraded("하이에크는 누구야"),
        format!("{}{}", FALLBACK_TABLE[1].1, DEGRADED_SUFFIX)
    );
    assert_eq!(degraded("안녕"), SERVICE_ERROR_REPLY);
    assert_eq!(degraded("오늘 날씨는?"), SERVICE_ERROR_REPLY);
}
