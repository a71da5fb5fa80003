//! Tests for the Telegram notifier module.

use super::types::TgResponse;
use super::*;

#[test]
fn test_tg_response_error_shape() {
    let resp: TgResponse = serde_json::from_str(
        r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#,
    )
    .unwrap();
    assert!(!resp.ok);
    assert_eq!(
        resp.description.as_deref(),
        Some("Bad Request: chat not found")
    );
}

#[test]
fn test_tg_response_ok_without_description() {
    let resp: TgResponse = serde_json::from_str(r#"{"ok": true, "result": {}}"#).unwrap();
    assert!(resp.ok);
    assert!(resp.description.is_none());
}

#[test]
fn test_notifier_base_url_embeds_token() {
    let cfg = TelegramNotifyConfig {
        enabled: true,
        bot_token: "123:abc".into(),
        chat_id: "42".into(),
    };
    let notifier = TelegramNotifier::new(&cfg);
    assert_eq!(notifier.base_url, "https://api.telegram.org/bot123:abc");
    assert_eq!(notifier.chat_id, "42");
    assert_eq!(notifier.name(), "telegram");
}
