//! Tests for the relay transport module.

use super::types::*;
use super::*;
use rollcall_core::message::ReplyMessage;

#[test]
fn test_relay_message_with_keyboard() {
    let json = r#"{
        "id": 4411,
        "sender_id": 8595031564,
        "text": "签到成功！获得：+5 GB",
        "buttons": [
            [{"text": "账户", "data": "acct"}, {"text": "虚机"}],
            [{"text": "帮助"}]
        ],
        "date": 1760000000
    }"#;
    let msg: RelayMessage = serde_json::from_str(json).unwrap();
    let reply = ReplyMessage::from(msg);
    assert_eq!(reply.id, "4411");
    assert_eq!(reply.sender_id, "8595031564");
    assert_eq!(reply.affordances.len(), 3);
    assert_eq!(reply.affordances[0].label, "账户");
    assert_eq!(reply.affordances[0].data.as_deref(), Some("acct"));
    assert_eq!((reply.affordances[1].row, reply.affordances[1].col), (0, 1));
    assert_eq!((reply.affordances[2].row, reply.affordances[2].col), (1, 0));
    assert_eq!(reply.received_at.timestamp(), 1760000000);
}

#[test]
fn test_relay_message_string_ids_and_no_buttons() {
    let json = r#"{"id": "m-1", "sender_id": "@SomeBot", "text": "hi"}"#;
    let reply = ReplyMessage::from(serde_json::from_str::<RelayMessage>(json).unwrap());
    assert_eq!(reply.id, "m-1");
    assert_eq!(reply.sender_id, "@SomeBot");
    assert!(reply.affordances.is_empty());
}

#[test]
fn test_relay_envelope_error() {
    let json = r#"{"ok": false, "description": "FLOOD_WAIT_30"}"#;
    let resp: RelayResponse<Vec<RelayMessage>> = serde_json::from_str(json).unwrap();
    assert!(!resp.ok);
    assert!(resp.result.is_none());
    assert_eq!(resp.description.as_deref(), Some("FLOOD_WAIT_30"));
}

#[test]
fn test_relay_connect_defaults_to_unauthorized() {
    let connect: RelayConnect = serde_json::from_str("{}").unwrap();
    assert!(!connect.authorized);
}

#[test]
fn test_id_string_null_is_empty() {
    assert_eq!(id_string(&serde_json::Value::Null), "");
}

#[test]
fn test_transport_trims_base_url() {
    let cfg = rollcall_core::config::RelayConfig {
        base_url: "http://127.0.0.1:8787/".into(),
        api_key: String::new(),
        timeout_secs: 30,
    };
    let transport = RelayTransport::new(&cfg, "tg_session");
    assert_eq!(transport.base_url, "http://127.0.0.1:8787");
    assert_eq!(transport.session, "tg_session");
}
