use super::*;
use crate::testkit::{account, policy, Click, ScriptedTransport, Step};
use rollcall_core::message::Affordance;
use std::time::Duration;

async fn run_with(
    account: &AccountConfig,
    policy: &PolicyConfig,
    transport: Arc<ScriptedTransport>,
) -> AccountResult {
    let patterns = PatternSet::for_account(&account.patterns).unwrap();
    CheckinOrchestrator::new(account, policy, &patterns, CancellationToken::new())
        .run(transport)
        .await
}

fn drill(label: &str) -> DrillStep {
    DrillStep {
        label: label.into(),
        ..Default::default()
    }
}

#[test]
fn test_capture_section() {
    assert_eq!(
        capture_section("虚拟机列表\n━━━━━━━━\nvm-1 running"),
        "vm-1 running"
    );
    assert_eq!(
        capture_section("a\n━━━━━━━\nb\n━━━━━━━\nlast part"),
        "last part"
    );
    assert_eq!(capture_section("  no divider  "), "no divider");
    assert_eq!(capture_section("header\n━━━━━━"), "header\n━━━━━━");
}

#[tokio::test(start_paused = true)]
async fn test_success_with_fields() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/checkin", Step::Reply("签到成功，获得 5，当前积分 120".into())),
    );
    let result = run_with(&account("A"), &policy(), transport.clone()).await;

    assert_eq!(result.account, "A");
    assert_eq!(result.status, Status::Success);
    assert_eq!(result.fields.len(), 2);
    assert_eq!(result.field("gained"), Some("5"));
    assert_eq!(result.field("total"), Some("120"));
    assert_eq!(transport.sent(), vec!["/checkin"]);
    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_already_done_queries_status() {
    let mut acct = account("A");
    acct.status_command = Some("/points".into());
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/checkin", Step::Reply("您今天已经签到过了".into()))
            .on("/points", Step::Reply("当前积分：120".into())),
    );
    let result = run_with(&acct, &policy(), transport.clone()).await;

    assert_eq!(result.status, Status::AlreadyDone);
    assert_eq!(result.fields.len(), 1);
    assert_eq!(result.field("total"), Some("120"));
    assert_eq!(transport.sent(), vec!["/checkin", "/points"]);
}

#[tokio::test(start_paused = true)]
async fn test_status_query_no_reply_is_not_fatal() {
    let mut acct = account("A");
    acct.status_command = Some("/points".into());
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/checkin", Step::Reply("今日已签到，获得 0".into()))
            .on("/points", Step::Silent),
    );
    let result = run_with(&acct, &policy(), transport).await;
    assert_eq!(result.status, Status::AlreadyDone);
    assert_eq!(result.field("gained"), Some("0"));
    assert_eq!(result.field("total"), None);
}

#[tokio::test(start_paused = true)]
async fn test_status_query_never_overrides_primary() {
    let mut acct = account("A");
    acct.status_command = Some("/points".into());
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/checkin", Step::Reply("已签到，连续签到 4 天".into()))
            .on("/points", Step::Reply("签到成功 当前积分 300 连续签到 9 天".into())),
    );
    let result = run_with(&acct, &policy(), transport).await;
    assert_eq!(result.status, Status::AlreadyDone);
    assert_eq!(result.field("streak"), Some("4"));
    assert_eq!(result.field("total"), Some("300"));
}

#[tokio::test(start_paused = true)]
async fn test_status_query_skipped_when_total_known() {
    let mut acct = account("A");
    acct.status_command = Some("/points".into());
    let transport = Arc::new(
        ScriptedTransport::new().on("/checkin", Step::Reply("已签到 当前积分 50".into())),
    );
    let result = run_with(&acct, &policy(), transport.clone()).await;
    assert_eq!(result.field("total"), Some("50"));
    assert_eq!(transport.sent(), vec!["/checkin"]);
}

#[tokio::test(start_paused = true)]
async fn test_all_attempts_time_out() {
    let transport = Arc::new(ScriptedTransport::new());
    let start = tokio::time::Instant::now();
    let result = run_with(&account("A"), &policy(), transport.clone()).await;

    assert_eq!(result.status, Status::TransientFailure);
    assert!(result.detail.contains("gave up after 3 attempts"));
    assert_eq!(transport.sent().len(), 3);
    // 3 settle windows plus linear backoff of 5s and 10s.
    assert!(start.elapsed() >= Duration::from_secs(15 + 15));
    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_before_budget() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/checkin", Step::Fail)
            .on("/checkin", Step::Silent)
            .on("/checkin", Step::Reply("签到成功，获得 5".into())),
    );
    let result = run_with(&account("A"), &policy(), transport.clone()).await;
    assert_eq!(result.status, Status::Success);
    assert_eq!(result.field("gained"), Some("5"));
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_reply_is_retried() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/checkin", Step::Reply("系统繁忙，请稍后再试".into()))
            .on("/checkin", Step::Reply("签到成功".into())),
    );
    let result = run_with(&account("A"), &policy(), transport.clone()).await;
    assert_eq!(result.status, Status::Success);
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_session_is_fatal() {
    let transport = Arc::new(ScriptedTransport::unauthorized());
    let result = run_with(&account("A"), &policy(), transport.clone()).await;
    assert_eq!(result.status, Status::Unauthorized);
    assert!(transport.sent().is_empty());
    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_reply_is_not_retried() {
    let transport =
        Arc::new(ScriptedTransport::new().on("/checkin", Step::Reply("请先登录".into())));
    let result = run_with(&account("A"), &policy(), transport.clone()).await;
    assert_eq!(result.status, Status::Unauthorized);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_is_terminal_and_keeps_raw_text() {
    let transport =
        Arc::new(ScriptedTransport::new().on("/checkin", Step::Reply("请选择语言".into())));
    let result = run_with(&account("A"), &policy(), transport.clone()).await;
    assert_eq!(result.status, Status::Ambiguous);
    assert!(result.detail.contains("请选择语言"));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drill_steps_capture_and_merge() {
    let mut acct = account("A");
    acct.drill = vec![
        drill("账户"),
        DrillStep {
            label: "VMs".into(),
            row: Some(0),
            col: Some(1),
            marker: Some("虚拟机列表".into()),
            capture: Some("vm_info".into()),
        },
    ];
    let buttons = vec![Affordance::new("👤 账户", 0, 0), Affordance::new("🖥 虚机", 0, 1)];
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(
                "/checkin",
                Step::ReplyWith("签到成功！获得：+5 GB".into(), buttons.clone()),
            )
            .on_click(
                "👤 账户",
                Click::Edit {
                    text: "📊 alice\n当前配额: 100 GB\n虚机: 2 台".into(),
                    affordances: buttons,
                    stale_reads: 1,
                },
            )
            .on_click(
                "🖥 虚机",
                Click::Edit {
                    text: "虚拟机列表\n━━━━━━━━\nvm-1 running\nvm-2 stopped".into(),
                    affordances: Vec::new(),
                    stale_reads: 0,
                },
            ),
    );
    let result = run_with(&acct, &policy(), transport.clone()).await;

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.field("gained"), Some("5"));
    assert_eq!(result.field("gained_unit"), Some("GB"));
    assert_eq!(result.field("user"), Some("alice"));
    assert_eq!(result.field("total"), Some("100"));
    assert_eq!(result.field("vm_count"), Some("2"));
    assert_eq!(result.field("vm_info"), Some("vm-1 running\nvm-2 stopped"));
    assert_eq!(transport.pressed(), vec!["👤 账户", "🖥 虚机"]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_affordance_never_downgrades() {
    let mut acct = account("A");
    acct.drill = vec![drill("账户")];
    let transport = Arc::new(
        ScriptedTransport::new().on("/checkin", Step::Reply("签到成功，获得 5".into())),
    );
    let result = run_with(&acct, &policy(), transport.clone()).await;
    assert_eq!(result.status, Status::Success);
    assert_eq!(result.field("gained"), Some("5"));
    assert!(transport.pressed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_drill_skipped_on_failure_outcome() {
    let mut acct = account("A");
    acct.drill = vec![drill("账户")];
    let transport = Arc::new(ScriptedTransport::new().on(
        "/checkin",
        Step::ReplyWith("请先登录".into(), vec![Affordance::new("账户", 0, 0)]),
    ));
    let result = run_with(&acct, &policy(), transport.clone()).await;
    assert_eq!(result.status, Status::Unauthorized);
    assert!(transport.pressed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_resolves_in_flight_account() {
    let acct = account("A");
    let pol = policy();
    let patterns = PatternSet::defaults();
    let cancel = CancellationToken::new();
    let transport = Arc::new(ScriptedTransport::new());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });
    let result = CheckinOrchestrator::new(&acct, &pol, &patterns, cancel)
        .run(transport.clone())
        .await;

    assert_eq!(result.status, Status::TransientFailure);
    assert!(result.detail.contains("cancelled"));
    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_transport_error_is_retried() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .failing_connects(1)
            .on("/checkin", Step::Reply("签到成功，获得 5".into())),
    );
    let start = tokio::time::Instant::now();
    let result = run_with(&account("A"), &policy(), transport.clone()).await;

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.field("gained"), Some("5"));
    assert_eq!(transport.connects(), 2);
    assert_eq!(transport.sent(), vec!["/checkin"]);
    assert!(start.elapsed() >= policy().backoff(1));
}

#[tokio::test(start_paused = true)]
async fn test_connect_gives_up_after_budget() {
    let transport = Arc::new(ScriptedTransport::new().failing_connects(5));
    let result = run_with(&account("A"), &policy(), transport.clone()).await;

    assert_eq!(result.status, Status::TransientFailure);
    assert!(result.detail.contains("gave up after 3 attempts"));
    assert!(result.detail.contains("connection reset"));
    assert_eq!(transport.connects(), 3);
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rendered_report_never_shows_raw_email() {
    let email = "alice@example.com";
    let pol = policy();
    let patterns = PatternSet::defaults();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let cancelled = CheckinOrchestrator::new(&account(email), &pol, &patterns, cancel)
        .run(Arc::new(ScriptedTransport::new()))
        .await;
    assert_eq!(cancelled.status, Status::TransientFailure);
    assert!(!cancelled.detail.contains(email));

    let mut acct = account(email);
    acct.drill = vec![drill("账户")];
    let buttons = vec![Affordance::new("👤 账户", 0, 0)];
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/checkin", Step::ReplyWith("签到成功".into(), buttons))
            .on_click(
                "👤 账户",
                Click::Edit {
                    text: format!("📊 {email}\n当前配额: 100 GB"),
                    affordances: Vec::new(),
                    stale_reads: 0,
                },
            ),
    );
    let drilled = run_with(&acct, &pol, transport).await;
    assert_eq!(drilled.field("user"), Some(email));

    let text = crate::report::render(&[cancelled, drilled]);
    assert!(!text.contains(email), "raw identifier in report:\n{text}");
    assert!(text.contains("user: ali***@example.com"));
}
