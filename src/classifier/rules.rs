//! Built-in response vocabulary.
//!
//! Phrasing collected from the chat bots and web panels rollcall checks in
//! against. Per-account rules extend these; they never replace them.

use rollcall_core::outcome::Status;

/// Number capture shared by the numeric field rules.
const NUM: &str = r"(?P<value>\d[\d,]*(?:\.\d+)?)";

/// Unit tokens recognized right after a number.
const UNIT: &str = r"(?:\s*(?P<unit>GB|MB|KB|TB|days?|天|points?|积分|分|credits?|元|台|万|[KkMmWw]\b))?";

/// Default status rules in precedence order.
pub(crate) const STATUS_RULES: &[(Status, &str)] = &[
    (
        Status::AlreadyDone,
        r"已经签到|已签到|今日已签|重复签到|签到过了|机会已用完|已完成签到|(?i:already\s+(?:checked|signed))|(?i:checked\s+in\s+today)|(?i:completed\s+today)",
    ),
    (
        Status::Success,
        r"签到成功|获得奖励|成功|(?i:check-?in\s+success)|(?i:\bsuccess)|(?i:attendance\s+recorded)|(?i:\bearned\b)",
    ),
    (
        Status::Unauthorized,
        r"未登录|请先登录|登录已过期|登录失效|认证失败|(?i:unauthori[sz]ed)|(?i:token\s+(?:is\s+)?(?:invalid|expired))|(?i:invalid\s+token)|(?i:HTTP\s*(?:error\s*)?401\b)",
    ),
    (
        Status::TransientFailure,
        r"系统繁忙|稍后再试|服务暂时不可用|失败|不成功|未成功|(?i:try\s+again\s+later)|(?i:too\s+many\s+requests)|(?i:rate\s+limit)|(?i:\bfailed\b)",
    ),
];

/// Phrasing that rules out `Success` even when a success keyword appears,
/// as in "签到不成功" or "登录成功，但签到失败".
pub(crate) const SUCCESS_NEGATION: &str =
    r"不成功|未成功|失败|(?i:\bfailed\b)|(?i:\bunsuccessful\b)|(?i:not\s+successful)";

/// How a field capture is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Text,
}

/// Default field rules as `(field, kind, regex)`; first match per field wins.
pub(crate) fn field_rules() -> Vec<(&'static str, FieldKind, String)> {
    use FieldKind::*;
    vec![
        (
            "gained",
            Number,
            format!(r"(?i:获得|今日已获|earned|gained)[^\d+\-\n]{{0,8}}\+?{NUM}{UNIT}"),
        ),
        (
            "total",
            Number,
            format!(r"(?i:当前积分|总积分|总分|积分余额|余额|当前配额|总配额|配额|total|balance|quota)\s*[:：]?\s*{NUM}{UNIT}"),
        ),
        (
            "streak",
            Number,
            format!(r"(?i:连续签到|连签|streak)[^\d\n]{{0,6}}{NUM}{UNIT}"),
        ),
        (
            "used",
            Number,
            format!(r"(?i:已使用|已用|used)\s*[:：]?\s*{NUM}{UNIT}"),
        ),
        (
            "remaining",
            Number,
            format!(r"(?i:剩余|remaining)\s*[:：]?\s*{NUM}{UNIT}"),
        ),
        ("vm_count", Number, format!(r"虚机\s*[:：]\s*{NUM}\s*台")),
        ("user", Text, r"📊\s*(?P<value>[^\n]+)".to_string()),
        (
            "user",
            Text,
            r"(?i:用户名|username)\s*[:：]\s*(?P<value>\S+)".to_string(),
        ),
        (
            "expiry_days",
            Number,
            format!(r"(?i:expires?\s+in)\s*{NUM}\s*[Dd]"),
        ),
    ]
}
