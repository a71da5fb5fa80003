//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "rollcall".to_string()
}

pub fn default_data_dir() -> String {
    "~/.rollcall".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_attempt_budget() -> u32 {
    3
}

pub fn default_backoff_secs() -> u64 {
    5
}

pub fn default_settle_secs() -> u64 {
    5
}

pub fn default_fetch_limit() -> usize {
    10
}

pub fn default_staleness_retries() -> u32 {
    1
}

pub fn default_inter_account_delay_secs() -> u64 {
    5
}

pub fn default_deadline_secs() -> u64 {
    600
}

pub fn default_command() -> String {
    "/checkin".to_string()
}

pub fn default_notify_title() -> String {
    "rollcall check-in report".to_string()
}

pub fn default_relay_timeout_secs() -> u64 {
    30
}

pub fn default_username_field() -> String {
    "username".to_string()
}

pub fn default_password_field() -> String {
    "password".to_string()
}

pub fn default_login_markers() -> Vec<String> {
    vec!["login".to_string(), "signin".to_string()]
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0 Safari/537.36"
        .to_string()
}
