//! Masking of account identifiers in externally rendered text.

/// Number of leading characters kept visible.
const VISIBLE_PREFIX: usize = 3;

/// Mask an account identifier for notifications.
///
/// Emails keep the first three characters of the local part and the whole
/// domain (`ali***@example.com`). Other names keep a short prefix. Very short
/// names keep only their first character.
pub fn mask_identifier(id: &str) -> String {
    let id = id.trim();
    if id.is_empty() {
        return "***".to_string();
    }
    if let Some(at) = id.find('@') {
        let (local, domain) = id.split_at(at);
        if !local.is_empty() {
            return format!("{}***{domain}", prefix(local));
        }
    }
    format!("{}***", prefix(id))
}

fn prefix(s: &str) -> String {
    let count = s.chars().count();
    let keep = if count > VISIBLE_PREFIX {
        VISIBLE_PREFIX
    } else {
        1
    };
    s.chars().take(keep).collect()
}
