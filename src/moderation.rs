//! Moderation workflow helpers.
//!
//! The publish-status state machine itself is enforced in SQL (approve/reject
//! update only rows still in `pending`); what lives here is the input
//! normalization that must behave identically for every caller.

/// Maximum stored length of a rejection reason, in characters.
pub const MAX_REJECT_REASON_CHARS: usize = 500;

/// Normalizes an admin-supplied rejection reason: trimmed, capped at
/// [`MAX_REJECT_REASON_CHARS`], and collapsed to `None` when nothing useful
/// remains so the column stores NULL rather than an empty string.
pub fn normalize_reject_reason(reason: Option<&str>) -> Option<String> {
    let trimmed = reason?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_REJECT_REASON_CHARS).collect())
}
