//! Visibility authorization and feed scoping.
//!
//! All privacy/publish-status decisions live here as pure functions so every
//! endpoint enforces the same rules: the detail handler asks [`can_view`], the
//! list endpoints build a [`FeedScope`] that the repository turns into SQL
//! filters, and pagination input is normalized through [`PageParams`].

use crate::models::PublishStatus;

/// The minimal slice of a record the authorization decision needs.
///
/// `privacy` and `publish_status` stay raw strings: an unrecognized value in
/// either field must deny access rather than panic or default open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAccess {
    pub owner_id: i64,
    pub privacy: String,
    pub publish_status: String,
}

/// Decides whether `caller` may view (or act on) a record.
///
/// `follow_edge` is the precomputed existence of a follow edge from the caller
/// to the record owner; it is only consulted for `friends` privacy. Evaluated
/// in order, first match wins:
///
/// 1. not `published` (draft/pending/rejected, or unknown): owner only
/// 2. `public`: anyone, including anonymous
/// 3. `private`: owner only
/// 4. `friends`: owner, or a caller following the owner; never anonymous
/// 5. unknown privacy value: denied
pub fn can_view(record: &RecordAccess, caller: Option<i64>, follow_edge: bool) -> bool {
    let is_owner = caller == Some(record.owner_id);

    if PublishStatus::parse(&record.publish_status) != Some(PublishStatus::Published) {
        return is_owner;
    }

    match record.privacy.as_str() {
        "public" => true,
        "private" => is_owner,
        "friends" => match caller {
            None => false,
            Some(_) => is_owner || follow_edge,
        },
        _ => false,
    }
}

/// The resolved scope of a list request. The repository translates this into
/// the SQL predicate; resolution itself has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// Public feed: `privacy = public AND publish_status = published`.
    Public,
    /// The caller viewing their own records: no privacy restriction, optional
    /// publish-status filter applied verbatim.
    Own {
        user_id: i64,
        publish_status: Option<PublishStatus>,
    },
    /// Viewing another user's records: published only, public or (friends and
    /// the viewer follows the target).
    User { target_id: i64, viewer: Option<i64> },
}

impl FeedScope {
    /// Resolves the scope from the raw list-endpoint parameters.
    ///
    /// `privacy_param = "all"` is the client's way of asking for an
    /// unrestricted view; it only widens anything when the caller is looking
    /// at their own records. The publish-status filter is honored solely in
    /// the own-records scope; everywhere else `published` is forced.
    pub fn resolve(
        caller: Option<i64>,
        target_user: Option<i64>,
        privacy_param: Option<&str>,
        publish_status_param: Option<&str>,
    ) -> Self {
        let status_filter = publish_status_param
            .filter(|s| *s != "all")
            .and_then(PublishStatus::parse);

        if let Some(target) = target_user {
            if caller == Some(target) {
                return Self::Own {
                    user_id: target,
                    publish_status: status_filter,
                };
            }
            return Self::User {
                target_id: target,
                viewer: caller,
            };
        }

        if privacy_param == Some("all") {
            if let Some(user_id) = caller {
                return Self::Own {
                    user_id,
                    publish_status: status_filter,
                };
            }
        }

        Self::Public
    }
}

/// Optional equality filters shared by list and search endpoints.
/// `"all"` and empty strings mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub category: Option<String>,
    pub record_type: Option<String>,
}

impl RecordFilter {
    pub fn new(category: Option<String>, record_type: Option<String>) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.is_empty() && s != "all");
        Self {
            category: keep(category),
            record_type: keep(record_type),
        }
    }
}

/// Normalized pagination: 1-based page, size clamped to `[1, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

impl PageParams {
    /// Clamps raw query input. Zero or negative pages become page 1; the size
    /// falls back to `default_size` and is bounded to `[1, 100]`.
    pub fn clamp(page: Option<i64>, page_size: Option<i64>, default_size: i64) -> Self {
        let page = page.unwrap_or(1).max(1);
        let size = page_size.unwrap_or(default_size).clamp(1, 100);
        Self {
            page: page.min(i64::from(u32::MAX)) as u32,
            page_size: size as u32,
        }
    }

    pub const fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}
