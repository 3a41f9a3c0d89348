use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Response envelope ---

/// ApiResponse
///
/// Every endpoint answers with this envelope. `code == 200` denotes business
/// success; error responses carry the HTTP status both as the transport status
/// and in `code`, with `data` set to null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success with no payload (`data: null`).
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: None,
        }
    }
}

/// Paged
///
/// Standard list payload: items plus total count and the effective (clamped)
/// page parameters, so clients can render pagination deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub list: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

// --- Domain enums ---
//
// Stored as plain text columns; the enums exist for validation and for the
// visibility logic. API views keep the raw strings so unknown values survive
// round trips and are handled fail-closed where it matters.

/// Privacy level of a record: who may view it once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Privacy {
    Public,
    Private,
    Friends,
}

impl Privacy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "friends" => Some(Self::Friends),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Friends => "friends",
        }
    }
}

/// Moderation state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PublishStatus {
    Draft,
    Pending,
    Published,
    Rejected,
}

impl PublishStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "published" => Some(Self::Published),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

/// Media type of a record: an ordered set of images, or a single video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Event kind behind a notification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
}

impl NotificationKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "comment" => Some(Self::Comment),
            "follow" => Some(Self::Follow),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Follow => "follow",
        }
    }
}

// --- Core application schemas (mapped to database) ---

/// User
///
/// Minimal identity record resolved during authentication. `role` is the RBAC
/// field: 'user' or 'admin'.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub role: String,
}

/// VideoInfo
///
/// The single video attachment of a video record: asset URL plus cover frame
/// and duration in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VideoInfo {
    pub url: String,
    pub cover: Option<String>,
    pub duration: Option<f64>,
}

/// RecordSummary
///
/// A life record as served in feeds and search results, enriched with the
/// author, media, tags, and the viewer's like state. The base fields map to a
/// `life_records` row joined with `users`; the decorated fields are filled in
/// a second assembly pass.
#[derive(Debug, Clone, Serialize, Deserialize, TS, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecordSummary {
    pub id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub avatar: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub privacy: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub publish_status: String,
    pub rejected_reason: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    // Filled by the assembly pass, not by the base row query.
    #[sqlx(skip)]
    pub images: Vec<String>,
    #[sqlx(skip)]
    pub video: Option<VideoInfo>,
    #[sqlx(skip)]
    pub tags: Vec<String>,
    #[sqlx(skip)]
    pub is_liked: bool,
}

/// RecordDetail
///
/// Detail view: the summary plus the first page of its root-level comments.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: RecordSummary,
    pub comments: Vec<CommentView>,
}

/// Internal row for media assembly; never serialized directly.
#[derive(Debug, Clone, FromRow)]
pub struct MediaRow {
    pub record_id: i64,
    pub media_type: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub duration: Option<f64>,
}

/// Internal row for tag assembly.
#[derive(Debug, Clone, FromRow)]
pub struct RecordTagRow {
    pub record_id: i64,
    pub name: String,
}

/// CommentView
///
/// A comment joined with its author's display fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentView {
    pub id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub avatar: Option<String>,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// FollowUserView
///
/// One entry of a following/followers listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FollowUserView {
    pub id: i64,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    #[ts(type = "string")]
    pub follow_at: DateTime<Utc>,
}

/// UserProfileView
///
/// Public profile page payload: identity plus counters and the viewer's
/// relationship to the profile owner.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfileView {
    pub id: i64,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<i16>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub record_count: i64,
    pub follower_count: i64,
    pub following_count: i64,
    pub is_following: bool,
    pub is_self: bool,
}

/// NotificationView
///
/// A notification joined with the acting user and the related record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub record_id: Option<i64>,
    pub from_user_id: Option<i64>,
    pub from_user_name: Option<String>,
    pub from_user_avatar: Option<String>,
    pub content: Option<String>,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub record_content: Option<String>,
    pub record_type: Option<String>,
}

/// TagCount
///
/// A tag with its usage counter, for the hot-tags listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TagCount {
    pub name: String,
    #[serde(rename = "count")]
    pub use_count: i64,
}

// --- Request payloads ---

/// Input payload for publishing a new record (POST /life/record).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateRecordRequest {
    pub content: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub privacy: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub video: Option<VideoInfo>,
    pub publish_status: Option<String>,
}

/// Partial update payload for an owned record (PUT /life/record).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateRecordRequest {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_status: Option<String>,
}

/// Input payload for liking a record (POST /life/like).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LikeRequest {
    pub record_id: i64,
}

/// Input payload for posting a comment (POST /life/comment).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCommentRequest {
    pub record_id: i64,
    pub content: String,
}

/// Input payload for following a user (POST /user/follow).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FollowRequest {
    pub following_id: i64,
}

/// Input payload for the admin reject action; the reason is optional.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

/// Target of a mark-as-read request: a single notification id, or `"all"`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ReadTarget {
    One(i64),
    Keyword(String),
}

/// Input payload for marking notifications read (POST /notification/read).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub id: ReadTarget,
}

/// Input payload for requesting a short-lived upload URL (POST /upload/presigned).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// Original filename, used to derive the object key extension.
    #[schema(example = "trip.mp4")]
    pub filename: String,
    /// MIME type the upload will be constrained to. Only image/* and video/*.
    #[schema(example = "video/mp4")]
    pub file_type: String,
}

/// Output of the presigned upload flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PresignedUrlResponse {
    pub upload_url: String,
    pub resource_key: String,
}

/// Payload returned after creating a record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatedRecord {
    pub id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Payload returned by like/unlike: the refreshed denormalized counter.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LikeCountPayload {
    pub like_count: i64,
}

/// Payload returned by the unread-count endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UnreadCountPayload {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privacy_round_trips_and_rejects_unknown() {
        assert_eq!(Privacy::parse("friends"), Some(Privacy::Friends));
        assert_eq!(Privacy::Friends.as_str(), "friends");
        assert_eq!(Privacy::parse("everyone"), None);
    }

    #[test]
    fn publish_status_parses_all_states() {
        for s in ["draft", "pending", "published", "rejected"] {
            let parsed = PublishStatus::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert_eq!(PublishStatus::parse(""), None);
    }

    #[test]
    fn record_summary_serializes_camel_case_with_type_alias() {
        let summary = RecordSummary {
            id: 7,
            user_id: 3,
            record_type: "image".to_string(),
            publish_status: "published".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["userId"], 3);
        assert_eq!(json["type"], "image");
        assert_eq!(json["publishStatus"], "published");
        assert_eq!(json["isLiked"], false);
    }

    #[test]
    fn read_target_accepts_id_or_all_keyword() {
        let one: MarkReadRequest = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert!(matches!(one.id, ReadTarget::One(42)));
        let all: MarkReadRequest = serde_json::from_str(r#"{"id": "all"}"#).unwrap();
        assert!(matches!(all.id, ReadTarget::Keyword(ref s) if s == "all"));
    }
}
