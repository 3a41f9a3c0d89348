use crate::{
    AppState,
    auth::{AuthUser, MaybeUser},
    error::{ApiError, ApiResult},
    models::{
        ApiResponse, CommentView, CreateCommentRequest, CreateRecordRequest, CreatedRecord,
        FollowRequest, FollowUserView, LikeCountPayload, LikeRequest, MarkReadRequest, MediaType,
        NotificationKind, NotificationView, Paged, PresignedUrlRequest, PresignedUrlResponse, Privacy,
        PublishStatus, ReadTarget, RecordDetail, RecordSummary, RejectRequest, TagCount,
        UnreadCountPayload, UpdateRecordRequest, UserProfileView,
    },
    moderation,
    storage::sanitize_key,
    visibility::{self, FeedScope, PageParams, RecordAccess, RecordFilter},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 10;
// Follow listings, the notification inbox, and the moderation queue default
// to larger pages than the media-heavy feeds.
const DEFAULT_WIDE_PAGE_SIZE: i64 = 20;
const DEFAULT_TAG_LIMIT: i64 = 20;
const MAX_TAG_LIMIT: i64 = 50;

// --- Query parameter structs ---

/// Accepted query parameters for the feed endpoint (GET /life/list).
/// `privacy=all` and `userId` switch the scope; the rest are plain filters.
#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// `all` widens to the caller's own records; any other value is ignored.
    pub privacy: Option<String>,
    /// Publish-status filter, honored only for the caller's own records.
    pub publish_status: Option<String>,
    /// Scope the feed to one author's records.
    pub user_id: Option<i64>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct RecordIdQuery {
    pub id: i64,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CommentListQuery {
    pub record_id: i64,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct TagListQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UnlikeQuery {
    pub record_id: i64,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowQuery {
    pub following_id: i64,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FollowListQuery {
    /// Whose follow list to read; defaults to the caller's own.
    pub user_id: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListQuery {
    /// Restrict the inbox to one event kind (like / comment / follow).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

// --- Shared helpers ---

/// Runs the visibility rules for one record against the caller, resolving the
/// follow edge only when the decision actually depends on it.
async fn authorize_view(
    state: &AppState,
    access: &RecordAccess,
    viewer: Option<i64>,
) -> ApiResult<()> {
    let follow_edge = match viewer {
        Some(viewer_id) if viewer_id != access.owner_id && access.privacy == "friends" => {
            state.repo.follow_exists(viewer_id, access.owner_id).await?
        }
        _ => false,
    };
    if visibility::can_view(access, viewer, follow_edge) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "no permission to view this record".to_string(),
        ))
    }
}

/// Fetches the access slice for a live record, mapping absence to 404. The
/// 403/404 split is deliberate: absence and denial are different answers.
async fn record_access_or_404(state: &AppState, id: i64) -> ApiResult<RecordAccess> {
    state
        .repo
        .record_access(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("record not found".to_string()))
}

fn require_admin(user: &AuthUser) -> ApiResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("admin role required".to_string()))
    }
}

// --- Record handlers ---

/// list_records
///
/// [Public Route] The feed. Anonymous callers get the public published slice;
/// `userId` narrows to one author under that author's privacy rules; the
/// caller's own records (via `userId` = self, or `privacy=all`) come back
/// unrestricted with an optional publish-status filter.
#[utoipa::path(
    get,
    path = "/life/list",
    params(FeedQuery),
    responses((status = 200, description = "Page of record summaries"))
)]
pub async fn list_records(
    viewer: MaybeUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<ApiResponse<Paged<RecordSummary>>>> {
    let scope = FeedScope::resolve(
        viewer.id(),
        query.user_id,
        query.privacy.as_deref(),
        query.publish_status.as_deref(),
    );
    let filter = RecordFilter::new(query.category, query.record_type);
    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_PAGE_SIZE);

    let paged = state
        .repo
        .list_records(scope, filter, page, viewer.id())
        .await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

/// get_record_detail
///
/// [Public Route] Full record with comments. A missing or soft-deleted record
/// is a 404; an existing record the caller may not see is a 403.
#[utoipa::path(
    get,
    path = "/life/detail",
    params(RecordIdQuery),
    responses(
        (status = 200, description = "Record detail"),
        (status = 403, description = "Not visible to the caller"),
        (status = 404, description = "No such record")
    )
)]
pub async fn get_record_detail(
    viewer: MaybeUser,
    State(state): State<AppState>,
    Query(query): Query<RecordIdQuery>,
) -> ApiResult<Json<ApiResponse<RecordDetail>>> {
    let access = record_access_or_404(&state, query.id).await?;
    authorize_view(&state, &access, viewer.id()).await?;

    let detail = state
        .repo
        .record_detail(query.id, viewer.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("record not found".to_string()))?;
    Ok(Json(ApiResponse::ok("success", detail)))
}

/// search_records
///
/// [Public Route] Keyword search over content and tags, public published
/// records only no matter who asks.
#[utoipa::path(
    get,
    path = "/life/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching records"),
        (status = 400, description = "Blank keyword")
    )
)]
pub async fn search_records(
    viewer: MaybeUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<Paged<RecordSummary>>>> {
    let keyword = query.keyword.as_deref().unwrap_or("").trim().to_string();
    if keyword.is_empty() {
        return Err(ApiError::Validation("keyword required".to_string()));
    }

    let filter = RecordFilter::new(query.category, query.record_type);
    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_PAGE_SIZE);

    let paged = state
        .repo
        .search_records(&keyword, filter, page, viewer.id())
        .await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

/// create_record
///
/// [Authenticated Route] Publishes a new record. The author is the session
/// user; privacy defaults to public and the publish status to published.
#[utoipa::path(
    post,
    path = "/life/record",
    request_body = CreateRecordRequest,
    responses(
        (status = 200, description = "Created", body = CreatedRecord),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_record(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateRecordRequest>,
) -> ApiResult<Json<ApiResponse<CreatedRecord>>> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("content required".to_string()));
    }
    let record_type = MediaType::parse(&payload.record_type)
        .ok_or_else(|| ApiError::Validation("invalid record type".to_string()))?;
    if let Some(privacy) = &payload.privacy {
        Privacy::parse(privacy)
            .ok_or_else(|| ApiError::Validation("invalid privacy value".to_string()))?;
    }
    if let Some(status) = &payload.publish_status {
        // Rejected is a moderation verdict, not something an author can set.
        match PublishStatus::parse(status) {
            Some(PublishStatus::Rejected) | None => {
                return Err(ApiError::Validation("invalid publish status".to_string()));
            }
            Some(_) => {}
        }
    }
    if record_type == MediaType::Video && payload.video.is_none() {
        return Err(ApiError::Validation("video info required".to_string()));
    }

    let created = state.repo.create_record(user.id, payload).await?;
    Ok(Json(ApiResponse::ok("record created", created)))
}

/// update_record
///
/// [Authenticated Route] Partial update of an owned record. Only the owner may
/// edit; a foreign record is a 403, a missing one a 404.
#[utoipa::path(
    put,
    path = "/life/record",
    request_body = UpdateRecordRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such record")
    )
)]
pub async fn update_record(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateRecordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if let Some(content) = &payload.content {
        if content.trim().is_empty() {
            return Err(ApiError::Validation("content required".to_string()));
        }
    }
    if let Some(privacy) = &payload.privacy {
        Privacy::parse(privacy)
            .ok_or_else(|| ApiError::Validation("invalid privacy value".to_string()))?;
    }
    if let Some(status) = &payload.publish_status {
        match PublishStatus::parse(status) {
            Some(PublishStatus::Rejected) | None => {
                return Err(ApiError::Validation("invalid publish status".to_string()));
            }
            Some(_) => {}
        }
    }

    let access = record_access_or_404(&state, payload.id).await?;
    if access.owner_id != user.id {
        return Err(ApiError::Forbidden("not the record owner".to_string()));
    }

    let id = payload.id;
    if !state.repo.update_record(id, user.id, payload).await? {
        return Err(ApiError::NotFound("record not found".to_string()));
    }
    Ok(Json(ApiResponse::ok_empty("record updated")))
}

/// delete_record
///
/// [Authenticated Route] Owner-only soft delete. The row stays in the store
/// with its status flag flipped and vanishes from every query.
#[utoipa::path(
    delete,
    path = "/life/record",
    params(RecordIdQuery),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such record")
    )
)]
pub async fn delete_record(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<RecordIdQuery>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let access = record_access_or_404(&state, query.id).await?;
    if access.owner_id != user.id {
        return Err(ApiError::Forbidden("not the record owner".to_string()));
    }

    if !state.repo.soft_delete_record(query.id, user.id).await? {
        return Err(ApiError::NotFound("record not found".to_string()));
    }
    Ok(Json(ApiResponse::ok_empty("record deleted")))
}

// --- Like & comment handlers ---

/// like_record
///
/// [Authenticated Route] Likes a record the caller can see. A second like of
/// the same record is a 400, not a silent no-op, so clients notice state
/// drift. Liking notifies the author unless the caller is the author.
#[utoipa::path(
    post,
    path = "/life/like",
    request_body = LikeRequest,
    responses(
        (status = 200, description = "Refreshed like count", body = LikeCountPayload),
        (status = 400, description = "Already liked")
    )
)]
pub async fn like_record(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<LikeRequest>,
) -> ApiResult<Json<ApiResponse<LikeCountPayload>>> {
    let access = record_access_or_404(&state, payload.record_id).await?;
    authorize_view(&state, &access, Some(user.id)).await?;

    let like_count = state.repo.like_record(payload.record_id, user.id).await?;
    Ok(Json(ApiResponse::ok(
        "record liked",
        LikeCountPayload { like_count },
    )))
}

/// unlike_record
///
/// [Authenticated Route] Removes the caller's like. Unliking something never
/// liked is a 400; the counter never goes below zero.
#[utoipa::path(
    delete,
    path = "/life/like",
    params(UnlikeQuery),
    responses(
        (status = 200, description = "Refreshed like count", body = LikeCountPayload),
        (status = 400, description = "Not liked")
    )
)]
pub async fn unlike_record(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UnlikeQuery>,
) -> ApiResult<Json<ApiResponse<LikeCountPayload>>> {
    let like_count = state.repo.unlike_record(query.record_id, user.id).await?;
    Ok(Json(ApiResponse::ok(
        "like removed",
        LikeCountPayload { like_count },
    )))
}

/// get_liked_records
///
/// [Authenticated Route] Records the caller liked, newest like first,
/// filtered down to what they may still see.
#[utoipa::path(
    get,
    path = "/life/liked",
    params(PageQuery),
    responses((status = 200, description = "Liked records"))
)]
pub async fn get_liked_records(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiResponse<Paged<RecordSummary>>>> {
    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let paged = state.repo.liked_records(user.id, page).await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

/// add_comment
///
/// [Authenticated Route] Comments on a record the caller can see, bumps the
/// denormalized counter, and notifies the author (never the caller
/// themselves).
#[utoipa::path(
    post,
    path = "/life/comment",
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Created comment", body = CommentView),
        (status = 400, description = "Blank content")
    )
)]
pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<Json<ApiResponse<CommentView>>> {
    let content = payload.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("comment content required".to_string()));
    }

    let access = record_access_or_404(&state, payload.record_id).await?;
    authorize_view(&state, &access, Some(user.id)).await?;

    let comment = state
        .repo
        .add_comment(payload.record_id, user.id, content)
        .await?;
    Ok(Json(ApiResponse::ok("comment added", comment)))
}

/// get_comments
///
/// [Public Route] Paged comments of a record, oldest first. Visibility of the
/// parent record gates the comments the same way it gates the detail view.
#[utoipa::path(
    get,
    path = "/life/comments",
    params(CommentListQuery),
    responses(
        (status = 200, description = "Comments"),
        (status = 403, description = "Parent record not visible"),
        (status = 404, description = "No such record")
    )
)]
pub async fn get_comments(
    viewer: MaybeUser,
    State(state): State<AppState>,
    Query(query): Query<CommentListQuery>,
) -> ApiResult<Json<ApiResponse<Paged<CommentView>>>> {
    let access = record_access_or_404(&state, query.record_id).await?;
    authorize_view(&state, &access, viewer.id()).await?;

    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let paged = state.repo.list_comments(query.record_id, page).await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

// --- Taxonomy handlers ---

/// get_categories
///
/// [Public Route] Category list, served from the in-process TTL cache when
/// warm.
#[utoipa::path(
    get,
    path = "/life/categories",
    responses((status = 200, description = "Category names"))
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<String>>>> {
    if let Some(cached) = state.taxonomy.categories() {
        return Ok(Json(ApiResponse::ok("success", cached)));
    }
    let categories = state.repo.categories().await?;
    state.taxonomy.store_categories(categories.clone());
    Ok(Json(ApiResponse::ok("success", categories)))
}

/// get_popular_tags
///
/// [Public Route] Hot tags by usage count, cached per requested limit.
#[utoipa::path(
    get,
    path = "/life/tags",
    params(TagListQuery),
    responses((status = 200, description = "Tags with usage counts", body = [TagCount]))
)]
pub async fn get_popular_tags(
    State(state): State<AppState>,
    Query(query): Query<TagListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<TagCount>>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TAG_LIMIT)
        .clamp(1, MAX_TAG_LIMIT);
    if let Some(cached) = state.taxonomy.tags(limit) {
        return Ok(Json(ApiResponse::ok("success", cached)));
    }
    let tags = state.repo.popular_tags(limit).await?;
    state.taxonomy.store_tags(limit, tags.clone());
    Ok(Json(ApiResponse::ok("success", tags)))
}

// --- Follow & profile handlers ---

/// follow_user
///
/// [Authenticated Route] Creates the one-directional follow edge that also
/// unlocks the target's friends-only records for the caller. Self-follow and
/// duplicates are 400s; a missing target is a 404.
#[utoipa::path(
    post,
    path = "/user/follow",
    request_body = FollowRequest,
    responses(
        (status = 200, description = "Followed"),
        (status = 400, description = "Self-follow or duplicate"),
        (status = 404, description = "No such user")
    )
)]
pub async fn follow_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<FollowRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if payload.following_id == user.id {
        return Err(ApiError::Validation("cannot follow yourself".to_string()));
    }
    state.repo.follow_user(user.id, payload.following_id).await?;
    Ok(Json(ApiResponse::ok_empty("followed")))
}

/// unfollow_user
///
/// [Authenticated Route] Removes the follow edge; unfollowing someone never
/// followed is a 400.
#[utoipa::path(
    delete,
    path = "/user/follow",
    params(UnfollowQuery),
    responses(
        (status = 200, description = "Unfollowed"),
        (status = 400, description = "Not following")
    )
)]
pub async fn unfollow_user(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UnfollowQuery>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.repo.unfollow_user(user.id, query.following_id).await?;
    Ok(Json(ApiResponse::ok_empty("unfollowed")))
}

/// get_following
///
/// [Authenticated Route] Who a user follows, newest edge first. Defaults to
/// the caller's own list.
#[utoipa::path(
    get,
    path = "/user/following",
    params(FollowListQuery),
    responses((status = 200, description = "Followed users", body = [FollowUserView]))
)]
pub async fn get_following(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FollowListQuery>,
) -> ApiResult<Json<ApiResponse<Paged<FollowUserView>>>> {
    let target = query.user_id.unwrap_or(user.id);
    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_WIDE_PAGE_SIZE);
    let paged = state.repo.list_following(target, page).await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

/// get_followers
///
/// [Authenticated Route] Who follows a user, newest edge first.
#[utoipa::path(
    get,
    path = "/user/followers",
    params(FollowListQuery),
    responses((status = 200, description = "Followers", body = [FollowUserView]))
)]
pub async fn get_followers(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FollowListQuery>,
) -> ApiResult<Json<ApiResponse<Paged<FollowUserView>>>> {
    let target = query.user_id.unwrap_or(user.id);
    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_WIDE_PAGE_SIZE);
    let paged = state.repo.list_followers(target, page).await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

/// get_user_profile
///
/// [Public Route] Profile page payload: identity, counters, and the caller's
/// relationship to the profile owner.
#[utoipa::path(
    get,
    path = "/user/profile/{userId}",
    params(("userId" = i64, Path, description = "Profile owner id")),
    responses(
        (status = 200, description = "Profile", body = UserProfileView),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user_profile(
    viewer: MaybeUser,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<ApiResponse<UserProfileView>>> {
    let profile = state
        .repo
        .user_profile(user_id, viewer.id())
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(ApiResponse::ok("success", profile)))
}

// --- Notification handlers ---

/// get_notifications
///
/// [Authenticated Route] The caller's inbox, newest first, optionally
/// restricted to one event kind.
#[utoipa::path(
    get,
    path = "/notification/list",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Notifications", body = [NotificationView]),
        (status = 400, description = "Unknown notification type")
    )
)]
pub async fn get_notifications(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<Json<ApiResponse<Paged<NotificationView>>>> {
    let kind = match query.kind.as_deref().filter(|k| !k.is_empty() && *k != "all") {
        Some(raw) => Some(
            NotificationKind::parse(raw)
                .ok_or_else(|| ApiError::Validation("invalid notification type".to_string()))?,
        ),
        None => None,
    };
    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_WIDE_PAGE_SIZE);
    let paged = state.repo.notifications(user.id, kind, page).await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

/// mark_notifications_read
///
/// [Authenticated Route] Marks one notification (`{"id": 42}`) or all of them
/// (`{"id": "all"}`) as read. Responds with the number of rows touched.
#[utoipa::path(
    post,
    path = "/notification/read",
    responses(
        (status = 200, description = "Rows updated"),
        (status = 400, description = "Invalid target")
    )
)]
pub async fn mark_notifications_read(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<MarkReadRequest>,
) -> ApiResult<Json<ApiResponse<u64>>> {
    let target = match payload.id {
        ReadTarget::One(id) => Some(id),
        ReadTarget::Keyword(keyword) if keyword == "all" => None,
        ReadTarget::Keyword(_) => {
            return Err(ApiError::Validation("invalid read target".to_string()));
        }
    };
    let updated = state.repo.mark_notifications_read(user.id, target).await?;
    Ok(Json(ApiResponse::ok("marked read", updated)))
}

/// get_unread_count
///
/// [Authenticated Route] Badge counter for the client's notification icon.
#[utoipa::path(
    get,
    path = "/notification/unread-count",
    responses((status = 200, description = "Unread total", body = UnreadCountPayload))
)]
pub async fn get_unread_count(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<UnreadCountPayload>>> {
    let count = state.repo.unread_count(user.id).await?;
    Ok(Json(ApiResponse::ok("success", UnreadCountPayload { count })))
}

/// delete_notification
///
/// [Authenticated Route] Removes one notification from the caller's inbox.
/// Ownership is enforced in the delete predicate; someone else's id is a 404.
#[utoipa::path(
    delete,
    path = "/notification",
    params(RecordIdQuery),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "No such notification")
    )
)]
pub async fn delete_notification(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<RecordIdQuery>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if !state.repo.delete_notification(query.id, user.id).await? {
        return Err(ApiError::NotFound("notification not found".to_string()));
    }
    Ok(Json(ApiResponse::ok_empty("notification deleted")))
}

// --- Upload handler ---

/// get_presigned_url
///
/// [Authenticated Route] Generates a short-lived URL for direct
/// client-to-bucket upload of record media, keeping media bytes off the
/// application server. Only image and video MIME types are accepted; the
/// object key is a fresh UUID so client filenames never collide.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "Upload URL", body = PresignedUrlResponse),
        (status = 400, description = "Unsupported MIME type")
    )
)]
pub async fn get_presigned_url(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> ApiResult<Json<ApiResponse<PresignedUrlResponse>>> {
    if !payload.file_type.starts_with("image/") && !payload.file_type.starts_with("video/") {
        return Err(ApiError::Validation("unsupported file type".to_string()));
    }

    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let object_key = sanitize_key(&format!("media/{}.{}", Uuid::new_v4(), extension));

    let upload_url = state
        .storage
        .presign_media_upload(&object_key, &payload.file_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "presigned upload URL generation failed");
            ApiError::Internal("storage unavailable".to_string())
        })?;

    Ok(Json(ApiResponse::ok(
        "success",
        PresignedUrlResponse {
            upload_url,
            resource_key: object_key,
        },
    )))
}

// --- Admin handlers ---

/// get_pending_records
///
/// [Admin Route] The moderation queue, oldest submission first.
#[utoipa::path(
    get,
    path = "/admin/pending-records",
    params(PageQuery),
    responses(
        (status = 200, description = "Pending records"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_pending_records(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiResponse<Paged<RecordSummary>>>> {
    require_admin(&user)?;
    let page = PageParams::clamp(query.page, query.page_size, DEFAULT_WIDE_PAGE_SIZE);
    let paged = state.repo.pending_records(page).await?;
    Ok(Json(ApiResponse::ok("success", paged)))
}

/// approve_record
///
/// [Admin Route] Publishes a pending record. Approving something that is not
/// pending (already decided, deleted, or never existed) is a 404, so two
/// moderators racing on one record see exactly one success.
#[utoipa::path(
    post,
    path = "/admin/record/{id}/approve",
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "Approved"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No pending record with this id")
    )
)]
pub async fn approve_record(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_admin(&user)?;
    if !state.repo.approve_record(id).await? {
        return Err(ApiError::NotFound(
            "no pending record to approve".to_string(),
        ));
    }
    Ok(Json(ApiResponse::ok_empty("record approved")))
}

/// reject_record
///
/// [Admin Route] Rejects a pending record with an optional reason shown to
/// the author. The reason is trimmed and capped; a blank reason stores NULL.
#[utoipa::path(
    post,
    path = "/admin/record/{id}/reject",
    params(("id" = i64, Path, description = "Record id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Rejected"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No pending record with this id")
    )
)]
pub async fn reject_record(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    require_admin(&user)?;
    let reason = moderation::normalize_reject_reason(payload.reason.as_deref());
    if !state.repo.reject_record(id, reason).await? {
        return Err(ApiError::NotFound(
            "no pending record to reject".to_string(),
        ));
    }
    Ok(Json(ApiResponse::ok_empty("record rejected")))
}
