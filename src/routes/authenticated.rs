use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes for any user who passed the authentication layer: publishing and
/// managing their own records, likes, comments, follows, notifications, and
/// the media upload pipeline.
///
/// Access Control Strategy:
/// Every handler here relies on the `AuthUser` extractor middleware applied
/// on the router layer above this module, which guarantees a validated user
/// id and role. Owner-only checks (record update/delete) and the duplicate
/// like/follow rules are then enforced inside the handlers and repository.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST/PUT/DELETE /life/record
        // The record lifecycle: publish, partial update, soft delete.
        // Update and delete enforce strict ownership in the handler.
        .route(
            "/life/record",
            post(handlers::create_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        // POST /life/like, DELETE /life/like?recordId=
        // Like edges with the denormalized counter. Duplicates are business
        // errors rather than idempotent no-ops.
        .route(
            "/life/like",
            post(handlers::like_record).delete(handlers::unlike_record),
        )
        // GET /life/liked
        // The caller's like history, newest like first.
        .route("/life/liked", get(handlers::get_liked_records))
        // POST /life/comment
        // Comments on a visible record; notifies the author.
        .route("/life/comment", post(handlers::add_comment))
        // --- Follow graph ---
        // POST /user/follow, DELETE /user/follow?followingId=
        // The one-directional follow edge that also unlocks friends-only
        // records of the followed author.
        .route(
            "/user/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        // GET /user/following, GET /user/followers
        // Follow listings, defaulting to the caller's own.
        .route("/user/following", get(handlers::get_following))
        .route("/user/followers", get(handlers::get_followers))
        // --- Notification inbox ---
        .route("/notification/list", get(handlers::get_notifications))
        .route("/notification/read", post(handlers::mark_notifications_read))
        .route(
            "/notification/unread-count",
            get(handlers::get_unread_count),
        )
        .route("/notification", delete(handlers::delete_notification))
        // POST /upload/presigned
        // Short-lived presigned URL for direct client-to-bucket media upload,
        // constrained to image/* and video/* MIME types.
        .route("/upload/presigned", post(handlers::get_presigned_url))
}
