use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a credential. Logged-in clients still hit
/// these routes; the `MaybeUser` extractor picks up their identity when a
/// valid token is present, which is how the feed widens for the owner and
/// friends-only records open up for followers.
///
/// Security Mandate:
/// Every record-reading handler here authorizes against the visibility rules
/// before releasing data. Anonymous callers only ever see the public
/// published slice.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /life/list?page=&pageSize=&privacy=&publishStatus=&userId=&category=&type=
        // The feed. Scope resolution (public / own / one author) happens in
        // the handler from the caller identity and the query parameters.
        .route("/life/list", get(handlers::list_records))
        // GET /life/detail?id=
        // Full record with comments. 404 for absent records, 403 for records
        // the caller may not see.
        .route("/life/detail", get(handlers::get_record_detail))
        // GET /life/search?keyword=
        // Keyword search over content and tags, public published records only.
        .route("/life/search", get(handlers::search_records))
        // GET /life/comments?recordId=&page=&pageSize=
        // Comments of a record, gated by the parent record's visibility.
        .route("/life/comments", get(handlers::get_comments))
        // GET /life/categories
        // Category names, served from the TTL cache when warm.
        .route("/life/categories", get(handlers::get_categories))
        // GET /life/tags?limit=
        // Hot tags ranked by usage count.
        .route("/life/tags", get(handlers::get_popular_tags))
        // GET /user/profile/{userId}
        // Public profile with counters and the caller's follow relationship.
        .route("/user/profile/{userId}", get(handlers::get_user_profile))
}
