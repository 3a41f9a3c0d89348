use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Moderation endpoints for the publish-status workflow, nested under
/// `/admin`.
///
/// Access Control:
/// The surrounding authentication layer guarantees a validated session; the
/// `role = 'admin'` check itself happens inside every handler, so a regular
/// user reaching these paths gets a 403 rather than a 404.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/pending-records
        // The moderation queue, oldest submission first so reviewers work in
        // arrival order.
        .route("/pending-records", get(handlers::get_pending_records))
        // POST /admin/record/{id}/approve
        // Publishes a pending record. Only fires from the pending state, so
        // racing moderators cannot double-decide one record.
        .route("/record/{id}/approve", post(handlers::approve_record))
        // POST /admin/record/{id}/reject
        // Rejects a pending record with an optional reason for the author.
        .route("/record/{id}/reject", post(handlers::reject_record))
}
