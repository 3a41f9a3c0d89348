use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use liferecord::{
    AppState, TaxonomyCache,
    auth::AuthUser,
    config::AppConfig,
    error::ApiResult,
    handlers::{
        self, CommentListQuery, FeedQuery, NotificationListQuery, PageQuery, RecordIdQuery,
        SearchQuery, UnlikeQuery,
    },
    models::{
        CommentView, CreateCommentRequest, CreateRecordRequest, CreatedRecord, FollowRequest,
        FollowUserView, LikeRequest, MarkReadRequest, NotificationKind, NotificationView, Paged,
        PresignedUrlRequest, ReadTarget, RecordDetail, RecordSummary, RejectRequest, TagCount,
        UpdateRecordRequest, User, UserProfileView,
    },
    repository::Repository,
    storage::MockMediaStorage,
    visibility::{FeedScope, PageParams, RecordAccess, RecordFilter},
};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::test;

// --- MOCK REPOSITORY ---

// Handlers depend on the Repository trait, so handler logic is tested against
// this mock: pre-canned outputs in, captured inputs out.
struct MockRepo {
    user_role: String,
    access: Option<RecordAccess>,
    follow_edge: bool,
    detail: Option<RecordDetail>,
    like_count: i64,
    like_error: Option<&'static str>,
    unlike_error: Option<&'static str>,
    follow_error: Option<&'static str>,
    unfollow_error: Option<&'static str>,
    update_ok: bool,
    soft_delete_ok: bool,
    approve_ok: bool,
    reject_ok: bool,
    delete_notification_ok: bool,
    mark_read_result: u64,
    categories_list: Vec<String>,

    // Captured inputs for verification.
    last_reject_reason: Mutex<Option<Option<String>>>,
    last_mark_read_target: Mutex<Option<Option<i64>>>,
    last_notification_kind: Mutex<Option<Option<NotificationKind>>>,
    last_page: Mutex<Option<PageParams>>,
    categories_calls: AtomicUsize,
}

impl Default for MockRepo {
    fn default() -> Self {
        MockRepo {
            user_role: "user".to_string(),
            access: Some(RecordAccess {
                owner_id: 1,
                privacy: "public".to_string(),
                publish_status: "published".to_string(),
            }),
            follow_edge: false,
            detail: Some(RecordDetail::default()),
            like_count: 5,
            like_error: None,
            unlike_error: None,
            follow_error: None,
            unfollow_error: None,
            update_ok: true,
            soft_delete_ok: true,
            approve_ok: true,
            reject_ok: true,
            delete_notification_ok: true,
            mark_read_result: 1,
            categories_list: vec!["daily".to_string(), "travel".to_string()],
            last_reject_reason: Mutex::new(None),
            last_mark_read_target: Mutex::new(None),
            last_notification_kind: Mutex::new(None),
            last_page: Mutex::new(None),
            categories_calls: AtomicUsize::new(0),
        }
    }
}

fn empty_paged<T>() -> Paged<T> {
    Paged {
        list: vec![],
        total: 0,
        page: 1,
        page_size: 10,
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user(&self, id: i64) -> ApiResult<Option<User>> {
        Ok(Some(User {
            id,
            nickname: Some("tester".to_string()),
            avatar: None,
            role: self.user_role.clone(),
        }))
    }
    async fn user_profile(
        &self,
        target_id: i64,
        viewer: Option<i64>,
    ) -> ApiResult<Option<UserProfileView>> {
        Ok(Some(UserProfileView {
            id: target_id,
            is_self: viewer == Some(target_id),
            ..UserProfileView::default()
        }))
    }
    async fn list_records(
        &self,
        _scope: FeedScope,
        _filter: RecordFilter,
        page: PageParams,
        _viewer: Option<i64>,
    ) -> ApiResult<Paged<RecordSummary>> {
        *self.last_page.lock().unwrap() = Some(page);
        Ok(empty_paged())
    }
    async fn search_records(
        &self,
        _keyword: &str,
        _filter: RecordFilter,
        _page: PageParams,
        _viewer: Option<i64>,
    ) -> ApiResult<Paged<RecordSummary>> {
        Ok(empty_paged())
    }
    async fn record_access(&self, _id: i64) -> ApiResult<Option<RecordAccess>> {
        Ok(self.access.clone())
    }
    async fn record_detail(
        &self,
        _id: i64,
        _viewer: Option<i64>,
    ) -> ApiResult<Option<RecordDetail>> {
        Ok(self.detail.clone())
    }
    async fn create_record(
        &self,
        _user_id: i64,
        _req: CreateRecordRequest,
    ) -> ApiResult<CreatedRecord> {
        Ok(CreatedRecord {
            id: 42,
            ..CreatedRecord::default()
        })
    }
    async fn update_record(
        &self,
        _id: i64,
        _user_id: i64,
        _req: UpdateRecordRequest,
    ) -> ApiResult<bool> {
        Ok(self.update_ok)
    }
    async fn soft_delete_record(&self, _id: i64, _user_id: i64) -> ApiResult<bool> {
        Ok(self.soft_delete_ok)
    }
    async fn like_record(&self, _record_id: i64, _user_id: i64) -> ApiResult<i64> {
        match self.like_error {
            Some(msg) => Err(liferecord::ApiError::Validation(msg.to_string())),
            None => Ok(self.like_count),
        }
    }
    async fn unlike_record(&self, _record_id: i64, _user_id: i64) -> ApiResult<i64> {
        match self.unlike_error {
            Some(msg) => Err(liferecord::ApiError::Validation(msg.to_string())),
            None => Ok(self.like_count),
        }
    }
    async fn liked_records(
        &self,
        _user_id: i64,
        _page: PageParams,
    ) -> ApiResult<Paged<RecordSummary>> {
        Ok(empty_paged())
    }
    async fn add_comment(
        &self,
        _record_id: i64,
        user_id: i64,
        content: String,
    ) -> ApiResult<CommentView> {
        Ok(CommentView {
            id: 1,
            user_id,
            content,
            ..CommentView::default()
        })
    }
    async fn list_comments(
        &self,
        _record_id: i64,
        _page: PageParams,
    ) -> ApiResult<Paged<CommentView>> {
        Ok(empty_paged())
    }
    async fn follow_exists(&self, _follower_id: i64, _following_id: i64) -> ApiResult<bool> {
        Ok(self.follow_edge)
    }
    async fn follow_user(&self, _follower_id: i64, _following_id: i64) -> ApiResult<()> {
        match self.follow_error {
            Some(msg) => Err(liferecord::ApiError::Validation(msg.to_string())),
            None => Ok(()),
        }
    }
    async fn unfollow_user(&self, _follower_id: i64, _following_id: i64) -> ApiResult<()> {
        match self.unfollow_error {
            Some(msg) => Err(liferecord::ApiError::Validation(msg.to_string())),
            None => Ok(()),
        }
    }
    async fn list_following(
        &self,
        _user_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<FollowUserView>> {
        *self.last_page.lock().unwrap() = Some(page);
        Ok(empty_paged())
    }
    async fn list_followers(
        &self,
        _user_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<FollowUserView>> {
        *self.last_page.lock().unwrap() = Some(page);
        Ok(empty_paged())
    }
    async fn pending_records(&self, page: PageParams) -> ApiResult<Paged<RecordSummary>> {
        *self.last_page.lock().unwrap() = Some(page);
        Ok(empty_paged())
    }
    async fn approve_record(&self, _id: i64) -> ApiResult<bool> {
        Ok(self.approve_ok)
    }
    async fn reject_record(&self, _id: i64, reason: Option<String>) -> ApiResult<bool> {
        *self.last_reject_reason.lock().unwrap() = Some(reason);
        Ok(self.reject_ok)
    }
    async fn categories(&self) -> ApiResult<Vec<String>> {
        self.categories_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.categories_list.clone())
    }
    async fn popular_tags(&self, _limit: i64) -> ApiResult<Vec<TagCount>> {
        Ok(vec![TagCount {
            name: "travel".to_string(),
            use_count: 3,
        }])
    }
    async fn notifications(
        &self,
        _user_id: i64,
        kind: Option<NotificationKind>,
        page: PageParams,
    ) -> ApiResult<Paged<NotificationView>> {
        *self.last_notification_kind.lock().unwrap() = Some(kind);
        *self.last_page.lock().unwrap() = Some(page);
        Ok(empty_paged())
    }
    async fn mark_notifications_read(&self, _user_id: i64, id: Option<i64>) -> ApiResult<u64> {
        *self.last_mark_read_target.lock().unwrap() = Some(id);
        Ok(self.mark_read_result)
    }
    async fn unread_count(&self, _user_id: i64) -> ApiResult<i64> {
        Ok(3)
    }
    async fn delete_notification(&self, _id: i64, _user_id: i64) -> ApiResult<bool> {
        Ok(self.delete_notification_ok)
    }
}

// --- TEST UTILITIES ---

const VIEWER_ID: i64 = 7;
const OWNER_ID: i64 = 1;

fn test_state(repo: MockRepo) -> AppState {
    AppState {
        repo: Arc::new(repo),
        storage: Arc::new(MockMediaStorage::new()),
        taxonomy: TaxonomyCache::new(),
        config: AppConfig::default(),
    }
}

fn state_with_repo(repo: MockRepo) -> (AppState, Arc<MockRepo>) {
    let repo = Arc::new(repo);
    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(MockMediaStorage::new()),
        taxonomy: TaxonomyCache::new(),
        config: AppConfig::default(),
    };
    (state, repo)
}

fn viewer() -> liferecord::auth::MaybeUser {
    liferecord::auth::MaybeUser(Some(plain_user()))
}

fn anonymous() -> liferecord::auth::MaybeUser {
    liferecord::auth::MaybeUser(None)
}

fn plain_user() -> AuthUser {
    AuthUser {
        id: VIEWER_ID,
        role: "user".to_string(),
    }
}

fn owner_user() -> AuthUser {
    AuthUser {
        id: OWNER_ID,
        role: "user".to_string(),
    }
}

fn admin_user() -> AuthUser {
    AuthUser {
        id: 99,
        role: "admin".to_string(),
    }
}

fn access(owner: i64, privacy: &str, status: &str) -> RecordAccess {
    RecordAccess {
        owner_id: owner,
        privacy: privacy.to_string(),
        publish_status: status.to_string(),
    }
}

fn page_query() -> PageQuery {
    PageQuery {
        page: None,
        page_size: None,
    }
}

// --- DETAIL & VISIBILITY ---

#[test]
async fn detail_of_missing_record_is_404() {
    let state = test_state(MockRepo {
        access: None,
        ..MockRepo::default()
    });

    let result =
        handlers::get_record_detail(anonymous(), State(state), Query(RecordIdQuery { id: 1 }))
            .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

#[test]
async fn detail_of_foreign_private_record_is_403() {
    let state = test_state(MockRepo {
        access: Some(access(OWNER_ID, "private", "published")),
        ..MockRepo::default()
    });

    let result =
        handlers::get_record_detail(viewer(), State(state), Query(RecordIdQuery { id: 1 })).await;

    // The record exists, so denial is a 403 rather than a 404.
    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);
}

#[test]
async fn friends_record_opens_for_a_follower() {
    let state = test_state(MockRepo {
        access: Some(access(OWNER_ID, "friends", "published")),
        follow_edge: true,
        ..MockRepo::default()
    });

    let result =
        handlers::get_record_detail(viewer(), State(state), Query(RecordIdQuery { id: 1 })).await;

    assert!(result.is_ok());
}

#[test]
async fn friends_record_stays_closed_to_strangers_and_anonymous() {
    let state = test_state(MockRepo {
        access: Some(access(OWNER_ID, "friends", "published")),
        follow_edge: false,
        ..MockRepo::default()
    });

    let result = handlers::get_record_detail(
        viewer(),
        State(state.clone()),
        Query(RecordIdQuery { id: 1 }),
    )
    .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);

    let result =
        handlers::get_record_detail(anonymous(), State(state), Query(RecordIdQuery { id: 1 }))
            .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);
}

#[test]
async fn pending_record_is_visible_only_to_its_owner() {
    let state = test_state(MockRepo {
        access: Some(access(OWNER_ID, "public", "pending")),
        ..MockRepo::default()
    });

    let result = handlers::get_record_detail(
        liferecord::auth::MaybeUser(Some(owner_user())),
        State(state.clone()),
        Query(RecordIdQuery { id: 1 }),
    )
    .await;
    assert!(result.is_ok());

    let result =
        handlers::get_record_detail(viewer(), State(state), Query(RecordIdQuery { id: 1 })).await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);
}

// --- SEARCH & FEED ---

#[test]
async fn search_requires_a_nonblank_keyword() {
    let state = test_state(MockRepo::default());

    let result = handlers::search_records(
        anonymous(),
        State(state),
        Query(SearchQuery {
            keyword: Some("   ".to_string()),
            page: None,
            page_size: None,
            category: None,
            record_type: None,
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn feed_answers_with_the_standard_envelope() {
    let state = test_state(MockRepo::default());

    let Json(response) = handlers::list_records(
        anonymous(),
        State(state),
        Query(FeedQuery {
            page: None,
            page_size: None,
            privacy: None,
            publish_status: None,
            user_id: None,
            category: None,
            record_type: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.code, 200);
    let paged = response.data.unwrap();
    assert_eq!(paged.total, 0);
    assert_eq!(paged.page, 1);
}

// --- RECORD LIFECYCLE ---

#[test]
async fn create_record_rejects_unknown_type_and_privacy() {
    let state = test_state(MockRepo::default());

    let result = handlers::create_record(
        plain_user(),
        State(state.clone()),
        Json(CreateRecordRequest {
            content: "hello".to_string(),
            record_type: "audio".to_string(),
            ..CreateRecordRequest::default()
        }),
    )
    .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);

    let result = handlers::create_record(
        plain_user(),
        State(state),
        Json(CreateRecordRequest {
            content: "hello".to_string(),
            record_type: "image".to_string(),
            privacy: Some("everyone".to_string()),
            ..CreateRecordRequest::default()
        }),
    )
    .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn authors_cannot_submit_a_rejected_record() {
    let state = test_state(MockRepo::default());

    let result = handlers::create_record(
        plain_user(),
        State(state),
        Json(CreateRecordRequest {
            content: "hello".to_string(),
            record_type: "image".to_string(),
            publish_status: Some("rejected".to_string()),
            ..CreateRecordRequest::default()
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn video_record_requires_video_info() {
    let state = test_state(MockRepo::default());

    let result = handlers::create_record(
        plain_user(),
        State(state),
        Json(CreateRecordRequest {
            content: "clip".to_string(),
            record_type: "video".to_string(),
            ..CreateRecordRequest::default()
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn create_record_returns_the_new_id() {
    let state = test_state(MockRepo::default());

    let Json(response) = handlers::create_record(
        plain_user(),
        State(state),
        Json(CreateRecordRequest {
            content: "a day out".to_string(),
            record_type: "image".to_string(),
            images: Some(vec!["media/a.jpg".to_string()]),
            ..CreateRecordRequest::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.data.unwrap().id, 42);
}

#[test]
async fn updating_a_foreign_record_is_403() {
    let state = test_state(MockRepo {
        access: Some(access(OWNER_ID, "public", "published")),
        ..MockRepo::default()
    });

    let result = handlers::update_record(
        plain_user(),
        State(state),
        Json(UpdateRecordRequest {
            id: 1,
            content: Some("edited".to_string()),
            ..UpdateRecordRequest::default()
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);
}

#[test]
async fn deleting_a_foreign_record_is_403() {
    let state = test_state(MockRepo {
        access: Some(access(OWNER_ID, "public", "published")),
        ..MockRepo::default()
    });

    let result =
        handlers::delete_record(plain_user(), State(state), Query(RecordIdQuery { id: 1 })).await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);
}

// --- LIKES & COMMENTS ---

#[test]
async fn duplicate_like_is_a_400_with_a_reason() {
    let state = test_state(MockRepo {
        like_error: Some("already liked"),
        ..MockRepo::default()
    });

    let result = handlers::like_record(
        plain_user(),
        State(state),
        Json(LikeRequest { record_id: 1 }),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "already liked");
}

#[test]
async fn like_returns_the_refreshed_counter() {
    let state = test_state(MockRepo {
        like_count: 6,
        ..MockRepo::default()
    });

    let Json(response) = handlers::like_record(
        plain_user(),
        State(state),
        Json(LikeRequest { record_id: 1 }),
    )
    .await
    .unwrap();

    assert_eq!(response.data.unwrap().like_count, 6);
}

#[test]
async fn unliking_without_a_like_is_a_400() {
    let state = test_state(MockRepo {
        unlike_error: Some("not liked"),
        ..MockRepo::default()
    });

    let result = handlers::unlike_record(
        plain_user(),
        State(state),
        Query(UnlikeQuery { record_id: 1 }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn blank_comment_is_rejected_and_content_is_trimmed() {
    let state = test_state(MockRepo::default());

    let result = handlers::add_comment(
        plain_user(),
        State(state.clone()),
        Json(CreateCommentRequest {
            record_id: 1,
            content: "  \t ".to_string(),
        }),
    )
    .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);

    let Json(response) = handlers::add_comment(
        plain_user(),
        State(state),
        Json(CreateCommentRequest {
            record_id: 1,
            content: "  nice shot  ".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(response.data.unwrap().content, "nice shot");
}

#[test]
async fn comments_of_an_invisible_record_are_403() {
    let state = test_state(MockRepo {
        access: Some(access(OWNER_ID, "private", "published")),
        ..MockRepo::default()
    });

    let result = handlers::get_comments(
        viewer(),
        State(state),
        Query(CommentListQuery {
            record_id: 1,
            page: None,
            page_size: None,
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);
}

// --- FOLLOWS ---

#[test]
async fn self_follow_is_rejected() {
    let state = test_state(MockRepo::default());

    let result = handlers::follow_user(
        plain_user(),
        State(state),
        Json(FollowRequest {
            following_id: VIEWER_ID,
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn duplicate_follow_is_a_400() {
    let state = test_state(MockRepo {
        follow_error: Some("already following"),
        ..MockRepo::default()
    });

    let result = handlers::follow_user(
        plain_user(),
        State(state),
        Json(FollowRequest { following_id: 8 }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

// --- PAGE-SIZE DEFAULTS ---

#[test]
async fn follow_notification_and_pending_listings_default_to_twenty_per_page() {
    let (state, repo) = state_with_repo(MockRepo::default());
    let captured_size = || repo.last_page.lock().unwrap().unwrap().page_size;

    handlers::get_following(
        plain_user(),
        State(state.clone()),
        Query(liferecord::handlers::FollowListQuery {
            user_id: None,
            page: None,
            page_size: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(captured_size(), 20);

    handlers::get_followers(
        plain_user(),
        State(state.clone()),
        Query(liferecord::handlers::FollowListQuery {
            user_id: None,
            page: None,
            page_size: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(captured_size(), 20);

    handlers::get_notifications(
        plain_user(),
        State(state.clone()),
        Query(NotificationListQuery {
            kind: None,
            page: None,
            page_size: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(captured_size(), 20);

    handlers::get_pending_records(admin_user(), State(state.clone()), Query(page_query()))
        .await
        .unwrap();
    assert_eq!(captured_size(), 20);

    // Feeds keep the smaller default.
    handlers::list_records(
        anonymous(),
        State(state),
        Query(FeedQuery {
            page: None,
            page_size: None,
            privacy: None,
            publish_status: None,
            user_id: None,
            category: None,
            record_type: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(captured_size(), 10);
}

// --- MODERATION ---

#[test]
async fn moderation_endpoints_require_the_admin_role() {
    let state = test_state(MockRepo::default());

    let result =
        handlers::get_pending_records(plain_user(), State(state.clone()), Query(page_query()))
            .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);

    let result = handlers::approve_record(plain_user(), State(state.clone()), Path(1)).await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);

    let result = handlers::reject_record(
        plain_user(),
        State(state),
        Path(1),
        Json(RejectRequest { reason: None }),
    )
    .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::FORBIDDEN);
}

#[test]
async fn approving_a_non_pending_record_is_404() {
    let state = test_state(MockRepo {
        approve_ok: false,
        ..MockRepo::default()
    });

    let result = handlers::approve_record(admin_user(), State(state), Path(1)).await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

#[test]
async fn reject_reason_is_normalized_before_storage() {
    let (state, repo) = state_with_repo(MockRepo::default());

    handlers::reject_record(
        admin_user(),
        State(state.clone()),
        Path(1),
        Json(RejectRequest {
            reason: Some("  low quality  ".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(
        repo.last_reject_reason.lock().unwrap().clone(),
        Some(Some("low quality".to_string()))
    );

    handlers::reject_record(
        admin_user(),
        State(state),
        Path(2),
        Json(RejectRequest {
            reason: Some("   ".to_string()),
        }),
    )
    .await
    .unwrap();
    // Whitespace-only reasons store NULL, not an empty string.
    assert_eq!(repo.last_reject_reason.lock().unwrap().clone(), Some(None));
}

// --- NOTIFICATIONS ---

#[test]
async fn mark_read_accepts_one_id_or_the_all_keyword() {
    let (state, repo) = state_with_repo(MockRepo::default());

    handlers::mark_notifications_read(
        plain_user(),
        State(state.clone()),
        Json(MarkReadRequest {
            id: ReadTarget::One(42),
        }),
    )
    .await
    .unwrap();
    assert_eq!(
        repo.last_mark_read_target.lock().unwrap().clone(),
        Some(Some(42))
    );

    handlers::mark_notifications_read(
        plain_user(),
        State(state.clone()),
        Json(MarkReadRequest {
            id: ReadTarget::Keyword("all".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(repo.last_mark_read_target.lock().unwrap().clone(), Some(None));

    let result = handlers::mark_notifications_read(
        plain_user(),
        State(state),
        Json(MarkReadRequest {
            id: ReadTarget::Keyword("everything".to_string()),
        }),
    )
    .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn notification_list_filters_by_kind_and_rejects_unknown_kinds() {
    let (state, repo) = state_with_repo(MockRepo::default());

    handlers::get_notifications(
        plain_user(),
        State(state.clone()),
        Query(NotificationListQuery {
            kind: Some("like".to_string()),
            page: None,
            page_size: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(
        repo.last_notification_kind.lock().unwrap().clone(),
        Some(Some(NotificationKind::Like))
    );

    handlers::get_notifications(
        plain_user(),
        State(state.clone()),
        Query(NotificationListQuery {
            kind: Some("all".to_string()),
            page: None,
            page_size: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(repo.last_notification_kind.lock().unwrap().clone(), Some(None));

    let result = handlers::get_notifications(
        plain_user(),
        State(state),
        Query(NotificationListQuery {
            kind: Some("mention".to_string()),
            page: None,
            page_size: None,
        }),
    )
    .await;
    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn deleting_a_foreign_notification_is_404() {
    let state = test_state(MockRepo {
        delete_notification_ok: false,
        ..MockRepo::default()
    });

    let result =
        handlers::delete_notification(plain_user(), State(state), Query(RecordIdQuery { id: 1 }))
            .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

// --- UPLOADS ---

#[test]
async fn presigned_upload_rejects_non_media_mime_types() {
    let state = test_state(MockRepo::default());

    let result = handlers::get_presigned_url(
        plain_user(),
        State(state),
        Json(PresignedUrlRequest {
            filename: "report.pdf".to_string(),
            file_type: "application/pdf".to_string(),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
async fn presigned_upload_issues_a_media_key() {
    let state = test_state(MockRepo::default());

    let Json(response) = handlers::get_presigned_url(
        plain_user(),
        State(state),
        Json(PresignedUrlRequest {
            filename: "trip.mp4".to_string(),
            file_type: "video/mp4".to_string(),
        }),
    )
    .await
    .unwrap();

    let payload = response.data.unwrap();
    assert!(payload.resource_key.starts_with("media/"));
    assert!(payload.resource_key.ends_with(".mp4"));
    assert!(payload.upload_url.contains("signature=fake"));
}

// --- TAXONOMY CACHE ---

#[test]
async fn categories_are_served_from_cache_on_repeat_calls() {
    let (state, repo) = state_with_repo(MockRepo::default());

    let Json(first) = handlers::get_categories(State(state.clone())).await.unwrap();
    let Json(second) = handlers::get_categories(State(state)).await.unwrap();

    assert_eq!(first.data, second.data);
    assert_eq!(repo.categories_calls.load(Ordering::SeqCst), 1);
}
