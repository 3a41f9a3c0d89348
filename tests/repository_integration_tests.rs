use liferecord::{
    error::ApiError,
    models::CreateRecordRequest,
    repository::{PostgresRepository, Repository},
    visibility::{FeedScope, PageParams, RecordFilter},
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// A simple structure to hold the database pool for testing
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Inserts a user with a unique openid so runs never collide.
async fn create_test_user(pool: &PgPool, nickname: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (openid, nickname, role) VALUES ($1, $2, 'user') RETURNING id",
    )
    .bind(format!("test-{}", Uuid::new_v4()))
    .bind(nickname)
    .fetch_one(pool)
    .await
    .expect("Failed to create test user")
}

/// Publishes a record through the repository, like the create handler would.
async fn create_test_record(
    repo: &PostgresRepository,
    user_id: i64,
    content: &str,
    privacy: &str,
    publish_status: &str,
    tags: Option<Vec<String>>,
) -> i64 {
    let req = CreateRecordRequest {
        content: content.to_string(),
        record_type: "image".to_string(),
        privacy: Some(privacy.to_string()),
        publish_status: Some(publish_status.to_string()),
        tags,
        ..CreateRecordRequest::default()
    };
    repo.create_record(user_id, req)
        .await
        .expect("Failed to create test record")
        .id
}

async fn stored_like_count(pool: &PgPool, record_id: i64) -> i64 {
    sqlx::query_scalar("SELECT like_count FROM life_records WHERE id = $1")
        .bind(record_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read like_count")
}

fn full_page() -> PageParams {
    PageParams::clamp(None, Some(100), 10)
}

async fn visible_ids(
    repo: &PostgresRepository,
    scope: FeedScope,
    viewer: Option<i64>,
) -> Vec<i64> {
    let mut ids: Vec<i64> = repo
        .list_records(scope, RecordFilter::default(), full_page(), viewer)
        .await
        .expect("Failed to list records")
        .list
        .into_iter()
        .map(|r| r.id)
        .collect();
    ids.sort_unstable();
    ids
}

// --- Tests ---

#[test]
async fn double_like_fails_and_counter_moves_by_exactly_one() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, "author").await;
    let liker = create_test_user(&ctx.pool, "liker").await;
    let record = create_test_record(&repo, author, "sunset", "public", "published", None).await;

    // 1. First like: edge created, counter at 1.
    let count = repo.like_record(record, liker).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(stored_like_count(&ctx.pool, record).await, 1);

    // 2. Second like by the same user: business error, counter untouched.
    let err = repo.like_record(record, liker).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(stored_like_count(&ctx.pool, record).await, 1);

    // 3. Unlike: edge removed, counter back to 0.
    let count = repo.unlike_record(record, liker).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(stored_like_count(&ctx.pool, record).await, 0);

    // 4. Unlike without a like: business error, counter unchanged.
    let err = repo.unlike_record(record, liker).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(stored_like_count(&ctx.pool, record).await, 0);
}

#[test]
async fn feed_scopes_compile_to_the_right_visibility_predicates() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, "author").await;
    let stranger = create_test_user(&ctx.pool, "stranger").await;
    let follower = create_test_user(&ctx.pool, "follower").await;
    repo.follow_user(follower, author).await.unwrap();

    let pub_rec =
        create_test_record(&repo, author, "public post", "public", "published", None).await;
    let friends_rec =
        create_test_record(&repo, author, "friends post", "friends", "published", None).await;
    let private_rec =
        create_test_record(&repo, author, "private post", "private", "published", None).await;
    let pending_rec =
        create_test_record(&repo, author, "pending post", "public", "pending", None).await;

    // Anonymous view of the author's page: public published only.
    let anon = visible_ids(
        &repo,
        FeedScope::User {
            target_id: author,
            viewer: None,
        },
        None,
    )
    .await;
    assert_eq!(anon, vec![pub_rec]);

    // A stranger sees the same slice.
    let stranger_view = visible_ids(
        &repo,
        FeedScope::User {
            target_id: author,
            viewer: Some(stranger),
        },
        Some(stranger),
    )
    .await;
    assert_eq!(stranger_view, vec![pub_rec]);

    // A follower additionally sees the friends-only record.
    let follower_view = visible_ids(
        &repo,
        FeedScope::User {
            target_id: author,
            viewer: Some(follower),
        },
        Some(follower),
    )
    .await;
    assert_eq!(follower_view, vec![pub_rec, friends_rec]);

    // The owner sees everything, pending and private included.
    let own_view = visible_ids(
        &repo,
        FeedScope::Own {
            user_id: author,
            publish_status: None,
        },
        Some(author),
    )
    .await;
    assert_eq!(own_view, vec![pub_rec, friends_rec, private_rec, pending_rec]);
}

#[test]
async fn search_matches_like_metacharacters_literally() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, "author").await;

    // A unique marker keeps the assertion independent of pre-existing rows.
    let marker = Uuid::new_v4().simple().to_string();
    let percent_rec = create_test_record(
        &repo,
        author,
        &format!("100% {marker} cotton"),
        "public",
        "published",
        None,
    )
    .await;
    create_test_record(
        &repo,
        author,
        &format!("plain {marker} cotton"),
        "public",
        "published",
        None,
    )
    .await;

    let result = repo
        .search_records(
            &format!("% {marker}"),
            RecordFilter::default(),
            full_page(),
            None,
        )
        .await
        .unwrap();

    // '%' matches itself, not everything.
    let ids: Vec<i64> = result.list.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![percent_rec]);
}

#[test]
async fn detail_embeds_at_most_one_page_of_comments() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, "author").await;
    let commenter = create_test_user(&ctx.pool, "commenter").await;
    let record = create_test_record(&repo, author, "busy thread", "public", "published", None).await;

    for i in 0..12 {
        repo.add_comment(record, commenter, format!("comment {i}"))
            .await
            .unwrap();
    }

    let detail = repo.record_detail(record, None).await.unwrap().unwrap();

    assert_eq!(detail.comments.len(), 10);
    // The counter still reports the full total.
    assert_eq!(detail.record.comment_count, 12);
}

#[test]
async fn soft_delete_rolls_back_tag_usage() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, "author").await;
    let tag_name = format!("tag-{}", Uuid::new_v4().simple());
    let record = create_test_record(
        &repo,
        author,
        "tagged",
        "public",
        "published",
        Some(vec![tag_name.clone()]),
    )
    .await;

    let use_count: i64 = sqlx::query_scalar("SELECT use_count FROM life_tags WHERE name = $1")
        .bind(&tag_name)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(use_count, 1);

    assert!(repo.soft_delete_record(record, author).await.unwrap());

    // The record is gone from every read path and its tag counter rolled back.
    assert!(repo.record_access(record).await.unwrap().is_none());
    let use_count: i64 = sqlx::query_scalar("SELECT use_count FROM life_tags WHERE name = $1")
        .bind(&tag_name)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(use_count, 0);
}
