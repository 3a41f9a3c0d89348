use crate::error::{ApiError, ApiResult};
use crate::models::{
    CommentView, CreateRecordRequest, CreatedRecord, FollowUserView, MediaRow, NotificationKind,
    NotificationView, Paged, RecordDetail, RecordSummary, RecordTagRow, TagCount,
    UpdateRecordRequest, User, UserProfileView, VideoInfo,
};
use crate::visibility::{FeedScope, PageParams, RecordAccess, RecordFilter};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers to interact with the data layer without knowing the specific
/// implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
///
/// Authorization decisions do NOT live here. Handlers fetch the minimal
/// [`RecordAccess`] slice, run the visibility rules, and only then call the
/// data operations; the list queries are the one exception, where the already
/// resolved [`FeedScope`] is compiled straight into the SQL predicate.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> ApiResult<Option<User>>;
    async fn user_profile(
        &self,
        target_id: i64,
        viewer: Option<i64>,
    ) -> ApiResult<Option<UserProfileView>>;

    // --- Record retrieval ---
    async fn list_records(
        &self,
        scope: FeedScope,
        filter: RecordFilter,
        page: PageParams,
        viewer: Option<i64>,
    ) -> ApiResult<Paged<RecordSummary>>;
    // Full-text-ish search over public published records only.
    async fn search_records(
        &self,
        keyword: &str,
        filter: RecordFilter,
        page: PageParams,
        viewer: Option<i64>,
    ) -> ApiResult<Paged<RecordSummary>>;
    // The minimal authorization slice for one live record.
    async fn record_access(&self, id: i64) -> ApiResult<Option<RecordAccess>>;
    async fn record_detail(&self, id: i64, viewer: Option<i64>)
    -> ApiResult<Option<RecordDetail>>;

    // --- Record lifecycle ---
    async fn create_record(&self, user_id: i64, req: CreateRecordRequest)
    -> ApiResult<CreatedRecord>;
    // Owner-only: the WHERE clause re-checks ownership even though handlers
    // verify it first. Returns false when no live row matched.
    async fn update_record(
        &self,
        id: i64,
        user_id: i64,
        req: UpdateRecordRequest,
    ) -> ApiResult<bool>;
    // Soft delete: flips the status flag, rows are never removed.
    async fn soft_delete_record(&self, id: i64, user_id: i64) -> ApiResult<bool>;

    // --- Likes & comments ---
    // Returns the refreshed denormalized counter. A duplicate like is a
    // business error, not an idempotent no-op.
    async fn like_record(&self, record_id: i64, user_id: i64) -> ApiResult<i64>;
    async fn unlike_record(&self, record_id: i64, user_id: i64) -> ApiResult<i64>;
    async fn liked_records(&self, user_id: i64, page: PageParams)
    -> ApiResult<Paged<RecordSummary>>;
    async fn add_comment(
        &self,
        record_id: i64,
        user_id: i64,
        content: String,
    ) -> ApiResult<CommentView>;
    async fn list_comments(&self, record_id: i64, page: PageParams)
    -> ApiResult<Paged<CommentView>>;

    // --- Follows ---
    async fn follow_exists(&self, follower_id: i64, following_id: i64) -> ApiResult<bool>;
    async fn follow_user(&self, follower_id: i64, following_id: i64) -> ApiResult<()>;
    async fn unfollow_user(&self, follower_id: i64, following_id: i64) -> ApiResult<()>;
    async fn list_following(
        &self,
        user_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<FollowUserView>>;
    async fn list_followers(
        &self,
        user_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<FollowUserView>>;

    // --- Moderation ---
    async fn pending_records(&self, page: PageParams) -> ApiResult<Paged<RecordSummary>>;
    // Both transitions only fire from the pending state; a stale id or an
    // already-decided record reports false.
    async fn approve_record(&self, id: i64) -> ApiResult<bool>;
    async fn reject_record(&self, id: i64, reason: Option<String>) -> ApiResult<bool>;

    // --- Taxonomy ---
    async fn categories(&self) -> ApiResult<Vec<String>>;
    async fn popular_tags(&self, limit: i64) -> ApiResult<Vec<TagCount>>;

    // --- Notifications ---
    async fn notifications(
        &self,
        user_id: i64,
        kind: Option<NotificationKind>,
        page: PageParams,
    ) -> ApiResult<Paged<NotificationView>>;
    // `id = None` marks everything unread for the user; returns rows touched.
    async fn mark_notifications_read(&self, user_id: i64, id: Option<i64>) -> ApiResult<u64>;
    async fn unread_count(&self, user_id: i64) -> ApiResult<i64>;
    async fn delete_notification(&self, id: i64, user_id: i64) -> ApiResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Well-known categories served even before any record uses them. Categories
/// actually present in the data are merged in behind these.
const DEFAULT_CATEGORIES: [&str; 8] = [
    "daily", "travel", "food", "mood", "sport", "study", "work", "other",
];

/// Base projection for record summaries. Every feed query starts here; the
/// `status = 1` predicate keeps soft-deleted rows out of every code path.
const SUMMARY_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.nickname AS user_name, u.avatar,
           r.content, r.record_type, r.privacy, r.category, r.location,
           r.like_count, r.comment_count, r.publish_status, r.rejected_reason,
           r.created_at
    FROM life_records r
    JOIN users u ON u.id = r.user_id
    WHERE r.status = 1
"#;

const SUMMARY_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM life_records r
    JOIN users u ON u.id = r.user_id
    WHERE r.status = 1
"#;

/// Comments embedded in the detail payload are capped at one page; clients
/// page through the rest via the comments endpoint.
const DETAIL_COMMENT_LIMIT: i64 = 10;

/// Compiles a resolved [`FeedScope`] into its SQL predicate. Shared by the
/// page query and the count query so the two can never disagree.
fn push_scope_filters(builder: &mut QueryBuilder<'_, Postgres>, scope: &FeedScope) {
    match scope {
        FeedScope::Public => {
            builder.push(" AND r.privacy = 'public' AND r.publish_status = 'published'");
        }
        FeedScope::Own {
            user_id,
            publish_status,
        } => {
            builder.push(" AND r.user_id = ");
            builder.push_bind(*user_id);
            if let Some(status) = publish_status {
                builder.push(" AND r.publish_status = ");
                builder.push_bind(status.as_str());
            }
        }
        FeedScope::User { target_id, viewer } => {
            builder.push(" AND r.user_id = ");
            builder.push_bind(*target_id);
            builder.push(" AND r.publish_status = 'published'");
            match viewer {
                Some(viewer_id) => {
                    // Friends-only records open up when the viewer follows the
                    // author (one-directional edge).
                    builder.push(
                        " AND (r.privacy = 'public' OR (r.privacy = 'friends' AND EXISTS (\
                         SELECT 1 FROM user_follows f WHERE f.follower_id = ",
                    );
                    builder.push_bind(*viewer_id);
                    builder.push(" AND f.following_id = r.user_id)))");
                }
                None => {
                    builder.push(" AND r.privacy = 'public'");
                }
            }
        }
    }
}

/// Escapes LIKE metacharacters so a search keyword matches literally;
/// without this, a keyword of `%` would match every record.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_record_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    if let Some(category) = &filter.category {
        builder.push(" AND r.category = ");
        builder.push_bind(category.clone());
    }
    if let Some(record_type) = &filter.record_type {
        builder.push(" AND r.record_type = ");
        builder.push_bind(record_type.clone());
    }
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Second assembly pass over a page of summaries: batches the media, tag,
    /// and viewer-like lookups with `= ANY($1)` instead of per-row queries.
    async fn decorate_records(
        &self,
        records: &mut [RecordSummary],
        viewer: Option<i64>,
    ) -> ApiResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();

        let media_rows = sqlx::query_as::<_, MediaRow>(
            r#"
            SELECT record_id, media_type, url, thumbnail_url, duration
            FROM life_media
            WHERE record_id = ANY($1)
            ORDER BY record_id, sort_order, id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let tag_rows = sqlx::query_as::<_, RecordTagRow>(
            r#"
            SELECT rt.record_id, t.name
            FROM life_record_tags rt
            JOIN life_tags t ON t.id = rt.tag_id
            WHERE rt.record_id = ANY($1)
            ORDER BY rt.record_id, t.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let liked_ids: Vec<i64> = match viewer {
            Some(viewer_id) => sqlx::query_scalar::<_, i64>(
                "SELECT record_id FROM life_likes WHERE user_id = $1 AND record_id = ANY($2)",
            )
            .bind(viewer_id)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?,
            None => vec![],
        };

        let mut images: HashMap<i64, Vec<String>> = HashMap::new();
        let mut videos: HashMap<i64, VideoInfo> = HashMap::new();
        for row in media_rows {
            match row.media_type.as_str() {
                "video" => {
                    videos.entry(row.record_id).or_insert(VideoInfo {
                        url: row.url,
                        cover: row.thumbnail_url,
                        duration: row.duration,
                    });
                }
                _ => images.entry(row.record_id).or_default().push(row.url),
            }
        }

        let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.record_id).or_default().push(row.name);
        }

        for record in records.iter_mut() {
            record.images = images.remove(&record.id).unwrap_or_default();
            record.video = videos.remove(&record.id);
            record.tags = tags.remove(&record.id).unwrap_or_default();
            record.is_liked = liked_ids.contains(&record.id);
        }
        Ok(())
    }

    /// Upserts the given tag names inside `tx`, bumps their usage counters,
    /// and links them to the record. Blank and duplicate names are dropped.
    async fn attach_tags(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        record_id: i64,
        names: &[String],
    ) -> ApiResult<()> {
        let mut seen: Vec<String> = Vec::new();
        for raw in names {
            let name = raw.trim();
            if name.is_empty() || seen.iter().any(|s| s == name) {
                continue;
            }
            seen.push(name.to_string());

            let tag_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO life_tags (name, use_count) VALUES ($1, 1)
                ON CONFLICT (name) DO UPDATE SET use_count = life_tags.use_count + 1
                RETURNING id
                "#,
            )
            .bind(name)
            .fetch_one(&mut **tx)
            .await?;

            sqlx::query(
                "INSERT INTO life_record_tags (record_id, tag_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(record_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Unlinks every tag from the record and rolls their usage counters back.
    async fn detach_tags(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        record_id: i64,
    ) -> ApiResult<()> {
        sqlx::query(
            r#"
            UPDATE life_tags
            SET use_count = GREATEST(use_count - 1, 0)
            WHERE id IN (SELECT tag_id FROM life_record_tags WHERE record_id = $1)
            "#,
        )
        .bind(record_id)
        .execute(&mut **tx)
        .await?;
        sqlx::query("DELETE FROM life_record_tags WHERE record_id = $1")
            .bind(record_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Looks up the owner of a live record, for the write paths that must
    /// refuse to touch missing or soft-deleted rows.
    async fn live_record_owner(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        record_id: i64,
    ) -> ApiResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM life_records WHERE id = $1 AND status = 1",
        )
        .bind(record_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("record not found".to_string()))
    }

    async fn insert_notification(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        user_id: i64,
        from_user_id: i64,
        record_id: Option<i64>,
        kind: NotificationKind,
        content: Option<&str>,
    ) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO notifications (user_id, from_user_id, record_id, kind, content) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(from_user_id)
        .bind(record_id)
        .bind(kind.as_str())
        .bind(content)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn fetch_summary_page(
        &self,
        mut builder: QueryBuilder<'_, Postgres>,
        mut count_builder: QueryBuilder<'_, Postgres>,
        page: PageParams,
        viewer: Option<i64>,
    ) -> ApiResult<Paged<RecordSummary>> {
        builder.push(" ORDER BY r.created_at DESC, r.id ASC LIMIT ");
        builder.push_bind(page.limit());
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let mut records: Vec<RecordSummary> = builder
            .build_query_as::<RecordSummary>()
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        self.decorate_records(&mut records, viewer).await?;

        Ok(Paged {
            list: records,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, nickname, avatar, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// user_profile
    ///
    /// The profile page payload in one call: identity fields plus the three
    /// counters and the viewer's relationship flags. The record counter only
    /// includes everything for the owner; other viewers count published,
    /// non-private records.
    async fn user_profile(
        &self,
        target_id: i64,
        viewer: Option<i64>,
    ) -> ApiResult<Option<UserProfileView>> {
        type UserRow = (i64, Option<String>, Option<String>, Option<i16>, chrono::DateTime<chrono::Utc>);
        let Some((id, nickname, avatar, gender, created_at)) = sqlx::query_as::<_, UserRow>(
            "SELECT id, nickname, avatar, gender, created_at FROM users WHERE id = $1",
        )
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let is_self = viewer == Some(target_id);
        let record_count: i64 = if is_self {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM life_records WHERE user_id = $1 AND status = 1",
            )
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM life_records WHERE user_id = $1 AND status = 1 \
                 AND publish_status = 'published' AND privacy <> 'private'",
            )
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?
        };

        let follower_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_follows WHERE following_id = $1")
                .bind(target_id)
                .fetch_one(&self.pool)
                .await?;
        let following_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_follows WHERE follower_id = $1")
                .bind(target_id)
                .fetch_one(&self.pool)
                .await?;

        let is_following = match viewer {
            Some(viewer_id) if !is_self => self.follow_exists(viewer_id, target_id).await?,
            _ => false,
        };

        Ok(Some(UserProfileView {
            id,
            nickname,
            avatar,
            gender,
            created_at,
            record_count,
            follower_count,
            following_count,
            is_following,
            is_self,
        }))
    }

    /// list_records
    ///
    /// The feed query. The scope predicate and optional equality filters are
    /// assembled with QueryBuilder for safe parameterization; ordering is
    /// newest first with the id as a stable tiebreaker.
    async fn list_records(
        &self,
        scope: FeedScope,
        filter: RecordFilter,
        page: PageParams,
        viewer: Option<i64>,
    ) -> ApiResult<Paged<RecordSummary>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_SELECT);
        push_scope_filters(&mut builder, &scope);
        push_record_filters(&mut builder, &filter);

        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_COUNT);
        push_scope_filters(&mut count_builder, &scope);
        push_record_filters(&mut count_builder, &filter);

        self.fetch_summary_page(builder, count_builder, page, viewer)
            .await
    }

    /// search_records
    ///
    /// Case-insensitive match over content and tag names, restricted to the
    /// public published slice regardless of who is asking.
    async fn search_records(
        &self,
        keyword: &str,
        filter: RecordFilter,
        page: PageParams,
        viewer: Option<i64>,
    ) -> ApiResult<Paged<RecordSummary>> {
        let pattern = format!("%{}%", escape_like(keyword));
        let push_search = |builder: &mut QueryBuilder<'_, Postgres>| {
            builder.push(" AND r.privacy = 'public' AND r.publish_status = 'published'");
            builder.push(" AND (r.content ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(
                " OR EXISTS (SELECT 1 FROM life_record_tags rt \
                 JOIN life_tags t ON t.id = rt.tag_id \
                 WHERE rt.record_id = r.id AND t.name ILIKE ",
            );
            builder.push_bind(pattern.clone());
            builder.push("))");
        };

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_SELECT);
        push_search(&mut builder);
        push_record_filters(&mut builder, &filter);

        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_COUNT);
        push_search(&mut count_builder);
        push_record_filters(&mut count_builder, &filter);

        self.fetch_summary_page(builder, count_builder, page, viewer)
            .await
    }

    async fn record_access(&self, id: i64) -> ApiResult<Option<RecordAccess>> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT user_id, privacy, publish_status FROM life_records \
             WHERE id = $1 AND status = 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(owner_id, privacy, publish_status)| RecordAccess {
            owner_id,
            privacy,
            publish_status,
        }))
    }

    /// record_detail
    ///
    /// The full record with the first page of its live comments. Visibility
    /// is NOT checked here; callers authorize against
    /// [`Repository::record_access`] first.
    async fn record_detail(
        &self,
        id: i64,
        viewer: Option<i64>,
    ) -> ApiResult<Option<RecordDetail>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_SELECT);
        builder.push(" AND r.id = ");
        builder.push_bind(id);

        let Some(record) = builder
            .build_query_as::<RecordSummary>()
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut records = vec![record];
        self.decorate_records(&mut records, viewer).await?;
        let record = records.remove(0);

        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.user_id, u.nickname AS user_name, u.avatar, c.content, c.created_at
            FROM life_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.record_id = $1 AND c.status = 1
            ORDER BY c.created_at ASC, c.id ASC
            LIMIT $2
            "#,
        )
        .bind(id)
        .bind(DETAIL_COMMENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(RecordDetail { record, comments }))
    }

    /// create_record
    ///
    /// Inserts the record plus its media rows and tag links in one
    /// transaction, so a failed tag upsert never leaves a half-built record.
    async fn create_record(
        &self,
        user_id: i64,
        req: CreateRecordRequest,
    ) -> ApiResult<CreatedRecord> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, CreatedRecord>(
            r#"
            INSERT INTO life_records
                (user_id, content, record_type, privacy, publish_status, category, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, created_at
            "#,
        )
        .bind(user_id)
        .bind(&req.content)
        .bind(&req.record_type)
        .bind(req.privacy.as_deref().unwrap_or("public"))
        .bind(req.publish_status.as_deref().unwrap_or("published"))
        .bind(&req.category)
        .bind(&req.location)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(images) = &req.images {
            for (i, url) in images.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO life_media (record_id, media_type, url, sort_order) \
                     VALUES ($1, 'image', $2, $3)",
                )
                .bind(created.id)
                .bind(url)
                .bind(i as i32)
                .execute(&mut *tx)
                .await?;
            }
        }
        if let Some(video) = &req.video {
            sqlx::query(
                "INSERT INTO life_media (record_id, media_type, url, thumbnail_url, duration) \
                 VALUES ($1, 'video', $2, $3, $4)",
            )
            .bind(created.id)
            .bind(&video.url)
            .bind(&video.cover)
            .bind(video.duration)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(tags) = &req.tags {
            self.attach_tags(&mut tx, created.id, tags).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// update_record
    ///
    /// Partial update via `COALESCE`: only columns whose request field is
    /// `Some` change. Submitting a new publish status also clears any previous
    /// rejection reason, so a resubmitted record goes back to moderation with
    /// a clean slate.
    async fn update_record(
        &self,
        id: i64,
        user_id: i64,
        req: UpdateRecordRequest,
    ) -> ApiResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE life_records
            SET content = COALESCE($3, content),
                privacy = COALESCE($4, privacy),
                category = COALESCE($5, category),
                location = COALESCE($6, location),
                publish_status = COALESCE($7, publish_status),
                rejected_reason = CASE WHEN $7::text IS NOT NULL THEN NULL
                                       ELSE rejected_reason END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 1
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&req.content)
        .bind(&req.privacy)
        .bind(&req.category)
        .bind(&req.location)
        .bind(&req.publish_status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(tags) = &req.tags {
            self.detach_tags(&mut tx, id).await?;
            self.attach_tags(&mut tx, id, tags).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// soft_delete_record
    ///
    /// Flips the status flag and unlinks the record's tags in one
    /// transaction, so the hot-tags counters stop counting invisible records.
    async fn soft_delete_record(&self, id: i64, user_id: i64) -> ApiResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE life_records SET status = 0, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND status = 1",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.detach_tags(&mut tx, id).await?;

        tx.commit().await?;
        Ok(true)
    }

    /// like_record
    ///
    /// Insert the like edge, bump the denormalized counter, and notify the
    /// author, all in one transaction. `ON CONFLICT DO NOTHING` detects the
    /// duplicate without racing a separate existence check.
    async fn like_record(&self, record_id: i64, user_id: i64) -> ApiResult<i64> {
        let mut tx = self.pool.begin().await?;
        let owner_id = self.live_record_owner(&mut tx, record_id).await?;

        let inserted = sqlx::query(
            "INSERT INTO life_likes (record_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(record_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(ApiError::Validation("already liked".to_string()));
        }

        let like_count: i64 = sqlx::query_scalar(
            "UPDATE life_records SET like_count = like_count + 1 WHERE id = $1 \
             RETURNING like_count",
        )
        .bind(record_id)
        .fetch_one(&mut *tx)
        .await?;

        // No self-notifications.
        if owner_id != user_id {
            self.insert_notification(
                &mut tx,
                owner_id,
                user_id,
                Some(record_id),
                NotificationKind::Like,
                None,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(like_count)
    }

    async fn unlike_record(&self, record_id: i64, user_id: i64) -> ApiResult<i64> {
        let mut tx = self.pool.begin().await?;
        self.live_record_owner(&mut tx, record_id).await?;

        let deleted = sqlx::query("DELETE FROM life_likes WHERE record_id = $1 AND user_id = $2")
            .bind(record_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ApiError::Validation("not liked".to_string()));
        }

        // GREATEST keeps the counter from going negative if it ever drifts.
        let like_count: i64 = sqlx::query_scalar(
            "UPDATE life_records SET like_count = GREATEST(like_count - 1, 0) \
             WHERE id = $1 RETURNING like_count",
        )
        .bind(record_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(like_count)
    }

    /// liked_records
    ///
    /// Records the user liked, newest like first, restricted to what the user
    /// may still see: their own records, or published public/friends records.
    async fn liked_records(
        &self,
        user_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<RecordSummary>> {
        let predicate = r#"
            JOIN life_likes l ON l.record_id = r.id AND l.user_id = $1
            WHERE r.status = 1 AND (
                r.user_id = $1 OR (
                    r.publish_status = 'published' AND (
                        r.privacy = 'public' OR (r.privacy = 'friends' AND EXISTS (
                            SELECT 1 FROM user_follows f
                            WHERE f.follower_id = $1 AND f.following_id = r.user_id))
                    )
                )
            )
        "#;

        let query = format!(
            r#"
            SELECT r.id, r.user_id, u.nickname AS user_name, u.avatar,
                   r.content, r.record_type, r.privacy, r.category, r.location,
                   r.like_count, r.comment_count, r.publish_status, r.rejected_reason,
                   r.created_at
            FROM life_records r
            JOIN users u ON u.id = r.user_id
            {predicate}
            ORDER BY l.created_at DESC, r.id ASC
            LIMIT $2 OFFSET $3
            "#
        );
        let count_query =
            format!("SELECT COUNT(*) FROM life_records r {predicate}");

        let mut records = sqlx::query_as::<_, RecordSummary>(&query)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        self.decorate_records(&mut records, Some(user_id)).await?;

        Ok(Paged {
            list: records,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    /// add_comment
    ///
    /// Inserts the comment and joins `users` in one CTE to return the
    /// enriched view, then bumps the counter and notifies the author.
    async fn add_comment(
        &self,
        record_id: i64,
        user_id: i64,
        content: String,
    ) -> ApiResult<CommentView> {
        let mut tx = self.pool.begin().await?;
        let owner_id = self.live_record_owner(&mut tx, record_id).await?;

        let comment = sqlx::query_as::<_, CommentView>(
            r#"
            WITH inserted AS (
                INSERT INTO life_comments (record_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, content, created_at
            )
            SELECT i.id, i.user_id, u.nickname AS user_name, u.avatar, i.content, i.created_at
            FROM inserted i JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(record_id)
        .bind(user_id)
        .bind(&content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE life_records SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(record_id)
            .execute(&mut *tx)
            .await?;

        if owner_id != user_id {
            self.insert_notification(
                &mut tx,
                owner_id,
                user_id,
                Some(record_id),
                NotificationKind::Comment,
                Some(&content),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(comment)
    }

    async fn list_comments(
        &self,
        record_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.user_id, u.nickname AS user_name, u.avatar, c.content, c.created_at
            FROM life_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.record_id = $1 AND c.status = 1
            ORDER BY c.created_at ASC, c.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(record_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM life_comments WHERE record_id = $1 AND status = 1",
        )
        .bind(record_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Paged {
            list: comments,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn follow_exists(&self, follower_id: i64, following_id: i64) -> ApiResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_follows \
             WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// follow_user
    ///
    /// One-directional edge. Following a missing user is a 404; following the
    /// same user twice is a business error, reported like the duplicate like.
    async fn follow_user(&self, follower_id: i64, following_id: i64) -> ApiResult<()> {
        let mut tx = self.pool.begin().await?;

        let target: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(following_id)
            .fetch_optional(&mut *tx)
            .await?;
        if target.is_none() {
            return Err(ApiError::NotFound("user not found".to_string()));
        }

        let inserted = sqlx::query(
            "INSERT INTO user_follows (follower_id, following_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(ApiError::Validation("already following".to_string()));
        }

        self.insert_notification(
            &mut tx,
            following_id,
            follower_id,
            None,
            NotificationKind::Follow,
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn unfollow_user(&self, follower_id: i64, following_id: i64) -> ApiResult<()> {
        let deleted = sqlx::query(
            "DELETE FROM user_follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;
        if deleted.rows_affected() == 0 {
            return Err(ApiError::Validation("not following".to_string()));
        }
        Ok(())
    }

    async fn list_following(
        &self,
        user_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<FollowUserView>> {
        let list = sqlx::query_as::<_, FollowUserView>(
            r#"
            SELECT u.id, u.nickname, u.avatar, f.created_at AS follow_at
            FROM user_follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC, u.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Paged {
            list,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn list_followers(
        &self,
        user_id: i64,
        page: PageParams,
    ) -> ApiResult<Paged<FollowUserView>> {
        let list = sqlx::query_as::<_, FollowUserView>(
            r#"
            SELECT u.id, u.nickname, u.avatar, f.created_at AS follow_at
            FROM user_follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1
            ORDER BY f.created_at DESC, u.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_follows WHERE following_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Paged {
            list,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    /// pending_records
    ///
    /// The moderation queue, oldest submission first so reviewers work in
    /// arrival order.
    async fn pending_records(&self, page: PageParams) -> ApiResult<Paged<RecordSummary>> {
        let mut records = sqlx::query_as::<_, RecordSummary>(&format!(
            "{SUMMARY_SELECT} AND r.publish_status = 'pending' \
             ORDER BY r.created_at ASC, r.id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "{SUMMARY_COUNT} AND r.publish_status = 'pending'"
        ))
        .fetch_one(&self.pool)
        .await?;

        self.decorate_records(&mut records, None).await?;

        Ok(Paged {
            list: records,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn approve_record(&self, id: i64) -> ApiResult<bool> {
        let result = sqlx::query(
            "UPDATE life_records \
             SET publish_status = 'published', rejected_reason = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 1 AND publish_status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reject_record(&self, id: i64, reason: Option<String>) -> ApiResult<bool> {
        let result = sqlx::query(
            "UPDATE life_records \
             SET publish_status = 'rejected', rejected_reason = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 1 AND publish_status = 'pending'",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// categories
    ///
    /// The well-known category list, followed by any extra categories that
    /// actually appear on live records.
    async fn categories(&self) -> ApiResult<Vec<String>> {
        let in_use: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM life_records \
             WHERE status = 1 AND category IS NOT NULL ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut categories: Vec<String> =
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
        for category in in_use {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        Ok(categories)
    }

    async fn popular_tags(&self, limit: i64) -> ApiResult<Vec<TagCount>> {
        let tags = sqlx::query_as::<_, TagCount>(
            "SELECT name, use_count FROM life_tags WHERE use_count > 0 \
             ORDER BY use_count DESC, name ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    /// notifications
    ///
    /// The inbox, newest first, enriched with the acting user and the related
    /// record, optionally restricted to one event kind. LEFT JOINs keep follow
    /// notifications (no record) and notifications from since-deleted records
    /// readable.
    async fn notifications(
        &self,
        user_id: i64,
        kind: Option<NotificationKind>,
        page: PageParams,
    ) -> ApiResult<Paged<NotificationView>> {
        let kind = kind.map(NotificationKind::as_str);
        let list = sqlx::query_as::<_, NotificationView>(
            r#"
            SELECT n.id, n.kind, n.record_id, n.from_user_id,
                   u.nickname AS from_user_name, u.avatar AS from_user_avatar,
                   n.content, n.is_read, n.created_at,
                   r.content AS record_content, r.record_type
            FROM notifications n
            LEFT JOIN users u ON u.id = n.from_user_id
            LEFT JOIN life_records r ON r.id = n.record_id
            WHERE n.user_id = $1 AND ($2::text IS NULL OR n.kind = $2)
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications \
             WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2)",
        )
        .bind(user_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(Paged {
            list,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn mark_notifications_read(&self, user_id: i64, id: Option<i64>) -> ApiResult<u64> {
        let result = match id {
            Some(notification_id) => {
                sqlx::query(
                    "UPDATE notifications SET is_read = true \
                     WHERE user_id = $1 AND id = $2 AND is_read = false",
                )
                .bind(user_id)
                .bind(notification_id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE notifications SET is_read = true \
                     WHERE user_id = $1 AND is_read = false",
                )
                .bind(user_id)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: i64) -> ApiResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete_notification(&self, id: i64, user_id: i64) -> ApiResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain coffee"), "plain coffee");
    }
}
