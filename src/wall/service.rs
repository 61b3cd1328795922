use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::require_owner_or_admin;
use crate::db::models::PostMedia;
use crate::error::{AppError, AppResult};
use crate::events::repository as events;
use crate::extractors::CurrentUser;
use crate::state::DbPool;
use crate::storage::Storage;
use crate::wall::domain::{self, ReactionType};
use crate::wall::repository::{self, PostRow};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCounts {
    pub like: i64,
    pub heart: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: String,
    pub event_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub media_urls: Vec<String>,
    pub reactions: ReactionCounts,
}

fn to_dto(conn: &rusqlite::Connection, row: &PostRow) -> AppResult<PostDto> {
    let media_urls = repository::media_paths(conn, &row.id)?;
    let (like, heart) = repository::reaction_counts(conn, &row.id)?;
    Ok(PostDto {
        id: row.id.clone(),
        event_id: row.event_id.clone(),
        author_id: row.author_id.clone(),
        author_name: row.author_name.clone(),
        content: row.content.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
        media_urls,
        reactions: ReactionCounts { like, heart },
    })
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    /// Temp file names previously returned by the upload API.
    #[serde(default)]
    pub media: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
    #[serde(default)]
    pub media: Vec<String>,
}

pub fn list_by_event(
    pool: &DbPool,
    event_id: &str,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<PostDto>> {
    let conn = pool.get()?;
    if !events::exists(&conn, event_id)? {
        return Err(AppError::NotFound(format!(
            "Event not found with id: {}",
            event_id
        )));
    }
    let rows = repository::list_by_event(&conn, event_id, limit.clamp(1, 200), offset.max(0))?;
    rows.iter().map(|row| to_dto(&conn, row)).collect()
}

/// Create a post on an event's wall, staging any referenced uploads into
/// permanent media in the same transaction. The file moves themselves are
/// not covered by the rollback.
pub fn create(
    pool: &DbPool,
    storage: &Storage,
    user: &CurrentUser,
    event_id: &str,
    req: CreatePostRequest,
) -> AppResult<PostDto> {
    domain::validate_content(&req.content)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let event = events::find_by_id(&tx, event_id)?;

    let post_id = uuid::Uuid::new_v4().to_string();
    repository::insert_post(&tx, &post_id, &event.id, &user.id, req.content.trim())?;
    attach_media(&tx, storage, &event.id, &post_id, &req.media)?;

    let row = repository::find_post(&tx, &post_id)?;
    let dto = to_dto(&tx, &row)?;
    tx.commit()?;

    tracing::info!("Post {} created on event {}", post_id, event_id);
    Ok(dto)
}

pub fn get(pool: &DbPool, post_id: &str) -> AppResult<PostDto> {
    let conn = pool.get()?;
    let row = repository::find_post(&conn, post_id)?;
    to_dto(&conn, &row)
}

/// Author or admin may edit; additional media may be attached.
pub fn update(
    pool: &DbPool,
    storage: &Storage,
    user: &CurrentUser,
    post_id: &str,
    req: UpdatePostRequest,
) -> AppResult<PostDto> {
    domain::validate_content(&req.content)?;

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let row = repository::find_post(&tx, post_id)?;
    require_owner_or_admin(&row.author_id, user)?;

    repository::update_content(&tx, post_id, req.content.trim())?;
    attach_media(&tx, storage, &row.event_id, post_id, &req.media)?;

    let row = repository::find_post(&tx, post_id)?;
    let dto = to_dto(&tx, &row)?;
    tx.commit()?;
    Ok(dto)
}

/// The author, the owning event's manager, or an admin may delete.
pub fn delete(pool: &DbPool, user: &CurrentUser, post_id: &str) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let row = repository::find_post(&tx, post_id)?;
    if row.event_owner_id != user.id {
        require_owner_or_admin(&row.author_id, user)?;
    }

    repository::delete_post_cascade(&tx, post_id)?;
    tx.commit()?;
    Ok(())
}

/// NONE removes the caller's reaction; anything else upserts a single row
/// per (post, user), last write wins.
pub fn react(
    pool: &DbPool,
    user: &CurrentUser,
    post_id: &str,
    reaction: ReactionType,
) -> AppResult<ReactionCounts> {
    let conn = pool.get()?;
    // Verify post exists
    repository::find_post(&conn, post_id)?;

    match reaction {
        ReactionType::None => repository::delete_reaction(&conn, post_id, &user.id)?,
        other => repository::upsert_reaction(&conn, post_id, &user.id, other)?,
    }

    let (like, heart) = repository::reaction_counts(&conn, post_id)?;
    Ok(ReactionCounts { like, heart })
}

/// The caller's current reaction, NONE when absent.
pub fn get_reaction(pool: &DbPool, user: &CurrentUser, post_id: &str) -> AppResult<ReactionType> {
    let conn = pool.get()?;
    repository::find_post(&conn, post_id)?;
    Ok(repository::find_reaction(&conn, post_id, &user.id)?.unwrap_or(ReactionType::None))
}

fn attach_media(
    conn: &rusqlite::Connection,
    storage: &Storage,
    event_id: &str,
    post_id: &str,
    temp_names: &[String],
) -> AppResult<()> {
    for temp_name in temp_names {
        let resource_id = domain::media_resource_id(temp_name)?;
        let path = storage.stage(temp_name, event_id, post_id)?;
        repository::insert_media(
            conn,
            &PostMedia {
                id: uuid::Uuid::new_v4().to_string(),
                post_id: post_id.to_string(),
                resource_id,
                path,
                created_at: Utc::now(),
            },
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository as users;
    use crate::db;
    use crate::db::models::UserRole;
    use crate::events::service as event_service;
    use chrono::Duration;

    struct Fixture {
        pool: DbPool,
        _tmp: tempfile::TempDir,
        storage: Storage,
        owner: CurrentUser,
        author: CurrentUser,
        admin: CurrentUser,
        event_id: String,
    }

    fn principal(pool: &DbPool, username: &str, role: UserRole) -> CurrentUser {
        let conn = pool.get().unwrap();
        let mut user = users::new_user("Test", "User", username, "hash");
        user.role = role;
        users::insert(&conn, &user).unwrap();
        CurrentUser {
            id: user.id,
            username: user.username,
            role,
        }
    }

    fn fixture() -> Fixture {
        let pool = db::test_pool();
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path());
        storage.init().unwrap();

        let owner = principal(&pool, "owner", UserRole::User);
        let author = principal(&pool, "author", UserRole::User);
        let admin = principal(&pool, "admin", UserRole::Admin);

        let now = Utc::now();
        let dto = event_service::create(
            &pool,
            &owner,
            event_service::CreateEventRequest {
                name: "Soup kitchen".to_string(),
                description: None,
                date_deadline: now + Duration::days(1),
                start_date: now + Duration::days(2),
                end_date: now + Duration::days(3),
            },
        )
        .unwrap();

        Fixture {
            pool,
            _tmp: tmp,
            storage,
            owner,
            author,
            admin,
            event_id: dto.id,
        }
    }

    fn post(fx: &Fixture, content: &str, media: Vec<String>) -> PostDto {
        create(
            &fx.pool,
            &fx.storage,
            &fx.author,
            &fx.event_id,
            CreatePostRequest {
                content: content.to_string(),
                media,
            },
        )
        .unwrap()
    }

    #[test]
    fn create_requires_content() {
        let fx = fixture();
        let err = create(
            &fx.pool,
            &fx.storage,
            &fx.author,
            &fx.event_id,
            CreatePostRequest {
                content: "   ".to_string(),
                media: vec![],
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn create_with_media_stages_files() {
        let fx = fixture();
        let temp_name = fx.storage.save_temp(b"pixels", "photo.jpg").unwrap();

        let dto = post(&fx, "great turnout", vec![temp_name.clone()]);
        assert_eq!(
            dto.media_urls,
            vec![format!("/uploads/{}/{}/{}", fx.event_id, dto.id, temp_name)]
        );

        // gone from temp, present in the permanent tree
        assert!(!fx.storage.temp_dir().join(&temp_name).exists());
        assert!(fx
            .storage
            .uploads_dir()
            .join(&fx.event_id)
            .join(&dto.id)
            .join(&temp_name)
            .is_file());
    }

    #[test]
    fn create_rejects_malformed_media_reference() {
        let fx = fixture();
        let err = create(
            &fx.pool,
            &fx.storage,
            &fx.author,
            &fx.event_id,
            CreatePostRequest {
                content: "hi".to_string(),
                media: vec!["not-a-uuid.jpg".to_string()],
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // the post insert rolled back with the failed media attach
        let conn = fx.pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn create_missing_temp_file_is_not_found() {
        let fx = fixture();
        let err = create(
            &fx.pool,
            &fx.storage,
            &fx.author,
            &fx.event_id,
            CreatePostRequest {
                content: "hi".to_string(),
                media: vec![format!("{}.jpg", uuid::Uuid::new_v4())],
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn update_restricted_to_author_or_admin() {
        let fx = fixture();
        let dto = post(&fx, "original", vec![]);

        let err = update(
            &fx.pool,
            &fx.storage,
            &fx.owner,
            &dto.id,
            UpdatePostRequest {
                content: "hijacked".to_string(),
                media: vec![],
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = update(
            &fx.pool,
            &fx.storage,
            &fx.admin,
            &dto.id,
            UpdatePostRequest {
                content: "moderated".to_string(),
                media: vec![],
            },
        )
        .unwrap();
        assert_eq!(updated.content, "moderated");
    }

    #[test]
    fn event_owner_can_delete_wall_posts() {
        let fx = fixture();
        let dto = post(&fx, "spam", vec![]);

        delete(&fx.pool, &fx.owner, &dto.id).unwrap();
        assert!(matches!(
            get(&fx.pool, &dto.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn stranger_cannot_delete() {
        let fx = fixture();
        let stranger = principal(&fx.pool, "stranger", UserRole::User);
        let dto = post(&fx, "keep me", vec![]);
        assert!(matches!(
            delete(&fx.pool, &stranger, &dto.id),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn react_upserts_and_none_deletes() {
        let fx = fixture();
        let dto = post(&fx, "react to me", vec![]);

        let counts = react(&fx.pool, &fx.owner, &dto.id, ReactionType::Like).unwrap();
        assert_eq!((counts.like, counts.heart), (1, 0));

        // same type twice still one row
        let counts = react(&fx.pool, &fx.owner, &dto.id, ReactionType::Like).unwrap();
        assert_eq!((counts.like, counts.heart), (1, 0));

        // last write wins
        let counts = react(&fx.pool, &fx.owner, &dto.id, ReactionType::Heart).unwrap();
        assert_eq!((counts.like, counts.heart), (0, 1));
        assert_eq!(
            get_reaction(&fx.pool, &fx.owner, &dto.id).unwrap(),
            ReactionType::Heart
        );

        let counts = react(&fx.pool, &fx.owner, &dto.id, ReactionType::None).unwrap();
        assert_eq!((counts.like, counts.heart), (0, 0));

        // NONE again is a no-op
        let counts = react(&fx.pool, &fx.owner, &dto.id, ReactionType::None).unwrap();
        assert_eq!((counts.like, counts.heart), (0, 0));
        assert_eq!(
            get_reaction(&fx.pool, &fx.owner, &dto.id).unwrap(),
            ReactionType::None
        );
    }

    #[test]
    fn list_requires_existing_event() {
        let fx = fixture();
        assert!(matches!(
            list_by_event(&fx.pool, "missing", 50, 0),
            Err(AppError::NotFound(_))
        ));
        post(&fx, "one", vec![]);
        assert_eq!(list_by_event(&fx.pool, &fx.event_id, 50, 0).unwrap().len(), 1);
    }
}
