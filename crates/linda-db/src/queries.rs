use crate::models::{
    ChatMessageRow, HelpCenterRow, LessonRow, NewChatMessage, NewReport, NewStory, PrivacyTipRow,
    ProgressRow, ReportRow, StoryRow, UpsertUser, UserRow, now_timestamp, parse_reactions,
};
use crate::Database;
use anyhow::{Result, anyhow};
use linda_types::models::{
    ChatMessage, HelpCenter, Language, LearningProgress, Lesson, PrivacyTip, ReactionCounts,
    Report, Story, User,
};
use rusqlite::{Connection, Row, params};

const USER_COLUMNS: &str = "id, open_id, name, email, login_method, password_hash, role, \
     preferred_language, created_at, updated_at, last_signed_in";

const REPORT_COLUMNS: &str = "id, user_id, abuse_type, description, audio_url, photo_url, \
     latitude, longitude, is_anonymous, status, created_at, updated_at";

const LESSON_COLUMNS: &str = "id, title_en, title_sw, content_en, content_sw, illustration_url, \
     audio_url_en, audio_url_sw, video_url, order_index, created_at";

const STORY_COLUMNS: &str =
    "id, user_id, content, audio_url, language, is_anonymous, reactions, created_at, updated_at";

impl Database {
    // -- Users --

    /// Insert-or-update keyed by `open_id`. The sign-in time is always refreshed.
    pub fn upsert_user(&self, user: &UpsertUser) -> Result<User> {
        if user.open_id.is_empty() {
            return Err(anyhow!("User openId is required for upsert"));
        }

        self.with_conn(|conn| {
            let now = now_timestamp();
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE open_id = ?1",
                    [&user.open_id],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing {
                Some(id) => {
                    conn.execute(
                        "UPDATE users SET
                            name = COALESCE(?2, name),
                            email = COALESCE(?3, email),
                            login_method = COALESCE(?4, login_method),
                            password_hash = COALESCE(?5, password_hash),
                            role = COALESCE(?6, role),
                            preferred_language = COALESCE(?7, preferred_language),
                            last_signed_in = ?8,
                            updated_at = ?8
                         WHERE id = ?1",
                        params![
                            id,
                            user.name.as_deref(),
                            user.email.as_deref(),
                            user.login_method.as_deref(),
                            user.password_hash.as_deref(),
                            user.role.map(|r| r.as_str()),
                            user.preferred_language.map(|l| l.as_str()),
                            now,
                        ],
                    )?;
                    id
                }
                None => {
                    conn.execute(
                        "INSERT INTO users (open_id, name, email, login_method, password_hash, role,
                                            preferred_language, created_at, updated_at, last_signed_in)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8)",
                        params![
                            user.open_id,
                            user.name.as_deref(),
                            user.email.as_deref(),
                            user.login_method.as_deref(),
                            user.password_hash.as_deref(),
                            user.role.unwrap_or_default().as_str(),
                            user.preferred_language.unwrap_or_default().as_str(),
                            now,
                        ],
                    )?;
                    conn.last_insert_rowid()
                }
            };

            query_user(conn, "id = ?1", id)?
                .map(User::from)
                .ok_or_else(|| anyhow!("User vanished after upsert: {}", user.open_id))
        })
    }

    /// Plain insert. Returns `None` when the `open_id` is already taken; the
    /// existing row is left untouched.
    pub fn create_user(&self, user: &UpsertUser) -> Result<Option<User>> {
        if user.open_id.is_empty() {
            return Err(anyhow!("User openId is required"));
        }

        self.with_conn(|conn| {
            let now = now_timestamp();
            let inserted = conn.execute(
                "INSERT INTO users (open_id, name, email, login_method, password_hash, role,
                                    preferred_language, created_at, updated_at, last_signed_in)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8)",
                params![
                    user.open_id,
                    user.name.as_deref(),
                    user.email.as_deref(),
                    user.login_method.as_deref(),
                    user.password_hash.as_deref(),
                    user.role.unwrap_or_default().as_str(),
                    user.preferred_language.unwrap_or_default().as_str(),
                    now,
                ],
            );

            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }

            let id = conn.last_insert_rowid();
            Ok(query_user(conn, "id = ?1", id)?.map(User::from))
        })
    }

    /// Raw row, including the password hash.
    pub fn get_user_by_open_id(&self, open_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "open_id = ?1", open_id))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| Ok(query_user(conn, "id = ?1", id)?.map(User::from)))
    }

    pub fn update_user_language(&self, user_id: i64, language: Language) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET preferred_language = ?2, updated_at = ?3 WHERE id = ?1",
                params![user_id, language.as_str(), now_timestamp()],
            )?;
            Ok(())
        })
    }

    // -- Chat messages --

    /// Oldest first.
    pub fn get_chat_history(&self, user_id: i64) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, role, content, language, audio_url, created_at
                 FROM chat_messages
                 WHERE user_id = ?1
                 ORDER BY created_at, id",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChatMessageRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        role: row.get(2)?,
                        content: row.get(3)?,
                        language: row.get(4)?,
                        audio_url: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(ChatMessage::try_from).collect()
        })
    }

    pub fn add_chat_message(&self, message: &NewChatMessage<'_>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (user_id, role, content, language, audio_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.user_id,
                    message.role.as_str(),
                    message.content,
                    message.language.as_str(),
                    message.audio_url,
                    now_timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    // -- Reports --

    pub fn create_report(&self, report: &NewReport<'_>) -> Result<i64> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO reports (user_id, abuse_type, description, audio_url, photo_url,
                                      latitude, longitude, is_anonymous, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    report.user_id,
                    report.abuse_type,
                    report.description,
                    report.audio_url,
                    report.photo_url,
                    report.latitude,
                    report.longitude,
                    report.is_anonymous,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Every report, newest first.
    pub fn get_all_reports(&self) -> Result<Vec<Report>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_report)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Report::from).collect())
        })
    }

    /// Reports filed under `user_id`, newest first. Anonymous reports have no owner and never
    /// show up here.
    pub fn get_user_reports(&self, user_id: i64) -> Result<Vec<Report>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_report)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Report::from).collect())
        })
    }

    // -- Lessons --

    pub fn get_all_lessons(&self) -> Result<Vec<Lesson>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons ORDER BY order_index, id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_lesson)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Lesson::from).collect())
        })
    }

    pub fn get_lesson_by_id(&self, lesson_id: i64) -> Result<Option<Lesson>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?1");
            let row = conn.query_row(&sql, [lesson_id], map_lesson).optional()?;
            Ok(row.map(Lesson::from))
        })
    }

    pub fn insert_lesson(&self, lesson: &Lesson) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO lessons (title_en, title_sw, content_en, content_sw, illustration_url,
                                      audio_url_en, audio_url_sw, video_url, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    lesson.title_en,
                    lesson.title_sw,
                    lesson.content_en,
                    lesson.content_sw,
                    lesson.illustration_url,
                    lesson.audio_url_en,
                    lesson.audio_url_sw,
                    lesson.video_url,
                    lesson.order_index,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    // -- Learning progress --

    pub fn get_user_progress(&self, user_id: i64) -> Result<Vec<LearningProgress>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, lesson_id, completed, completed_at, created_at, updated_at
                 FROM learning_progress
                 WHERE user_id = ?1
                 ORDER BY lesson_id",
            )?;
            let rows = stmt
                .query_map([user_id], map_progress)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(LearningProgress::from).collect())
        })
    }

    /// Mark a lesson complete for a user. Creates the progress row on first call and updates it
    /// in place afterwards. Returns `None` if the lesson doesn't exist.
    pub fn mark_lesson_complete(&self, user_id: i64, lesson_id: i64) -> Result<Option<LearningProgress>> {
        self.with_conn(|conn| {
            let lesson_exists: Option<i64> = conn
                .query_row("SELECT id FROM lessons WHERE id = ?1", [lesson_id], |row| row.get(0))
                .optional()?;
            if lesson_exists.is_none() {
                return Ok(None);
            }

            let now = now_timestamp();
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM learning_progress WHERE user_id = ?1 AND lesson_id = ?2",
                    [user_id, lesson_id],
                    |row| row.get(0),
                )
                .optional()?;

            let id = if let Some(id) = existing {
                conn.execute(
                    "UPDATE learning_progress SET completed = 1, completed_at = ?2, updated_at = ?2
                     WHERE id = ?1",
                    params![id, now],
                )?;
                id
            } else {
                conn.execute(
                    "INSERT INTO learning_progress (user_id, lesson_id, completed, completed_at,
                                                    created_at, updated_at)
                     VALUES (?1, ?2, 1, ?3, ?3, ?3)",
                    params![user_id, lesson_id, now],
                )?;
                conn.last_insert_rowid()
            };

            let row = conn.query_row(
                "SELECT id, user_id, lesson_id, completed, completed_at, created_at, updated_at
                 FROM learning_progress WHERE id = ?1",
                [id],
                map_progress,
            )?;
            Ok(Some(LearningProgress::from(row)))
        })
    }

    // -- Privacy tips --

    pub fn get_all_privacy_tips(&self) -> Result<Vec<PrivacyTip>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title_en, title_sw, content_en, content_sw, icon, order_index, created_at
                 FROM privacy_tips
                 ORDER BY order_index, id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(PrivacyTipRow {
                        id: row.get(0)?,
                        title_en: row.get(1)?,
                        title_sw: row.get(2)?,
                        content_en: row.get(3)?,
                        content_sw: row.get(4)?,
                        icon: row.get(5)?,
                        order_index: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(PrivacyTip::from).collect())
        })
    }

    pub fn insert_privacy_tip(&self, tip: &PrivacyTip) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO privacy_tips (title_en, title_sw, content_en, content_sw, icon, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    tip.title_en,
                    tip.title_sw,
                    tip.content_en,
                    tip.content_sw,
                    tip.icon,
                    tip.order_index,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    // -- Stories --

    /// Newest first.
    pub fn get_all_stories(&self) -> Result<Vec<Story>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {STORY_COLUMNS} FROM stories ORDER BY created_at DESC, id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_story)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Story::from).collect())
        })
    }

    pub fn get_story_by_id(&self, story_id: i64) -> Result<Option<Story>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1");
            let row = conn.query_row(&sql, [story_id], map_story).optional()?;
            Ok(row.map(Story::from))
        })
    }

    /// New stories start with an empty reaction map.
    pub fn create_story(&self, story: &NewStory<'_>) -> Result<i64> {
        self.insert_story(story, &ReactionCounts::new())
    }

    pub fn insert_story(&self, story: &NewStory<'_>, reactions: &ReactionCounts) -> Result<i64> {
        let reactions = serde_json::to_string(reactions)?;
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO stories (user_id, content, audio_url, language, is_anonymous, reactions,
                                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    story.user_id,
                    story.content,
                    story.audio_url,
                    story.language.as_str(),
                    story.is_anonymous,
                    reactions,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Read the stored reaction map, bump one emoji, write the map back.
    /// Returns the updated map, or `None` if the story doesn't exist.
    pub fn add_story_reaction(&self, story_id: i64, emoji: &str) -> Result<Option<ReactionCounts>> {
        self.with_conn(|conn| {
            let stored: Option<Option<String>> = conn
                .query_row("SELECT reactions FROM stories WHERE id = ?1", [story_id], |row| {
                    row.get(0)
                })
                .optional()?;
            let Some(stored) = stored else {
                return Ok(None);
            };

            let mut reactions = parse_reactions(stored.as_deref(), story_id);
            let count = reactions.entry(emoji.to_string()).or_insert(0);
            *count = count.saturating_add(1);

            write_reactions(conn, story_id, &reactions)?;
            Ok(Some(reactions))
        })
    }

    // -- Help centers --

    pub fn get_all_help_centers(&self) -> Result<Vec<HelpCenter>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name_en, name_sw, description_en, description_sw, latitude, longitude,
                        address, phone, email, website, type, created_at, updated_at
                 FROM help_centers
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(HelpCenterRow {
                        id: row.get(0)?,
                        name_en: row.get(1)?,
                        name_sw: row.get(2)?,
                        description_en: row.get(3)?,
                        description_sw: row.get(4)?,
                        latitude: row.get(5)?,
                        longitude: row.get(6)?,
                        address: row.get(7)?,
                        phone: row.get(8)?,
                        email: row.get(9)?,
                        website: row.get(10)?,
                        kind: row.get(11)?,
                        created_at: row.get(12)?,
                        updated_at: row.get(13)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(HelpCenter::try_from).collect()
        })
    }

    pub fn insert_help_center(&self, center: &HelpCenter) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO help_centers (name_en, name_sw, description_en, description_sw, latitude,
                                           longitude, address, phone, email, website, type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    center.name_en,
                    center.name_sw,
                    center.description_en,
                    center.description_sw,
                    center.latitude,
                    center.longitude,
                    center.address,
                    center.phone,
                    center.email,
                    center.website,
                    center.kind.as_str(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Row count of a seedable table.
    pub(crate) fn count_rows(&self, table: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, key: P) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter}");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                open_id: row.get(1)?,
                name: row.get(2)?,
                email: row.get(3)?,
                login_method: row.get(4)?,
                password_hash: row.get(5)?,
                role: row.get(6)?,
                preferred_language: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
                last_signed_in: row.get(10)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_report(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        abuse_type: row.get(2)?,
        description: row.get(3)?,
        audio_url: row.get(4)?,
        photo_url: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        is_anonymous: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn map_lesson(row: &Row<'_>) -> rusqlite::Result<LessonRow> {
    Ok(LessonRow {
        id: row.get(0)?,
        title_en: row.get(1)?,
        title_sw: row.get(2)?,
        content_en: row.get(3)?,
        content_sw: row.get(4)?,
        illustration_url: row.get(5)?,
        audio_url_en: row.get(6)?,
        audio_url_sw: row.get(7)?,
        video_url: row.get(8)?,
        order_index: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn map_progress(row: &Row<'_>) -> rusqlite::Result<ProgressRow> {
    Ok(ProgressRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        lesson_id: row.get(2)?,
        completed: row.get(3)?,
        completed_at: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_story(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        audio_url: row.get(3)?,
        language: row.get(4)?,
        is_anonymous: row.get(5)?,
        reactions: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn write_reactions(conn: &Connection, story_id: i64, reactions: &ReactionCounts) -> Result<()> {
    conn.execute(
        "UPDATE stories SET reactions = ?2, updated_at = ?3 WHERE id = ?1",
        params![story_id, serde_json::to_string(reactions)?, now_timestamp()],
    )?;
    Ok(())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linda_types::models::{MessageRole, Role};

    fn db_with_user(open_id: &str) -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .upsert_user(&UpsertUser {
                open_id: open_id.to_string(),
                ..Default::default()
            })
            .unwrap();
        (db, user)
    }

    fn lesson(order_index: i64) -> Lesson {
        Lesson {
            id: 0,
            title_en: format!("Lesson {order_index}"),
            title_sw: format!("Somo {order_index}"),
            content_en: "content".into(),
            content_sw: "maudhui".into(),
            illustration_url: None,
            audio_url_en: None,
            audio_url_sw: None,
            video_url: None,
            order_index,
            created_at: Default::default(),
        }
    }

    #[test]
    fn upsert_creates_then_updates_in_place() {
        let (db, first) = db_with_user("amina");
        assert_eq!(first.role, Role::User);
        assert_eq!(first.preferred_language, Language::En);

        let second = db
            .upsert_user(&UpsertUser {
                open_id: "amina".into(),
                name: Some("Amina".into()),
                role: Some(Role::Admin),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name.as_deref(), Some("Amina"));
        assert!(second.is_admin());

        // a later upsert without a name keeps the stored one
        let third = db
            .upsert_user(&UpsertUser {
                open_id: "amina".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(third.name.as_deref(), Some("Amina"));
        assert!(third.is_admin());
    }

    #[test]
    fn upsert_requires_open_id() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.upsert_user(&UpsertUser::default()).is_err());
    }

    #[test]
    fn create_user_refuses_taken_open_id() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .create_user(&UpsertUser {
                open_id: "zawadi".into(),
                password_hash: Some("hash-one".into()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();

        let second = db
            .create_user(&UpsertUser {
                open_id: "zawadi".into(),
                password_hash: Some("hash-two".into()),
                role: Some(Role::Admin),
                ..Default::default()
            })
            .unwrap();
        assert!(second.is_none());

        let row = db.get_user_by_open_id("zawadi").unwrap().unwrap();
        assert_eq!(row.id, first.id);
        assert_eq!(row.password_hash.as_deref(), Some("hash-one"));
        assert_eq!(row.role, Role::User.as_str());
    }

    #[test]
    fn language_update_persists() {
        let (db, user) = db_with_user("wanjiru");
        db.update_user_language(user.id, Language::Sw).unwrap();
        let reloaded = db.get_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(reloaded.preferred_language, Language::Sw);
    }

    #[test]
    fn chat_history_is_oldest_first_and_per_user() {
        let (db, user) = db_with_user("a");
        let other = db
            .upsert_user(&UpsertUser {
                open_id: "b".into(),
                ..Default::default()
            })
            .unwrap();

        for (role, content) in [(MessageRole::User, "hi"), (MessageRole::Assistant, "hello")] {
            db.add_chat_message(&NewChatMessage {
                user_id: user.id,
                role,
                content,
                language: Language::En,
                audio_url: None,
            })
            .unwrap();
        }
        db.add_chat_message(&NewChatMessage {
            user_id: other.id,
            role: MessageRole::User,
            content: "not yours",
            language: Language::Sw,
            audio_url: Some("http://x/a.webm"),
        })
        .unwrap();

        let history = db.get_chat_history(user.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[test]
    fn anonymous_report_has_no_owner() {
        let (db, user) = db_with_user("a");
        let id = db
            .create_report(&NewReport {
                user_id: None,
                abuse_type: "Stalking",
                description: "someone follows my posts",
                audio_url: None,
                photo_url: None,
                latitude: Some("-1.29"),
                longitude: Some("36.82"),
                is_anonymous: true,
            })
            .unwrap();

        let all = db.get_all_reports().unwrap();
        let report = all.iter().find(|r| r.id == id).unwrap();
        assert!(report.user_id.is_none());
        assert!(report.is_anonymous);
        assert!(db.get_user_reports(user.id).unwrap().is_empty());
    }

    #[test]
    fn marking_complete_twice_keeps_one_row() {
        let (db, user) = db_with_user("a");
        let lesson_id = db.insert_lesson(&lesson(1)).unwrap();

        let first = db.mark_lesson_complete(user.id, lesson_id).unwrap().unwrap();
        let second = db.mark_lesson_complete(user.id, lesson_id).unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.completed);
        assert!(second.completed_at.is_some());

        let progress = db.get_user_progress(user.id).unwrap();
        assert_eq!(progress.len(), 1);
    }

    #[test]
    fn marking_unknown_lesson_is_none() {
        let (db, user) = db_with_user("a");
        assert!(db.mark_lesson_complete(user.id, 999).unwrap().is_none());
        assert!(db.get_user_progress(user.id).unwrap().is_empty());
    }

    #[test]
    fn lessons_follow_order_index() {
        let db = Database::open_in_memory().unwrap();
        db.insert_lesson(&lesson(3)).unwrap();
        db.insert_lesson(&lesson(1)).unwrap();
        db.insert_lesson(&lesson(2)).unwrap();

        let order: Vec<i64> = db.get_all_lessons().unwrap().iter().map(|l| l.order_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn reactions_increment_per_emoji() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_story(&NewStory {
                user_id: None,
                content: "I reported it and it stopped.",
                audio_url: None,
                language: Language::En,
                is_anonymous: true,
            })
            .unwrap();

        db.add_story_reaction(id, "❤️").unwrap();
        db.add_story_reaction(id, "❤️").unwrap();
        let map = db.add_story_reaction(id, "💪").unwrap().unwrap();
        assert_eq!(map.get("❤️"), Some(&2));
        assert_eq!(map.get("💪"), Some(&1));

        let story = db.get_story_by_id(id).unwrap().unwrap();
        assert_eq!(story.reactions, map);
        assert!(db.add_story_reaction(404, "❤️").unwrap().is_none());
    }

    #[test]
    fn corrupt_reaction_map_restarts_from_zero() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_story(&NewStory {
                user_id: None,
                content: "story",
                audio_url: None,
                language: Language::Sw,
                is_anonymous: false,
            })
            .unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE stories SET reactions = 'oops' WHERE id = ?1", [id])?;
            Ok(())
        })
        .unwrap();

        let map = db.add_story_reaction(id, "🙏").unwrap().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("🙏"), Some(&1));
    }

    #[test]
    fn reaction_count_saturates() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_story(&NewStory {
                user_id: None,
                content: "story",
                audio_url: None,
                language: Language::En,
                is_anonymous: false,
            })
            .unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE stories SET reactions = ?2 WHERE id = ?1",
                params![id, format!("{{\"❤️\":{}}}", u64::MAX)],
            )?;
            Ok(())
        })
        .unwrap();

        let map = db.add_story_reaction(id, "❤️").unwrap().unwrap();
        assert_eq!(map.get("❤️"), Some(&u64::MAX));
    }
}
