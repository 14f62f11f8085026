//! Database row types. These map directly to SQLite rows; enums and timestamps stay as TEXT
//! here and are parsed when a row is turned into its `linda-types` model.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use linda_types::models::{
    ChatMessage, HelpCenter, Language, LearningProgress, Lesson, MessageRole, PrivacyTip,
    ReactionCounts, Report, Role, Story, User,
};

pub struct UserRow {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    pub preferred_language: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_signed_in: String,
}

pub struct ChatMessageRow {
    pub id: i64,
    pub user_id: i64,
    pub role: String,
    pub content: String,
    pub language: String,
    pub audio_url: Option<String>,
    pub created_at: String,
}

pub struct ReportRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub abuse_type: String,
    pub description: String,
    pub audio_url: Option<String>,
    pub photo_url: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub is_anonymous: bool,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct LessonRow {
    pub id: i64,
    pub title_en: String,
    pub title_sw: String,
    pub content_en: String,
    pub content_sw: String,
    pub illustration_url: Option<String>,
    pub audio_url_en: Option<String>,
    pub audio_url_sw: Option<String>,
    pub video_url: Option<String>,
    pub order_index: i64,
    pub created_at: String,
}

pub struct ProgressRow {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct PrivacyTipRow {
    pub id: i64,
    pub title_en: String,
    pub title_sw: String,
    pub content_en: String,
    pub content_sw: String,
    pub icon: String,
    pub order_index: i64,
    pub created_at: String,
}

pub struct StoryRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub content: String,
    pub audio_url: Option<String>,
    pub language: String,
    pub is_anonymous: bool,
    /// JSON object of emoji -> count.
    pub reactions: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct HelpCenterRow {
    pub id: i64,
    pub name_en: String,
    pub name_sw: String,
    pub description_en: Option<String>,
    pub description_sw: Option<String>,
    pub latitude: String,
    pub longitude: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub kind: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields written by a login upsert. `None` leaves the stored value alone on update and
/// takes the column default on insert.
#[derive(Debug, Default, Clone)]
pub struct UpsertUser {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub preferred_language: Option<Language>,
}

pub struct NewChatMessage<'a> {
    pub user_id: i64,
    pub role: MessageRole,
    pub content: &'a str,
    pub language: Language,
    pub audio_url: Option<&'a str>,
}

pub struct NewReport<'a> {
    pub user_id: Option<i64>,
    pub abuse_type: &'a str,
    pub description: &'a str,
    pub audio_url: Option<&'a str>,
    pub photo_url: Option<&'a str>,
    pub latitude: Option<&'a str>,
    pub longitude: Option<&'a str>,
    pub is_anonymous: bool,
}

pub struct NewStory<'a> {
    pub user_id: Option<i64>,
    pub content: &'a str,
    pub audio_url: Option<&'a str>,
    pub language: Language,
    pub is_anonymous: bool,
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(raw: &str, table: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // rows written by hand with datetime('now') have no timezone
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {} {}: {}", raw, table, id, e);
            DateTime::default()
        })
}

fn parse_enum<T: FromStr<Err = String> + Default>(raw: &str, table: &str, id: i64) -> T {
    raw.parse().unwrap_or_else(|e| {
        warn!("{} on {} {}", e, table, id);
        T::default()
    })
}

/// Decode a stored reaction map. Missing or corrupt maps decode as empty.
pub fn parse_reactions(raw: Option<&str>, story_id: i64) -> ReactionCounts {
    match raw {
        None => ReactionCounts::new(),
        Some(s) if s.trim().is_empty() => ReactionCounts::new(),
        Some(s) => serde_json::from_str(s).unwrap_or_else(|e| {
            warn!("Corrupt reactions on story {}: {}", story_id, e);
            ReactionCounts::new()
        }),
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            role: parse_enum(&row.role, "user", row.id),
            preferred_language: parse_enum(&row.preferred_language, "user", row.id),
            created_at: parse_timestamp(&row.created_at, "user", row.id),
            updated_at: parse_timestamp(&row.updated_at, "user", row.id),
            last_signed_in: parse_timestamp(&row.last_signed_in, "user", row.id),
            id: row.id,
            open_id: row.open_id,
            name: row.name,
            email: row.email,
            login_method: row.login_method,
        }
    }
}

impl TryFrom<ChatMessageRow> for ChatMessage {
    type Error = anyhow::Error;

    fn try_from(row: ChatMessageRow) -> anyhow::Result<Self> {
        // a turn with an unknown author can't be shown either way, so refuse it
        let role = row
            .role
            .parse()
            .map_err(|e| anyhow::anyhow!("{} on chat message {}", e, row.id))?;
        Ok(Self {
            role,
            language: parse_enum(&row.language, "chat message", row.id),
            created_at: parse_timestamp(&row.created_at, "chat message", row.id),
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            audio_url: row.audio_url,
        })
    }
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            status: parse_enum(&row.status, "report", row.id),
            created_at: parse_timestamp(&row.created_at, "report", row.id),
            updated_at: parse_timestamp(&row.updated_at, "report", row.id),
            id: row.id,
            user_id: row.user_id,
            abuse_type: row.abuse_type,
            description: row.description,
            audio_url: row.audio_url,
            photo_url: row.photo_url,
            latitude: row.latitude,
            longitude: row.longitude,
            is_anonymous: row.is_anonymous,
        }
    }
}

impl From<LessonRow> for Lesson {
    fn from(row: LessonRow) -> Self {
        Self {
            created_at: parse_timestamp(&row.created_at, "lesson", row.id),
            id: row.id,
            title_en: row.title_en,
            title_sw: row.title_sw,
            content_en: row.content_en,
            content_sw: row.content_sw,
            illustration_url: row.illustration_url,
            audio_url_en: row.audio_url_en,
            audio_url_sw: row.audio_url_sw,
            video_url: row.video_url,
            order_index: row.order_index,
        }
    }
}

impl From<ProgressRow> for LearningProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            completed_at: row
                .completed_at
                .as_deref()
                .map(|raw| parse_timestamp(raw, "progress", row.id)),
            created_at: parse_timestamp(&row.created_at, "progress", row.id),
            updated_at: parse_timestamp(&row.updated_at, "progress", row.id),
            id: row.id,
            user_id: row.user_id,
            lesson_id: row.lesson_id,
            completed: row.completed,
        }
    }
}

impl From<PrivacyTipRow> for PrivacyTip {
    fn from(row: PrivacyTipRow) -> Self {
        Self {
            created_at: parse_timestamp(&row.created_at, "tip", row.id),
            id: row.id,
            title_en: row.title_en,
            title_sw: row.title_sw,
            content_en: row.content_en,
            content_sw: row.content_sw,
            icon: row.icon,
            order_index: row.order_index,
        }
    }
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Self {
            reactions: parse_reactions(row.reactions.as_deref(), row.id),
            language: parse_enum(&row.language, "story", row.id),
            created_at: parse_timestamp(&row.created_at, "story", row.id),
            updated_at: parse_timestamp(&row.updated_at, "story", row.id),
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            audio_url: row.audio_url,
            is_anonymous: row.is_anonymous,
        }
    }
}

impl TryFrom<HelpCenterRow> for HelpCenter {
    type Error = anyhow::Error;

    fn try_from(row: HelpCenterRow) -> anyhow::Result<Self> {
        let kind = row
            .kind
            .parse()
            .map_err(|e| anyhow::anyhow!("{} on help center {}", e, row.id))?;
        Ok(Self {
            kind,
            created_at: parse_timestamp(&row.created_at, "help center", row.id),
            updated_at: parse_timestamp(&row.updated_at, "help center", row.id),
            id: row.id,
            name_en: row.name_en,
            name_sw: row.name_sw,
            description_en: row.description_en,
            description_sw: row.description_sw,
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
            phone: row.phone,
            email: row.email,
            website: row.website,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_shapes() {
        let a = parse_timestamp("2025-03-01T10:00:00.250Z", "t", 1);
        let b = parse_timestamp("2025-03-01 10:00:00", "t", 1);
        assert_eq!(a.timestamp(), b.timestamp());
        assert_eq!(parse_timestamp("garbage", "t", 1), DateTime::<Utc>::default());
    }

    #[test]
    fn corrupt_reactions_decode_empty() {
        assert!(parse_reactions(None, 1).is_empty());
        assert!(parse_reactions(Some("{not json"), 1).is_empty());
        let map = parse_reactions(Some(r#"{"💪": 3}"#), 1);
        assert_eq!(map.get("💪"), Some(&3));
    }
}
