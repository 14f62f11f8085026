use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generates `as_str`, `Display` and `FromStr` for a fieldless enum stored as TEXT.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(concat!("invalid ", stringify!($name), ": {}"), other)),
                }
            }
        }
    };
}

/// Content language. Every bilingual row carries an English and a Swahili column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Sw,
}

text_enum!(Language { En => "en", Sw => "sw" });

impl Language {
    /// Select one half of a bilingual field pair.
    pub fn pick<'a, T: ?Sized>(&self, en: &'a T, sw: &'a T) -> &'a T {
        match self {
            Self::En => en,
            Self::Sw => sw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

text_enum!(Role { User => "user", Admin => "admin" });

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

text_enum!(MessageRole { User => "user", Assistant => "assistant" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
}

text_enum!(ReportStatus { Pending => "pending", Reviewed => "reviewed", Resolved => "resolved" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpCenterType {
    Ngo,
    Shelter,
    SupportCenter,
    Hotline,
}

text_enum!(HelpCenterType {
    Ngo => "ngo",
    Shelter => "shelter",
    SupportCenter => "support_center",
    Hotline => "hotline",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Role,
    pub preferred_language: Language,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub language: Language,
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    /// `None` for anonymous reports.
    pub user_id: Option<i64>,
    pub abuse_type: String,
    pub description: String,
    pub audio_url: Option<String>,
    pub photo_url: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub is_anonymous: bool,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
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
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyTip {
    pub id: i64,
    pub title_en: String,
    pub title_sw: String,
    pub content_en: String,
    pub content_sw: String,
    pub icon: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
}

/// Emoji -> count. Ordered so the serialized form is stable.
pub type ReactionCounts = BTreeMap<String, u64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: i64,
    pub user_id: Option<i64>,
    pub content: String,
    pub audio_url: Option<String>,
    pub language: Language,
    pub is_anonymous: bool,
    pub reactions: ReactionCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpCenter {
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
    #[serde(rename = "type")]
    pub kind: HelpCenterType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HelpCenter {
    /// Parsed `(latitude, longitude)`, or `None` if either column is not a number.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.trim().parse::<f64>().ok()?;
        let lon = self.longitude.trim().parse::<f64>().ok()?;
        Some((lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trips_through_text() {
        assert_eq!("sw".parse::<Language>().unwrap(), Language::Sw);
        assert_eq!(Language::En.to_string(), "en");
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn pick_selects_bilingual_half() {
        assert_eq!(Language::En.pick("Hello", "Habari"), "Hello");
        assert_eq!(Language::Sw.pick("Hello", "Habari"), "Habari");
    }

    #[test]
    fn help_center_type_uses_snake_case() {
        let json = serde_json::to_string(&HelpCenterType::SupportCenter).unwrap();
        assert_eq!(json, "\"support_center\"");
        assert_eq!(
            "support_center".parse::<HelpCenterType>().unwrap(),
            HelpCenterType::SupportCenter
        );
    }
}
