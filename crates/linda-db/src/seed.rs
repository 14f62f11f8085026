//! Built-in content: lessons, privacy tips, help centers and the starter community stories.
//! Each table is only filled while it is still empty, so running this on every boot is safe.

use anyhow::Result;
use serde::Deserialize;
use tracing::info;

use linda_types::models::{
    HelpCenter, HelpCenterType, Language, Lesson, PrivacyTip, ReactionCounts,
};

use crate::Database;
use crate::models::NewStory;

const LESSONS: &str = include_str!("../seed/lessons.json");
const PRIVACY_TIPS: &str = include_str!("../seed/privacy_tips.json");
const HELP_CENTERS: &str = include_str!("../seed/help_centers.json");
const STORIES: &str = include_str!("../seed/stories.json");

#[derive(Debug, Deserialize)]
struct SeedLesson {
    title_en: String,
    title_sw: String,
    content_en: String,
    content_sw: String,
    illustration_url: Option<String>,
    audio_url_en: Option<String>,
    audio_url_sw: Option<String>,
    video_url: Option<String>,
    order_index: i64,
}

#[derive(Debug, Deserialize)]
struct SeedTip {
    title_en: String,
    title_sw: String,
    content_en: String,
    content_sw: String,
    icon: String,
    order_index: i64,
}

#[derive(Debug, Deserialize)]
struct SeedHelpCenter {
    name_en: String,
    name_sw: String,
    description_en: Option<String>,
    description_sw: Option<String>,
    latitude: String,
    longitude: String,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    #[serde(rename = "type")]
    kind: HelpCenterType,
}

#[derive(Debug, Deserialize)]
struct SeedStory {
    content: String,
    audio_url: Option<String>,
    language: Language,
    is_anonymous: bool,
    #[serde(default)]
    reactions: ReactionCounts,
}

/// Rows inserted per table by one `seed_defaults` call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub lessons: usize,
    pub privacy_tips: usize,
    pub help_centers: usize,
    pub stories: usize,
}

impl Database {
    pub fn seed_defaults(&self) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        if self.count_rows("lessons")? == 0 {
            let lessons: Vec<SeedLesson> = serde_json::from_str(LESSONS)?;
            for l in lessons {
                self.insert_lesson(&Lesson {
                    id: 0,
                    title_en: l.title_en,
                    title_sw: l.title_sw,
                    content_en: l.content_en,
                    content_sw: l.content_sw,
                    illustration_url: l.illustration_url,
                    audio_url_en: l.audio_url_en,
                    audio_url_sw: l.audio_url_sw,
                    video_url: l.video_url,
                    order_index: l.order_index,
                    created_at: Default::default(),
                })?;
                report.lessons += 1;
            }
            info!("Seeded {} lessons", report.lessons);
        }

        if self.count_rows("privacy_tips")? == 0 {
            let tips: Vec<SeedTip> = serde_json::from_str(PRIVACY_TIPS)?;
            for t in tips {
                self.insert_privacy_tip(&PrivacyTip {
                    id: 0,
                    title_en: t.title_en,
                    title_sw: t.title_sw,
                    content_en: t.content_en,
                    content_sw: t.content_sw,
                    icon: t.icon,
                    order_index: t.order_index,
                    created_at: Default::default(),
                })?;
                report.privacy_tips += 1;
            }
            info!("Seeded {} privacy tips", report.privacy_tips);
        }

        if self.count_rows("help_centers")? == 0 {
            let centers: Vec<SeedHelpCenter> = serde_json::from_str(HELP_CENTERS)?;
            for c in centers {
                self.insert_help_center(&HelpCenter {
                    id: 0,
                    name_en: c.name_en,
                    name_sw: c.name_sw,
                    description_en: c.description_en,
                    description_sw: c.description_sw,
                    latitude: c.latitude,
                    longitude: c.longitude,
                    address: c.address,
                    phone: c.phone,
                    email: c.email,
                    website: c.website,
                    kind: c.kind,
                    created_at: Default::default(),
                    updated_at: Default::default(),
                })?;
                report.help_centers += 1;
            }
            info!("Seeded {} help centers", report.help_centers);
        }

        if self.count_rows("stories")? == 0 {
            let stories: Vec<SeedStory> = serde_json::from_str(STORIES)?;
            for s in &stories {
                self.insert_story(
                    &NewStory {
                        user_id: None,
                        content: &s.content,
                        audio_url: s.audio_url.as_deref(),
                        language: s.language,
                        is_anonymous: s.is_anonymous,
                    },
                    &s.reactions,
                )?;
                report.stories += 1;
            }
            info!("Seeded {} community stories", report.stories);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_once() {
        let db = Database::open_in_memory().unwrap();

        let first = db.seed_defaults().unwrap();
        assert_eq!(
            first,
            SeedReport {
                lessons: 10,
                privacy_tips: 7,
                help_centers: 5,
                stories: 16,
            }
        );

        let second = db.seed_defaults().unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(db.get_all_lessons().unwrap().len(), 10);
    }

    #[test]
    fn seeded_content_is_bilingual() {
        let db = Database::open_in_memory().unwrap();
        db.seed_defaults().unwrap();

        let tips = db.get_all_privacy_tips().unwrap();
        assert_eq!(tips[0].title_en, "Lock Your Phone");
        assert_eq!(tips[0].title_sw, "Funga Simu Yako");

        let centers = db.get_all_help_centers().unwrap();
        assert!(centers.iter().all(|c| c.coordinates().is_some()));
        assert!(centers.iter().any(|c| c.kind == HelpCenterType::Shelter));

        let stories = db.get_all_stories().unwrap();
        assert!(stories.iter().all(|s| s.user_id.is_none()));
        assert!(stories.iter().any(|s| s.language == Language::Sw));
        assert!(stories.iter().all(|s| s.reactions.contains_key("❤️")));
    }
}
