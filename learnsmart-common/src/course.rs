//! Course records and their derived detail view
//!
//! Courses are stored in the tabular import shape (one string per column,
//! JSON names identical to the import headers). An optional outline of
//! modules → lessons → resources hangs off each course. The detail view adds
//! parsed fields (skill list, numeric rating, viewer count) on top of the raw
//! record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Raw course columns as imported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFields {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Short Intro")]
    pub short_intro: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Sub-Category")]
    pub sub_category: String,
    #[serde(rename = "Course Type")]
    pub course_type: String,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Subtitle Languages")]
    pub subtitle_languages: String,
    #[serde(rename = "Skills")]
    pub skills: String,
    #[serde(rename = "Instructors")]
    pub instructors: String,
    #[serde(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Number of viewers")]
    pub viewers: String,
    #[serde(rename = "Duration")]
    pub duration: String,
    #[serde(rename = "Site")]
    pub site: String,
}

impl CourseFields {
    fn columns(&self) -> [(&'static str, &str); 14] {
        [
            ("Title", &self.title),
            ("URL", &self.url),
            ("Short Intro", &self.short_intro),
            ("Category", &self.category),
            ("Sub-Category", &self.sub_category),
            ("Course Type", &self.course_type),
            ("Language", &self.language),
            ("Subtitle Languages", &self.subtitle_languages),
            ("Skills", &self.skills),
            ("Instructors", &self.instructors),
            ("Rating", &self.rating),
            ("Number of viewers", &self.viewers),
            ("Duration", &self.duration),
            ("Site", &self.site),
        ]
    }

    /// Every column is required and may not be blank
    pub fn validate(&self) -> Result<()> {
        match self.columns().iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(Error::InvalidInput(format!("{} is required", name))),
            None => Ok(()),
        }
    }
}

/// Partial update of course columns; absent keys are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoursePatch {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(rename = "Short Intro")]
    pub short_intro: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Sub-Category")]
    pub sub_category: Option<String>,
    #[serde(rename = "Course Type")]
    pub course_type: Option<String>,
    #[serde(rename = "Language")]
    pub language: Option<String>,
    #[serde(rename = "Subtitle Languages")]
    pub subtitle_languages: Option<String>,
    #[serde(rename = "Skills")]
    pub skills: Option<String>,
    #[serde(rename = "Instructors")]
    pub instructors: Option<String>,
    #[serde(rename = "Rating")]
    pub rating: Option<String>,
    #[serde(rename = "Number of viewers")]
    pub viewers: Option<String>,
    #[serde(rename = "Duration")]
    pub duration: Option<String>,
    #[serde(rename = "Site")]
    pub site: Option<String>,
}

impl CoursePatch {
    /// Apply the patch, then re-validate the result
    pub fn apply_to(self, fields: &mut CourseFields) -> Result<()> {
        fn set(target: &mut String, value: Option<String>) {
            if let Some(v) = value {
                *target = v;
            }
        }

        set(&mut fields.title, self.title);
        set(&mut fields.url, self.url);
        set(&mut fields.short_intro, self.short_intro);
        set(&mut fields.category, self.category);
        set(&mut fields.sub_category, self.sub_category);
        set(&mut fields.course_type, self.course_type);
        set(&mut fields.language, self.language);
        set(&mut fields.subtitle_languages, self.subtitle_languages);
        set(&mut fields.skills, self.skills);
        set(&mut fields.instructors, self.instructors);
        set(&mut fields.rating, self.rating);
        set(&mut fields.viewers, self.viewers);
        set(&mut fields.duration, self.duration);
        set(&mut fields.site, self.site);

        fields.validate()
    }
}

/// Stored course
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub fields: CourseFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of a lesson resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceKind {
    Pdf,
    Video,
    Link,
    Code,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pdf => "PDF",
            ResourceKind::Video => "VIDEO",
            ResourceKind::Link => "LINK",
            ResourceKind::Code => "CODE",
        }
    }

    /// Parse a stored value; accepts any case
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PDF" => Some(ResourceKind::Pdf),
            "VIDEO" => Some(ResourceKind::Video),
            "LINK" => Some(ResourceKind::Link),
            "CODE" => Some(ResourceKind::Code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonResource {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub order: i64,
    pub resources: Vec<LessonResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub duration: String,
    pub order: i64,
    pub lessons: Vec<Lesson>,
}

impl CourseModule {
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }
}

/// Outline submitted by an author (ids are assigned on save)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDraft {
    pub title: String,
    #[serde(default)]
    pub duration: String,
    pub order: i64,
    #[serde(default)]
    pub lessons: Vec<LessonDraft>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub video_url: Option<String>,
    pub order: i64,
    #[serde(default)]
    pub resources: Vec<ResourceDraft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub url: String,
}

/// Instructor card shown in course listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructorSummary {
    pub name: String,
    pub avatar: String,
}

/// Course as returned by the API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: CourseFields,
    pub skills: Vec<String>,
    pub instructors: Vec<String>,
    pub rating_value: Option<f64>,
    pub viewers_count: Option<i64>,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub level: String,
    pub rating: Option<f64>,
    pub duration: String,
    pub instructor: InstructorSummary,
    pub enrolled_count: Option<i64>,
    pub modules: Vec<CourseModule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const INSTRUCTOR_AVATAR: &str = "https://source.unsplash.com/random/100x100?person";

impl Course {
    /// Derive the detail view, attaching the given outline
    pub fn to_detail(&self, modules: Vec<CourseModule>) -> CourseDetail {
        let fields = &self.fields;
        let instructors = split_list(&fields.instructors);
        let rating = parse_rating(&fields.rating);

        CourseDetail {
            id: self.id,
            skills: split_list(&fields.skills),
            instructor: InstructorSummary {
                name: instructors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Unknown Instructor".to_string()),
                avatar: INSTRUCTOR_AVATAR.to_string(),
            },
            instructors,
            rating_value: rating,
            viewers_count: parse_viewers(&fields.viewers),
            enrolled_count: parse_viewers(&fields.viewers),
            thumbnail: thumbnail_url(&fields.category),
            title: fields.title.clone(),
            description: fields.short_intro.clone(),
            level: fields.course_type.clone(),
            rating,
            duration: fields.duration.clone(),
            modules,
            created_at: self.created_at,
            updated_at: self.updated_at,
            fields: fields.clone(),
        }
    }
}

/// Split a comma-separated column into trimmed, non-empty entries
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse ratings such as `"4.9stars"` or `"4.7"`
pub fn parse_rating(raw: &str) -> Option<f64> {
    raw.replace("stars", "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite())
}

/// Parse viewer counts such as `"10,438 "`
pub fn parse_viewers(raw: &str) -> Option<i64> {
    raw.replace(',', "").trim().parse::<i64>().ok()
}

pub fn thumbnail_url(category: &str) -> String {
    format!(
        "https://source.unsplash.com/random/800x600?{}",
        category.to_lowercase()
    )
}
