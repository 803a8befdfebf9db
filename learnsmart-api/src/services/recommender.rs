//! Personalized course recommendations
//!
//! The model is given the learner's onboarding answers and the whole catalog
//! and answers with titles and URLs. Each entry is joined back to a catalog
//! course by exact (case-insensitive) title and URL; anything the model
//! invented keeps `course: null`.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;
use tracing::{debug, warn};

use learnsmart_common::course::{split_list, Course, CourseDetail};
use learnsmart_common::preferences::UserPreferences;

use super::openai_client::{strip_code_fence, ChatMessage, ChatModel, ChatRequest, LlmError};

const SYSTEM_PROMPT: &str =
    "You are an AI learning advisor that provides personalized course recommendations.";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;
const RECOMMENDATION_COUNT: usize = 5;

pub const BASIC_PATH_NAME: &str = "Basic Learning Path";
pub const BASIC_PATH_DESCRIPTION: &str = "A starter path for your learning journey";

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("No response from the model")]
    Empty,

    #[error("Malformed recommendation reply: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Recommendations plus an ordered learning path
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    pub learning_path: LearningPath,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub course_title: String,
    pub course_url: String,
    pub explanation: String,
    pub course: Option<CourseDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningPath {
    pub name: String,
    pub description: String,
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub order: i64,
    pub course_title: String,
    pub course_url: String,
    pub explanation: String,
    pub course: Option<CourseDetail>,
}

/// Reply shape requested from the model
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelReply {
    recommendations: Vec<ModelEntry>,
    learning_path: ModelPath,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelEntry {
    order: i64,
    course_title: String,
    course_url: String,
    explanation: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelPath {
    name: String,
    description: String,
    steps: Vec<ModelEntry>,
}

impl RecommendationSet {
    /// Empty payload returned right after onboarding
    pub fn basic() -> Self {
        Self {
            recommendations: Vec::new(),
            learning_path: LearningPath {
                name: BASIC_PATH_NAME.to_string(),
                description: BASIC_PATH_DESCRIPTION.to_string(),
                steps: Vec::new(),
            },
        }
    }
}

/// Prompt describing the learner and every catalog course
pub fn build_prompt(preferences: &UserPreferences, courses: &[Course]) -> String {
    let mut prompt = String::from("Given a user with the following preferences:\n");
    for (label, value) in preferences.labelled() {
        let _ = writeln!(prompt, "- {}: {}", label, value);
    }

    prompt.push_str("\nAnd the following available courses:\n");
    for course in courses {
        let f = &course.fields;
        let _ = writeln!(prompt, "- Title: {}", f.title);
        let _ = writeln!(prompt, "  URL: {}", f.url);
        let _ = writeln!(prompt, "  Category: {}", f.category);
        let _ = writeln!(prompt, "  Course Type: {}", f.course_type);
        let _ = writeln!(prompt, "  Duration: {}", f.duration);
        let _ = writeln!(prompt, "  Description: {}", f.short_intro);
        let _ = writeln!(prompt, "  Skills: {}", split_list(&f.skills).join(", "));
        let _ = writeln!(prompt, "  Rating: {}", f.rating);
    }

    let _ = write!(
        prompt,
        r#"
Please recommend the top {} most suitable courses for this user and explain why each course is recommended.
Also suggest a learning path that combines these courses in an optimal order.
Format the response as a JSON object with the following structure:
{{
  "recommendations": [
    {{ "courseTitle": "exact course title", "courseUrl": "exact course URL", "explanation": "why this course is recommended" }}
  ],
  "learningPath": {{
    "name": "path name",
    "description": "path description",
    "steps": [
      {{ "order": 1, "courseTitle": "exact course title", "courseUrl": "exact course URL", "explanation": "why this course should be taken at this step" }}
    ]
  }}
}}

Important: Use the exact course titles and URLs as provided in the course list above."#,
        RECOMMENDATION_COUNT
    );

    prompt
}

/// Ask the model for recommendations and join them to the catalog
pub async fn recommend(
    model: &dyn ChatModel,
    preferences: &UserPreferences,
    courses: &[Course],
) -> Result<RecommendationSet, RecommendationError> {
    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(preferences, courses)),
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };

    let reply = model.complete(request).await?.ok_or(RecommendationError::Empty)?;
    let parsed: ModelReply = serde_json::from_str(strip_code_fence(&reply)).map_err(|e| {
        warn!("Unparseable recommendation reply: {}", e);
        e
    })?;

    debug!(
        recommendations = parsed.recommendations.len(),
        steps = parsed.learning_path.steps.len(),
        "Recommendations received"
    );

    Ok(join_catalog(parsed, courses))
}

fn find_course<'a>(courses: &'a [Course], title: &str, url: &str) -> Option<&'a Course> {
    let title = title.trim().to_lowercase();
    let url = url.trim().to_lowercase();
    courses.iter().find(|c| {
        c.fields.title.trim().to_lowercase() == title && c.fields.url.trim().to_lowercase() == url
    })
}

fn join_catalog(reply: ModelReply, courses: &[Course]) -> RecommendationSet {
    let detail = |title: &str, url: &str| {
        find_course(courses, title, url).map(|c| c.to_detail(Vec::new()))
    };

    let recommendations = reply
        .recommendations
        .into_iter()
        .map(|entry| Recommendation {
            course: detail(&entry.course_title, &entry.course_url),
            course_title: entry.course_title,
            course_url: entry.course_url,
            explanation: entry.explanation,
        })
        .collect();

    let steps = reply
        .learning_path
        .steps
        .into_iter()
        .map(|entry| PathStep {
            course: detail(&entry.course_title, &entry.course_url),
            order: entry.order,
            course_title: entry.course_title,
            course_url: entry.course_url,
            explanation: entry.explanation,
        })
        .collect();

    RecommendationSet {
        recommendations,
        learning_path: LearningPath {
            name: reply.learning_path.name,
            description: reply.learning_path.description,
            steps,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use crate::db::courses::tests::fields;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct CannedModel {
        reply: Option<String>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl CannedModel {
        fn new(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, request: ChatRequest) -> Result<Option<String>, LlmError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn catalog() -> Vec<Course> {
        let mut course_fields = fields("Rust for Beginners", "Backend");
        course_fields.url = "https://example.com/rust".to_string();
        vec![Course {
            id: Uuid::new_v4(),
            fields: course_fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }]
    }

    fn preferences() -> UserPreferences {
        UserPreferences {
            learning_style: "Visual".to_string(),
            learning_pace: "Steady".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_lists_preferences_and_courses() {
        let prompt = build_prompt(&preferences(), &catalog());
        assert!(prompt.contains("- Learning Style: Visual"));
        assert!(prompt.contains("- Learning Strength: "));
        assert!(prompt.contains("- Title: Rust for Beginners"));
        assert!(prompt.contains("URL: https://example.com/rust"));
        assert!(prompt.contains("\"learningPath\""));
    }

    #[test]
    fn test_basic_payload() {
        let json = serde_json::to_value(RecommendationSet::basic()).unwrap();
        assert_eq!(json["recommendations"], serde_json::json!([]));
        assert_eq!(json["learningPath"]["name"], BASIC_PATH_NAME);
        assert_eq!(json["learningPath"]["steps"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_joins_by_title_and_url() {
        let reply = r#"```json
        {
          "recommendations": [
            {"courseTitle": "RUST FOR BEGINNERS", "courseUrl": "https://EXAMPLE.com/rust", "explanation": "fits"},
            {"courseTitle": "Rust for Beginners", "courseUrl": "https://example.com/other", "explanation": "wrong url"}
          ],
          "learningPath": {
            "name": "Systems",
            "description": "Start low level",
            "steps": [{"order": 1, "courseTitle": "Rust for Beginners", "courseUrl": "https://example.com/rust", "explanation": "first"}]
          }
        }
        ```"#;
        let model = CannedModel::new(Some(reply));
        let set = recommend(&model, &preferences(), &catalog()).await.unwrap();

        assert_eq!(set.recommendations.len(), 2);
        assert!(set.recommendations[0].course.is_some());
        assert!(set.recommendations[1].course.is_none());
        assert_eq!(set.learning_path.name, "Systems");
        assert_eq!(set.learning_path.steps[0].order, 1);
        assert!(set.learning_path.steps[0].course.is_some());

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].max_tokens, MAX_TOKENS);
        assert_eq!(seen[0].messages[0].content, SYSTEM_PROMPT);
        assert!(seen[0].messages[1].content.contains("Rust for Beginners"));
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let model = CannedModel::new(None);
        let err = recommend(&model, &preferences(), &catalog()).await.unwrap_err();
        assert!(matches!(err, RecommendationError::Empty));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let model = CannedModel::new(Some("Here are some courses you might like"));
        let err = recommend(&model, &preferences(), &catalog()).await.unwrap_err();
        assert!(matches!(err, RecommendationError::Parse(_)));
    }
}
