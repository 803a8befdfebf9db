//! Course roadmaps generated by the chat model

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use learnsmart_common::course::Course;

use super::openai_client::{strip_code_fence, ChatMessage, ChatModel, ChatRequest, LlmError};

const SYSTEM_PROMPT: &str = "You are a curriculum designer who creates structured learning roadmaps.";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2000;

/// Roadmap generation failures; the display text is what clients see
#[derive(Debug, Error)]
pub enum RoadmapError {
    #[error("Error generating roadmap")]
    Llm(#[from] LlmError),

    #[error("Failed to generate roadmap")]
    Empty,

    #[error("Failed to parse roadmap data")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicResourceKind {
    Article,
    Video,
    Course,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicResource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: TopicResourceKind,
}

/// One node of a roadmap; children share the same shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapTopic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resources: Vec<TopicResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RoadmapTopic>>,
}

pub fn build_prompt(course: &Course) -> String {
    let f = &course.fields;
    format!(
        r#"Create a detailed learning roadmap for a course titled "{}" with the following details:
Description: {}
Skills: {}
Category: {}

Format the response as a JSON array of topics, where each topic has:
- id (string)
- title (string)
- description (string)
- resources (array of {{title, url, type}}) where type is 'article', 'video', or 'course'
- children (optional array of subtopics with the same structure)"#,
        f.title, f.short_intro, f.skills, f.category
    )
}

/// Generate a roadmap for `course`, linking the course into every topic
pub async fn generate_roadmap(
    model: &dyn ChatModel,
    course: &Course,
) -> Result<Vec<RoadmapTopic>, RoadmapError> {
    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(course)),
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };

    let reply = model.complete(request).await?.ok_or(RoadmapError::Empty)?;
    let mut topics: Vec<RoadmapTopic> =
        serde_json::from_str(strip_code_fence(&reply)).map_err(|e| {
            warn!(course = %course.id, "Unparseable roadmap reply: {}", e);
            e
        })?;

    let course_resource = TopicResource {
        title: course.fields.title.clone(),
        url: course.fields.url.clone(),
        kind: TopicResourceKind::Course,
    };
    attach_resource(&mut topics, &course_resource);

    debug!(course = %course.id, topics = topics.len(), "Roadmap generated");
    Ok(topics)
}

/// Append `resource` to every topic, depth first
fn attach_resource(topics: &mut [RoadmapTopic], resource: &TopicResource) {
    for topic in topics {
        topic.resources.push(resource.clone());
        if let Some(children) = topic.children.as_mut() {
            attach_resource(children, resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::courses::tests::fields;
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    struct Fixed(Result<Option<String>, ()>);

    #[async_trait]
    impl ChatModel for Fixed {
        async fn complete(&self, _request: ChatRequest) -> Result<Option<String>, LlmError> {
            match &self.0 {
                Ok(reply) => Ok(reply.clone()),
                Err(()) => Err(LlmError::Api(500, "upstream down".to_string())),
            }
        }
    }

    fn course() -> Course {
        Course {
            id: Uuid::new_v4(),
            fields: fields("Rust Basics", "Backend"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    const NESTED: &str = r#"[
        {"id": "1", "title": "Ownership", "description": "Moves and borrows",
         "resources": [{"title": "Book", "url": "https://doc.rust-lang.org/book", "type": "article"}],
         "children": [{"id": "1.1", "title": "Lifetimes", "description": "", "resources": []}]},
        {"id": "2", "title": "Traits", "description": "Shared behavior"}
    ]"#;

    #[test]
    fn test_prompt_mentions_course() {
        let prompt = build_prompt(&course());
        assert!(prompt.contains(r#"titled "Rust Basics""#));
        assert!(prompt.contains("Skills: Rust, SQL"));
        assert!(prompt.contains("Category: Backend"));
    }

    #[tokio::test]
    async fn test_course_resource_added_recursively() {
        let course = course();
        let topics = generate_roadmap(&Fixed(Ok(Some(NESTED.to_string()))), &course)
            .await
            .unwrap();

        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].resources.len(), 2);
        assert_eq!(topics[0].resources[1].kind, TopicResourceKind::Course);
        assert_eq!(topics[0].resources[1].url, course.fields.url);

        let child = &topics[0].children.as_ref().unwrap()[0];
        assert_eq!(child.resources.len(), 1);
        assert_eq!(child.resources[0].title, "Rust Basics");

        assert_eq!(topics[1].resources.len(), 1);
        assert!(topics[1].children.is_none());
    }

    #[tokio::test]
    async fn test_fenced_reply_accepted() {
        let reply = format!("```json\n{}\n```", NESTED);
        let topics = generate_roadmap(&Fixed(Ok(Some(reply))), &course()).await.unwrap();
        assert_eq!(topics.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_messages() {
        let empty = generate_roadmap(&Fixed(Ok(None)), &course()).await.unwrap_err();
        assert_eq!(empty.to_string(), "Failed to generate roadmap");

        let garbage = generate_roadmap(&Fixed(Ok(Some("not json".to_string()))), &course())
            .await
            .unwrap_err();
        assert_eq!(garbage.to_string(), "Failed to parse roadmap data");

        let upstream = generate_roadmap(&Fixed(Err(())), &course()).await.unwrap_err();
        assert_eq!(upstream.to_string(), "Error generating roadmap");
    }

    #[test]
    fn test_children_omitted_when_absent() {
        let topic = RoadmapTopic {
            id: "1".to_string(),
            title: "Intro".to_string(),
            description: String::new(),
            resources: Vec::new(),
            children: None,
        };
        let json = serde_json::to_value(&topic).unwrap();
        assert!(json.get("children").is_none());
    }
}
