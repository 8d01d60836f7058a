//! Generative text collaborator.
//!
//! The service is asked for JSON matching a fixed schema. Replies are
//! validated strictly at this boundary: a missing key, a wrong type or a
//! story-point value outside the recognized scale fails the whole call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use crate::model::Priority;

/// Story-point values the estimator may return.
pub const STORY_POINTS: [u32; 6] = [1, 2, 3, 5, 8, 13];

const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that improves Jira tickets. Be concise but thorough.";

/// Improved version of a task draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Enhancement {
    pub improved_title: String,
    pub improved_description: String,
    pub acceptance_criteria: Vec<String>,
    pub suggested_tags: Vec<String>,
    pub estimated_story_points: u32,
}

/// One task drafted from free text. Only the title is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DraftSpec {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub story_points: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDraft {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    story_points: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDrafts {
    List(Vec<RawDraft>),
    Wrapped { tasks: Vec<RawDraft> },
}

fn malformed(what: &str, detail: impl std::fmt::Display) -> Error {
    Error::Generation(format!("malformed {what}: {detail}"))
}

fn check_story_points(points: u32) -> Result<u32> {
    if STORY_POINTS.contains(&points) {
        Ok(points)
    } else {
        Err(malformed(
            "response",
            format!("story points {points} not in {STORY_POINTS:?}"),
        ))
    }
}

/// Parse and validate an enhancement reply.
pub fn parse_enhancement(raw: &str) -> Result<Enhancement> {
    let enhancement: Enhancement =
        serde_json::from_str(raw).map_err(|err| malformed("enhancement", err))?;
    if enhancement.improved_title.trim().is_empty() {
        return Err(malformed("enhancement", "empty improvedTitle"));
    }
    check_story_points(enhancement.estimated_story_points)?;
    Ok(enhancement)
}

/// Parse and validate a bulk drafting reply: either a bare array of drafts
/// or an object with a `tasks` array.
pub fn parse_drafts(raw: &str) -> Result<Vec<DraftSpec>> {
    let drafts = match serde_json::from_str::<RawDrafts>(raw)
        .map_err(|err| malformed("task drafts", err))?
    {
        RawDrafts::List(drafts) | RawDrafts::Wrapped { tasks: drafts } => drafts,
    };

    drafts
        .into_iter()
        .map(|raw| {
            let priority = raw
                .priority
                .as_deref()
                .map(str::parse::<Priority>)
                .transpose()
                .map_err(|err| malformed("task drafts", err))?;
            let story_points = raw.story_points.map(check_story_points).transpose()?;
            Ok(DraftSpec {
                title: raw.title.trim().to_string(),
                description: raw.description,
                priority,
                tags: raw.tags,
                story_points,
            })
        })
        .collect()
}

/// Text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Improve a task's title and description and estimate it.
    async fn enhance(&self, title: &str, description: &str) -> Result<Enhancement>;

    /// Turn free text into task drafts.
    async fn draft_tasks(&self, text: &str) -> Result<Vec<DraftSpec>>;
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from config, reading the API key from the configured variable.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Generation(format!("{} is not set", config.api_key_env))
            })?;
        Ok(Self::new(&config.endpoint, &config.model, api_key))
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate(&self, prompt: String, schema: Value) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Generation(format!("request failed: {err}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "service returned {status}: {}",
                text.trim()
            )));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|err| malformed("service reply", err))?;
        candidate_text(&payload)
    }
}

/// Concatenated text parts of the first candidate.
pub fn candidate_text(payload: &Value) -> Result<String> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Generation("no response from service".to_string()))?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(Error::Generation("empty response from service".to_string()));
    }
    Ok(text)
}

fn enhance_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "improvedTitle": {
                "type": "STRING",
                "description": "A concise, action-oriented title for the task."
            },
            "improvedDescription": {
                "type": "STRING",
                "description": "A professional, detailed description of the task using agile user story format if applicable."
            },
            "acceptanceCriteria": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of 3-5 clear acceptance criteria."
            },
            "suggestedTags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of 2-4 relevant short tags (e.g., 'Frontend', 'Bug', 'Optimization')."
            },
            "estimatedStoryPoints": {
                "type": "INTEGER",
                "description": "Fibonacci number estimation (1, 2, 3, 5, 8, 13) based on complexity."
            }
        },
        "required": [
            "improvedTitle",
            "improvedDescription",
            "acceptanceCriteria",
            "suggestedTags",
            "estimatedStoryPoints"
        ]
    })
}

fn drafts_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING", "description": "Short, action-oriented task title." },
                "description": { "type": "STRING" },
                "priority": { "type": "STRING", "enum": ["Low", "Medium", "High", "Critical"] },
                "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                "storyPoints": { "type": "INTEGER", "description": "One of 1, 2, 3, 5, 8, 13." }
            },
            "required": ["title"]
        }
    })
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn enhance(&self, title: &str, description: &str) -> Result<Enhancement> {
        let prompt = format!(
            "You are an expert Agile Product Manager. Please analyze the following task draft and enhance it.\n\n\
             Current Title: \"{title}\"\n\
             Current Description: \"{description}\"\n\n\
             Provide a more professional title, a structured description (User Story format), \
             acceptance criteria, relevant tags, and story point estimation."
        );
        let raw = self.generate(prompt, enhance_schema()).await?;
        parse_enhancement(&raw)
    }

    async fn draft_tasks(&self, text: &str) -> Result<Vec<DraftSpec>> {
        let prompt = format!(
            "Split the following notes into individual, actionable tasks. \
             Keep the original order. Give each a short title and, where the notes say more, \
             a description, priority, tags and story points.\n\nNotes:\n{text}"
        );
        let raw = self.generate(prompt, drafts_schema()).await?;
        parse_drafts(&raw)
    }
}
