//! Gemini `generateContent` client: task planning and the chat mentor.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::future::Future;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::debug;

use super::{ChatResponder, PlanRequest, RawPlan, TaskPlanner};
use crate::error::IngestError;
use crate::state::AiMode;
use crate::storage::config::IngestConfig;

fn system_prompt(mode: AiMode) -> &'static str {
    match mode {
        AiMode::Soft => "You are a supportive, encouraging life coach. Help the user organize their day with kindness. Offer quiet, restrained advice. If the user is overwhelmed, suggest dropping low-priority tasks.",
        AiMode::Normal => "You are a minimalist personal assistant. Be clear, concise and logical. Focus on one core goal at a time.",
        AiMode::Brutal => "You are a quiet, stoic mentor. No excuses. High standards, low volume. Discipline over motivation.",
    }
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tasks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING", "description": "Id of an existing task when updating it; otherwise omit." },
                        "title": { "type": "STRING" },
                        "duration": { "type": "NUMBER" },
                        "startTime": { "type": "STRING", "description": "HH:MM" },
                        "date": { "type": "STRING", "description": "YYYY-MM-DD" },
                        "category": { "type": "STRING", "enum": ["work", "personal", "health", "growth"] },
                        "difficulty": { "type": "INTEGER" },
                        "isBoss": { "type": "BOOLEAN" },
                        "subTasks": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "title": { "type": "STRING" },
                                    "completed": { "type": "BOOLEAN" }
                                }
                            }
                        }
                    },
                    "required": ["title", "duration", "category", "isBoss", "difficulty"]
                }
            },
            "realityCheck": { "type": "STRING" }
        }
    })
}

fn user_prompt(request: &PlanRequest) -> Result<String, IngestError> {
    let existing = serde_json::to_string(&request.existing)
        .map_err(|e| IngestError::Transport(e.to_string()))?;
    Ok(indoc::formatdoc! {"
        User input: \"{input}\"
        Current energy level: {energy}
        Current time: {now}
        Existing tasks: {existing}

        Turn the input into a clean, minimal list of tasks.
        You may update existing tasks when the user asks to move, reschedule or
        change them; match them by title and return their id.

        Difficulty (1-5) reflects cognitive load:
        1-2: easy or routine
        3: moderate
        4-5: intense, boss task

        If the plan is unrealistic, add a brief realityCheck (at most 10 words).
        Break complex tasks into 3-5 subtasks.
        Categories are strictly 'work', 'personal', 'health' or 'growth'.
        ",
        input = request.input,
        energy = request.energy.as_str(),
        now = request.now.to_rfc3339(),
    })
}

const CHAT_PROMPT: &str = "You are Aura AI, a high-intelligence productivity mentor. Be concise, stoic, and helpful. Use markdown for lists.";

/// Reply used when the model answers with no text.
const EMPTY_REPLY: &str = "Complete.";

fn fresh_runtime() -> Result<Runtime, IngestError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| IngestError::Transport(e.to_string()))
}

/// Drive `fut` to completion from synchronous code, whatever runtime (if
/// any) the caller is on.
fn block_on<F>(fut: F) -> Result<F::Output, IngestError>
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
        }
        // A current-thread runtime cannot block in place; run the request
        // on a helper thread with a runtime of its own.
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(move || fresh_runtime().map(|rt| rt.block_on(fut)))
                .join()
                .unwrap_or_else(|_| Err(IngestError::Transport("request thread panicked".into())))
        }),
        Err(_) => fresh_runtime().map(|rt| rt.block_on(fut)),
    }
}

/// Planner and chat mentor backed by the Gemini REST API. No retries.
#[derive(Debug, Clone)]
pub struct GeminiPlanner {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiPlanner {
    pub fn new(config: &IngestConfig, api_key: Option<String>) -> Self {
        // Sync calls may each run on a different runtime, so idle
        // connections must not be pooled across them.
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn key(&self) -> Result<&str, IngestError> {
        self.api_key.as_deref().ok_or(IngestError::MissingKey)
    }

    /// POST `body` and return the first candidate's text, if any.
    async fn generate(&self, body: &Value) -> Result<Option<String>, IngestError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.key()?)
            .json(body)
            .send()
            .await
            .map_err(|e| IngestError::Transport(e.to_string()))?;

        let status = resp.status();
        debug!(status = status.as_u16(), model = %self.model, "gemini responded");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(IngestError::AuthInvalid),
            StatusCode::TOO_MANY_REQUESTS => return Err(IngestError::RateLimited),
            s if !s.is_success() => {
                let message = resp.text().await.unwrap_or_default();
                return Err(IngestError::Remote {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let envelope: Value = resp
            .json()
            .await
            .map_err(|e| IngestError::MalformedPayload(e.to_string()))?;
        Ok(envelope
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Async form of [`TaskPlanner::plan`] for callers that own a runtime.
    pub async fn plan_async(&self, request: &PlanRequest) -> Result<RawPlan, IngestError> {
        self.key()?;
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system_prompt(request.mode) }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_prompt(request)? }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });
        let text = self
            .generate(&body)
            .await?
            .ok_or_else(|| IngestError::MalformedPayload("response has no candidate text".into()))?;
        serde_json::from_str(&text).map_err(|e| IngestError::MalformedPayload(e.to_string()))
    }

    /// Async form of [`ChatResponder::reply`].
    pub async fn reply_async(&self, message: &str) -> Result<String, IngestError> {
        self.key()?;
        let body = json!({
            "systemInstruction": { "parts": [{ "text": CHAT_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": message }] }],
        });
        let text = self.generate(&body).await?.unwrap_or_default();
        if text.trim().is_empty() {
            Ok(EMPTY_REPLY.to_string())
        } else {
            Ok(text)
        }
    }
}

impl TaskPlanner for GeminiPlanner {
    fn plan(&self, request: &PlanRequest) -> Result<RawPlan, IngestError> {
        self.key()?;
        block_on(self.plan_async(request))?
    }
}

impl ChatResponder for GeminiPlanner {
    fn reply(&self, message: &str) -> Result<String, IngestError> {
        self.key()?;
        block_on(self.reply_async(message))?
    }
}
