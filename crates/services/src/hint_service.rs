use std::env;
use std::time::Duration;

use reqwest::Client;
use sensei_core::model::{HintSettings, HintSettingsDraft, SettingsError, TopicId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HintError;

/// Upper bound on a generated hint before the fixed text is used instead.
pub const HINT_TIMEOUT: Duration = Duration::from_secs(2);

/// Returned for topics without a fixed hint.
pub const GENERIC_HINT: &str = "No specific hint available.";

const FALLBACK_HINTS: [(&str, &str); 8] = [
    (
        "variables_types",
        "Variables are like labeled boxes where you store different types of information. Think of them as containers that can hold numbers, text, or other data. Each container has a unique name so you can easily find and use what's inside.",
    ),
    (
        "arrays_objects",
        "Arrays are like lists of items, and objects are like labeled containers with multiple compartments. Imagine an array as a train with many cars, and an object as a toolbox with labeled drawers.",
    ),
    (
        "loops_conditionals",
        "Loops help you repeat actions, like a robot following steps over and over. Conditionals are decision points, like traffic lights, that choose which path the code takes based on a condition.",
    ),
    (
        "functions",
        "Functions are like special recipes that do a specific job. You can create a function that takes ingredients (inputs), follows a set of steps, and serves up a result (output).",
    ),
    (
        "methods_core",
        "Methods are like built-in superpowers for arrays and objects. They help you transform, filter, and play with your data in cool ways.",
    ),
    (
        "async_await",
        "Async/await is like ordering food at a restaurant. You place an order (async function) and wait for it to arrive without stopping everything else.",
    ),
    (
        "apis_event_loop",
        "The event loop is like a busy traffic controller, managing when and how different tasks get processed in JavaScript.",
    ),
    (
        "intro_js",
        "JavaScript is the magic language that makes websites interactive, like adding special effects to a comic book.",
    ),
];

/// Fixed, offline hint for `topic`.
#[must_use]
pub fn fallback_hint(topic: &TopicId) -> &'static str {
    FALLBACK_HINTS
        .iter()
        .find(|(id, _)| *id == topic.as_str())
        .map_or(GENERIC_HINT, |(_, hint)| *hint)
}

/// What the learner is stuck on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HintRequest {
    pub topic: TopicId,
    pub prompt: String,
    /// Index of the choice the learner picked, if they answered wrongly.
    pub wrong_choice: Option<usize>,
}

impl HintRequest {
    #[must_use]
    pub fn new(topic: TopicId, prompt: impl Into<String>) -> Self {
        Self {
            topic,
            prompt: prompt.into(),
            wrong_choice: None,
        }
    }

    #[must_use]
    pub fn with_wrong_choice(mut self, choice: usize) -> Self {
        self.wrong_choice = Some(choice);
        self
    }

    fn tutor_prompt(&self) -> String {
        let chose = self
            .wrong_choice
            .map(|choice| format!(" They chose option {choice}."))
            .unwrap_or_default();
        format!(
            "You are a friendly JS tutor. Topic: {}. Style: kid-friendly. Level: beginner. \
             Question: {}{chose}. Respond in 2-5 short sentences with kid-speak analogies \
             and no code unless necessary.",
            self.topic, self.prompt
        )
    }
}

/// Read hint settings from `SENSEI_HINT_API_KEY`, `SENSEI_HINT_BASE_URL` and `SENSEI_HINT_MODEL`.
///
/// # Errors
///
/// Returns `SettingsError` if a base URL is set but invalid.
pub fn hint_settings_from_env() -> Result<Option<HintSettings>, SettingsError> {
    HintSettingsDraft {
        api_key: env::var("SENSEI_HINT_API_KEY").ok(),
        model: env::var("SENSEI_HINT_MODEL").ok(),
        base_url: env::var("SENSEI_HINT_BASE_URL").ok(),
    }
    .validate()
}

/// Short tutoring hints from a chat-completions endpoint, with fixed fallbacks.
#[derive(Clone)]
pub struct HintService {
    client: Client,
    settings: Option<HintSettings>,
    timeout: Duration,
}

impl HintService {
    #[must_use]
    pub fn new(settings: Option<HintSettings>) -> Self {
        Self {
            client: Client::new(),
            settings,
            timeout: HINT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.settings.is_some()
    }

    /// A hint for `request`; never fails.
    ///
    /// Falls back to the topic's fixed hint when generation is disabled,
    /// errors, returns nothing, or exceeds the timeout.
    pub async fn hint(&self, request: &HintRequest) -> String {
        if !self.enabled() {
            return fallback_hint(&request.topic).to_owned();
        }

        let generated = match tokio::time::timeout(self.timeout, self.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(HintError::Timeout),
        };
        match generated {
            Ok(hint) => hint,
            Err(err) => {
                warn!(topic = %request.topic, error = %err, "hint generation failed, using fallback");
                fallback_hint(&request.topic).to_owned()
            }
        }
    }

    /// Ask the configured model for a hint.
    ///
    /// # Errors
    ///
    /// Returns `HintError` when the service is disabled, the request fails,
    /// or the response is empty.
    pub async fn generate(&self, request: &HintRequest) -> Result<String, HintError> {
        let settings = self.settings.as_ref().ok_or(HintError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            settings.base_url().trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: settings.model().to_owned(),
            messages: vec![ChatMessage {
                role: "user",
                content: request.tutor_prompt(),
            }],
            temperature: 0.2,
        };

        debug!(topic = %request.topic, model = settings.model(), "requesting hint");
        let response = self
            .client
            .post(url)
            .bearer_auth(settings.api_key())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HintError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(HintError::EmptyResponse)?;

        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
