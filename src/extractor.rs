use std::{env, time::Duration};

use itertools::Itertools;
use log::{debug, trace};
use reqwest::header;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{schema::Field, settings::Settings};

/// One page to fetch and extract.
#[derive(Clone, Copy, Debug, TypedBuilder)]
pub struct ExtractRequest<'a> {
    pub url: &'a str,
    pub css_selector: &'a str,
    pub session_id: &'a str,
}

/// Fetches a page and turns the selected part of it into a JSON payload.
///
/// `Ok(None)` and `Ok(Some(""))` both mean the page produced no content.
#[allow(async_fn_in_trait)]
pub trait Extractor {
    async fn extract(&self, request: &ExtractRequest<'_>) -> Result<Option<String>, ExtractError>;
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid CSS selector {0:?}")]
    InvalidSelector(String),
    #[error("Language model request failed: {0}")]
    Llm(String),
}

#[derive(Debug, Error)]
pub enum ExtractorConfigError {
    #[error("{0} environment variable is required")]
    MissingApiKey(String),
    #[error("Unsupported provider {0:?} (expected \"openai/<model>\")")]
    UnsupportedProvider(String),
    #[error("Invalid language model endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("Failed to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub const EXTRACTION_INSTRUCTIONS: &str = "\
You are given the text of a single course page from the UNSW Handbook. \
Extract the fields described by the JSON schema below and return them as JSON. \
Respond with a JSON object matching the schema exactly. \
Use null for missing data. Avoid commentary.";

/// JSON schema of the object the model is asked to return.
pub fn course_json_schema() -> Value {
    let properties = Field::all()
        .map(|field| {
            (
                field.name().to_owned(),
                json!({ "type": ["string", "null"], "description": field.description() }),
            )
        })
        .collect::<serde_json::Map<_, _>>();
    json!({
        "title": "CourseRecord",
        "type": "object",
        "properties": properties,
        "required": Field::all().map(Field::name).collect_vec(),
    })
}

/// Fetches pages over HTTP and asks an OpenAI-compatible chat model to extract the fields.
///
/// A single client with a cookie store is shared by every request of a run.
pub struct LlmExtractor {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: String,
    system_prompt: String,
}

impl LlmExtractor {
    /// Checks the credential and provider without touching the network.
    pub fn new(settings: &Settings) -> Result<Self, ExtractorConfigError> {
        let api_key_env = &settings.llm.api_key_env;
        let api_key = env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ExtractorConfigError::MissingApiKey(api_key_env.clone()))?;
        let model = match settings.llm.provider.split_once('/') {
            Some(("openai", model)) if !model.is_empty() => model.to_owned(),
            _ => {
                return Err(ExtractorConfigError::UnsupportedProvider(
                    settings.llm.provider.clone(),
                ))
            }
        };
        let endpoint = Url::parse(&format!(
            "{}/chat/completions",
            settings.llm.base_url.as_str().trim_end_matches('/')
        ))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(&settings.crawler.user_agent)
            .timeout(Duration::from_secs(settings.crawler.timeout_seconds))
            .build()?;
        let system_prompt = format!("{EXTRACTION_INSTRUCTIONS}\n\n{}", course_json_schema());
        Ok(Self {
            client,
            endpoint,
            model,
            api_key,
            system_prompt,
        })
    }

    async fn fetch_selected_text(&self, url: Url, css_selector: &str) -> Result<String, ExtractError> {
        let selector = Selector::parse(css_selector)
            .map_err(|_| ExtractError::InvalidSelector(css_selector.to_owned()))?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let document = Html::parse_document(&body);
        Ok(document
            .select(&selector)
            .map(|element| element.text().flat_map(str::split_whitespace).join(" "))
            .filter(|text| !text.is_empty())
            .join("\n"))
    }

    async fn complete(
        &self,
        request: &ExtractRequest<'_>,
        page_text: &str,
    ) -> Result<Option<String>, ExtractError> {
        let user_content = format!("URL: {}\n\n{page_text}", request.url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
            response_format: json!({ "type": "json_object" }),
            temperature: 0.,
            user: request.session_id,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Llm(format!("server returned {status}: {text}")));
        }
        let response: ChatResponse = response.json().await?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

impl Extractor for LlmExtractor {
    async fn extract(&self, request: &ExtractRequest<'_>) -> Result<Option<String>, ExtractError> {
        let url = Url::parse(request.url)?;
        trace!("Session {}: fetching {url}", request.session_id);
        let page_text = self.fetch_selected_text(url, request.css_selector).await?;
        if page_text.is_empty() {
            debug!(
                "Selector {:?} matched no text on {}",
                request.css_selector, request.url
            );
            return Ok(None);
        }
        self.complete(request, &page_text).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: Value,
    temperature: f32,
    user: &'a str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
