use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::schema::{Placeholder, StudyLevel, Year};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub handbook: HandbookSettings,
    pub crawler: CrawlSettings,
    pub llm: LlmSettings,
    /// Caps the number of course codes processed.
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HandbookSettings {
    pub input_file: Option<PathBuf>,
    pub output_file: PathBuf,
    pub base_url_template: String,
    pub level: StudyLevel,
    pub year: Year,
    pub css_selector: String,
}
impl Default for HandbookSettings {
    fn default() -> Self {
        Self {
            input_file: None,
            output_file: "data/output/courses.csv".into(),
            base_url_template: "https://www.handbook.unsw.edu.au/{level}/courses/{year}/{code}"
                .to_owned(),
            level: StudyLevel::Undergraduate,
            year: Year::new_static::<2025>(),
            css_selector: "main".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub browser: String,
    pub headless: bool,
    pub verbose: bool,
    pub delay_seconds: f64,
    pub session_prefix: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            browser: "chromium".to_owned(),
            headless: true,
            verbose: false,
            delay_seconds: 0.5,
            session_prefix: "unsw_handbook".to_owned(),
            timeout_seconds: 60,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}
impl CrawlSettings {
    /// Fails on negative, non-finite or out-of-range values.
    pub fn delay(&self) -> Result<Duration, SettingsLoadError> {
        Duration::try_from_secs_f64(self.delay_seconds).map_err(|e| {
            SettingsLoadError::Invalid(format!(
                "crawler.delay_seconds must be a non-negative number of seconds: {e}"
            ))
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub placeholder: Placeholder,
    pub base_url: Url,
    /// Name of the environment variable holding the API credential.
    pub api_key_env: String,
}
impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai/gpt-4o-mini".to_owned(),
            placeholder: Placeholder::default(),
            base_url: Url::parse("https://api.openai.com/v1").unwrap(),
            api_key_env: "OPENAI_API_KEY".to_owned(),
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct SettingsOverrides {
    /// Limit the number of courses to scrape
    #[arg(long)]
    pub limit: Option<usize>,
    /// Override the handbook year from settings
    #[arg(long)]
    pub year: Option<Year>,
    /// Override the study level
    #[arg(long, value_enum)]
    pub level: Option<StudyLevel>,
    /// Override the output CSV path
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Override the course list JSON path
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("Settings file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("An I/O error occurred when loading the settings: {0:?}")]
    Io(io::Error),
    #[error("The settings file could not be parsed: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsLoadError> {
        let path = path.as_ref();
        let text = fs_err::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SettingsLoadError::NotFound(path.to_owned()),
            _ => SettingsLoadError::Io(e),
        })?;
        Ok(toml::from_str(&text)?)
    }

    pub fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        let handbook = &mut self.handbook;
        if let Some(year) = overrides.year {
            handbook.year = year;
        }
        if let Some(level) = overrides.level {
            handbook.level = level;
        }
        if let Some(output) = &overrides.output {
            handbook.output_file = output.clone();
        }
        if let Some(input) = &overrides.input {
            handbook.input_file = Some(input.clone());
        }
        if let Some(limit) = overrides.limit {
            self.limit = Some(limit);
        }
    }

    pub fn validate(&self) -> Result<(), SettingsLoadError> {
        let invalid = |message: &str| Err(SettingsLoadError::Invalid(message.to_owned()));
        if self.handbook.input_file.is_none() {
            return invalid("handbook.input_file is not set (use --input or the settings file)");
        }
        if self.handbook.css_selector.trim().is_empty() {
            return invalid("handbook.css_selector must not be empty");
        }
        self.crawler.delay()?;
        if self.llm.placeholder.is_blank() {
            return invalid("llm.placeholder must not be blank");
        }
        Ok(())
    }

    /// The course list path; present once [`Settings::validate`] has passed.
    pub fn input_file(&self) -> Result<&Path, SettingsLoadError> {
        self.handbook
            .input_file
            .as_deref()
            .ok_or_else(|| SettingsLoadError::Invalid("handbook.input_file is not set".to_owned()))
    }
}
