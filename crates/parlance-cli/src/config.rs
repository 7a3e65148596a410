//! Configuration read from the environment.

use std::path::PathBuf;

use parlance_conversation::ConversationOptions;

use crate::error::AppError;

/// Runtime configuration for a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the JSON script to replay.
    pub script: PathBuf,
    /// Send the script's `start` automatically when the engine connects,
    /// instead of calling `start` explicitly.
    pub start_on_connect: bool,
    /// Send `resume` automatically when the engine connects.
    pub resume_on_connect: bool,
    /// Watchdog for a single narrative message handler.
    pub task_timeout_ms: Option<u64>,
}

impl Config {
    /// Reads `PARLANCE_SCRIPT`, `PARLANCE_START_ON_CONNECT`,
    /// `PARLANCE_RESUME_ON_CONNECT` and `PARLANCE_TASK_TIMEOUT_MS`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the script path is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the script path is missing or a value
    /// does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let script = lookup("PARLANCE_SCRIPT").ok_or_else(|| {
            AppError::Config("PARLANCE_SCRIPT environment variable must be set".to_owned())
        })?;
        let task_timeout_ms = lookup("PARLANCE_TASK_TIMEOUT_MS")
            .map(|value| {
                value.parse::<u64>().map_err(|e| {
                    AppError::Config(format!("PARLANCE_TASK_TIMEOUT_MS must be a valid u64: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            script: PathBuf::from(script),
            start_on_connect: flag(&lookup, "PARLANCE_START_ON_CONNECT")?,
            resume_on_connect: flag(&lookup, "PARLANCE_RESUME_ON_CONNECT")?,
            task_timeout_ms,
        })
    }

    /// Conversation options derived from this configuration. `start` is the
    /// script's start payload, used only when starting on connect.
    #[must_use]
    pub fn conversation_options(
        &self,
        start: Option<&parlance_core::command::StartEvent>,
    ) -> ConversationOptions {
        ConversationOptions {
            should_resume_on_connect: self.resume_on_connect,
            should_start_on_connect: if self.start_on_connect {
                Some(start.cloned().unwrap_or_default())
            } else {
                None
            },
            task_timeout_ms: self.task_timeout_ms,
            ..ConversationOptions::default()
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool, AppError> {
    match lookup(key).as_deref() {
        None | Some("" | "0" | "false") => Ok(false),
        Some("1" | "true") => Ok(true),
        Some(other) => Err(AppError::Config(format!(
            "{key} must be true or false, got {other:?}"
        ))),
    }
}
