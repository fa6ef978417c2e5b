use std::fmt;
use std::fs;
use std::io;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PathSettings;
use crate::error::{Error, Result};
use crate::pipeline::CommandRunner;
use crate::registry;

/// Key holding the default flag entries in the flag configuration file.
pub const FLAGS_KEY: &str = "nmap_flags";

/// Where the scan flags come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Flags stored in the flag configuration file
    Defaults,
    /// Flags typed by the user
    Custom,
    /// Flags picked through the interactive helper
    Assisted,
}

impl Mode {
    /// Map a menu answer to a mode.
    pub fn from_choice(choice: &str) -> Result<Self> {
        match choice.trim() {
            "1" => Ok(Mode::Defaults),
            "2" => Ok(Mode::Custom),
            "3" => Ok(Mode::Assisted),
            other => Err(Error::InvalidSelection(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Defaults => write!(f, "defaults"),
            Mode::Custom => write!(f, "custom"),
            Mode::Assisted => write!(f, "assisted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    target: String,
    mode: Mode,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>, mode: Mode) -> Self {
        Self {
            target: target.into(),
            mode,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// A single flag with its optional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagEntry {
    pub flag: String,
    pub value: Option<String>,
}

impl FlagEntry {
    /// Read a `{"flag": ..., "value": ...}` object.
    ///
    /// Non-string values such as port numbers are kept in their JSON text form.
    pub fn from_value(value: &Value) -> std::result::Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected an object, found {}", value))?;

        let flag = match object.get("flag") {
            Some(Value::String(flag)) if !flag.trim().is_empty() => flag.trim().to_string(),
            Some(_) => return Err("'flag' must be a non-empty string".to_string()),
            None => return Err("missing 'flag'".to_string()),
        };

        let value = match object.get("value") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self { flag, value })
    }
}

/// Ordered command-line tokens for the scan binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList(Vec<String>);

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Push the flag, then its value when one is set.
    pub fn push_entry(&mut self, entry: &FlagEntry) {
        self.0.push(entry.flag.clone());
        if let Some(value) = entry.value.as_deref().filter(|v| !v.trim().is_empty()) {
            self.0.push(value.to_string());
        }
    }

    /// Make sure `target` appears exactly once, appending it when absent.
    pub fn place_target(&mut self, target: &str) {
        let mut seen = false;
        self.0.retain(|token| {
            if token != target {
                return true;
            }
            let first = !seen;
            seen = true;
            first
        });
        if !seen {
            self.0.push(target.to_string());
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// Turns a scan request into the argument list handed to the scan binary.
pub struct ArgumentBuilder<'a> {
    paths: &'a PathSettings,
}

impl<'a> ArgumentBuilder<'a> {
    pub fn new(paths: &'a PathSettings) -> Self {
        Self { paths }
    }

    /// Build the arguments for `request`, with the target as the last token.
    pub async fn build<R>(&self, request: &ScanRequest, raw_input: Option<&str>, runner: &R) -> Result<ArgumentList>
    where
        R: CommandRunner + ?Sized,
    {
        let mut args = match request.mode() {
            Mode::Defaults => self.from_defaults()?,
            Mode::Custom => Self::from_custom(raw_input.unwrap_or_default()),
            Mode::Assisted => self.from_assisted(runner).await?,
        };
        args.place_target(request.target());

        debug!(mode = %request.mode(), args = %args, "built scan arguments");
        Ok(args)
    }

    pub fn from_defaults(&self) -> Result<ArgumentList> {
        let config_path = registry::search_file_names(&self.paths.registry_file, &self.paths.config_keys)?;
        let configs = registry::load_config(&config_path)?;

        let flags = configs
            .iter()
            .find_map(|config| config.get(FLAGS_KEY).and_then(Value::as_array))
            .ok_or_else(|| Error::MissingKey {
                key: FLAGS_KEY.to_string(),
            })?;

        let mut args = ArgumentList::new();
        for (index, item) in flags.iter().enumerate() {
            let entry = FlagEntry::from_value(item).map_err(|reason| Error::MalformedEntry { index, reason })?;
            args.push_entry(&entry);
        }
        Ok(args)
    }

    /// Split free-form text on whitespace; token syntax is left to the scan binary.
    pub fn from_custom(raw: &str) -> ArgumentList {
        ArgumentList::from_tokens(raw.split_whitespace())
    }

    async fn from_assisted<R>(&self, runner: &R) -> Result<ArgumentList>
    where
        R: CommandRunner + ?Sized,
    {
        let result_path = &self.paths.assisted_result;
        if let Err(e) = fs::remove_file(result_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %result_path.display(), error = %e, "could not remove stale selection file");
            }
        }

        runner.run_assistant().await?;

        let content = fs::read_to_string(result_path)
            .map_err(|e| Error::AssistedIo(format!("error reading {}: {}", result_path.display(), e)))?;
        let items: Vec<Value> = serde_json::from_str(&content)
            .map_err(|e| Error::AssistedIo(format!("error parsing {}: {}", result_path.display(), e)))?;

        let mut args = ArgumentList::new();
        for (index, item) in items.iter().enumerate() {
            let entry = FlagEntry::from_value(item).map_err(|reason| {
                Error::AssistedIo(format!("entry #{} in {}: {}", index, result_path.display(), reason))
            })?;
            args.push_entry(&entry);
        }
        Ok(args)
    }
}
