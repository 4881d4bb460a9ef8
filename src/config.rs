// =============================================================================
// config.rs - THE CONTROL PANEL
// =============================================================================
//
// One positional argument (where to write the JSON) and a handful of
// environment variables (everything else). Nothing here is mandatory: run the
// binary bare and it crawls the English cardlist from TSK/S70-E001 into
// `data.json` and `images/`.
//
// Every variable is prefixed with WS_CRAWLER_. A `.env` file is read first if
// one is lying around.
//
// Numbers and booleans that don't parse quietly fall back to their defaults.
// Things that would send the crawler somewhere nonsensical (a bad URL, an
// unknown variant) are refused outright.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::models::{PageId, Variant};
use crate::walker::{ImageFailurePolicy, PageFailurePolicy, WalkPolicy};

const PREFIX: &str = "WS_CRAWLER_";

pub const DEFAULT_BASE_URL: &str = "https://en.ws-tcg.com/cardlist/list/";
pub const DEFAULT_FIRST_CARD: &str = ".?cardno=TSK/S70-E001";
pub const DEFAULT_OUTPUT_BASE: &str = "data";
pub const DEFAULT_USER_AGENT: &str =
    "WsCardlistCrawler/0.1 (one request at a time, we promise)";

/// How log lines come out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Relative page identifiers and image paths resolve against this.
    pub base_url: Url,

    /// Where the walk begins.
    pub first_page: PageId,

    /// The document lands at `<output_base>.json`.
    pub output_base: String,

    /// One file per card image, named after the source file.
    pub image_dir: PathBuf,

    /// Base or extended extraction.
    pub variant: Variant,

    pub request_timeout: Duration,
    pub user_agent: String,

    pub on_page_error: PageFailurePolicy,
    pub on_image_error: ImageFailurePolicy,

    /// Unbounded unless set.
    pub max_pages: Option<usize>,

    /// Any extraction gap aborts the run.
    pub strict_extraction: bool,

    /// On abort, write what we have to `<output_base>.partial.json`.
    pub checkpoint_on_abort: bool,

    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process: `.env` if present, then the environment, with
    /// `args` being the command-line arguments after the program name.
    ///
    /// Logging is configured from the result too (`log_format`), so this runs
    /// before the subscriber exists and can't log anything itself.
    pub fn from_env(args: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        // No .env is fine. Most runs won't have one.
        let _ = dotenvy::dotenv();
        Self::from_process(args)
    }

    /// `from_env` with an explicit `.env` location.
    #[cfg(test)]
    pub fn from_env_file(
        path: &std::path::Path,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, ConfigError> {
        let _ = dotenvy::from_path(path);
        Self::from_process(args)
    }

    fn from_process(args: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        Self::from_lookup(args, |key| env::var(key).ok())
    }

    /// Same as `from_env`, but with the variable source handed in.
    pub fn from_lookup<F>(
        args: impl IntoIterator<Item = String>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let output_base = args
            .into_iter()
            .next()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_BASE.to_string());

        let base_raw = vars.or_default("BASE_URL", DEFAULT_BASE_URL);
        let base_url = Url::parse(base_raw.trim()).map_err(|source| ConfigError::InvalidUrl {
            key: "WS_CRAWLER_BASE_URL",
            value: base_raw.clone(),
            source,
        })?;

        let variant = match vars.or_default("VARIANT", "base").trim().to_ascii_lowercase().as_str() {
            "base" => Variant::Base,
            "extended" => {
                let storage_prefix = vars
                    .get("STORAGE_PREFIX")
                    .filter(|p| !p.trim().is_empty())
                    .ok_or(ConfigError::MissingStoragePrefix("WS_CRAWLER_STORAGE_PREFIX"))?;
                Variant::Extended { storage_prefix }
            }
            other => {
                return Err(ConfigError::InvalidChoice {
                    key: "WS_CRAWLER_VARIANT",
                    value: other.to_string(),
                    expected: "base, extended",
                });
            }
        };

        let on_page_error = match vars.or_default("ON_PAGE_ERROR", "abort").trim().to_ascii_lowercase().as_str() {
            "abort" => PageFailurePolicy::Abort,
            "stop" => PageFailurePolicy::Stop,
            other => {
                return Err(ConfigError::InvalidChoice {
                    key: "WS_CRAWLER_ON_PAGE_ERROR",
                    value: other.to_string(),
                    expected: "abort, stop",
                });
            }
        };

        let on_image_error = match vars.or_default("ON_IMAGE_ERROR", "abort").trim().to_ascii_lowercase().as_str() {
            "abort" => ImageFailurePolicy::Abort,
            "skip" => ImageFailurePolicy::Skip,
            other => {
                return Err(ConfigError::InvalidChoice {
                    key: "WS_CRAWLER_ON_IMAGE_ERROR",
                    value: other.to_string(),
                    expected: "abort, skip",
                });
            }
        };

        let log_format = match vars.get("LOG_FORMAT") {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Config {
            base_url,
            first_page: PageId::new(vars.or_default("FIRST_CARD", DEFAULT_FIRST_CARD).trim()),
            output_base,
            image_dir: PathBuf::from(vars.or_default("IMAGE_DIR", "images")),
            variant,
            request_timeout: Duration::from_secs(
                vars.or_default("REQUEST_TIMEOUT_SECS", "30").trim().parse().unwrap_or(30),
            ),
            user_agent: vars.or_default("USER_AGENT", DEFAULT_USER_AGENT),
            on_page_error,
            on_image_error,
            max_pages: vars.get("MAX_PAGES").and_then(|v| v.trim().parse().ok()),
            strict_extraction: vars.flag("STRICT_EXTRACTION", false),
            checkpoint_on_abort: vars.flag("CHECKPOINT_ON_ABORT", true),
            log_format,
        })
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.json", self.output_base))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.partial.json", self.output_base))
    }

    pub fn walk_policy(&self) -> WalkPolicy {
        WalkPolicy {
            on_page_error: self.on_page_error,
            on_image_error: self.on_image_error,
            max_pages: self.max_pages,
            strict_extraction: self.strict_extraction,
        }
    }
}

/// Prefixed variable access over whatever lookup we were given.
struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{PREFIX}{key}"))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// true/false, yes/no, 1/0, on/off. Anything else is the default.
    fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
            _ => default,
        }
    }
}
