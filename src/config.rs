//! Run configuration: per-source profiles and environment credentials.
//!
//! A [`SourceProfile`] says where to look and how to read a site; it comes
//! from the built-in registry in [`crate::scrapers::sources`] or from a YAML
//! file passed with `--sources`. [`Settings`] holds the credentials the chosen
//! profile needs and is read once from the environment (after loading the
//! `.env` settings file). Both are built before any network activity and
//! passed down by reference.

use crate::error::{Error, Result};
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_X_API_BASE_URL: &str = "https://api.twitter.com";

/// How the Locator turns the listing page into candidate URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateMode {
    /// First matching link only. No match is an error.
    #[default]
    Latest,
    /// Every matching link, de-duplicated in page order. No match yields
    /// an empty list.
    Archive,
    /// The listing URL itself is the only candidate; nothing is fetched.
    Direct,
}

/// Selectors used to pull fields out of an article page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// When set, each matching element is one article and the other
    /// selectors are evaluated inside it.
    #[serde(default)]
    pub block_selector: Option<String>,
    #[serde(default)]
    pub title_selector: Option<String>,
    #[serde(default)]
    pub date_selector: Option<String>,
    /// Every match contributes one stripped line of body text.
    pub body_selector: String,
    /// Skip articles whose body came out empty instead of publishing them.
    #[serde(default)]
    pub require_body: bool,
}

/// What to do when a generative or summarisation call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Substitute labelled placeholder text and keep going.
    #[default]
    Placeholder,
    /// Drop the article.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryBackend {
    /// In-process extractive summariser.
    #[default]
    Local,
    /// Ask the generative service for a summary.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeOptions {
    pub backend: SummaryBackend,
    pub min_chars: usize,
    pub max_chars: usize,
    /// Input beyond this many characters is cut before summarising.
    pub max_input_chars: usize,
    pub on_failure: FailurePolicy,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            backend: SummaryBackend::Local,
            min_chars: 40,
            max_chars: 150,
            max_input_chars: 8000,
            on_failure: FailurePolicy::Placeholder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Output language, named in the prompt.
    pub language: String,
    pub audience: String,
    pub tone: String,
    /// Extra lines appended to the prompt's requirement list.
    pub instructions: Vec<String>,
    /// Body text beyond this many characters is cut before prompting.
    pub max_input_chars: usize,
    /// Regexes whose matches are removed from the response before parsing.
    pub boilerplate_patterns: Vec<String>,
    /// Put the source URL in the prompt for attribution.
    pub include_source_url: bool,
    pub on_failure: FailurePolicy,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            language: "Japanese".to_string(),
            audience: "readers who are new to crypto assets".to_string(),
            tone: "polite and easy to follow".to_string(),
            instructions: Vec::new(),
            max_input_chars: 8000,
            boilerplate_patterns: vec![r"(?s)BOBGについて.*?https?://\S+".to_string()],
            include_source_url: false,
            on_failure: FailurePolicy::Placeholder,
        }
    }
}

/// Transformer policy for a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformPolicy {
    /// Publish the extracted text as-is.
    #[default]
    None,
    Summarize(SummarizeOptions),
    Rewrite(RewriteOptions),
}

impl TransformPolicy {
    /// Whether this policy calls the generative service (and so needs its key).
    pub fn needs_generative_service(&self) -> bool {
        match self {
            TransformPolicy::None => false,
            TransformPolicy::Summarize(o) => o.backend == SummaryBackend::Remote,
            TransformPolicy::Rewrite(_) => true,
        }
    }
}

/// Destination a source publishes to. Credentials come from [`Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherTarget {
    WordpressXmlrpc,
    WordpressRest,
    X,
}

/// Rendering knobs for the published post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentOptions {
    /// Append a link back to the source page with this label.
    pub source_link_label: Option<String>,
    /// Append the summary block when a summary exists.
    pub include_summary: bool,
    pub summary_label: String,
    /// Character limit for social posts.
    pub social_max_chars: usize,
    /// Post status sent to blog destinations.
    pub post_status: String,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            source_link_label: None,
            include_summary: true,
            summary_label: "Summary:".to_string(),
            social_max_chars: 280,
            post_status: "publish".to_string(),
        }
    }
}

/// Everything needed to run the pipeline against one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub listing_url: Url,
    #[serde(default)]
    pub mode: LocateMode,
    /// Selector for `a[href]`-bearing elements on the listing page. Unused
    /// in [`LocateMode::Direct`].
    #[serde(default)]
    pub link_selector: String,
    pub extraction: ExtractionRule,
    #[serde(default)]
    pub transform: TransformPolicy,
    pub publisher: PublisherTarget,
    #[serde(default)]
    pub content: ContentOptions,
}

impl SourceProfile {
    /// Check every selector and pattern so bad configuration fails before
    /// the first request.
    pub fn validate(&self) -> Result<()> {
        let check = |what: &str, sel: &str| -> Result<()> {
            Selector::parse(sel).map(|_| ()).map_err(|e| {
                Error::Config(format!("source `{}`: invalid {what} `{sel}`: {e}", self.id))
            })
        };

        if self.mode != LocateMode::Direct {
            if self.link_selector.trim().is_empty() {
                return Err(Error::Config(format!(
                    "source `{}`: link_selector is required unless mode is `direct`",
                    self.id
                )));
            }
            check("link_selector", &self.link_selector)?;
        }
        let rule = &self.extraction;
        if let Some(s) = &rule.block_selector {
            check("block_selector", s)?;
        }
        if let Some(s) = &rule.title_selector {
            check("title_selector", s)?;
        }
        if let Some(s) = &rule.date_selector {
            check("date_selector", s)?;
        }
        check("body_selector", &rule.body_selector)?;

        match &self.transform {
            TransformPolicy::Rewrite(o) => {
                for p in &o.boilerplate_patterns {
                    Regex::new(p).map_err(|e| {
                        Error::Config(format!("source `{}`: invalid boilerplate pattern: {e}", self.id))
                    })?;
                }
            }
            TransformPolicy::Summarize(o) if o.min_chars > o.max_chars => {
                return Err(Error::Config(format!(
                    "source `{}`: summary min_chars ({}) exceeds max_chars ({})",
                    self.id, o.min_chars, o.max_chars
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Source profiles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    profiles: Vec<SourceProfile>,
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    sources: Vec<SourceProfile>,
}

impl SourceRegistry {
    /// Registry holding `profiles` in the given order.
    pub fn new(profiles: Vec<SourceProfile>) -> Self {
        Self { profiles }
    }

    /// Merge profiles from a YAML document. A profile whose id already
    /// exists replaces it.
    pub fn merge_yaml(&mut self, yaml: &str) -> Result<usize> {
        let file: SourcesFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("could not parse sources file: {e}")))?;
        let count = file.sources.len();
        for profile in file.sources {
            profile.validate()?;
            match self.profiles.iter_mut().find(|p| p.id == profile.id) {
                Some(existing) => {
                    debug!(id = %profile.id, "Replacing built-in source profile");
                    *existing = profile;
                }
                None => self.profiles.push(profile),
            }
        }
        Ok(count)
    }

    /// Read `path` and merge it with [`merge_yaml`](Self::merge_yaml).
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the file cannot be read or a profile in it is
    /// invalid.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn merge_file(&mut self, path: &Path) -> Result<usize> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("could not read sources file {}: {e}", path.display()))
        })?;
        let count = self.merge_yaml(&yaml)?;
        info!(count, "Loaded source profiles");
        Ok(count)
    }

    /// Look up a profile by id.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] naming every known id when `id` is not registered.
    pub fn get(&self, id: &str) -> Result<&SourceProfile> {
        self.profiles.iter().find(|p| p.id == id).ok_or_else(|| {
            Error::Config(format!(
                "unknown source `{id}` (known: {})",
                self.ids().join(", ")
            ))
        })
    }

    /// Profile ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn profiles(&self) -> &[SourceProfile] {
        &self.profiles
    }
}

/// XML-RPC blog endpoint credentials.
#[derive(Debug, Clone)]
pub struct XmlRpcCredentials {
    /// Full endpoint URL, e.g. `https://blog.example/xmlrpc.php`.
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

/// REST blog credentials. Posts go to `{base_url}/wp-json/wp/v2/posts`.
#[derive(Debug, Clone)]
pub struct RestCredentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// OAuth 1.0a user-context credentials for the social network.
#[derive(Debug, Clone)]
pub struct XCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub enum PublisherCredentials {
    WordpressXmlrpc(XmlRpcCredentials),
    WordpressRest(RestCredentials),
    X(XCredentials),
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Credentials resolved for one profile.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` in dry-run mode.
    pub publisher: Option<PublisherCredentials>,
    /// `None` when the transformer does not call the generative service.
    pub gemini: Option<GeminiSettings>,
}

impl Settings {
    /// Load the `.env` settings file (when present) and resolve credentials
    /// from the process environment.
    pub fn from_env(profile: &SourceProfile, dry_run: bool, env_file: Option<&Path>) -> Result<Self> {
        let loaded = match env_file {
            Some(path) => dotenvy::from_path(path).map(|_| path.display().to_string()),
            None => dotenvy::dotenv().map(|p| p.display().to_string()),
        };
        match loaded {
            Ok(path) => info!(%path, "Loaded settings file"),
            Err(e) if env_file.is_some() => {
                return Err(Error::Config(format!("could not load settings file: {e}")));
            }
            Err(_) => debug!("No .env settings file found; using process environment"),
        }
        Self::resolve(profile, dry_run, |key| std::env::var(key).ok())
    }

    /// Resolve credentials through `lookup`. Only what the profile needs is
    /// required; a missing or blank variable is a [`Error::Config`] naming it.
    pub fn resolve<F>(profile: &SourceProfile, dry_run: bool, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("required environment variable {key} is not set")))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let gemini = if profile.transform.needs_generative_service() {
            Some(GeminiSettings {
                api_key: required("GEMINI_API_KEY")?,
                model: optional("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: optional("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            })
        } else {
            None
        };

        let publisher = if dry_run {
            None
        } else {
            Some(match profile.publisher {
                PublisherTarget::WordpressXmlrpc => {
                    PublisherCredentials::WordpressXmlrpc(XmlRpcCredentials {
                        endpoint: required("WP_URL")?,
                        username: required("WP_USERNAME")?,
                        password: required("WP_PASSWORD")?,
                    })
                }
                PublisherTarget::WordpressRest => PublisherCredentials::WordpressRest(RestCredentials {
                    base_url: required("WP_API_URL")?,
                    username: required("WP_USERNAME")?,
                    password: required("WP_PASSWORD")?,
                }),
                PublisherTarget::X => PublisherCredentials::X(XCredentials {
                    api_key: required("X_API_KEY")?,
                    api_secret: required("X_API_SECRET")?,
                    access_token: required("X_ACCESS_TOKEN")?,
                    access_secret: required("X_ACCESS_SECRET")?,
                    base_url: optional("X_API_BASE_URL", DEFAULT_X_API_BASE_URL),
                }),
            })
        };

        Ok(Self { publisher, gemini })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::sources;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn test_builtin_profiles_validate() {
        for profile in sources::builtin().profiles() {
            profile.validate().unwrap();
        }
    }

    #[test]
    fn test_missing_credential_is_named_config_error() {
        let registry = sources::builtin();
        let profile = registry.get("coinpost").unwrap();
        let lookup = lookup_from(&[
            ("GEMINI_API_KEY", "key"),
            ("WP_URL", "http://blog.local/xmlrpc.php"),
            ("WP_USERNAME", "root"),
        ]);
        let err = Settings::resolve(profile, false, lookup).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("WP_PASSWORD"));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let registry = sources::builtin();
        let profile = registry.get("coinpost").unwrap();
        let lookup = lookup_from(&[("GEMINI_API_KEY", "   ")]);
        let err = Settings::resolve(profile, true, lookup).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_dry_run_skips_publisher_credentials() {
        let registry = sources::builtin();
        let profile = registry.get("coinpost").unwrap();
        let settings = Settings::resolve(profile, true, lookup_from(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert!(settings.publisher.is_none());
        let gemini = settings.gemini.unwrap();
        assert_eq!(gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(gemini.base_url, DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn test_x_credentials_resolve() {
        let registry = sources::builtin();
        let profile = registry.get("bittimes").unwrap();
        let lookup = lookup_from(&[
            ("X_API_KEY", "a"),
            ("X_API_SECRET", "b"),
            ("X_ACCESS_TOKEN", "c"),
            ("X_ACCESS_SECRET", "d"),
        ]);
        let settings = Settings::resolve(profile, false, lookup).unwrap();
        assert!(settings.gemini.is_none());
        match settings.publisher {
            Some(PublisherCredentials::X(x)) => {
                assert_eq!(x.access_secret, "d");
                assert_eq!(x.base_url, DEFAULT_X_API_BASE_URL);
            }
            other => panic!("unexpected publisher: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_source_lists_known_ids() {
        let registry = sources::builtin();
        let err = registry.get("nope").unwrap_err();
        assert!(err.to_string().contains("coinpost"));
    }

    #[test]
    fn test_merge_yaml_adds_and_replaces() {
        let mut registry = sources::builtin();
        let yaml = r#"
sources:
  - id: coinpost
    listing_url: https://coinpost.example/
    link_selector: "a.latest"
    extraction:
      title_selector: "h1"
      body_selector: "p"
    transform:
      kind: none
    publisher: wordpress_rest
  - id: custom
    listing_url: https://news.example/archive
    mode: archive
    link_selector: "ul.posts a"
    extraction:
      body_selector: "article p"
      require_body: true
    transform:
      kind: summarize
      backend: local
      max_chars: 200
    publisher: x
"#;
        let count = registry.merge_yaml(yaml).unwrap();
        assert_eq!(count, 2);

        let coinpost = registry.get("coinpost").unwrap();
        assert_eq!(coinpost.publisher, PublisherTarget::WordpressRest);
        assert_eq!(coinpost.transform, TransformPolicy::None);

        let custom = registry.get("custom").unwrap();
        assert_eq!(custom.mode, LocateMode::Archive);
        assert!(custom.extraction.require_body);
        match &custom.transform {
            TransformPolicy::Summarize(o) => {
                assert_eq!(o.max_chars, 200);
                assert_eq!(o.min_chars, 40);
            }
            other => panic!("unexpected transform: {other:?}"),
        }
        assert_eq!(custom.content.social_max_chars, 280);
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let mut registry = SourceRegistry::default();
        let yaml = r#"
sources:
  - id: broken
    listing_url: https://news.example/
    link_selector: "a[["
    extraction:
      body_selector: "p"
    publisher: x
"#;
        let err = registry.merge_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("link_selector"));
    }

    #[test]
    fn test_direct_mode_needs_no_link_selector() {
        let mut registry = SourceRegistry::default();
        let yaml = r#"
sources:
  - id: single
    listing_url: https://news.example/archives/2025-03.html
    mode: direct
    extraction:
      block_selector: "div.post"
      body_selector: "div.body"
    publisher: wordpress_xmlrpc
"#;
        registry.merge_yaml(yaml).unwrap();
        assert_eq!(registry.get("single").unwrap().mode, LocateMode::Direct);
    }
}
