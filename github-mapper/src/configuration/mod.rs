//! Logic for loading configuration in to an object model
use std::str::FromStr;
use std::time::Duration;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;


const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";
const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read the token from environment variable '{name}': {source}
    CannotReadToken {
        name: String,
        #[source]
        source: std::env::VarError,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(#[from] serde_yaml::Error),
}

/// The configuration of the HTTP executor.
///
/// Can be created through `serde::Deserialize` from YAML, or inline in Rust code with the
/// builder.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// The GraphQL endpoint queries are posted to.
    /// Defaults to https://api.github.com/graphql
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// Name of the environment variable holding the API token.
    /// Defaults to GITHUB_TOKEN
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in human-readable format; defaults to 30s
    #[serde(with = "humantime_serde", default = "default_timeout")]
    #[schemars(with = "String")]
    pub timeout: Duration,
}

#[allow(clippy::expect_used)]
fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint must be a valid url")
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(
        endpoint: Option<Url>,
        token_env: Option<String>,
        user_agent: Option<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            endpoint: endpoint.unwrap_or_else(default_endpoint),
            token_env: token_env.unwrap_or_else(default_token_env),
            user_agent: user_agent.unwrap_or_else(default_user_agent),
            timeout: timeout.unwrap_or_else(default_timeout),
        }
    }

    /// Parse configuration from a string in YAML syntax.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigurationError> {
        let configuration = serde_yaml::from_str(raw)?;
        tracing::debug!(?configuration, "loaded configuration");
        Ok(configuration)
    }

    /// Read the API token from the configured environment variable.
    pub fn token(&self) -> Result<String, ConfigurationError> {
        std::env::var(&self.token_env).map_err(|source| ConfigurationError::CannotReadToken {
            name: self.token_env.clone(),
            source,
        })
    }
}

/// Parse configuration from a string in YAML syntax
impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_yaml(s)
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings
        .into_generator()
        .into_root_schema_for::<Configuration>()
}
