use std::time::Duration;

use clap::Args;
use url::Url;

use crate::error::StartupError;
use crate::prompts::PromptSettings;
use crate::tools::system_prompt::DEFAULT_SYSTEM_PROMPT;
use crate::util::{parse_flag, parse_tool_list};

/// Server settings, read from flags or the environment (a `.env` file is
/// loaded by the binary before parsing).
#[derive(Args, Clone, Debug)]
pub struct ServerArgs {
    /// Base URL of the Directus instance
    #[arg(long, env = "DIRECTUS_URL")]
    pub directus_url: String,

    /// Static access token
    #[arg(long, env = "DIRECTUS_TOKEN", hide_env_values = true)]
    pub directus_token: Option<String>,

    /// Email to log in with (requires a password, excludes a token)
    #[arg(long, env = "DIRECTUS_USER_EMAIL")]
    pub directus_user_email: Option<String>,

    /// Password to log in with
    #[arg(long, env = "DIRECTUS_USER_PASSWORD", hide_env_values = true)]
    pub directus_user_password: Option<String>,

    /// Tools to hide, comma separated or as a JSON array
    #[arg(long, env = "DISABLE_TOOLS", default_value = "delete-item")]
    pub disable_tools: String,

    /// Expose the `system-prompt` tool
    #[arg(
        long,
        env = "ENABLE_SYSTEM_PROMPT",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = parse_flag
    )]
    pub enable_system_prompt: bool,

    /// Text returned by the `system-prompt` tool
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Collection holding prompt templates
    #[arg(long, env = "PROMPTS_COLLECTION")]
    pub prompts_collection: Option<String>,

    #[arg(long, env = "PROMPTS_NAME_FIELD", default_value = "name")]
    pub prompts_name_field: String,

    #[arg(long, env = "PROMPTS_DESCRIPTION_FIELD", default_value = "description")]
    pub prompts_description_field: String,

    #[arg(long, env = "PROMPTS_SYSTEM_PROMPT_FIELD", default_value = "system_prompt")]
    pub prompts_system_prompt_field: String,

    #[arg(long, env = "PROMPTS_MESSAGES_FIELD", default_value = "messages")]
    pub prompts_messages_field: String,

    /// Only serve prompt rows whose `status` equals this value
    #[arg(long, env = "PROMPTS_STATUS_FILTER")]
    pub prompts_status_filter: Option<String>,

    /// Timeout for each backend request, in seconds
    #[arg(long, env = "DIRECTUS_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Login { email: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::Login { email, .. } => {
                f.debug_struct("Login").field("email", email).finish_non_exhaustive()
            }
        }
    }
}

/// Validated configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub base_url: Url,
    pub credentials: Credentials,
    pub disabled_tools: Vec<String>,
    /// `Some` when the `system-prompt` tool is enabled.
    pub system_prompt: Option<String>,
    /// `Some` when a prompts collection is configured.
    pub prompts: Option<PromptSettings>,
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn from_args(args: ServerArgs) -> Result<Self, StartupError> {
        let base_url = parse_base_url(&args.directus_url)?;
        let credentials = resolve_credentials(
            non_empty(args.directus_token),
            non_empty(args.directus_user_email),
            non_empty(args.directus_user_password),
        )?;

        if args.request_timeout_secs == 0 {
            return Err(StartupError::ConfigInvalid(
                "DIRECTUS_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let system_prompt = args.enable_system_prompt.then(|| {
            non_empty(args.system_prompt).unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.trim().to_string())
        });

        let prompts = non_empty(args.prompts_collection).map(|collection| PromptSettings {
            collection,
            name_field: args.prompts_name_field,
            description_field: args.prompts_description_field,
            system_prompt_field: args.prompts_system_prompt_field,
            messages_field: args.prompts_messages_field,
            status_filter: non_empty(args.prompts_status_filter),
        });

        Ok(Self {
            base_url,
            credentials,
            disabled_tools: parse_tool_list(&args.disable_tools),
            system_prompt,
            prompts,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
        })
    }

    /// Base URL without a trailing slash, as used in admin deep links.
    pub fn public_base_url(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_base_url(raw: &str) -> Result<Url, StartupError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| StartupError::ConfigInvalid(format!("DIRECTUS_URL '{raw}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StartupError::ConfigInvalid(format!(
            "DIRECTUS_URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

fn resolve_credentials(
    token: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<Credentials, StartupError> {
    match (token, email, password) {
        (Some(token), None, None) => Ok(Credentials::Token(token)),
        (None, Some(email), Some(password)) => Ok(Credentials::Login { email, password }),
        (Some(_), _, _) => Err(StartupError::ConfigInvalid(
            "Provide either DIRECTUS_TOKEN or DIRECTUS_USER_EMAIL and DIRECTUS_USER_PASSWORD, not both"
                .to_string(),
        )),
        (None, None, None) => Err(StartupError::ConfigInvalid(
            "Either DIRECTUS_TOKEN or both DIRECTUS_USER_EMAIL and DIRECTUS_USER_PASSWORD must be provided"
                .to_string(),
        )),
        (None, _, _) => Err(StartupError::ConfigInvalid(
            "DIRECTUS_USER_EMAIL and DIRECTUS_USER_PASSWORD must be provided together".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServerArgs {
        ServerArgs {
            directus_url: "https://cms.example.com/".to_string(),
            directus_token: Some("secret".to_string()),
            directus_user_email: None,
            directus_user_password: None,
            disable_tools: "delete-item".to_string(),
            enable_system_prompt: false,
            system_prompt: None,
            prompts_collection: None,
            prompts_name_field: "name".to_string(),
            prompts_description_field: "description".to_string(),
            prompts_system_prompt_field: "system_prompt".to_string(),
            prompts_messages_field: "messages".to_string(),
            prompts_status_filter: None,
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn token_configuration_is_valid() {
        let config = ServerConfig::from_args(args()).expect("valid config");
        assert_eq!(config.credentials, Credentials::Token("secret".to_string()));
        assert_eq!(config.disabled_tools, vec!["delete-item"]);
        assert_eq!(config.public_base_url(), "https://cms.example.com");
        assert!(config.system_prompt.is_none());
        assert!(config.prompts.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn login_configuration_is_valid() {
        let mut input = args();
        input.directus_token = None;
        input.directus_user_email = Some("ada@example.com".to_string());
        input.directus_user_password = Some("pw".to_string());
        let config = ServerConfig::from_args(input).expect("valid config");
        assert!(matches!(config.credentials, Credentials::Login { ref email, .. } if email == "ada@example.com"));
    }

    #[test]
    fn contradictory_or_missing_credentials_are_rejected() {
        let mut both = args();
        both.directus_user_email = Some("ada@example.com".to_string());
        both.directus_user_password = Some("pw".to_string());

        let mut email_only = args();
        email_only.directus_token = None;
        email_only.directus_user_email = Some("ada@example.com".to_string());

        let mut none = args();
        none.directus_token = Some("   ".to_string());

        for input in [both, email_only, none] {
            let err = ServerConfig::from_args(input).expect_err("must be rejected");
            assert!(matches!(err, StartupError::ConfigInvalid(_)), "{err:?}");
        }
    }

    #[test]
    fn non_http_urls_are_rejected() {
        let mut input = args();
        input.directus_url = "ftp://cms.example.com".to_string();
        assert!(matches!(
            ServerConfig::from_args(input),
            Err(StartupError::ConfigInvalid(_))
        ));

        let mut input = args();
        input.directus_url = "not a url".to_string();
        assert!(ServerConfig::from_args(input).is_err());
    }

    #[test]
    fn system_prompt_falls_back_to_built_in_text() {
        let mut input = args();
        input.enable_system_prompt = true;
        let config = ServerConfig::from_args(input).unwrap();
        assert!(config.system_prompt.as_deref().is_some_and(|p| p.contains("Directus")));

        let mut input = args();
        input.enable_system_prompt = true;
        input.system_prompt = Some("Be brief.".to_string());
        let config = ServerConfig::from_args(input).unwrap();
        assert_eq!(config.system_prompt.as_deref(), Some("Be brief."));
    }

    #[test]
    fn prompts_settings_carry_field_overrides() {
        let mut input = args();
        input.prompts_collection = Some("ai_prompts".to_string());
        input.prompts_name_field = "title".to_string();
        input.prompts_status_filter = Some("published".to_string());
        let prompts = ServerConfig::from_args(input).unwrap().prompts.expect("prompts enabled");
        assert_eq!(prompts.collection, "ai_prompts");
        assert_eq!(prompts.name_field, "title");
        assert_eq!(prompts.messages_field, "messages");
        assert_eq!(prompts.status_filter.as_deref(), Some("published"));
    }
}
