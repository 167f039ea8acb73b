use crate::error::ConfigError;
use crate::reddit::RedditCredentials;
use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use tracing::info;

pub struct Config {
    pub port: u16,
    pub reddit: RedditCredentials,
    pub reddit_auth_url: String,
    pub reddit_api_url: String,
    pub yahoo_base_url: String,
    pub credentials_path: PathBuf,
    pub mention_subreddit: String,
    pub mention_post_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("PORT", "5000")?,
            reddit: RedditCredentials {
                client_id: required("REDDIT_CLIENT_ID")?,
                client_secret: required("REDDIT_CLIENT_SECRET")?,
                username: required("REDDIT_USERNAME")?,
                password: required("REDDIT_PASSWORD")?,
                user_agent: try_load("REDDIT_USER_AGENT", "traders-den/0.1")?,
            },
            reddit_auth_url: try_load("REDDIT_AUTH_URL", "https://www.reddit.com")?,
            reddit_api_url: try_load("REDDIT_API_URL", "https://oauth.reddit.com")?,
            yahoo_base_url: try_load("YAHOO_BASE_URL", "https://query1.finance.yahoo.com")?,
            credentials_path: try_load("CREDENTIALS_PATH", "database.json")?,
            mention_subreddit: try_load("MENTION_SUBREDDIT", "wallstreetbets")?,
            mention_post_limit: try_load("MENTION_POST_LIMIT", "3")?,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid { var: key, reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_and_bad_numbers_are_reported() {
        assert_eq!(try_load::<u16>("TRADERS_DEN_TEST_UNSET_PORT", "5000").unwrap(), 5000);

        env::set_var("TRADERS_DEN_TEST_BAD_LIMIT", "three");
        let err = try_load::<usize>("TRADERS_DEN_TEST_BAD_LIMIT", "3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TRADERS_DEN_TEST_BAD_LIMIT", .. }));
    }

    #[test]
    fn blank_required_value_is_missing() {
        env::set_var("TRADERS_DEN_TEST_BLANK", "  ");
        assert!(matches!(required("TRADERS_DEN_TEST_BLANK"), Err(ConfigError::Missing(_))));
    }
}
