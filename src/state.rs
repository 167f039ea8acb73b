use crate::config::Config;
use crate::credentials::{CredentialStore, JsonFileStore};
use crate::market::{MarketDataProvider, YahooClient};
use crate::reddit::{DiscussionProvider, RedditClient};
use crate::session::{MentionCache, SessionStore};
use chrono::NaiveDate;
use std::sync::Arc;

/// Everything a request handler needs. Collaborators are injected so tests
/// can swap in stubs.
pub struct AppState {
    pub discussions: Arc<dyn DiscussionProvider>,
    pub market: Arc<dyn MarketDataProvider>,
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<SessionStore>,
    /// Usually the same store as `sessions`.
    pub mentions: Arc<dyn MentionCache>,
    pub mention_subreddit: String,
    pub mention_post_limit: usize,
    pub chart_since: NaiveDate,
}

impl AppState {
    pub fn from_config(config: &Config) -> Arc<Self> {
        let reddit = RedditClient::new(&config.reddit_auth_url, &config.reddit_api_url, config.reddit.clone());
        let yahoo = YahooClient::new(&config.yahoo_base_url);
        let sessions = Arc::new(SessionStore::default());

        Arc::new(Self {
            discussions: Arc::new(reddit),
            market: Arc::new(yahoo),
            credentials: Arc::new(JsonFileStore::new(config.credentials_path.clone())),
            mentions: sessions.clone(),
            sessions,
            mention_subreddit: config.mention_subreddit.clone(),
            mention_post_limit: config.mention_post_limit,
            chart_since: chart_start(),
        })
    }
}

pub fn chart_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN)
}
