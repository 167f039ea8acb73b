use crate::error::ProviderError;
use crate::types::Post;
use async_trait::async_trait;
use reqwest::{redirect, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const PROVIDER: &str = "Reddit";
const PAGE_SIZE: usize = 100;
const TOKEN_SLACK: Duration = Duration::from_secs(60);
/// Reddit grants day-long tokens at most; longer claims are capped.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of discussion threads. Implementations expand every comment tree
/// before returning bodies.
#[async_trait]
pub trait DiscussionProvider: Send + Sync {
    async fn hot_posts(&self, subreddit: &str, limit: usize) -> Result<Vec<Post>, ProviderError>;
    async fn comment_bodies(&self, post: &Post) -> Result<Vec<String>, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditClient {
    client: Client,
    auth_url: String,
    api_url: String,
    credentials: RedditCredentials,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
    after: Option<String>,
}

#[derive(Deserialize)]
struct Thing {
    kind: String,
    data: JsonValue,
}

#[derive(Deserialize)]
struct RawPost {
    id: String,
    title: String,
    permalink: String,
}

#[derive(Deserialize)]
struct RawComment {
    #[serde(default)]
    body: String,
    #[serde(default)]
    replies: JsonValue,
}

fn unreachable(e: reqwest::Error) -> ProviderError {
    ProviderError::Unreachable { provider: PROVIDER, reason: e.to_string() }
}

fn bad_response(reason: impl ToString) -> ProviderError {
    ProviderError::BadResponse { provider: PROVIDER, reason: reason.to_string() }
}

impl RedditClient {
    pub fn new(auth_url: &str, api_url: &str, credentials: RedditCredentials) -> Self {
        // A missing subreddit answers with a redirect to the search page.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(credentials.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!("[Reddit] Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            auth_url: auth_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn bearer(&self) -> Result<String, ProviderError> {
        let mut token = self.token.lock().await;
        if let Some(t) = token.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(t.value.clone());
        }

        let response = self
            .client
            .post(format!("{}/api/v1/access_token", self.auth_url))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(unreachable)?;

        if !response.status().is_success() {
            warn!("[Reddit] Token request rejected: {}", response.status());
            return Err(bad_response(format!("token request returned {}", response.status())));
        }

        let granted: TokenResponse = response.json().await.map_err(bad_response)?;
        let lifetime = Duration::from_secs(granted.expires_in)
            .min(MAX_TOKEN_LIFETIME)
            .saturating_sub(TOKEN_SLACK);
        info!("[Reddit] Obtained access token (valid {}s)", lifetime.as_secs());

        let now = Instant::now();
        let expires_at = now.checked_add(lifetime).unwrap_or(now);
        let value = granted.access_token.clone();
        *token = Some(AccessToken { value: granted.access_token, expires_at });
        Ok(value)
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<(StatusCode, JsonValue), ProviderError> {
        let bearer = self.bearer().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .query(query)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Ok((status, JsonValue::Null));
        }
        let body = response.json().await.map_err(bad_response)?;
        Ok((status, body))
    }
}

#[async_trait]
impl DiscussionProvider for RedditClient {
    async fn hot_posts(&self, subreddit: &str, limit: usize) -> Result<Vec<Post>, ProviderError> {
        let name = subreddit.trim().trim_start_matches("r/");
        let url = format!("{}/r/{}/hot", self.api_url, name);
        let mut posts = Vec::with_capacity(limit);
        let mut after: Option<String> = None;

        while posts.len() < limit {
            let mut query = vec![
                ("limit", (limit - posts.len()).min(PAGE_SIZE).to_string()),
                ("raw_json", "1".to_string()),
            ];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let (status, body) = self.get_json(&url, &query).await?;
            if status.is_redirection() || status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
                warn!("[Reddit] r/{} is not available: {}", name, status);
                return Err(ProviderError::NotFound(format!("r/{}", name)));
            }
            if !status.is_success() {
                return Err(bad_response(format!("listing returned {}", status)));
            }

            let listing: Listing = serde_json::from_value(body).map_err(bad_response)?;
            let page_len = listing.data.children.len();
            for thing in listing.data.children.into_iter().filter(|t| t.kind == "t3") {
                let raw: RawPost = serde_json::from_value(thing.data).map_err(bad_response)?;
                posts.push(Post {
                    id: raw.id,
                    title: raw.title,
                    permalink: format!("https://www.reddit.com{}", raw.permalink),
                });
            }

            debug!("[Reddit] r/{}: page of {} post(s), {} collected", name, page_len, posts.len());
            match listing.data.after {
                Some(cursor) if page_len > 0 => after = Some(cursor),
                _ => break,
            }
        }

        posts.truncate(limit);
        Ok(posts)
    }

    async fn comment_bodies(&self, post: &Post) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/comments/{}", self.api_url, post.id);
        let (status, body) = self.get_json(&url, &[("raw_json", "1".to_string())]).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!("post {}", post.id)));
        }
        if !status.is_success() {
            return Err(bad_response(format!("comments returned {}", status)));
        }

        // [post listing, comment listing]
        let comments = body
            .as_array()
            .and_then(|parts| parts.get(1))
            .cloned()
            .ok_or_else(|| bad_response("comment listing missing"))?;
        let listing: Listing = serde_json::from_value(comments).map_err(bad_response)?;
        flatten_comments(listing)
    }
}

/// Breadth-first walk of a comment tree, dropping "load more" stubs.
fn flatten_comments(root: Listing) -> Result<Vec<String>, ProviderError> {
    let mut bodies = Vec::new();
    let mut queue: VecDeque<Thing> = root.data.children.into();

    while let Some(thing) = queue.pop_front() {
        if thing.kind != "t1" {
            continue;
        }
        let comment: RawComment = serde_json::from_value(thing.data).map_err(bad_response)?;
        if comment.replies.is_object() {
            let replies: Listing = serde_json::from_value(comment.replies).map_err(bad_response)?;
            queue.extend(replies.data.children);
        }
        bodies.push(comment.body);
    }

    Ok(bodies)
}
