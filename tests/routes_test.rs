use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use traders_den::credentials::JsonFileStore;
use traders_den::error::ProviderError;
use traders_den::market::MarketDataProvider;
use traders_den::reddit::DiscussionProvider;
use traders_den::routes::router;
use traders_den::session::{MentionCache, SessionId, SessionStore};
use traders_den::state::{chart_start, AppState};
use traders_den::types::{Candle, Post, Quote};
use traders_den::Ticker;

#[derive(Default)]
struct StubReddit {
    comments: HashMap<String, Vec<String>>,
    comment_calls: AtomicUsize,
}

#[async_trait]
impl DiscussionProvider for StubReddit {
    async fn hot_posts(&self, subreddit: &str, limit: usize) -> Result<Vec<Post>, ProviderError> {
        if subreddit == "missing" {
            return Err(ProviderError::NotFound(format!("r/{subreddit}")));
        }
        if subreddit == "down" {
            return Err(ProviderError::Unreachable { provider: "Reddit", reason: "timeout".into() });
        }
        let mut ids: Vec<_> = self.comments.keys().cloned().collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .take(limit)
            .map(|id| Post {
                title: format!("Post {id}"),
                permalink: format!("https://www.reddit.com/r/{subreddit}/comments/{id}/"),
                id,
            })
            .collect())
    }

    async fn comment_bodies(&self, post: &Post) -> Result<Vec<String>, ProviderError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.comments.get(&post.id).cloned().unwrap_or_default())
    }
}

struct StubMarket;

#[async_trait]
impl MarketDataProvider for StubMarket {
    async fn quote(&self, ticker: &Ticker) -> Result<Quote, ProviderError> {
        if ticker.as_str() == "NOPE" {
            return Err(ProviderError::NotFound(ticker.to_string()));
        }
        Ok(Quote {
            symbol: ticker.to_string(),
            long_name: Some("GameStop Corp.".into()),
            price: Some(25.5),
            ..Quote::default()
        })
    }

    async fn history(&self, _ticker: &Ticker, since: NaiveDate) -> Result<Vec<Candle>, ProviderError> {
        Ok(vec![Candle { date: since, open: 10.0, high: 12.0, low: 9.0, close: 11.0, volume: 1000 }])
    }
}

struct Harness {
    app: Router,
    reddit: Arc<StubReddit>,
    _dir: tempfile::TempDir,
}

/// Answers every lookup with the same count and records what it was asked to store.
struct FixedCache {
    count: u64,
    remembered: AtomicUsize,
}

#[async_trait]
impl MentionCache for FixedCache {
    async fn cached_count(&self, _session: SessionId, _ticker: &Ticker) -> Option<u64> {
        Some(self.count)
    }

    async fn remember_count(&self, _session: SessionId, _ticker: &Ticker, _count: u64) {
        self.remembered.fetch_add(1, Ordering::SeqCst);
    }
}

fn harness() -> Harness {
    harness_with_cache(None)
}

fn harness_with_cache(mentions: Option<Arc<dyn MentionCache>>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let reddit = Arc::new(StubReddit {
        comments: HashMap::from([
            ("a".to_string(), vec!["GME GME".to_string(), "sold my gme".to_string()]),
            ("b".to_string(), vec!["GME!".to_string(), "tsla".to_string()]),
            ("c".to_string(), vec!["gme".to_string()]),
            ("d".to_string(), vec!["GME".to_string()]),
        ]),
        ..StubReddit::default()
    });
    let sessions = Arc::new(SessionStore::default());
    let mentions = mentions.unwrap_or_else(|| sessions.clone() as Arc<dyn MentionCache>);
    let state = Arc::new(AppState {
        discussions: reddit.clone(),
        market: Arc::new(StubMarket),
        credentials: Arc::new(JsonFileStore::new(dir.path().join("database.json"))),
        sessions,
        mentions,
        mention_subreddit: "wallstreetbets".into(),
        mention_post_limit: 3,
        chart_since: chart_start(),
    });
    Harness { app: router(state), reddit, _dir: dir }
}

fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cookie, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn stock_page_shows_quote_mentions_and_chart() {
    let h = harness();
    let (status, cookie, body) = send(&h.app, form_post("/stock", "stock_name=gme", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_some());
    assert!(body.contains("GameStop Corp."));
    assert!(body.contains("Mentioned <strong>4</strong> time(s)"));
    assert!(body.contains("<svg"));
    assert_eq!(h.reddit.comment_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn mention_count_is_memoized_per_session() {
    let h = harness();
    let (_, cookie, _) = send(&h.app, form_post("/stock", "stock_name=GME", None)).await;
    let cookie = cookie.unwrap();

    let (status, again, body) = send(&h.app, form_post("/stock", "stock_name=gme", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(again.is_none());
    assert!(body.contains("Mentioned <strong>4</strong>"));
    assert_eq!(h.reddit.comment_calls.load(Ordering::SeqCst), 3);

    // A different session scans again.
    send(&h.app, form_post("/stock", "stock_name=GME", None)).await;
    assert_eq!(h.reddit.comment_calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn stock_page_uses_the_injected_mention_cache() {
    let cache = Arc::new(FixedCache { count: 42, remembered: AtomicUsize::new(0) });
    let injected: Arc<dyn MentionCache> = cache.clone();
    let h = harness_with_cache(Some(injected));

    let (status, _, body) = send(&h.app, form_post("/stock", "stock_name=GME", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Mentioned <strong>42</strong>"));
    assert_eq!(h.reddit.comment_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.remembered.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_and_unknown_tickers_get_distinct_messages() {
    let h = harness();
    let (status, _, body) = send(&h.app, form_post("/stock", "stock_name=", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid stock ticker"));

    let (status, _, body) = send(&h.app, form_post("/stock", "stock_name=nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("NOPE could not be found"));
}

#[tokio::test]
async fn subreddit_results_list_ranked_posts() {
    let h = harness();
    let (status, _, body) = send(
        &h.app,
        form_post("/subreddit", "subreddit_name=stocks&subreddit_n_post=2", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("1. Post a"));
    assert!(body.contains("2. Post b"));
    assert!(!body.contains("3. Post c"));
    assert!(body.contains("background: #001400;"));
}

#[tokio::test]
async fn subreddit_errors_render_the_search_form() {
    let h = harness();
    let (status, _, body) = send(
        &h.app,
        form_post("/subreddit", "subreddit_name=stocks&subreddit_n_post=-4", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid subreddit or number"));

    let (status, _, body) = send(
        &h.app,
        form_post("/subreddit", "subreddit_name=missing&subreddit_n_post=4", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("r/missing could not be found"));

    let (status, _, body) = send(
        &h.app,
        form_post("/subreddit", "subreddit_name=down&subreddit_n_post=4", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("Reddit is unavailable right now"));
}

#[tokio::test]
async fn signup_then_login() {
    let h = harness();
    let (status, cookie, _) = send(&h.app, form_post("/signup", "username=ape&password=diamond", None)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let cookie = cookie.unwrap();

    let request = Request::get("/main").header(header::COOKIE, &cookie).body(Body::empty()).unwrap();
    let (_, _, body) = send(&h.app, request).await;
    assert!(body.contains("Welcome back, ape"));

    let (status, _, body) = send(&h.app, form_post("/signup", "username=ape&password=other", None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Taken username"));

    let (status, _, _) = send(&h.app, form_post("/", "username=ape&password=diamond", None)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (status, _, body) = send(&h.app, form_post("/", "username=ape&password=paper", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Wrong username or password"));
}

#[tokio::test]
async fn static_pages_render() {
    let h = harness();
    for uri in ["/", "/signup", "/main", "/main-stock", "/faq"] {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, _, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body.contains("<!DOCTYPE html>"), "{uri}");
    }

    let (status, _, body) = send(&h.app, form_post("/main-stock", "", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid stock ticker"));
}
