use crate::chart::render_candlestick_svg;
use crate::error::AppError;
use crate::mentions::{scan_subreddit, Ticker};
use crate::pages;
use crate::session::{session_cookie, set_cookie_header, SessionId};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Reddit stops paginating hot listings well before this.
const MAX_POSTS: i64 = 1000;

#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct SubredditForm {
    #[serde(default)]
    subreddit_name: String,
    #[serde(default)]
    subreddit_n_post: String,
}

#[derive(Deserialize)]
pub struct StockForm {
    #[serde(default)]
    stock_name: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(login_form).post(login))
        .route("/signup", get(signup_form).post(signup))
        .route("/main", get(subreddit_search).post(subreddit_search_retry))
        .route("/main-stock", get(stock_search).post(stock_search_retry))
        .route("/subreddit", axum::routing::post(subreddit_results))
        .route("/stock", axum::routing::post(stock_results))
        .route("/faq", get(faq).post(faq))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn with_session_cookie(mut response: Response, session: SessionId, fresh: bool) -> Response {
    if fresh {
        if let Some(cookie) = set_cookie_header(session) {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
    }
    response
}

/// Re-renders the submitting form with the error's own message.
fn form_error(render: fn(&str) -> String, err: AppError) -> Response {
    warn!("Request failed: {}", err);
    (err.status(), Html(render(&err.user_message()))).into_response()
}

async fn login_form() -> Html<String> {
    Html(pages::login_page(""))
}

async fn login(State(state): State<Arc<AppState>>, headers: HeaderMap, Form(form): Form<CredentialsForm>) -> Response {
    let username = form.username.trim();
    match state.credentials.verify(username, &form.password).await {
        Ok(true) => {
            let (session, fresh) = state.sessions.resume(&headers).await;
            state.sessions.set_user(session, username).await;
            info!("{} logged in", username);
            with_session_cookie(Redirect::to("/main").into_response(), session, fresh)
        }
        Ok(false) => form_error(pages::login_page, AppError::BadLogin),
        Err(e) => form_error(pages::login_page, e.into()),
    }
}

async fn signup_form() -> Html<String> {
    Html(pages::signup_page(""))
}

async fn signup(State(state): State<Arc<AppState>>, headers: HeaderMap, Form(form): Form<CredentialsForm>) -> Response {
    if let Err(e) = state.credentials.register(form.username.trim(), &form.password).await {
        return form_error(pages::signup_page, e.into());
    }

    let (session, fresh) = state.sessions.resume(&headers).await;
    state.sessions.set_user(session, form.username.trim()).await;
    with_session_cookie(Redirect::to("/main").into_response(), session, fresh)
}

async fn subreddit_search(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Html<String> {
    let username = match session_cookie(&headers) {
        Some(id) => state.sessions.username(id).await,
        None => None,
    };
    Html(pages::main_page(username.as_deref()))
}

async fn subreddit_search_retry() -> Response {
    (StatusCode::BAD_REQUEST, Html(pages::subreddit_form_page("Invalid subreddit or number"))).into_response()
}

async fn stock_search() -> Html<String> {
    Html(pages::stock_form_page(""))
}

async fn stock_search_retry() -> Response {
    (StatusCode::BAD_REQUEST, Html(pages::stock_form_page("Invalid stock ticker"))).into_response()
}

fn parse_subreddit_form(form: &SubredditForm) -> Result<(String, usize), AppError> {
    let invalid = || AppError::MalformedInput("Invalid subreddit or number".into());

    let name = form.subreddit_name.trim().trim_start_matches("r/").to_string();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }
    let count: i64 = form.subreddit_n_post.trim().parse().map_err(|_| invalid())?;
    if !(0..=MAX_POSTS).contains(&count) {
        return Err(invalid());
    }
    Ok((name, count as usize))
}

async fn subreddit_results(State(state): State<Arc<AppState>>, Form(form): Form<SubredditForm>) -> Response {
    let (name, count) = match parse_subreddit_form(&form) {
        Ok(parsed) => parsed,
        Err(e) => return form_error(pages::subreddit_form_page, e),
    };

    match state.discussions.hot_posts(&name, count).await {
        Ok(posts) => {
            info!("r/{}: showing {} of {} requested post(s)", name, posts.len(), count);
            Html(pages::subreddit_page(&name, count, &posts)).into_response()
        }
        Err(e) => form_error(pages::subreddit_form_page, e.into()),
    }
}

async fn mention_count(state: &AppState, session: SessionId, ticker: &Ticker) -> Result<u64, AppError> {
    if let Some(count) = state.mentions.cached_count(session, ticker).await {
        info!("{}: using cached mention count {}", ticker, count);
        return Ok(count);
    }

    let count = scan_subreddit(
        state.discussions.as_ref(),
        ticker,
        &state.mention_subreddit,
        state.mention_post_limit,
    )
    .await?;
    state.mentions.remember_count(session, ticker, count).await;
    Ok(count)
}

async fn stock_results(State(state): State<Arc<AppState>>, headers: HeaderMap, Form(form): Form<StockForm>) -> Response {
    let ticker = match Ticker::parse(&form.stock_name) {
        Ok(t) => t,
        Err(e) => return form_error(pages::stock_form_page, e.into()),
    };
    let (session, fresh) = state.sessions.resume(&headers).await;

    let quote = match state.market.quote(&ticker).await {
        Ok(q) => q,
        Err(e) => return with_session_cookie(form_error(pages::stock_form_page, e.into()), session, fresh),
    };

    let mentions = match mention_count(&state, session, &ticker).await {
        Ok(n) => n,
        Err(e) => return with_session_cookie(form_error(pages::stock_form_page, e), session, fresh),
    };

    let candles = match state.market.history(&ticker, state.chart_since).await {
        Ok(c) => c,
        Err(e) => return with_session_cookie(form_error(pages::stock_form_page, e.into()), session, fresh),
    };

    let chart = render_candlestick_svg(ticker.as_str(), &candles);
    let page = pages::stock_page(&quote, mentions, &state.mention_subreddit, &chart);
    with_session_cookie(Html(page).into_response(), session, fresh)
}

async fn faq(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::faq_page(&state.mention_subreddit))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "traders-den",
        "sessions": state.sessions.len().await,
        "timestamp": Utc::now().to_rfc3339()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, n: &str) -> SubredditForm {
        SubredditForm { subreddit_name: name.into(), subreddit_n_post: n.into() }
    }

    #[test]
    fn subreddit_form_accepts_prefixed_names() {
        assert_eq!(parse_subreddit_form(&form("r/stocks", " 5 ")).unwrap(), ("stocks".to_string(), 5));
        assert_eq!(parse_subreddit_form(&form("wall_street", "0")).unwrap(), ("wall_street".to_string(), 0));
    }

    #[test]
    fn subreddit_form_rejects_bad_input() {
        assert!(parse_subreddit_form(&form("stocks", "-1")).is_err());
        assert!(parse_subreddit_form(&form("stocks", "ten")).is_err());
        assert!(parse_subreddit_form(&form("stocks", "1001")).is_err());
        assert!(parse_subreddit_form(&form("", "3")).is_err());
        assert!(parse_subreddit_form(&form("../admin", "3")).is_err());
    }
}
