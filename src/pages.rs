//! Server-rendered HTML pages.

use crate::types::{Post, Quote};

/// Green shades, lightest first.
pub const PALETTE: [&str; 15] = [
    "#007500", "#007000", "#006600", "#006100", "#005c00", "#005200", "#004d00", "#004700",
    "#003d00", "#003800", "#003300", "#002900", "#002400", "#001f00", "#001400",
];

const CSS: &str = r#"
body { background: #0b0f0c; color: rgb(0, 179, 77); font-family: system-ui, sans-serif; margin: 0; }
nav { display: flex; gap: 20px; padding: 14px 24px; border-bottom: 1px solid #003300; }
nav a { color: rgb(0, 179, 77); text-decoration: none; }
main { max-width: 1100px; margin: 0 auto; padding: 24px; }
form { display: flex; flex-direction: column; gap: 10px; max-width: 420px; }
input { padding: 8px; background: #111; color: #eee; border: 1px solid #004700; }
button { padding: 8px; background: #005200; color: #fff; border: none; cursor: pointer; }
.error { color: #ff4136; }
.posts a { display: block; padding: 10px 14px; color: #fff; text-decoration: none; }
table.info td { padding: 4px 14px; }
.mentions { font-size: 1.4em; }
"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Background shade for each of `n` rows. Consecutive blocks of fifteen run
/// in alternating directions, starting dark to light.
pub fn row_colors(n: usize) -> Vec<&'static str> {
    let len = PALETTE.len();
    (0..n)
        .map(|i| {
            let offset = i % len;
            if (i / len) % 2 == 0 {
                PALETTE[len - 1 - offset]
            } else {
                PALETTE[offset]
            }
        })
        .collect()
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} | The Trader's Den</title>
    <style>{css}</style>
</head>
<body>
    <nav>
        <a href="/main">Subreddits</a>
        <a href="/main-stock">Stocks</a>
        <a href="/faq">FAQ</a>
        <a href="/">Login</a>
    </nav>
    <main>
{body}
    </main>
</body>
</html>"#,
        title = escape(title),
        css = CSS,
        body = body,
    )
}

fn error_line(error: &str) -> String {
    if error.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="error">{}</p>"#, escape(error))
    }
}

pub fn login_page(error: &str) -> String {
    layout(
        "Login",
        &format!(
            r#"<h1>The Trader's Den</h1>
<form method="post" action="/">
    <label>Username <input name="username" autocomplete="username"></label>
    <label>Password <input name="password" type="password" autocomplete="current-password"></label>
    <button type="submit">Login</button>
</form>
{error}
<p>No account? <a href="/signup">Sign up</a></p>"#,
            error = error_line(error),
        ),
    )
}

pub fn signup_page(error: &str) -> String {
    layout(
        "Sign Up",
        &format!(
            r#"<h1>Create an account</h1>
<form method="post" action="/signup">
    <label>Username <input name="username" autocomplete="username"></label>
    <label>Password <input name="password" type="password" autocomplete="new-password"></label>
    <button type="submit">Sign Up</button>
</form>
{error}"#,
            error = error_line(error),
        ),
    )
}

pub fn subreddit_form_page(error: &str) -> String {
    subreddit_search(error, None)
}

/// Landing page after login.
pub fn main_page(username: Option<&str>) -> String {
    subreddit_search("", username)
}

fn subreddit_search(error: &str, username: Option<&str>) -> String {
    let greeting = username
        .map(|u| format!("<p>Welcome back, {}</p>", escape(u)))
        .unwrap_or_default();
    layout(
        "Subreddit search",
        &format!(
            r#"<h1>Trending posts</h1>
{greeting}
<form method="post" action="/subreddit">
    <label>Write the subreddit name here <input name="subreddit_name"></label>
    <label>Write the number of trending posts you want to see <input name="subreddit_n_post" type="number" min="0"></label>
    <button type="submit">Search</button>
</form>
{error}"#,
            greeting = greeting,
            error = error_line(error),
        ),
    )
}

pub fn stock_form_page(error: &str) -> String {
    layout(
        "Stock search",
        &format!(
            r#"<h1>Stock lookup</h1>
<form method="post" action="/stock">
    <label>Write the stock ticker name <input name="stock_name"></label>
    <button type="submit">Search</button>
</form>
{error}"#,
            error = error_line(error),
        ),
    )
}

pub fn subreddit_page(subreddit: &str, requested: usize, posts: &[Post]) -> String {
    let mut rows = String::new();
    for ((i, post), color) in posts.iter().enumerate().zip(row_colors(posts.len())) {
        rows.push_str(&format!(
            r#"<a href="{link}" style="background: {color};" target="_blank" rel="noopener">{n}. {title}</a>
"#,
            link = escape(&post.permalink),
            color = color,
            n = i + 1,
            title = escape(&post.title),
        ));
    }

    layout(
        subreddit,
        &format!(
            r#"<h1>r/{name}</h1>
<p>Top {requested} hot post(s), {found} found</p>
<div class="posts">
{rows}</div>"#,
            name = escape(subreddit),
            requested = requested,
            found = posts.len(),
            rows = rows,
        ),
    )
}

fn row(label: &str, value: Option<String>) -> String {
    format!(
        "<tr><td>{}</td><td>{}</td></tr>",
        label,
        escape(value.as_deref().unwrap_or("n/a"))
    )
}

pub fn stock_page(quote: &Quote, mentions: u64, mention_subreddit: &str, chart_svg: &str) -> String {
    let money = |v: Option<f64>| v.map(|v| format!("{:.2}", v));
    let table = [
        row("Exchange", quote.exchange.clone()),
        row("Type", quote.instrument_type.clone()),
        row("Currency", quote.currency.clone()),
        row("Price", money(quote.price)),
        row("Previous close", money(quote.previous_close)),
        row("Day high", money(quote.day_high)),
        row("Day low", money(quote.day_low)),
        row("Volume", quote.volume.map(|v| v.to_string())),
        row("52 week high", money(quote.fifty_two_week_high)),
        row("52 week low", money(quote.fifty_two_week_low)),
    ]
    .concat();

    layout(
        &quote.symbol,
        &format!(
            r#"<h1>{symbol} <small>{name}</small></h1>
<p class="mentions">Mentioned <strong>{mentions}</strong> time(s) in the hot comments of r/{sub}</p>
<table class="info">{table}</table>
<div class="chart">{chart}</div>"#,
            symbol = escape(&quote.symbol),
            name = escape(quote.display_name()),
            mentions = mentions,
            sub = escape(mention_subreddit),
            table = table,
            chart = chart_svg,
        ),
    )
}

pub fn faq_page(mention_subreddit: &str) -> String {
    layout(
        "FAQ",
        &format!(
            r#"<h1>FAQ</h1>
<h3>What does the subreddit search show?</h3>
<p>The current hot posts of any public subreddit, ranked the way Reddit ranks them, with links to each thread.</p>
<h3>How are mentions counted?</h3>
<p>We read every comment on the top hot posts of r/{sub} and count the words that equal the ticker, ignoring case.
Words are split on spaces only, so "GME!" or "$GME" are not counted as "GME".</p>
<h3>Why does the count not change when I search again?</h3>
<p>Counts are remembered for the rest of your session so repeated lookups stay fast.</p>
<h3>Where does the market data come from?</h3>
<p>Quotes and daily prices since 2018 come from Yahoo Finance.</p>"#,
            sub = escape(mention_subreddit),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_colors_ping_pong_between_blocks() {
        let colors = row_colors(31);
        assert_eq!(colors[0], "#001400");
        assert_eq!(colors[14], "#007500");
        assert_eq!(colors[15], "#007500");
        assert_eq!(colors[29], "#001400");
        assert_eq!(colors[30], "#001400");
    }

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn subreddit_page_numbers_and_links_posts() {
        let posts = vec![
            Post { id: "a".into(), title: "Daily thread".into(), permalink: "https://www.reddit.com/r/x/a".into() },
            Post { id: "b".into(), title: "YOLO <update>".into(), permalink: "https://www.reddit.com/r/x/b".into() },
        ];
        let html = subreddit_page("x", 2, &posts);
        assert!(html.contains("1. Daily thread"));
        assert!(html.contains("2. YOLO &lt;update&gt;"));
        assert!(html.contains(r#"href="https://www.reddit.com/r/x/b""#));
    }
}
