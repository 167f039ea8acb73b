use crate::error::{InvalidArgument, ProviderError};
use crate::reddit::DiscussionProvider;
use futures_util::future::try_join_all;
use std::fmt;
use tracing::{debug, info};

const MAX_TICKER_LEN: usize = 15;

/// Upper-cased security symbol, e.g. `GME` or `BRK-B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, InvalidArgument> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InvalidArgument("ticker must not be empty".into()));
        }
        // Checked before case mapping: non-ASCII letters can upper-case into ASCII.
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
        {
            return Err(InvalidArgument(format!("ticker contains {c:?}")));
        }
        if raw.len() > MAX_TICKER_LEN {
            return Err(InvalidArgument(format!("ticker {raw} is too long")));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Counts whitespace-separated tokens equal to `ticker`, ignoring case.
///
/// Tokens are not stripped of punctuation, so `GME!` does not match `GME`.
/// An empty ticker never matches anything.
pub fn count_mentions<I, S>(ticker: &str, bodies: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let needle = ticker.to_lowercase();
    if needle.is_empty() {
        return 0;
    }

    bodies
        .into_iter()
        .map(|body| {
            body.as_ref()
                .split_whitespace()
                .filter(|word| word.to_lowercase() == needle)
                .count() as u64
        })
        .sum()
}

/// Counts mentions of `ticker` across the comments of the hot posts in `subreddit`.
pub async fn scan_subreddit(
    provider: &dyn DiscussionProvider,
    ticker: &Ticker,
    subreddit: &str,
    post_limit: usize,
) -> Result<u64, ProviderError> {
    let posts = provider.hot_posts(subreddit, post_limit).await?;
    let threads = try_join_all(posts.iter().map(|post| provider.comment_bodies(post))).await?;

    let mut total = 0;
    for (post, bodies) in posts.iter().zip(&threads) {
        let count = count_mentions(ticker.as_str(), bodies);
        debug!("{} in {} comments of {}: {}", ticker, bodies.len(), post.id, count);
        total += count;
    }

    info!("{}: {} mention(s) across {} post(s) in r/{}", ticker, total, posts.len(), subreddit);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_is_trimmed_and_uppercased() {
        assert_eq!(Ticker::parse(" gme ").unwrap().as_str(), "GME");
        assert_eq!(Ticker::parse("brk-b").unwrap().as_str(), "BRK-B");
        assert_eq!(Ticker::parse("eurusd=x").unwrap().as_str(), "EURUSD=X");
    }

    #[test]
    fn ticker_rejects_empty_and_garbage() {
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("   ").is_err());
        assert!(Ticker::parse("GME STONK").is_err());
        assert!(Ticker::parse("<script>").is_err());
        assert!(Ticker::parse("ABCDEFGHIJKLMNOP").is_err());
    }

    #[test]
    fn ticker_rejects_letters_that_uppercase_into_ascii() {
        for raw in ["ß", "ﬀ", "gıme", "ǆ"] {
            assert!(Ticker::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn empty_ticker_counts_nothing() {
        assert_eq!(count_mentions("", ["", " ", "GME"]), 0);
    }

    #[test]
    fn newlines_and_tabs_separate_tokens() {
        assert_eq!(count_mentions("AMC", ["AMC\nAMC\tamc  AMC"]), 4);
    }
}
