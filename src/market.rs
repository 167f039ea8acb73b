use crate::error::ProviderError;
use crate::mentions::Ticker;
use crate::types::{Candle, Quote};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "Yahoo Finance";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; traders-den/0.1)";

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn quote(&self, ticker: &Ticker) -> Result<Quote, ProviderError>;
    async fn history(&self, ticker: &Ticker, since: NaiveDate) -> Result<Vec<Candle>, ProviderError>;
}

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    symbol: String,
    currency: Option<String>,
    exchange_name: Option<String>,
    instrument_type: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<u64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
}

#[derive(Deserialize, Default)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Deserialize, Default)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

impl From<Meta> for Quote {
    fn from(m: Meta) -> Self {
        Quote {
            symbol: m.symbol,
            long_name: m.long_name,
            short_name: m.short_name,
            currency: m.currency,
            exchange: m.exchange_name,
            instrument_type: m.instrument_type,
            price: m.regular_market_price,
            previous_close: m.chart_previous_close,
            day_high: m.regular_market_day_high,
            day_low: m.regular_market_day_low,
            volume: m.regular_market_volume,
            fifty_two_week_high: m.fifty_two_week_high,
            fifty_two_week_low: m.fifty_two_week_low,
        }
    }
}

impl YahooClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!("[Yahoo] Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn chart(&self, ticker: &Ticker, period1: i64, period2: i64) -> Result<ChartResult, ProviderError> {
        let response = self
            .client
            .get(format!("{}/v8/finance/chart/{}", self.base_url, ticker))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable { provider: PROVIDER, reason: e.to_string() })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(ticker.to_string()));
        }
        if !status.is_success() {
            warn!("[Yahoo] Chart request for {} failed: {}", ticker, status);
            return Err(ProviderError::BadResponse { provider: PROVIDER, reason: format!("chart returned {}", status) });
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse { provider: PROVIDER, reason: e.to_string() })?;

        if let Some(err) = envelope.chart.error {
            debug!("[Yahoo] {}: {} ({})", ticker, err.code, err.description.unwrap_or_default());
            return Err(ProviderError::NotFound(ticker.to_string()));
        }

        envelope
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ProviderError::NotFound(ticker.to_string()))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn quote(&self, ticker: &Ticker) -> Result<Quote, ProviderError> {
        let now = Utc::now().timestamp();
        let result = self.chart(ticker, now - 7 * 86_400, now).await?;
        Ok(result.meta.into())
    }

    async fn history(&self, ticker: &Ticker, since: NaiveDate) -> Result<Vec<Candle>, ProviderError> {
        let start = since.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or(0);
        let result = self.chart(ticker, start, Utc::now().timestamp()).await?;
        let candles = candles_from(&result);
        debug!("[Yahoo] {}: {} daily candle(s) since {}", ticker, candles.len(), since);
        Ok(candles)
    }
}

/// Zips timestamps with the OHLCV series, skipping rows with any gap.
fn candles_from(result: &ChartResult) -> Vec<Candle> {
    let Some(series) = result.indicators.quote.first() else {
        return vec![];
    };

    result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            Some(Candle {
                date,
                open: (*series.open.get(i)?)?,
                high: (*series.high.get(i)?)?,
                low: (*series.low.get(i)?)?,
                close: (*series.close.get(i)?)?,
                volume: (*series.volume.get(i)?)?,
            })
        })
        .collect()
}
