use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hadx_core::common::{Instrument, TimeFrame};
use hadx_core::market::entity::{Bar, Series};
use hadx_core::market::error::MarketError;
use hadx_core::market::port::MarketDataProvider;
use hadx_indicator::resample::resample;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// # Summary
/// Yahoo Finance 行情提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯。
/// - 返回的价格已按复权收盘价等比调整。
#[derive(Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 配置 10 秒超时。
    /// 2. 设置浏览器 User-Agent 以减少被拦截风险。
    ///
    /// # Returns
    /// HTTP 客户端构建失败时返回 `MarketError::Network`。
    pub fn new() -> Result<Self, MarketError> {
        Self::with_base_url(CHART_URL)
    }

    /// 指向自定义的 chart 接口地址
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, MarketError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// 请求一次原生周期的数据
    async fn fetch_native(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, MarketError> {
        let url = format!("{}/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string().as_str()),
                ("period2", end.timestamp().to_string().as_str()),
                ("interval", interval),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketError::RateLimited);
        }
        if !status.is_success() {
            return Err(MarketError::Network(format!("HTTP {}", status)));
        }

        let json: YahooResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let bars = parse_chart(json)?;
        debug!(symbol, interval, bars = bars.len(), "yahoo chart fetched");
        Ok(bars)
    }
}

/// Yahoo 原生 interval；4 小时线没有原生支持，需要从 60 分钟线重采样
fn native_interval(timeframe: TimeFrame) -> &'static str {
    match timeframe {
        TimeFrame::Minute1 => "1m",
        TimeFrame::Minute5 => "5m",
        TimeFrame::Hour1 | TimeFrame::Hour4 => "60m",
        TimeFrame::Day1 => "1d",
        TimeFrame::Week1 => "1wk",
        TimeFrame::Month1 => "1mo",
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Deserialize, Debug)]
struct YahooError {
    code: Option<String>,
    description: String,
}

#[derive(Deserialize, Debug)]
struct YahooResult {
    // 停牌或无数据时 Yahoo 会省略该字段
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
    // 复权收盘价，仅日线及以上周期提供
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Deserialize, Debug)]
struct YahooAdjClose {
    adjclose: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 将 chart 响应转换为 K 线列表。
///
/// # Logic
/// 1. 接口返回错误时：`Not Found` 映射为 `NotFound`，其余为 `Source`。
/// 2. 开高低收任一缺失的行直接丢弃（节假日与盘中空洞）。
/// 3. 有复权收盘价时按 `adjclose / close` 等比调整四个价格。
/// 4. 时间戳重复时保留后出现的一行（盘中实时行会与最后一根重叠），时间戳倒退视为解析错误。
///
/// # Returns
/// 按时间升序的 K 线；没有任何可用行时返回 `NotFound`。
fn parse_chart(json: YahooResponse) -> Result<Vec<Bar>, MarketError> {
    if let Some(err) = json.chart.error {
        if err.code.as_deref() == Some("Not Found") {
            return Err(MarketError::NotFound);
        }
        return Err(MarketError::Source(err.description));
    }

    let result = json
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or(MarketError::NotFound)?;

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| MarketError::Parse("No quote data".into()))?;

    let adj_close_list = result
        .indicators
        .adjclose
        .as_ref()
        .and_then(|v| v.first())
        .map(|v| &v.adjclose);

    let mut bars: Vec<Bar> = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
        ) else {
            continue;
        };

        let time = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| MarketError::Parse(format!("invalid timestamp {}", ts)))?;

        let ratio = adj_close_list
            .and_then(|list| list.get(i).copied().flatten())
            .filter(|adj| adj.is_finite() && close > 0.0)
            .map_or(1.0, |adj| adj / close);

        let bar = Bar {
            time,
            open: open * ratio,
            high: high * ratio,
            low: low * ratio,
            close: close * ratio,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
        };

        match bars.last_mut() {
            Some(last) if last.time == bar.time => *last = bar,
            Some(last) if last.time > bar.time => {
                return Err(MarketError::Parse(format!(
                    "timestamp {} goes backwards after {}",
                    bar.time, last.time
                )));
            }
            _ => bars.push(bar),
        }
    }

    if bars.is_empty() {
        return Err(MarketError::NotFound);
    }
    Ok(bars)
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取 K 线历史数据。
    ///
    /// # Logic
    /// 1. 映射 TimeFrame 周期为 Yahoo 识别的 interval。
    /// 2. 请求原生周期数据并解析。
    /// 3. 4 小时线由 60 分钟线按 UTC 对齐的桶重采样得到。
    ///
    /// # Arguments
    /// * `instrument`: 标的身份。
    /// * `timeframe`: 周期。
    /// * `start`: 开始时间。
    /// * `end`: 结束时间。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_bars(
        &self,
        instrument: &Instrument,
        timeframe: TimeFrame,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, MarketError> {
        let bars = self
            .fetch_native(&instrument.symbol, native_interval(timeframe), start, end)
            .await?;

        if timeframe != TimeFrame::Hour4 {
            return Ok(bars);
        }

        let hourly = Series::new(instrument.clone(), TimeFrame::Hour1, bars)
            .map_err(|e| MarketError::Parse(e.to_string()))?;
        let resampled =
            resample(&hourly, TimeFrame::Hour4).map_err(|e| MarketError::Parse(e.to_string()))?;
        Ok(resampled.into_bars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Vec<Bar>, MarketError> {
        parse_chart(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_parse_adjusts_and_skips_gaps() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704067200,1704153600,1704240000],
            "indicators":{
                "quote":[{
                    "open":[10.0,null,12.0],
                    "high":[12.0,13.0,14.0],
                    "low":[9.0,10.0,11.0],
                    "close":[11.0,12.0,13.0],
                    "volume":[100.0,200.0,null]
                }],
                "adjclose":[{"adjclose":[5.5,6.0,13.0]}]
            }
        }],"error":null}}"#;

        let bars = parse(body).unwrap();
        assert_eq!(bars.len(), 2);

        // 复权比例 0.5
        assert_eq!(bars[0].open, 5.0);
        assert_eq!(bars[0].high, 6.0);
        assert_eq!(bars[0].close, 5.5);
        assert_eq!(bars[0].volume, 100.0);

        assert_eq!(bars[1].close, 13.0);
        assert_eq!(bars[1].volume, 0.0);
        assert_eq!(bars[1].time.timestamp(), 1704240000);
    }

    #[test]
    fn test_parse_keeps_last_duplicate_timestamp() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704067200,1704070800,1704070800],
            "indicators":{"quote":[{
                "open":[10.0,11.0,11.0],
                "high":[12.0,12.0,12.5],
                "low":[9.0,10.0,10.0],
                "close":[11.0,11.5,12.2],
                "volume":[1.0,1.0,2.0]
            }]}
        }],"error":null}}"#;

        let bars = parse(body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 12.2);
    }

    #[test]
    fn test_parse_rejects_backwards_timestamp() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1704067200,1704153600,1704067200],
            "indicators":{"quote":[{
                "open":[10.0,11.0,9.0],
                "high":[12.0,12.0,9.5],
                "low":[9.0,10.0,8.5],
                "close":[11.0,11.5,9.2],
                "volume":[1.0,1.0,1.0]
            }]}
        }],"error":null}}"#;

        assert!(matches!(parse(body), Err(MarketError::Parse(_))));
    }

    #[test]
    fn test_parse_errors() {
        let not_found = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse(not_found), Err(MarketError::NotFound)));

        let other = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse(other), Err(MarketError::Source(_))));

        let empty = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(matches!(parse(empty), Err(MarketError::NotFound)));
    }

    #[test]
    fn test_native_interval() {
        assert_eq!(native_interval(TimeFrame::Hour4), "60m");
        assert_eq!(native_interval(TimeFrame::Week1), "1wk");
        assert_eq!(native_interval(TimeFrame::Month1), "1mo");
    }

    #[test]
    fn test_transient_errors() {
        assert!(MarketError::RateLimited.is_transient());
        assert!(MarketError::Network("timeout".into()).is_transient());
        assert!(!MarketError::NotFound.is_transient());
        assert!(!MarketError::Source("Invalid input".into()).is_transient());
    }
}
