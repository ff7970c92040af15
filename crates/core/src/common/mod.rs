use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod time;

/// # Summary
/// 交易标的实体，代表扫描关注的特定股票、ETF 或加密货币对。
///
/// # Invariants
/// - `symbol` 必须是数据源可识别的交易代码。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Instrument {
    // 交易代码 (例如: AAPL, GGAL, BTC-USD)
    pub symbol: String,
    // 交易所代码 (可选，例如: NASDAQ, BCBA)
    pub exchange: Option<String>,
}

impl Instrument {
    /// 以交易代码创建不带交易所信息的标的
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: None,
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.exchange {
            Some(exchange) => write!(f, "{}:{}", exchange, self.symbol),
            None => write!(f, "{}", self.symbol),
        }
    }
}

/// # Summary
/// 交易时间周期枚举，定义 K 线的时间跨度。
///
/// # Invariants
/// - 枚举声明顺序即周期由细到粗的顺序，`Ord` 依赖该顺序。
/// - 序列化名称与 `Display` 一致，配置文件中写 `"1d"`、`"1w"` 等。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeFrame {
    // 1分钟
    #[serde(rename = "1m")]
    Minute1,
    // 5分钟
    #[serde(rename = "5m")]
    Minute5,
    // 1小时
    #[serde(rename = "1h")]
    Hour1,
    // 4小时
    #[serde(rename = "4h")]
    Hour4,
    // 1日
    #[serde(rename = "1d")]
    Day1,
    // 1周
    #[serde(rename = "1w", alias = "1wk")]
    Week1,
    // 1月
    #[serde(rename = "1mo")]
    Month1,
}

impl TimeFrame {
    /// # Summary
    /// 返回该周期的名义时长。
    ///
    /// # Logic
    /// 月线按 31 天估算，仅用于推算历史抓取窗口，不参与分桶。
    ///
    /// # Returns
    /// 周期对应的 `chrono::Duration`。
    pub fn duration(&self) -> Duration {
        match self {
            TimeFrame::Minute1 => Duration::minutes(1),
            TimeFrame::Minute5 => Duration::minutes(5),
            TimeFrame::Hour1 => Duration::hours(1),
            TimeFrame::Hour4 => Duration::hours(4),
            TimeFrame::Day1 => Duration::days(1),
            TimeFrame::Week1 => Duration::weeks(1),
            TimeFrame::Month1 => Duration::days(31),
        }
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "minute1" => Ok(TimeFrame::Minute1),
            "5m" | "minute5" => Ok(TimeFrame::Minute5),
            "1h" | "hour1" => Ok(TimeFrame::Hour1),
            "4h" | "hour4" => Ok(TimeFrame::Hour4),
            "1d" | "day1" => Ok(TimeFrame::Day1),
            "1w" | "1wk" | "week1" => Ok(TimeFrame::Week1),
            "1mo" | "month1" => Ok(TimeFrame::Month1),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute1 => write!(f, "1m"),
            TimeFrame::Minute5 => write!(f, "5m"),
            TimeFrame::Hour1 => write!(f, "1h"),
            TimeFrame::Hour4 => write!(f, "4h"),
            TimeFrame::Day1 => write!(f, "1d"),
            TimeFrame::Week1 => write!(f, "1w"),
            TimeFrame::Month1 => write!(f, "1mo"),
        }
    }
}
