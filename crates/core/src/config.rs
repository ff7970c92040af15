use crate::common::TimeFrame;
use serde::{Deserialize, Serialize};

/// # Summary
/// 信号引擎配置，纯计算组件只读取这一组参数。
///
/// # Invariants
/// - `period >= 1`。
/// - `threshold` 为有限值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    // Wilder 平滑窗口
    pub period: usize,
    // 入场所需的 ADX 门槛 (严格大于)
    pub threshold: f64,
    // 是否在真实迁移之外追加当前状态快照事件
    pub snapshot_mode: bool,
    // 分析所需的最少 K 线数量，实际门槛取 max(min_bars, period + 1)
    pub min_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            period: 14,
            threshold: 20.0,
            snapshot_mode: false,
            min_bars: 50,
        }
    }
}

impl EngineConfig {
    /// # Summary
    /// 校验参数合法性。
    ///
    /// # Returns
    /// 非法时返回描述字符串。
    pub fn validate(&self) -> Result<(), String> {
        if self.period == 0 {
            return Err("engine.period must be at least 1".to_string());
        }
        if !self.threshold.is_finite() {
            return Err("engine.threshold must be finite".to_string());
        }
        Ok(())
    }

    /// 单个标的进入分析所需的最少 K 线数
    pub fn required_bars(&self) -> usize {
        self.min_bars.max(self.period + 1)
    }
}

/// # Summary
/// 批量扫描配置。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    // 同时在途的标的数量上限，受数据源限流约束
    pub max_concurrency: usize,
    // 每个标的向数据源请求的历史 K 线数量
    pub history_bars: usize,
    // 每个 (标的, 周期) 只保留最近一个事件
    pub latest_only: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            history_bars: 300,
            latest_only: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    // 日志过滤表达式，RUST_LOG 优先
    pub filter: String,
    // 按天滚动的日志目录，为空则只输出到终端
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            dir: None,
        }
    }
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub scan: ScanConfig,
    // 扫描的标的列表
    pub watchlist: Vec<String>,
    // 扫描的周期列表
    pub timeframes: Vec<TimeFrame>,
    // 未配置时只打印报告
    pub telegram: Option<TelegramConfig>,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            scan: ScanConfig::default(),
            watchlist: ["SPY", "QQQ", "AAPL", "MSFT", "NVDA", "GGAL", "YPF", "MELI"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeframes: vec![TimeFrame::Month1, TimeFrame::Week1, TimeFrame::Day1],
            telegram: None,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.period, 14);
        assert_eq!(config.engine.threshold, 20.0);
        assert!(!config.engine.snapshot_mode);
        assert_eq!(config.engine.required_bars(), 50);
        assert_eq!(config.scan.max_concurrency, 8);
        assert_eq!(
            config.timeframes,
            vec![TimeFrame::Month1, TimeFrame::Week1, TimeFrame::Day1]
        );
        assert!(config.telegram.is_none());
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_required_bars_respects_period() {
        let config = EngineConfig {
            period: 60,
            ..EngineConfig::default()
        };
        assert_eq!(config.required_bars(), 61);
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let config = EngineConfig {
            period: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"engine": {"threshold": 25.0}, "watchlist": ["TSLA"]}"#)
                .unwrap();
        assert_eq!(config.engine.threshold, 25.0);
        assert_eq!(config.engine.period, 14);
        assert_eq!(config.watchlist, vec!["TSLA".to_string()]);
        assert_eq!(config.scan, ScanConfig::default());
    }

    #[test]
    fn test_timeframes_use_short_names() {
        let config: AppConfig =
            serde_json::from_str(r#"{"timeframes": ["1mo", "1wk", "4h"]}"#).unwrap();
        assert_eq!(
            config.timeframes,
            vec![TimeFrame::Month1, TimeFrame::Week1, TimeFrame::Hour4]
        );
        assert!(serde_json::from_str::<AppConfig>(r#"{"timeframes": ["Day1"]}"#).is_err());
    }
}
