use thiserror::Error;

/// # Summary
/// 行情数据源错误。
///
/// # Invariants
/// - 扫描器按目标记录该错误，不会中断其他目标。
#[derive(Error, Debug)]
pub enum MarketError {
    // 连接失败、超时或非 2xx 响应
    #[error("Network error: {0}")]
    Network(String),
    // 数据源限流 (HTTP 429)
    #[error("Rate limited by data source")]
    RateLimited,
    // 响应体无法解析
    #[error("Parse error: {0}")]
    Parse(String),
    // 标的不存在、已退市或窗口内没有可用 K 线
    #[error("No data for symbol")]
    NotFound,
    // 数据源返回的其他业务错误
    #[error("Data source error: {0}")]
    Source(String),
}

impl MarketError {
    /// 稍后重试可能成功的失败
    pub fn is_transient(&self) -> bool {
        matches!(self, MarketError::Network(_) | MarketError::RateLimited)
    }
}
