use thiserror::Error;

/// # Summary
/// 通知投递错误。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 扫描结果不受投递失败影响，由调用方决定是否重试。
#[derive(Error, Debug)]
pub enum NotifyError {
    /// 凭据缺失或客户端无法构建
    #[error("Configuration error: {0}")]
    Config(String),

    /// 连接失败或超时
    #[error("Network error: {0}")]
    Network(String),

    /// 推送平台限流，附带平台建议的等待秒数
    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// 推送平台拒绝了消息 (例如 Markdown 解析失败、chat 不存在)
    #[error("Rejected by {channel}: {reason}")]
    Rejected { channel: &'static str, reason: String },
}
