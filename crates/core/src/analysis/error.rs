use thiserror::Error;

/// # Summary
/// 指标计算与信号扫描错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 纯计算组件只返回该错误，不做吞没；只有扫描器可以按标的记录后继续。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// 序列长度不足以完成预热，应跳过该标的
    #[error("Insufficient data: required {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Heikin-Ashi 序列与 ADX 序列长度不一致，属于集成错误
    #[error("Shape mismatch: heikin-ashi series has {ha} values, adx series has {adx}")]
    ShapeMismatch { ha: usize, adx: usize },

    /// 某根 K 线违反 OHLC 约束或时间顺序
    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    /// 参数非法 (例如 period 为 0)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
