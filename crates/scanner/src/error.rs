use hadx_core::analysis::error::AnalysisError;
use hadx_core::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 单个扫描目标的失败原因。
///
/// # Invariants
/// - 只在扫描器内部被捕获并记录，不会中断其他目标。
#[derive(Error, Debug)]
pub enum ScanError {
    // 数据源获取失败
    #[error("Market data error: {0}")]
    Market(#[from] MarketError),
    // 序列校验或指标计算失败
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    // 取消信号到达时尚未开始调度
    #[error("Cancelled before scheduling")]
    Cancelled,
    // 工作任务异常退出
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl ScanError {
    /// 数据不足属于预期内的跳过，不视为异常
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ScanError::Analysis(AnalysisError::InsufficientData { .. })
        )
    }

    /// 网络或限流类失败，下次扫描可能恢复
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::Market(e) if e.is_transient())
    }
}
