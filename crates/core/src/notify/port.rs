use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 扫描报告的投递通道。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync`。
/// - 转义、格式化与超长消息拆分由实现方负责，调用方只提供纯文本。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 通道名称，用于日志
    fn channel(&self) -> &'static str;

    /// # Summary
    /// 投递一份报告。
    ///
    /// # Arguments
    /// * `subject` - 报告标题。
    /// * `content` - 纯文本正文，可能超过单条消息上限。
    ///
    /// # Returns
    /// 全部投递成功返回 `Ok(())`；拆分发送时在第一段失败处停止并返回错误。
    async fn notify(&self, subject: &str, content: &str) -> Result<(), NotifyError>;
}
