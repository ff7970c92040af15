use crate::common::{Instrument, TimeFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// Heikin-Ashi K 线颜色。
///
/// # Invariants
/// - 仅当 `close > open` 严格成立时为 `Bullish`，相等归为 `Bearish`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleColor {
    Bullish,
    Bearish,
}

impl CandleColor {
    /// 根据开收盘价判定颜色
    pub fn of(open: f64, close: f64) -> Self {
        if close > open {
            CandleColor::Bullish
        } else {
            CandleColor::Bearish
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, CandleColor::Bullish)
    }
}

impl std::fmt::Display for CandleColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandleColor::Bullish => write!(f, "bullish"),
            CandleColor::Bearish => write!(f, "bearish"),
        }
    }
}

/// # Summary
/// 由原始 K 线推导出的 Heikin-Ashi K 线。
///
/// # Invariants
/// - `close` 只依赖同一索引的原始 K 线。
/// - `open` 只依赖前一根已计算的 Heikin-Ashi 值。
/// - 生成后不可变，不做持久化。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeikinAshiBar {
    // 与原始 K 线一致的时间戳
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    // 原始收盘价，作为信号的成交参考价
    pub price: f64,
    pub color: CandleColor,
}

/// # Summary
/// 信号类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    // 空仓 -> 持仓
    EnterLong,
    // 持仓 -> 空仓
    ExitLong,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::EnterLong => write!(f, "ENTER_LONG"),
            SignalKind::ExitLong => write!(f, "EXIT_LONG"),
        }
    }
}

/// # Summary
/// 信号来源：真实的状态迁移，或快照模式下合成的当前状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalOrigin {
    Transition,
    Snapshot,
}

/// # Summary
/// 信号状态机产出的离散事件。
///
/// # Invariants
/// - 携带足够的信息供通知方直接格式化，无需重新计算指标。
/// - `trend_strength` 在预热期内可能为 NaN（仅快照事件会出现）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalEvent {
    pub time: DateTime<Utc>,
    pub kind: SignalKind,
    // 触发 K 线的原始收盘价
    pub price: f64,
    // 触发 K 线的 ADX 值
    pub trend_strength: f64,
    pub origin: SignalOrigin,
}

/// # Summary
/// 扫描器聚合后的事件，附带来源标的与周期。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedEvent {
    pub instrument: Instrument,
    pub timeframe: TimeFrame,
    pub event: SignalEvent,
}
