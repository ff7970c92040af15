use crate::analysis::error::AnalysisError;
use crate::common::{Instrument, TimeFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - 价格均为正的有限值。
/// - `low <= min(open, close) <= max(open, close) <= high`。
/// - 一旦由数据源产出即不可变，由所属的 `Series` 独占。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量 (指标计算不使用，仅随重采样累加)
    pub volume: f64,
}

impl Bar {
    /// # Summary
    /// 校验单根 K 线是否满足 OHLC 约束。
    ///
    /// # Logic
    /// 1. 四个价格必须是有限正数。
    /// 2. `low` 不得高于开收盘中的较小值，`high` 不得低于其中的较大值。
    ///
    /// # Returns
    /// 合法返回 `Ok(())`，否则返回违规原因描述。
    pub fn check(&self) -> Result<(), String> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be a positive finite number, got {}", name, value));
            }
        }

        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low {
            return Err(format!("low {} above candle body {}", self.low, body_low));
        }
        if self.high < body_high {
            return Err(format!("high {} below candle body {}", self.high, body_high));
        }
        Ok(())
    }
}

/// # Summary
/// 单个 (标的, 周期) 的有序 K 线序列。
///
/// # Invariants
/// - 时间戳严格递增。
/// - 每根 K 线都通过 `Bar::check`。
/// - 只能通过 `Series::new` 构造，构造后不可变。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    instrument: Instrument,
    timeframe: TimeFrame,
    bars: Vec<Bar>,
}

impl Series {
    /// # Summary
    /// 校验并构造一条 K 线序列。
    ///
    /// # Logic
    /// 1. 逐根校验 OHLC 约束。
    /// 2. 校验时间戳严格递增。
    /// 3. 任意一根不合法即拒绝整条序列，递推指标无法跳过中间的坏数据。
    ///
    /// # Arguments
    /// * `instrument`: 标的身份。
    /// * `timeframe`: K 线周期。
    /// * `bars`: 按时间升序排列的 K 线。
    ///
    /// # Returns
    /// 成功返回 `Series`，失败返回 `AnalysisError::InvalidBar`。
    pub fn new(
        instrument: Instrument,
        timeframe: TimeFrame,
        bars: Vec<Bar>,
    ) -> Result<Self, AnalysisError> {
        for (index, bar) in bars.iter().enumerate() {
            bar.check()
                .map_err(|reason| AnalysisError::InvalidBar { index, reason })?;
        }

        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].time <= pair[0].time {
                return Err(AnalysisError::InvalidBar {
                    index: index + 1,
                    reason: format!(
                        "timestamp {} not after previous {}",
                        pair[1].time, pair[0].time
                    ),
                });
            }
        }

        Ok(Self {
            instrument,
            timeframe,
            bars,
        })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// # Summary
    /// 断言序列长度不少于 `required`。
    ///
    /// # Returns
    /// 长度不足时返回 `AnalysisError::InsufficientData`。
    pub fn require_len(&self, required: usize) -> Result<(), AnalysisError> {
        if self.bars.len() < required {
            return Err(AnalysisError::InsufficientData {
                required,
                actual: self.bars.len(),
            });
        }
        Ok(())
    }

    /// 拆出内部 K 线，供重采样等需要所有权的场景使用
    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(day: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_series_accepts_valid_bars() {
        let series = Series::new(
            Instrument::new("AAPL"),
            TimeFrame::Day1,
            vec![bar(0, 10.0, 12.0, 9.0, 11.0), bar(1, 11.0, 11.0, 8.0, 9.0)],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().close, 9.0);
        assert!(series.require_len(2).is_ok());
        assert!(matches!(
            series.require_len(3),
            Err(AnalysisError::InsufficientData {
                required: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_series_rejects_ohlc_violation() {
        let err = Series::new(
            Instrument::new("AAPL"),
            TimeFrame::Day1,
            vec![bar(0, 10.0, 12.0, 9.0, 11.0), bar(1, 11.0, 10.5, 8.0, 9.0)],
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBar { index: 1, .. }));
    }

    #[test]
    fn test_series_rejects_non_finite_price() {
        let err = Series::new(
            Instrument::new("AAPL"),
            TimeFrame::Day1,
            vec![bar(0, f64::NAN, 12.0, 9.0, 11.0)],
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBar { index: 0, .. }));
    }

    #[test]
    fn test_series_rejects_duplicate_timestamp() {
        let err = Series::new(
            Instrument::new("AAPL"),
            TimeFrame::Day1,
            vec![bar(3, 10.0, 12.0, 9.0, 11.0), bar(3, 11.0, 12.0, 8.0, 9.0)],
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBar { index: 1, .. }));
    }

    #[test]
    fn test_empty_series_is_allowed() {
        let series = Series::new(Instrument::new("AAPL"), TimeFrame::Day1, vec![]).unwrap();
        assert!(series.is_empty());
        assert!(series.last().is_none());
    }
}
