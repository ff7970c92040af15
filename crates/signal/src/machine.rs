use hadx_core::analysis::entity::{
    CandleColor, HeikinAshiBar, SignalEvent, SignalKind, SignalOrigin,
};
use hadx_core::analysis::error::AnalysisError;
use hadx_core::config::EngineConfig;
use tracing::debug;

/// # Summary
/// 信号状态机的持仓状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    // 空仓 (初始状态)
    Flat,
    // 持仓
    Long,
}

/// # Summary
/// 扫描输出模式。
///
/// # Invariants
/// - `Transitions` 只返回真实迁移。
/// - `Snapshot` 在真实迁移之后追加一个描述当前状态的合成事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Transitions,
    Snapshot,
}

impl ScanMode {
    pub fn from_config(config: &EngineConfig) -> Self {
        if config.snapshot_mode {
            ScanMode::Snapshot
        } else {
            ScanMode::Transitions
        }
    }
}

/// # Summary
/// FLAT / LONG 两状态信号机。
///
/// # Invariants
/// - 入场需要 Bullish 且 ADX 严格大于门槛。
/// - 出场只看 Bearish，不受 ADX 约束。
/// - NaN 的 ADX 与任何门槛比较均为 false，预热期不会入场。
#[derive(Debug, Clone)]
pub struct SignalMachine {
    threshold: f64,
    state: PositionState,
}

impl SignalMachine {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: PositionState::Flat,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    /// # Summary
    /// 推进一根 K 线。
    ///
    /// # Logic
    /// 1. FLAT 且 Bullish 且 `adx > threshold`：迁移到 LONG，产出 ENTER_LONG。
    /// 2. LONG 且 Bearish：迁移到 FLAT，产出 EXIT_LONG。
    /// 3. 其余情况保持原状态。
    ///
    /// # Arguments
    /// * `bar`: 当前 Heikin-Ashi K 线。
    /// * `adx`: 同索引的 ADX 值。
    ///
    /// # Returns
    /// 发生迁移时返回事件。
    pub fn step(&mut self, bar: &HeikinAshiBar, adx: f64) -> Option<SignalEvent> {
        let kind = match (self.state, bar.color) {
            (PositionState::Flat, CandleColor::Bullish) if adx > self.threshold => {
                self.state = PositionState::Long;
                SignalKind::EnterLong
            }
            (PositionState::Long, CandleColor::Bearish) => {
                self.state = PositionState::Flat;
                SignalKind::ExitLong
            }
            _ => return None,
        };

        Some(event(bar, adx, kind, SignalOrigin::Transition))
    }
}

fn event(bar: &HeikinAshiBar, adx: f64, kind: SignalKind, origin: SignalOrigin) -> SignalEvent {
    SignalEvent {
        time: bar.time,
        kind,
        price: bar.price,
        trend_strength: adx,
        origin,
    }
}

fn check_shape(ha: &[HeikinAshiBar], adx: &[f64]) -> Result<(), AnalysisError> {
    if ha.len() != adx.len() {
        return Err(AnalysisError::ShapeMismatch {
            ha: ha.len(),
            adx: adx.len(),
        });
    }
    Ok(())
}

/// # Summary
/// 遍历整条序列，返回全部真实迁移事件。
///
/// # Logic
/// 1. 校验两条序列等长。
/// 2. 从索引 1 开始逐根推进状态机，索引 0 仅作为种子。
/// 3. 序列结束时不强制平仓。
///
/// # Arguments
/// * `ha`: Heikin-Ashi 序列。
/// * `adx`: 与之对齐的 ADX 序列。
/// * `threshold`: 入场门槛。
///
/// # Returns
/// 按时间升序排列的事件列表，ENTER/EXIT 严格交替且以 ENTER 开头。
pub fn scan_transitions(
    ha: &[HeikinAshiBar],
    adx: &[f64],
    threshold: f64,
) -> Result<Vec<SignalEvent>, AnalysisError> {
    check_shape(ha, adx)?;

    let mut machine = SignalMachine::new(threshold);
    let events: Vec<SignalEvent> = ha
        .iter()
        .zip(adx)
        .skip(1)
        .filter_map(|(bar, &value)| machine.step(bar, value))
        .collect();

    debug!(bars = ha.len(), events = events.len(), "transitions scanned");
    Ok(events)
}

/// # Summary
/// 真实迁移加上一个描述当前隐含状态的合成事件。
///
/// # Invariants
/// - 快照事件不参与 ENTER/EXIT 交替：从未入场时最后一根为 Bearish 也会得到 EXIT_LONG 快照。
/// - 同一根 K 线最多一个事件。
///
/// # Logic
/// 1. 先执行 `scan_transitions`。
/// 2. 序列至少两根时，以最后一根的颜色合成事件：Bullish 记为 ENTER_LONG，Bearish 记为 EXIT_LONG，
///    来源标记为 `Snapshot`。即使从未发生真实迁移也会追加。
/// 3. 最后一根已经产生真实迁移时不再合成，该迁移的方向必然与最后一根颜色一致。
///
/// # Returns
/// 事件列表，最后一个元素描述当前状态（序列不足两根时没有快照）。
pub fn scan_snapshot(
    ha: &[HeikinAshiBar],
    adx: &[f64],
    threshold: f64,
) -> Result<Vec<SignalEvent>, AnalysisError> {
    let mut events = scan_transitions(ha, adx, threshold)?;

    if ha.len() < 2 {
        return Ok(events);
    }
    if let (Some(bar), Some(&value)) = (ha.last(), adx.last()) {
        if events.last().is_some_and(|e| e.time == bar.time) {
            return Ok(events);
        }
        let kind = match bar.color {
            CandleColor::Bullish => SignalKind::EnterLong,
            CandleColor::Bearish => SignalKind::ExitLong,
        };
        events.push(event(bar, value, kind, SignalOrigin::Snapshot));
    }

    Ok(events)
}

/// 按模式分派到 `scan_transitions` 或 `scan_snapshot`
pub fn scan(
    ha: &[HeikinAshiBar],
    adx: &[f64],
    threshold: f64,
    mode: ScanMode,
) -> Result<Vec<SignalEvent>, AnalysisError> {
    match mode {
        ScanMode::Transitions => scan_transitions(ha, adx, threshold),
        ScanMode::Snapshot => scan_snapshot(ha, adx, threshold),
    }
}

/// # Summary
/// 只比较最后两根 K 线的颜色翻转，用于即时告警。
///
/// # Logic
/// 1. 校验两条序列等长，不足两根返回 None。
/// 2. Bearish -> Bullish 且最后一根 `adx > threshold`：ENTER_LONG。
/// 3. Bullish -> Bearish：EXIT_LONG。
///
/// # Returns
/// 最后一根发生翻转时返回事件。
pub fn detect_flip(
    ha: &[HeikinAshiBar],
    adx: &[f64],
    threshold: f64,
) -> Result<Option<SignalEvent>, AnalysisError> {
    check_shape(ha, adx)?;

    let n = ha.len();
    if n < 2 {
        return Ok(None);
    }
    let (prev, curr, value) = (&ha[n - 2], &ha[n - 1], adx[n - 1]);

    let kind = match (prev.color, curr.color) {
        (CandleColor::Bearish, CandleColor::Bullish) if value > threshold => SignalKind::EnterLong,
        (CandleColor::Bullish, CandleColor::Bearish) => SignalKind::ExitLong,
        _ => return Ok(None),
    };

    Ok(Some(event(curr, value, kind, SignalOrigin::Transition)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn ha_bars(colors: &[CandleColor]) -> Vec<HeikinAshiBar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        colors
            .iter()
            .zip(0i32..)
            .map(|(&color, i)| {
                let (open, close) = match color {
                    CandleColor::Bullish => (10.0, 11.0),
                    CandleColor::Bearish => (11.0, 10.0),
                };
                HeikinAshiBar {
                    time: t0 + Duration::days(i64::from(i)),
                    open,
                    high: 11.5,
                    low: 9.5,
                    close,
                    price: 100.0 + f64::from(i),
                    color,
                }
            })
            .collect()
    }

    use hadx_core::analysis::entity::CandleColor::{Bearish as D, Bullish as U};

    #[test]
    fn test_enter_then_exit_on_color_flip() {
        let ha = ha_bars(&[D, U, U, U, U, U, U, U, D, D]);
        let adx = [f64::NAN, 12.0, 18.0, 21.0, 24.0, 26.0, 27.0, 28.0, 29.0, 30.0];

        let events = scan_transitions(&ha, &adx, 20.0).unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].kind, SignalKind::EnterLong);
        assert_eq!(events[0].time, ha[3].time);
        assert_eq!(events[0].price, 103.0);
        assert_eq!(events[0].trend_strength, 21.0);
        assert_eq!(events[0].origin, SignalOrigin::Transition);

        // 出场时 ADX 仍然很强
        assert_eq!(events[1].kind, SignalKind::ExitLong);
        assert_eq!(events[1].time, ha[8].time);
    }

    #[test]
    fn test_shape_mismatch() {
        let ha = ha_bars(&[U; 40]);
        let adx = vec![30.0; 39];
        assert_eq!(
            scan_transitions(&ha, &adx, 20.0),
            Err(AnalysisError::ShapeMismatch { ha: 40, adx: 39 })
        );
        assert!(detect_flip(&ha, &adx, 20.0).is_err());
    }

    #[test]
    fn test_first_bar_never_signals() {
        let ha = ha_bars(&[U, U]);
        let events = scan_transitions(&ha, &[50.0, 10.0], 20.0).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_threshold_is_strict_and_nan_never_enters() {
        let ha = ha_bars(&[D, U, U, U]);
        let events = scan_transitions(&ha, &[f64::NAN, f64::NAN, 20.0, 20.5], 20.0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time, ha[3].time);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(scan_transitions(&[], &[], 20.0).unwrap().is_empty());
        assert!(scan_snapshot(&[], &[], 20.0).unwrap().is_empty());
        assert_eq!(detect_flip(&[], &[], 20.0), Ok(None));
    }

    #[test]
    fn test_snapshot_appends_current_state() {
        let ha = ha_bars(&[D, U, U]);
        let adx = [f64::NAN, 5.0, 6.0];

        assert!(scan_transitions(&ha, &adx, 20.0).unwrap().is_empty());

        let events = scan_snapshot(&ha, &adx, 20.0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SignalKind::EnterLong);
        assert_eq!(events[0].origin, SignalOrigin::Snapshot);
        assert_eq!(events[0].time, ha[2].time);

        let bearish = ha_bars(&[U, D]);
        let events = scan(&bearish, &[f64::NAN, f64::NAN], 20.0, ScanMode::Snapshot).unwrap();
        assert_eq!(events[0].kind, SignalKind::ExitLong);
        assert!(events[0].trend_strength.is_nan());
    }

    #[test]
    fn test_snapshot_skipped_when_last_bar_transitions() {
        let ha = ha_bars(&[D, D, U]);
        let adx = [f64::NAN, 10.0, 30.0];

        let events = scan_snapshot(&ha, &adx, 20.0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SignalKind::EnterLong);
        assert_eq!(events[0].origin, SignalOrigin::Transition);
        assert_eq!(events[0].time, ha[2].time);
    }

    #[test]
    fn test_bearish_snapshot_without_entry() {
        // 从未入场，快照仍然报告当前为 Bearish
        let ha = ha_bars(&[U, D]);
        let events = scan_snapshot(&ha, &[f64::NAN, 35.0], 20.0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SignalKind::ExitLong);
        assert_eq!(events[0].origin, SignalOrigin::Snapshot);
        assert_eq!(events[0].time, ha[1].time);
    }

    #[test]
    fn test_mode_from_config() {
        let mut config = EngineConfig::default();
        assert_eq!(ScanMode::from_config(&config), ScanMode::Transitions);
        config.snapshot_mode = true;
        assert_eq!(ScanMode::from_config(&config), ScanMode::Snapshot);
    }

    #[test]
    fn test_detect_flip() {
        let up = ha_bars(&[D, U]);
        let flip = detect_flip(&up, &[10.0, 25.0], 20.0).unwrap().unwrap();
        assert_eq!(flip.kind, SignalKind::EnterLong);

        // 趋势不足时不告警入场
        assert_eq!(detect_flip(&up, &[10.0, 15.0], 20.0), Ok(None));

        let down = ha_bars(&[U, D]);
        let flip = detect_flip(&down, &[10.0, 5.0], 20.0).unwrap().unwrap();
        assert_eq!(flip.kind, SignalKind::ExitLong);

        let same = ha_bars(&[U, U]);
        assert_eq!(detect_flip(&same, &[30.0, 30.0], 20.0), Ok(None));
    }

    #[test]
    fn test_machine_state_tracks_position() {
        let ha = ha_bars(&[U, D]);
        let mut machine = SignalMachine::new(20.0);
        assert_eq!(machine.state(), PositionState::Flat);

        assert!(machine.step(&ha[0], 25.0).is_some());
        assert_eq!(machine.state(), PositionState::Long);

        // 持仓时再次 Bullish 不重复入场
        assert!(machine.step(&ha[0], 25.0).is_none());
        assert!(machine.step(&ha[1], 25.0).is_some());
        assert_eq!(machine.state(), PositionState::Flat);
    }
}
