use hadx_core::analysis::entity::{CandleColor, SignalEvent};
use hadx_core::analysis::error::AnalysisError;
use hadx_core::common::{Instrument, TimeFrame};
use hadx_core::config::EngineConfig;
use hadx_core::market::entity::Series;
use hadx_indicator::adx::compute_adx;
use hadx_indicator::heikin_ashi::transform;
use hadx_signal::machine::{detect_flip, scan, ScanMode};
use serde::Serialize;
use tracing::debug;

/// # Summary
/// 单个 (标的, 周期) 的分析结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub instrument: Instrument,
    pub timeframe: TimeFrame,
    // 按时间升序的信号事件
    pub events: Vec<SignalEvent>,
    // 最后一根 Heikin-Ashi K 线的颜色
    pub latest_color: CandleColor,
    // 最后一根 K 线的 ADX，预热期为 NaN
    pub latest_adx: f64,
    // 最后两根 K 线是否发生颜色翻转
    pub flip: Option<SignalEvent>,
}

/// # Summary
/// 对一条已校验的序列执行完整的分析流水线。
///
/// # Logic
/// 1. 校验引擎参数。
/// 2. 序列长度不足 `required_bars` 时返回 `InsufficientData`。
/// 3. 依次计算 Heikin-Ashi、ADX，再交给信号状态机。
/// 4. 附带最后两根的翻转检测结果。
///
/// # Arguments
/// * `series`: 原始 K 线序列。
/// * `config`: 引擎配置。
///
/// # Returns
/// 成功返回 `Analysis`，任何一步失败都原样返回 `AnalysisError`。
pub fn analyze(series: &Series, config: &EngineConfig) -> Result<Analysis, AnalysisError> {
    config.validate().map_err(AnalysisError::InvalidParameter)?;
    series.require_len(config.required_bars())?;

    let ha = transform(series);
    let adx = compute_adx(series, config.period)?;
    let events = scan(&ha, &adx, config.threshold, ScanMode::from_config(config))?;
    let flip = detect_flip(&ha, &adx, config.threshold)?;

    let (Some(last), Some(&latest_adx)) = (ha.last(), adx.last()) else {
        // require_len 保证至少 period + 1 根
        return Err(AnalysisError::InsufficientData {
            required: config.required_bars(),
            actual: 0,
        });
    };

    debug!(
        instrument = %series.instrument(),
        timeframe = %series.timeframe(),
        events = events.len(),
        latest_color = %last.color,
        latest_adx,
        "series analyzed"
    );

    Ok(Analysis {
        instrument: series.instrument().clone(),
        timeframe: series.timeframe(),
        events,
        latest_color: last.color,
        latest_adx,
        flip,
    })
}
