use hadx_core::analysis::error::AnalysisError;
use hadx_core::market::entity::{Bar, Series};
use tracing::trace;

/// Wilder 默认窗口
pub const DEFAULT_PERIOD: usize = 14;

/// # Summary
/// Wilder 递推平滑器，等价于 `ewm(alpha = 1/period, adjust = False)`。
///
/// # Invariants
/// - 首个输入直接作为种子值。
/// - 其后 `S[i] = S[i-1] + alpha * (X[i] - S[i-1])`，不使用窗口加权平均。
#[derive(Debug, Clone)]
pub struct WilderSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl WilderSmoother {
    /// # Summary
    /// 以窗口长度创建平滑器。
    ///
    /// # Returns
    /// `period` 为 0 或超出 `u32` 时返回 `InvalidParameter`。
    pub fn new(period: usize) -> Result<Self, AnalysisError> {
        if period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "period must be at least 1".to_string(),
            ));
        }
        let period = u32::try_from(period).map_err(|_| {
            AnalysisError::InvalidParameter(format!("period {} is too large", period))
        })?;

        Ok(Self {
            alpha: 1.0 / f64::from(period),
            value: None,
        })
    }

    /// 推入一个新值并返回平滑结果
    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => prev + self.alpha * (x - prev),
            None => x,
        };
        self.value = Some(next);
        next
    }

    /// 当前平滑值，尚未输入时为 None
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// # Summary
/// 方向运动指标的完整输出。
///
/// # Invariants
/// - 三个序列与输入 K 线等长。
/// - 前 `period` 个值为 NaN，表示预热期数据不足。
#[derive(Debug, Clone, PartialEq)]
pub struct DmiSeries {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

/// 单根 K 线的真实波幅与方向运动
fn directional_movement(bar: &Bar, prev: Option<&Bar>) -> (f64, f64, f64) {
    let Some(prev) = prev else {
        return (bar.high - bar.low, 0.0, 0.0);
    };

    let tr = (bar.high - bar.low)
        .max((bar.high - prev.close).abs())
        .max((bar.low - prev.close).abs());

    let up = bar.high - prev.high;
    let down = prev.low - bar.low;
    let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
    let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };

    (tr, plus_dm, minus_dm)
}

/// # Summary
/// 计算 +DI / -DI / ADX。
///
/// # Logic
/// 1. 逐根计算 TR、+DM、-DM（首根 TR = high - low，DM 为 0）。
/// 2. 对 TR、+DM、-DM 分别做 Wilder 递推平滑。
/// 3. 平滑 TR 为 0 时 +DI、-DI 记为 0，避免除零。
/// 4. `+DI + -DI` 为 0 时 DX 记为 0。
/// 5. 对 DX 再做一次 Wilder 平滑得到 ADX，并夹在 [0, 100]。
/// 6. 前 `period` 个输出以 NaN 屏蔽。
///
/// # Arguments
/// * `bars`: 按时间升序排列的原始 K 线（不是 Heikin-Ashi K 线）。
/// * `period`: Wilder 窗口，至少为 1。
///
/// # Returns
/// 成功返回 `DmiSeries`；`period` 非法返回 `InvalidParameter`。
pub fn compute_dmi(bars: &[Bar], period: usize) -> Result<DmiSeries, AnalysisError> {
    let mut tr_smooth = WilderSmoother::new(period)?;
    let mut plus_smooth = WilderSmoother::new(period)?;
    let mut minus_smooth = WilderSmoother::new(period)?;
    let mut adx_smooth = WilderSmoother::new(period)?;

    let n = bars.len();
    let mut out = DmiSeries {
        plus_di: Vec::with_capacity(n),
        minus_di: Vec::with_capacity(n),
        adx: Vec::with_capacity(n),
    };

    let mut prev: Option<&Bar> = None;
    for (i, bar) in bars.iter().enumerate() {
        let (tr, plus_dm, minus_dm) = directional_movement(bar, prev);
        prev = Some(bar);

        let tr_s = tr_smooth.update(tr);
        let plus_s = plus_smooth.update(plus_dm);
        let minus_s = minus_smooth.update(minus_dm);

        let (plus_di, minus_di) = if tr_s == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * plus_s / tr_s, 100.0 * minus_s / tr_s)
        };

        let di_sum = plus_di + minus_di;
        let dx = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };

        let adx = adx_smooth.update(dx).clamp(0.0, 100.0);

        if i < period {
            out.plus_di.push(f64::NAN);
            out.minus_di.push(f64::NAN);
            out.adx.push(f64::NAN);
        } else {
            out.plus_di.push(plus_di);
            out.minus_di.push(minus_di);
            out.adx.push(adx);
        }
    }

    trace!(bars = n, period, "dmi computed");
    Ok(out)
}

/// # Summary
/// 计算与序列一一对齐的 ADX。
///
/// # Logic
/// 1. 调用 `compute_dmi` 并只保留 ADX 分量。
///
/// # Arguments
/// * `series`: 原始 K 线序列。
/// * `period`: Wilder 窗口。
///
/// # Returns
/// 与序列等长的 ADX 列表，预热期为 NaN。
pub fn compute_adx(series: &Series, period: usize) -> Result<Vec<f64>, AnalysisError> {
    compute_adx_bars(series.bars(), period)
}

/// 切片版本的 `compute_adx`
pub fn compute_adx_bars(bars: &[Bar], period: usize) -> Result<Vec<f64>, AnalysisError> {
    Ok(compute_dmi(bars, period)?.adx)
}
