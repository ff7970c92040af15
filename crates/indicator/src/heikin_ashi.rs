use hadx_core::analysis::entity::{CandleColor, HeikinAshiBar};
use hadx_core::market::entity::{Bar, Series};

/// # Summary
/// 将原始 K 线序列转换为 Heikin-Ashi 序列。
///
/// # Logic
/// 1. 直接委托给 `transform_bars`，输出与输入一一对应、时间戳相同。
///
/// # Arguments
/// * `series`: 已校验的原始 K 线序列。
///
/// # Returns
/// 与输入等长的 Heikin-Ashi K 线列表，空序列返回空列表。
pub fn transform(series: &Series) -> Vec<HeikinAshiBar> {
    transform_bars(series.bars())
}

/// # Summary
/// 对 K 线切片执行单次前向扫描，生成 Heikin-Ashi K 线。
///
/// # Logic
/// 1. `close = (open + high + low + close) / 4`，只依赖同索引原始 K 线。
/// 2. 首根 `open = (open + close) / 2`。
/// 3. 其后每根 `open = (前一根 ha_open + 前一根 ha_close) / 2`，只读取已计算的前值。
/// 4. `high`/`low` 取原始极值与 HA 开收盘的极值。
/// 5. 颜色按 `close > open` 严格判定，相等为 Bearish。
///
/// # Arguments
/// * `bars`: 按时间升序排列的原始 K 线。
///
/// # Returns
/// Heikin-Ashi K 线列表。
pub fn transform_bars(bars: &[Bar]) -> Vec<HeikinAshiBar> {
    let mut out: Vec<HeikinAshiBar> = Vec::with_capacity(bars.len());

    for bar in bars {
        let close = (bar.open + bar.high + bar.low + bar.close) / 4.0;
        let open = match out.last() {
            Some(prev) => (prev.open + prev.close) / 2.0,
            None => (bar.open + bar.close) / 2.0,
        };

        out.push(HeikinAshiBar {
            time: bar.time,
            open,
            high: bar.high.max(open).max(close),
            low: bar.low.min(open).min(close),
            close,
            price: bar.close,
            color: CandleColor::of(open, close),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ohlc.iter()
            .zip(0i64..)
            .map(|(&(open, high, low, close), i)| Bar {
                time: t0 + Duration::days(i),
                open,
                high,
                low,
                close,
                volume: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_three_bar_example() {
        let ha = transform_bars(&bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 11.0, 8.0, 9.0),
            (9.0, 13.0, 9.0, 12.0),
        ]));

        let closes: Vec<f64> = ha.iter().map(|b| b.close).collect();
        let opens: Vec<f64> = ha.iter().map(|b| b.open).collect();
        let colors: Vec<CandleColor> = ha.iter().map(|b| b.color).collect();

        assert_eq!(closes, vec![10.5, 9.75, 10.75]);
        assert_eq!(opens, vec![10.5, 10.5, 10.125]);
        assert_eq!(
            colors,
            vec![CandleColor::Bearish, CandleColor::Bearish, CandleColor::Bullish]
        );
    }

    #[test]
    fn test_high_low_envelope() {
        let ha = transform_bars(&bars(&[(10.0, 12.0, 9.0, 11.0), (11.0, 11.0, 8.0, 9.0)]));
        // HA 开收盘 (10.5, 9.75) 落在原始区间内
        assert_eq!(ha[1].high, 11.0);
        assert_eq!(ha[1].low, 8.0);
        assert_eq!(ha[1].price, 9.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(transform_bars(&[]).is_empty());
    }
}
