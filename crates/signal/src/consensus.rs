use hadx_core::analysis::entity::CandleColor;
use hadx_core::common::{Instrument, TimeFrame};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// # Summary
/// 多周期最新 K 线颜色的一致性分类。
///
/// # Invariants
/// - 只依赖各周期颜色的多头数量与周期总数，与周期顺序无关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Alignment {
    // 全部周期 Bullish
    FullBullish,
    // 全部周期 Bearish
    FullBearish,
    // 至少三个周期且仅一个 Bearish
    StrongBullish,
    // 至少三个周期且仅一个 Bullish
    StrongBearish,
    Mixed,
}

impl Alignment {
    /// 排序权重，越小越靠前
    pub fn rank(&self) -> u8 {
        match self {
            Alignment::FullBullish => 0,
            Alignment::FullBearish => 1,
            Alignment::StrongBullish => 2,
            Alignment::StrongBearish => 3,
            Alignment::Mixed => 4,
        }
    }

    /// # Summary
    /// 对一组颜色分类。
    ///
    /// # Returns
    /// 空输入返回 None。
    pub fn classify(colors: &[CandleColor]) -> Option<Self> {
        let total = colors.len();
        if total == 0 {
            return None;
        }
        let bullish = colors.iter().filter(|c| c.is_bullish()).count();

        let alignment = if bullish == total {
            Alignment::FullBullish
        } else if bullish == 0 {
            Alignment::FullBearish
        } else if total >= 3 && bullish == total - 1 {
            Alignment::StrongBullish
        } else if total >= 3 && bullish == 1 {
            Alignment::StrongBearish
        } else {
            Alignment::Mixed
        };
        Some(alignment)
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Alignment::FullBullish => "full bullish",
            Alignment::FullBearish => "full bearish",
            Alignment::StrongBullish => "strong bullish",
            Alignment::StrongBearish => "strong bearish",
            Alignment::Mixed => "mixed",
        };
        write!(f, "{}", label)
    }
}

/// 单个周期的最新读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameReading {
    pub timeframe: TimeFrame,
    pub color: CandleColor,
    // 最后一根 K 线的 ADX，预热期为 NaN
    pub adx: f64,
}

/// # Summary
/// 单个标的在多个周期上的一致性结论。
///
/// # Invariants
/// - `readings` 按周期从粗到细排列，至少两项。
/// - `confirmed` 仅当每个周期的 ADX 都严格大于门槛时为 true，NaN 视为未确认。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consensus {
    pub instrument: Instrument,
    pub readings: Vec<FrameReading>,
    pub alignment: Alignment,
    pub confirmed: bool,
}

/// # Summary
/// 将 (标的, 周期读数) 归约为一致性表。
///
/// # Logic
/// 1. 按标的分组，同一周期重复出现时后者覆盖前者。
/// 2. 只保留覆盖至少两个周期的标的。
/// 3. 每组读数按周期从粗到细排列后按颜色分类，并以 ADX 门槛判断趋势强度是否确认。
/// 4. 结果按 `Alignment::rank` 升序，同级按标的升序。
///
/// # Arguments
/// * `latest`: 每个成功分析目标的最新读数。
/// * `threshold`: ADX 确认门槛，与入场门槛一致。
///
/// # Returns
/// 排好序的一致性列表。
pub fn build_consensus<I>(latest: I, threshold: f64) -> Vec<Consensus>
where
    I: IntoIterator<Item = (Instrument, FrameReading)>,
{
    let mut grouped: BTreeMap<Instrument, BTreeMap<Reverse<TimeFrame>, FrameReading>> =
        BTreeMap::new();
    for (instrument, reading) in latest {
        grouped
            .entry(instrument)
            .or_default()
            .insert(Reverse(reading.timeframe), reading);
    }

    let mut table: Vec<Consensus> = grouped
        .into_iter()
        .filter(|(_, frames)| frames.len() >= 2)
        .filter_map(|(instrument, frames)| {
            let readings: Vec<FrameReading> = frames.into_values().collect();
            let palette: Vec<CandleColor> = readings.iter().map(|r| r.color).collect();
            let confirmed = readings.iter().all(|r| r.adx > threshold);
            Alignment::classify(&palette).map(|alignment| Consensus {
                instrument,
                readings,
                alignment,
                confirmed,
            })
        })
        .collect();

    table.sort_by(|a, b| {
        a.alignment
            .rank()
            .cmp(&b.alignment.rank())
            .then_with(|| a.instrument.cmp(&b.instrument))
    });
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use hadx_core::analysis::entity::CandleColor::{Bearish as D, Bullish as U};

    #[test]
    fn test_classify() {
        assert_eq!(Alignment::classify(&[]), None);
        assert_eq!(Alignment::classify(&[U, U, U]), Some(Alignment::FullBullish));
        assert_eq!(Alignment::classify(&[D, D, D]), Some(Alignment::FullBearish));
        assert_eq!(Alignment::classify(&[U, D, U]), Some(Alignment::StrongBullish));
        assert_eq!(Alignment::classify(&[D, U, D]), Some(Alignment::StrongBearish));
        assert_eq!(Alignment::classify(&[U, D, U, D]), Some(Alignment::Mixed));
        // 两个周期无法形成 strong
        assert_eq!(Alignment::classify(&[U, D]), Some(Alignment::Mixed));
    }

    fn row(symbol: &str, timeframe: TimeFrame, color: CandleColor, adx: f64) -> (Instrument, FrameReading) {
        (
            Instrument::new(symbol),
            FrameReading {
                timeframe,
                color,
                adx,
            },
        )
    }

    #[test]
    fn test_build_consensus_orders_by_rank_then_instrument() {
        let rows = vec![
            row("YPF", TimeFrame::Day1, D, 30.0),
            row("YPF", TimeFrame::Week1, U, 30.0),
            row("AAPL", TimeFrame::Day1, U, 30.0),
            row("AAPL", TimeFrame::Month1, U, 30.0),
            row("MSFT", TimeFrame::Day1, D, 30.0),
            row("MSFT", TimeFrame::Week1, D, 30.0),
            row("GGAL", TimeFrame::Day1, U, 30.0),
            row("GGAL", TimeFrame::Week1, U, 30.0),
            // 单周期标的不参与
            row("SPY", TimeFrame::Day1, U, 30.0),
        ];

        let table = build_consensus(rows, 20.0);
        let order: Vec<(&str, Alignment)> = table
            .iter()
            .map(|c| (c.instrument.symbol.as_str(), c.alignment))
            .collect();
        assert_eq!(
            order,
            vec![
                ("AAPL", Alignment::FullBullish),
                ("GGAL", Alignment::FullBullish),
                ("MSFT", Alignment::FullBearish),
                ("YPF", Alignment::Mixed),
            ]
        );

        // 周期从粗到细
        let frames: Vec<TimeFrame> = table[0].readings.iter().map(|r| r.timeframe).collect();
        assert_eq!(frames, vec![TimeFrame::Month1, TimeFrame::Day1]);
    }

    #[test]
    fn test_consensus_confirmed_only_when_every_frame_is_trending() {
        let rows = vec![
            row("AAPL", TimeFrame::Week1, U, 32.5),
            row("AAPL", TimeFrame::Day1, U, 24.0),
            row("TSLA", TimeFrame::Week1, U, 32.5),
            row("TSLA", TimeFrame::Day1, U, 20.0),
            row("NEW", TimeFrame::Week1, U, f64::NAN),
            row("NEW", TimeFrame::Day1, U, 40.0),
        ];

        let table = build_consensus(rows, 20.0);
        let confirmed: Vec<(&str, bool)> = table
            .iter()
            .map(|c| (c.instrument.symbol.as_str(), c.confirmed))
            .collect();
        assert_eq!(confirmed, vec![("AAPL", true), ("NEW", false), ("TSLA", false)]);
        assert_eq!(table[0].readings[0].adx, 32.5);
        assert_eq!(table[0].readings[1].adx, 24.0);
    }
}
