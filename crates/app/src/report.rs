use chrono::{DateTime, Utc};
use hadx_core::analysis::entity::{CandleColor, SignalOrigin, TaggedEvent};
use hadx_core::common::TimeFrame;
use hadx_core::config::EngineConfig;
use hadx_scanner::orchestrator::RankedEventSet;

/// 渲染后的通知
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

/// 没有任何信号与翻转时无需推送
pub fn is_quiet(result: &RankedEventSet) -> bool {
    result.events.is_empty() && result.flips.is_empty()
}

fn format_time(time: DateTime<Utc>, timeframe: TimeFrame) -> String {
    if timeframe < TimeFrame::Day1 {
        time.format("%Y-%m-%d %H:%M").to_string()
    } else {
        time.format("%Y-%m-%d").to_string()
    }
}

fn format_adx(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.1}", value)
    }
}

fn event_line(tagged: &TaggedEvent) -> String {
    let event = &tagged.event;
    let marker = match event.origin {
        SignalOrigin::Transition => "",
        SignalOrigin::Snapshot => " (state)",
    };
    format!(
        "{} {} {} {}{} @ {:.2} ADX {}",
        format_time(event.time, tagged.timeframe),
        tagged.instrument,
        tagged.timeframe,
        event.kind,
        marker,
        event.price,
        format_adx(event.trend_strength)
    )
}

fn color_mark(color: CandleColor) -> char {
    match color {
        CandleColor::Bullish => '+',
        CandleColor::Bearish => '-',
    }
}

/// # Summary
/// 将一次扫描结果渲染为纯文本报告。
///
/// # Logic
/// 1. 标题包含扫描时间与信号数量。
/// 2. 依次输出最新翻转、全部信号、多周期一致性表与失败汇总。
///    一致性表的每个周期附带最新 ADX，全部周期超过门槛时标注 trend confirmed。
/// 3. 数据不足的目标只计数，不逐条列出。
///
/// # Arguments
/// * `result`: 扫描结果。
/// * `engine`: 引擎配置，用于在报告头部注明参数。
/// * `now`: 报告时间。
pub fn render(result: &RankedEventSet, engine: &EngineConfig, now: DateTime<Utc>) -> Report {
    let subject = format!(
        "HA+ADX scan {} | {} signals, {} flips",
        now.format("%Y-%m-%d %H:%M UTC"),
        result.events.len(),
        result.flips.len()
    );

    let mut lines = vec![format!(
        "ADX({}) > {} | analyzed {}",
        engine.period, engine.threshold, result.analyzed
    )];

    if !result.flips.is_empty() {
        lines.push(String::new());
        lines.push("Flips on last bar".to_string());
        lines.extend(result.flips.iter().map(event_line));
    }

    if !result.events.is_empty() {
        lines.push(String::new());
        lines.push("Signals".to_string());
        lines.extend(result.events.iter().map(event_line));
    }

    if !result.consensus.is_empty() {
        lines.push(String::new());
        lines.push("Consensus".to_string());
        for row in &result.consensus {
            let frames: Vec<String> = row
                .readings
                .iter()
                .map(|r| format!("{}{} {}", r.timeframe, color_mark(r.color), format_adx(r.adx)))
                .collect();
            let confirmed = if row.confirmed { ", trend confirmed" } else { "" };
            lines.push(format!(
                "{} {} | {}{}",
                row.instrument,
                frames.join(" | "),
                row.alignment,
                confirmed
            ));
        }
    }

    let (skipped, failed): (Vec<_>, Vec<_>) =
        result.failures.iter().partition(|f| f.error.is_skip());
    if !failed.is_empty() {
        lines.push(String::new());
        lines.push("Failures".to_string());
        lines.extend(
            failed
                .iter()
                .map(|f| format!("{} {}: {}", f.instrument, f.timeframe, f.error)),
        );
    }
    if !skipped.is_empty() {
        lines.push(String::new());
        lines.push(format!("{} targets skipped (insufficient data)", skipped.len()));
    }

    Report {
        subject,
        body: lines.join("\n"),
    }
}
