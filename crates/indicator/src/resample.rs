use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use hadx_core::analysis::error::AnalysisError;
use hadx_core::common::TimeFrame;
use hadx_core::market::entity::{Bar, Series};

/// # Summary
/// 计算某个时间点在目标周期下所属分桶的起始时间。
///
/// # Logic
/// 1. 分钟与小时周期按 UTC 纪元对齐取整（4 小时桶起点为 0/4/8/12/16/20 点）。
/// 2. 日线取当日零点。
/// 3. 周线取所在 ISO 周的周一零点。
/// 4. 月线取当月 1 日零点。
///
/// # Returns
/// 分桶起始时间；日期越界时返回 `InvalidParameter`。
pub fn bucket_start(time: DateTime<Utc>, timeframe: TimeFrame) -> Result<DateTime<Utc>, AnalysisError> {
    let date = time.date_naive();
    let day_start = match timeframe {
        TimeFrame::Minute1 | TimeFrame::Minute5 | TimeFrame::Hour1 | TimeFrame::Hour4 => {
            let width = timeframe.duration().num_seconds();
            let secs = time.timestamp().div_euclid(width) * width;
            return DateTime::from_timestamp(secs, 0).ok_or_else(|| out_of_range(time));
        }
        TimeFrame::Day1 => Some(date),
        TimeFrame::Week1 => {
            date.checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))
        }
        TimeFrame::Month1 => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
    };

    day_start
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| out_of_range(time))
}

fn out_of_range(time: DateTime<Utc>) -> AnalysisError {
    AnalysisError::InvalidParameter(format!("timestamp {} out of range", time))
}

/// # Summary
/// 将序列重采样到更粗的周期。
///
/// # Logic
/// 1. 目标周期必须严格粗于源周期。
/// 2. 序列已按时间升序，同一分桶的 K 线必然连续，逐根折叠即可。
/// 3. 聚合规则：首根 open、最大 high、最小 low、末根 close、成交量求和。
/// 4. 聚合后的 K 线以分桶起始时间为时间戳，重新走 `Series::new` 校验。
///
/// # Arguments
/// * `series`: 源序列。
/// * `target`: 目标周期。
///
/// # Returns
/// 重采样后的新序列。
pub fn resample(series: &Series, target: TimeFrame) -> Result<Series, AnalysisError> {
    if target <= series.timeframe() {
        return Err(AnalysisError::InvalidParameter(format!(
            "cannot resample {} into {}",
            series.timeframe(),
            target
        )));
    }

    let mut out: Vec<Bar> = Vec::new();
    for bar in series.bars() {
        let start = bucket_start(bar.time, target)?;
        match out.last_mut() {
            Some(acc) if acc.time == start => {
                acc.high = acc.high.max(bar.high);
                acc.low = acc.low.min(bar.low);
                acc.close = bar.close;
                acc.volume += bar.volume;
            }
            _ => out.push(Bar {
                time: start,
                ..bar.clone()
            }),
        }
    }

    Series::new(series.instrument().clone(), target, out)
}
