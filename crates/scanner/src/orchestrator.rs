use crate::analysis::{analyze, Analysis};
use crate::error::ScanError;
use chrono::{DateTime, Utc};
use hadx_core::analysis::entity::{SignalKind, TaggedEvent};
use hadx_core::analysis::error::AnalysisError;
use hadx_core::common::time::TimeProvider;
use hadx_core::common::{Instrument, TimeFrame};
use hadx_core::config::{EngineConfig, ScanConfig};
use hadx_core::market::entity::Series;
use hadx_core::market::port::MarketDataProvider;
use hadx_signal::consensus::{build_consensus, Consensus, FrameReading};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// # Summary
/// 一个扫描目标：标的、周期以及负责取数的数据源。
#[derive(Clone)]
pub struct ScanTarget {
    pub instrument: Instrument,
    pub timeframe: TimeFrame,
    pub source: Arc<dyn MarketDataProvider>,
}

impl ScanTarget {
    pub fn new(
        instrument: Instrument,
        timeframe: TimeFrame,
        source: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self {
            instrument,
            timeframe,
            source,
        }
    }
}

/// 单个目标的失败记录
#[derive(Debug)]
pub struct TargetFailure {
    pub instrument: Instrument,
    pub timeframe: TimeFrame,
    pub error: ScanError,
}

/// # Summary
/// 一次批量扫描的完整输出。
///
/// # Invariants
/// - `events` 按时间降序，同一时间按标的、周期、类型升序。
/// - `failures` 按标的、周期升序。
/// - 任意目标失败都不会让整体结果为空，成功目标的事件照常保留。
#[derive(Debug, Default)]
pub struct RankedEventSet {
    pub events: Vec<TaggedEvent>,
    // 最后一根 K 线刚发生的颜色翻转，排序规则同 `events`
    pub flips: Vec<TaggedEvent>,
    pub failures: Vec<TargetFailure>,
    pub consensus: Vec<Consensus>,
    // 成功完成分析的目标数
    pub analyzed: usize,
}

impl RankedEventSet {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.failures.is_empty()
    }
}

fn kind_order(kind: SignalKind) -> u8 {
    match kind {
        SignalKind::EnterLong => 0,
        SignalKind::ExitLong => 1,
    }
}

fn compare_events(a: &TaggedEvent, b: &TaggedEvent) -> Ordering {
    b.event
        .time
        .cmp(&a.event.time)
        .then_with(|| a.instrument.cmp(&b.instrument))
        .then_with(|| a.timeframe.cmp(&b.timeframe))
        .then_with(|| kind_order(a.event.kind).cmp(&kind_order(b.event.kind)))
}

/// # Summary
/// 批量扫描调度器。
///
/// # Invariants
/// - 同时在途的目标数不超过 `max_concurrency`。
/// - 取消只阻止新目标被调度，已在途的目标会完成。
/// - 当前时间只通过 `TimeProvider` 获取。
pub struct Scanner {
    engine: EngineConfig,
    scan: ScanConfig,
    time: Arc<dyn TimeProvider>,
}

impl Scanner {
    /// # Summary
    /// 创建扫描器。
    ///
    /// # Returns
    /// 引擎参数非法、并发上限为 0 或 `history_bars` 小于分析所需根数时返回 `InvalidParameter`。
    pub fn new(
        engine: EngineConfig,
        scan: ScanConfig,
        time: Arc<dyn TimeProvider>,
    ) -> Result<Self, AnalysisError> {
        engine.validate().map_err(AnalysisError::InvalidParameter)?;
        if scan.max_concurrency == 0 {
            return Err(AnalysisError::InvalidParameter(
                "scan.max_concurrency must be at least 1".to_string(),
            ));
        }
        if scan.history_bars < engine.required_bars() {
            return Err(AnalysisError::InvalidParameter(format!(
                "scan.history_bars {} is below the {} bars the engine requires",
                scan.history_bars,
                engine.required_bars()
            )));
        }
        Ok(Self { engine, scan, time })
    }

    /// # Summary
    /// 计算某个周期的抓取窗口。
    ///
    /// # Logic
    /// 1. 结束时间为当前时间。
    /// 2. 回看 `history_bars * 2` 个周期，为休市与缺口预留余量。
    pub fn fetch_window(
        &self,
        timeframe: TimeFrame,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), AnalysisError> {
        let end = self.time.now();
        let start = i32::try_from(self.scan.history_bars.saturating_mul(2))
            .ok()
            .and_then(|n| timeframe.duration().checked_mul(n))
            .and_then(|d| end.checked_sub_signed(d))
            .ok_or_else(|| {
                AnalysisError::InvalidParameter(format!(
                    "history window of {} bars is too large",
                    self.scan.history_bars
                ))
            })?;
        Ok((start, end))
    }

    /// # Summary
    /// 并发扫描所有目标并汇总为有序结果。
    ///
    /// # Logic
    /// 1. 逐个调度目标：先检查取消信号，再获取信号量许可。
    /// 2. 取消后剩余目标全部记为 `Cancelled`。
    /// 3. 每个目标独立取数与分析，失败只记录不传播。
    /// 4. 汇合所有任务后按 `latest_only` 裁剪、排序并计算多周期一致性。
    ///
    /// # Arguments
    /// * `targets`: 扫描目标列表。
    /// * `cancel`: 取消信号，值变为 `true` 表示取消。
    ///
    /// # Returns
    /// 汇总后的 `RankedEventSet`。
    pub async fn run(
        &self,
        targets: Vec<ScanTarget>,
        mut cancel: watch::Receiver<bool>,
    ) -> RankedEventSet {
        let total = targets.len();
        let semaphore = Arc::new(Semaphore::new(self.scan.max_concurrency));
        let mut tasks: JoinSet<(Instrument, TimeFrame, Result<Analysis, ScanError>)> =
            JoinSet::new();
        let mut labels: HashMap<tokio::task::Id, (Instrument, TimeFrame)> = HashMap::new();
        let mut result = RankedEventSet::default();
        let mut latest = Vec::new();

        for target in targets {
            let permit = tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancel) => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                result.failures.push(TargetFailure {
                    instrument: target.instrument,
                    timeframe: target.timeframe,
                    error: ScanError::Cancelled,
                });
                continue;
            };

            let label = (target.instrument.clone(), target.timeframe);
            let engine = self.engine.clone();
            let history_bars = self.scan.history_bars;
            let window = self.fetch_window(target.timeframe);

            let handle = tasks.spawn(async move {
                let outcome = match window {
                    Ok((start, end)) => {
                        run_target(&target, &engine, history_bars, start, end).await
                    }
                    Err(e) => Err(ScanError::from(e)),
                };
                drop(permit);
                (target.instrument, target.timeframe, outcome)
            });
            labels.insert(handle.id(), label);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (instrument, timeframe, Ok(analysis)))) => {
                    result.analyzed += 1;
                    latest.push((
                        instrument.clone(),
                        FrameReading {
                            timeframe,
                            color: analysis.latest_color,
                            adx: analysis.latest_adx,
                        },
                    ));

                    if let Some(event) = analysis.flip {
                        result.flips.push(TaggedEvent {
                            instrument: instrument.clone(),
                            timeframe,
                            event,
                        });
                    }

                    let mut events = analysis.events;
                    if self.scan.latest_only && events.len() > 1 {
                        events = events.split_off(events.len() - 1);
                    }
                    result.events.extend(events.into_iter().map(|event| TaggedEvent {
                        instrument: instrument.clone(),
                        timeframe,
                        event,
                    }));
                }
                Ok((_, (instrument, timeframe, Err(error)))) => {
                    result.failures.push(TargetFailure {
                        instrument,
                        timeframe,
                        error,
                    });
                }
                Err(e) => {
                    if let Some((instrument, timeframe)) = labels.remove(&e.id()) {
                        result.failures.push(TargetFailure {
                            instrument,
                            timeframe,
                            error: ScanError::Task(e.to_string()),
                        });
                    }
                }
            }
        }

        for failure in &result.failures {
            if failure.error.is_skip() {
                info!(instrument = %failure.instrument, timeframe = %failure.timeframe, "target skipped: {}", failure.error);
            } else {
                warn!(
                    instrument = %failure.instrument,
                    timeframe = %failure.timeframe,
                    transient = failure.error.is_transient(),
                    "target failed: {}",
                    failure.error
                );
            }
        }

        result.events.sort_by(compare_events);
        result.flips.sort_by(compare_events);
        result.consensus = build_consensus(latest, self.engine.threshold);
        result.failures.sort_by(|a, b| {
            a.instrument
                .cmp(&b.instrument)
                .then_with(|| a.timeframe.cmp(&b.timeframe))
        });

        info!(
            targets = total,
            analyzed = result.analyzed,
            events = result.events.len(),
            failures = result.failures.len(),
            "scan finished"
        );
        result
    }
}

/// 等待取消信号；发送端被丢弃视为永不取消
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// # Summary
/// 单个目标的取数与分析。
///
/// # Logic
/// 1. 从数据源拉取窗口内的 K 线。
/// 2. 只保留最近 `history_bars` 根。
/// 3. 构造并校验 `Series`，然后执行分析流水线。
async fn run_target(
    target: &ScanTarget,
    engine: &EngineConfig,
    history_bars: usize,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Analysis, ScanError> {
    let mut bars = target
        .source
        .fetch_bars(&target.instrument, target.timeframe, start, end)
        .await?;

    if bars.len() > history_bars {
        bars = bars.split_off(bars.len() - history_bars);
    }

    let series = Series::new(target.instrument.clone(), target.timeframe, bars)?;
    analyze(&series, engine).map_err(ScanError::from)
}
