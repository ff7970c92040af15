mod cli;
mod logging;
mod report;
mod settings;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use hadx_core::common::Instrument;
use hadx_core::common::time::{RealTimeProvider, TimeProvider};
use hadx_core::market::port::MarketDataProvider;
use hadx_core::notify::port::Notifier;
use hadx_feed::yahoo::YahooProvider;
use hadx_notify::telegram::TelegramNotifier;
use hadx_scanner::orchestrator::{ScanTarget, Scanner};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责装配数据源、扫描器与通知器，执行一次批量扫描后退出。
///
/// # Logic
/// 1. 加载 .env、命令行与分层配置。
/// 2. 初始化全局日志与 TLS 加密后端。
/// 3. 实例化基础设施层（Feed、Notifier）。
/// 4. 构造扫描器并以 标的 x 周期 生成扫描目标。
/// 5. 监听 Ctrl-C 作为取消信号，执行扫描。
/// 6. 渲染报告并推送，dry-run 或未配置通知时打印到终端。
#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置
    let env_file = dotenvy::dotenv();
    let cli = cli::Cli::parse();
    let config = settings::apply_cli(settings::load(cli.config.as_deref())?, &cli)?;

    // 2. 初始化日志
    let _log_guard = logging::init(&config.log)?;
    match env_file {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) => debug!("no .env loaded: {}", e),
    }
    info!(
        symbols = config.watchlist.len(),
        timeframes = config.timeframes.len(),
        "hadx scan starting..."
    );

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("TLS crypto provider already installed"))?;

    // 3. 实例化基础设施层
    let feed: Arc<dyn MarketDataProvider> =
        Arc::new(YahooProvider::new().context("Failed to create Yahoo provider")?);
    let notifier: Option<Box<dyn Notifier>> = match (&config.telegram, cli.dry_run) {
        (Some(tg), false) => Some(Box::new(
            TelegramNotifier::from_config(tg).context("Invalid telegram configuration")?,
        )),
        _ => None,
    };

    // 4. 构造扫描器与扫描目标
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let scanner = Scanner::new(config.engine.clone(), config.scan.clone(), clock.clone())
        .context("Invalid scanner configuration")?;

    let targets: Vec<ScanTarget> = config
        .watchlist
        .iter()
        .flat_map(|symbol| {
            let feed = feed.clone();
            config
                .timeframes
                .iter()
                .map(move |tf| ScanTarget::new(Instrument::new(symbol.as_str()), *tf, feed.clone()))
        })
        .collect();

    // 5. Ctrl-C 只阻止新目标被调度，在途目标会跑完
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received. Finishing in-flight targets...");
            if cancel_tx.send(true).is_err() {
                debug!("scan already finished");
            }
        }
    });

    let result = scanner.run(targets, cancel_rx).await;

    // 6. 输出报告
    let rendered = report::render(&result, &config.engine, clock.now());
    match notifier {
        Some(notifier) if !report::is_quiet(&result) => {
            notifier
                .notify(&rendered.subject, &rendered.body)
                .await
                .context("Failed to send notification")?;
            info!(
                channel = notifier.channel(),
                events = result.events.len(),
                "report sent"
            );
        }
        Some(_) => info!("no signals, notification skipped"),
        None => println!("{}\n\n{}", rendered.subject, rendered.body),
    }

    Ok(())
}
