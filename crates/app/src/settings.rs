use crate::cli::Cli;
use anyhow::{Context, Result, bail};
use config::{Config, Environment, File};
use hadx_core::config::AppConfig;
use std::path::Path;

/// 环境变量前缀，层级之间以 `__` 分隔 (例如 `HADX__ENGINE__THRESHOLD`)
pub const ENV_PREFIX: &str = "HADX";

const DEFAULT_FILE: &str = "hadx";

/// # Summary
/// 分层加载应用配置。
///
/// # Logic
/// 1. 内置默认值由 `AppConfig` 的 `serde(default)` 提供。
/// 2. 指定了配置文件时必须存在；否则尝试读取当前目录的 `hadx.toml`。
/// 3. `HADX__` 前缀的环境变量覆盖文件中的值，`watchlist` 与 `timeframes` 以逗号分隔。
///
/// # Arguments
/// * `path`: 命令行传入的配置文件路径。
///
/// # Returns
/// 反序列化后的 `AppConfig`。
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(DEFAULT_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("watchlist")
                .with_list_parse_key("timeframes")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// # Summary
/// 将命令行参数叠加到配置之上并做最终校验。
///
/// # Logic
/// 1. 非空的 `--symbol` / `--timeframe` 整体替换配置中的列表。
/// 2. 标志位只能打开对应开关，不会关闭配置里已打开的开关。
/// 3. 校验引擎参数，且标的与周期列表不能为空。
pub fn apply_cli(mut config: AppConfig, cli: &Cli) -> Result<AppConfig> {
    if !cli.symbols.is_empty() {
        config.watchlist = cli.symbols.clone();
    }
    if !cli.timeframes.is_empty() {
        config.timeframes = cli.timeframes.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.engine.threshold = threshold;
    }
    config.engine.snapshot_mode |= cli.snapshot;
    config.scan.latest_only |= cli.latest_only;

    if let Err(reason) = config.engine.validate() {
        bail!("Invalid engine configuration: {}", reason);
    }
    if config.watchlist.is_empty() {
        bail!("watchlist is empty");
    }
    if config.timeframes.is_empty() {
        bail!("timeframes is empty");
    }

    config.timeframes.sort_by(|a, b| b.cmp(a));
    config.timeframes.dedup();
    Ok(config)
}
