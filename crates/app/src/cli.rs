use clap::Parser;
use hadx_core::common::TimeFrame;
use std::path::PathBuf;

/// Heikin-Ashi + ADX 趋势信号扫描器
#[derive(Parser, Debug, Default)]
#[command(name = "hadx", version, about)]
pub struct Cli {
    /// TOML 配置文件路径，缺省时尝试读取当前目录的 hadx.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 只打印报告，不发送通知
    #[arg(long)]
    pub dry_run: bool,

    /// 覆盖配置中的标的列表，可重复
    #[arg(short, long = "symbol", value_name = "SYMBOL")]
    pub symbols: Vec<String>,

    /// 覆盖配置中的周期列表，可重复 (1m, 5m, 1h, 4h, 1d, 1wk, 1mo)
    #[arg(short, long = "timeframe", value_name = "TIMEFRAME")]
    pub timeframes: Vec<TimeFrame>,

    /// 覆盖入场所需的 ADX 门槛
    #[arg(long)]
    pub threshold: Option<f64>,

    /// 在真实迁移之外追加当前状态快照
    #[arg(long)]
    pub snapshot: bool,

    /// 每个标的与周期只保留最近一个事件
    #[arg(long)]
    pub latest_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::parse_from([
            "hadx",
            "--dry-run",
            "-s",
            "AAPL",
            "--symbol",
            "GGAL.BA",
            "-t",
            "1wk",
            "--timeframe",
            "4h",
            "--threshold",
            "25",
        ]);
        assert!(cli.dry_run);
        assert_eq!(cli.symbols, vec!["AAPL", "GGAL.BA"]);
        assert_eq!(cli.timeframes, vec![TimeFrame::Week1, TimeFrame::Hour4]);
        assert_eq!(cli.threshold, Some(25.0));
        assert!(!cli.snapshot);
    }

    #[test]
    fn test_rejects_unknown_timeframe() {
        assert!(Cli::try_parse_from(["hadx", "--timeframe", "3d"]).is_err());
    }
}
