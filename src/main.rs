use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use network_report::config::ReportConfig;
use network_report::report::{header_row, report_dates, ReportRunner};
use network_report::transport::HttpTransport;

/// 按天统计网络请求的总数、失败数和成功率
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// 开始日期，格式 YYYY-MM-DD
    #[arg(value_name = "START_DATE")]
    start_date: NaiveDate,

    /// 持续天数，如 2020-01-01 7 输出 2020-01-01 到 2020-01-07 每天一行
    #[arg(value_name = "DAYS", default_value_t = 1)]
    days: u32,

    /// JSON 配置文件路径
    #[arg(short, long, value_name = "CONFIG_PATH", default_value = "report_config.json")]
    config: PathBuf,

    /// 覆盖配置中的结果页大小
    #[arg(long)]
    page_size: Option<usize>,

    /// 只打印请求体，不发送请求
    #[arg(long)]
    dry_run: bool,
}

/// 加载配置，失败时使用默认配置
fn load_config(path: &Path) -> ReportConfig {
    match ReportConfig::from_json_file(path) {
        Ok(config) => {
            info!(path = %path.display(), users = config.user_ids.len(), "loaded report config");
            config
        }
        Err(e) => {
            warn!(error = %e, "falling back to default config, no user restriction");
            ReportConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("Problem while generating report: {e:#}");
        exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    ensure!(args.days >= 1, "DAYS must be at least 1");

    let mut config = load_config(&args.config);
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }

    let transport = HttpTransport::new(config.endpoint.clone(), &config.headers)?;
    let runner = ReportRunner::new(&config, transport)?;

    if args.dry_run {
        for date in report_dates(args.start_date, args.days)? {
            let (total, failure) = runner.envelopes_for(date)?;
            println!("# {date} total\n{total}# {date} failure\n{failure}");
        }
        return Ok(());
    }

    println!("{}", header_row());
    for report in runner.run(args.start_date, args.days).await? {
        println!("{}", report.row());
    }
    Ok(())
}
