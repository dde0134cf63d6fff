//! ayur-kb CLI 진입점

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    // 로깅 초기화
    tracing_subscriber::fmt()
        .with_env_filter(ayur_kb::config::log_filter())
        .with_writer(std::io::stderr)
        .init();

    // CLI 실행
    let cli = ayur_kb::cli::Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(ayur_kb::cli::run(cli))
}
