//! company-rag CLI 진입점

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use company_rag::cli::{self, Cli};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 설정 로드 실패도 초기화 실패로 취급
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            company_rag::logging::init(&company_rag::AppConfig::default().log_dir);
            return Ok(cli::report_initialize_failure(&e));
        }
    };

    // 로깅 초기화
    company_rag::logging::init(&config.log_dir);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(cli::run(cli, config))
}
