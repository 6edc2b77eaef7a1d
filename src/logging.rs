//! 로깅 초기화
//!
//! stderr 출력과 로그 디렉토리의 일 단위 롤링 파일(운영 로그)을 함께 설치합니다.
//! 레벨은 `RUST_LOG`로 덮어쓸 수 있고 기본값은 `info`입니다.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// 운영 로그 파일 이름 접두사
pub const LOG_FILE: &str = "company-rag.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 전역 subscriber 설치 (두 번째 호출부터는 무시)
pub fn init(log_dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    if LOG_GUARD.set(guard).is_err() {
        return;
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}
