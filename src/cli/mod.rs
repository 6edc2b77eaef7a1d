//! CLI 모듈
//!
//! company-rag CLI 명령어 정의 및 구현

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Instrument;

use crate::collector::FileCollector;
use crate::config::{AppConfig, EmbeddingBackend, SourceMode};
use crate::embedding::has_api_key;
use crate::extractor::LoaderRegistry;
use crate::session::SessionContext;

/// 초기화 실패 시 사용자에게 보여주는 메시지
pub const INITIALIZE_ERROR_MESSAGE: &str = "初期化処理に失敗しました。";

/// 문의 안내 문구
const CONTACT_ADMIN_MESSAGE: &str = "このエラーが繰り返し発生する場合は、管理者に問い合わせてください。";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "company-rag")]
#[command(version, about = "社内文書 RAG 取り込みパイプライン", long_about = None)]
pub struct Cli {
    /// 設定ファイルのパス (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// データソース (設定ファイルの source より優先)
    #[arg(short, long, global = true, value_enum)]
    pub source: Option<SourceMode>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 文書を取り込んでインデックスを作成し、結果を表示
    Ingest,

    /// インデックスを作成して検索
    Query {
        /// 検索クエリ
        query: String,

        /// 結果の件数 (既定値: 設定の retriever_top_k)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// 設定と環境の状態を表示
    Status,
}

impl Cli {
    /// 설정 로드 후 CLI 플래그 적용
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config.clone().or_else(AppConfig::discover);
        let mut config = AppConfig::load(path.as_deref()).context("設定の読み込みに失敗しました")?;
        if let Some(source) = self.source {
            config.source = source;
        }
        Ok(config)
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli, config: AppConfig) -> Result<ExitCode> {
    match cli.command {
        Commands::Ingest => cmd_ingest(config).await,
        Commands::Query { query, limit } => cmd_query(config, &query, limit).await,
        Commands::Status => cmd_status(&config, cli.config.as_deref()),
    }
}

/// 초기화 실패 처리: 전체 에러 체인은 로그로, 화면에는 안내 문구만
pub fn report_initialize_failure(error: &anyhow::Error) -> ExitCode {
    tracing::error!("{}\n{:#}", INITIALIZE_ERROR_MESSAGE, error);
    eprintln!("{}", build_error_message(INITIALIZE_ERROR_MESSAGE));
    ExitCode::FAILURE
}

/// 사용자용 에러 메시지 (문의 안내 포함)
pub fn build_error_message(message: &str) -> String {
    format!("{}\n{}", message, CONTACT_ADMIN_MESSAGE)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 세션을 만들고 초기화 (실패하면 `None`)
async fn start_session(config: AppConfig) -> Option<SessionContext> {
    let mut session = SessionContext::new(config);
    let span = tracing::info_span!("session", session_id = %session.session_id());

    let result = session
        .initialize()
        .instrument(span)
        .await
        .context("retriever の初期化に失敗しました");

    match result {
        Ok(Some(report)) => {
            println!(
                "[OK] 取り込み完了: 文書 {} 件 (社員名簿 {} 件), チャンク {} 件, {:.2} 秒",
                report.raw_documents,
                report.roster_documents,
                report.fragments_indexed,
                report.elapsed.as_secs_f64()
            );
            Some(session)
        }
        Ok(None) => Some(session),
        Err(e) => {
            report_initialize_failure(&e);
            None
        }
    }
}

/// 수집 명령어 (ingest)
async fn cmd_ingest(config: AppConfig) -> Result<ExitCode> {
    println!("[*] 取り込み中: {:?}", config.source);

    match start_session(config).await {
        Some(session) => {
            tracing::info!(session_id = %session.session_id(), "Ingest finished");
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

/// 검색 명령어 (query)
///
/// 색인을 새로 만든 뒤 상위 문서의 출처와 내용 일부를 출력합니다.
async fn cmd_query(config: AppConfig, query: &str, limit: Option<usize>) -> Result<ExitCode> {
    let limit = limit.unwrap_or(config.retriever_top_k);
    let Some(session) = start_session(config).await else {
        return Ok(ExitCode::FAILURE);
    };

    println!("[*] 検索中: \"{}\"", query);
    let results = session.search(query, limit).await.context("検索に失敗しました")?;

    if results.is_empty() {
        println!("\n[!] 検索結果がありません。");
        return Ok(ExitCode::SUCCESS);
    }

    println!("\n[OK] 検索結果 ({} 件):\n", results.len());

    for (i, result) in results.iter().enumerate() {
        let doc = &result.document;
        println!(
            "{}. [スコア: {:.4}] {}",
            i + 1,
            result.similarity,
            doc.source().unwrap_or("-")
        );

        if let Some(department) = doc.meta_str("department") {
            println!("   部署: {}", department);
        } else if let Some(title) = doc.meta_str("title") {
            println!("   タイトル: {}", title);
        }

        println!("   内容: {}", truncate_text(&doc.content, 200));
        println!();
    }

    Ok(ExitCode::SUCCESS)
}

/// 상태 명령어 (status)
fn cmd_status(config: &AppConfig, config_path: Option<&Path>) -> Result<ExitCode> {
    println!("company-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    match config_path.map(Path::to_path_buf).or_else(AppConfig::discover) {
        Some(path) => println!("[*] 設定ファイル: {}", path.display()),
        None => println!("[*] 設定ファイル: (既定値)"),
    }

    println!("[*] データソース: {:?}", config.source);

    // 데이터 디렉토리
    if config.data_dir.exists() {
        let collector = FileCollector::new(config.collector.clone());
        let (count, total) = collector
            .walk_files(&config.data_dir)
            .filter_map(|path| std::fs::metadata(path).ok())
            .fold((0usize, 0u64), |(count, total), meta| {
                (count + 1, total + meta.len())
            });
        println!(
            "[OK] データフォルダ: {} ({} ファイル, {})",
            config.data_dir.display(),
            count,
            format_bytes(total as usize)
        );
    } else {
        println!(
            "[!] データフォルダがありません: {}",
            config.data_dir.display()
        );
    }

    println!(
        "[*] 対応拡張子: {}",
        LoaderRegistry::builtin().extensions().join(", ")
    );
    println!("[*] Web URL: {} 件", config.web.urls.len());
    for url in &config.web.urls {
        println!("    - {}", url);
    }
    println!(
        "[*] チャンク: {} / オーバーラップ {}, 検索 k = {}",
        config.chunking.chunk_size, config.chunking.chunk_overlap, config.retriever_top_k
    );
    println!("[*] 文字列正規化: {:?}", config.normalize.resolve());
    println!("[*] ログフォルダ: {}", config.log_dir.display());

    // API 키 상태
    match config.embedding.provider {
        EmbeddingBackend::OpenAi => {
            println!("[*] 埋め込み: OpenAI {}", config.embedding.model);
            if has_api_key() {
                println!("[OK] API キー: 設定済み");
            } else {
                println!("[!] API キー: 未設定");
                println!("    設定方法: export OPENAI_API_KEY=your-key");
            }
        }
        EmbeddingBackend::Hash => {
            println!(
                "[*] 埋め込み: hash (次元 {}, API キー不要)",
                config.embedding.hash_dimension
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_truncate_japanese() {
        assert_eq!(truncate_text("社員名簿一覧表", 4), "社員名簿...");
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::parse_from(["company-rag", "query", "人事部の社員", "--source", "both"]);
        assert_eq!(cli.source, Some(SourceMode::Both));
        match cli.command {
            Commands::Query { query, limit } => {
                assert_eq!(query, "人事部の社員");
                assert_eq!(limit, None);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_source_flag_overrides_config() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "source = \"web\"\n").expect("write");

        let cli = Cli::parse_from([
            "company-rag",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--source",
            "local",
            "status",
        ]);
        let config = cli.load_config().expect("config");
        assert_eq!(config.source, SourceMode::Local);
    }

    #[test]
    fn test_help_text_is_japanese() {
        use clap::CommandFactory;

        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("設定ファイルのパス"));
        assert!(!help.chars().any(|c| ('\u{AC00}'..='\u{D7A3}').contains(&c)));
    }

    #[test]
    fn test_build_error_message_has_no_chain() {
        let message = build_error_message(INITIALIZE_ERROR_MESSAGE);
        assert!(message.starts_with("初期化処理に失敗しました。"));
        assert!(!message.contains("CSV"));
    }

    #[tokio::test]
    async fn test_failed_initialize_yields_no_session() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("社員名簿.csv"), "").expect("write");
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            embedding: crate::config::EmbeddingConfig {
                provider: EmbeddingBackend::Hash,
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(start_session(config).await.is_none());
    }
}
