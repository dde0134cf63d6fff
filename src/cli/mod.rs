//! CLI 모듈
//!
//! ayur-kb CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{get_data_dir, resolve_source_path, EngineConfig};
use crate::engine::{KnowledgeEngine, ReloadOutcome};
use crate::knowledge::{source_for_path, Answer, KnowledgeBase, Medicine};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "ayur-kb")]
#[command(version, about = "증상 기반 아유르베다 진단 지식 엔진", long_about = None)]
pub struct Cli {
    /// 지식베이스 소스 (CSV 디렉토리 또는 .db 파일)
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 증상으로 진단 질의
    Ask {
        /// 증상 설명
        query: String,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 약재 이름/제형 검색
    Search {
        /// 검색어
        query: String,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 소스 검증 (잘못된 행 경고 출력)
    Check,

    /// 상태 확인
    Status,

    /// 대화형 질의 (소스 변경 시 자동 리로드)
    Chat {
        /// 소스 변경 확인 주기 (초, 0이면 끔)
        #[arg(short, long, default_value = "5")]
        watch_secs: u64,
    },
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let source = resolve_source_path(cli.source.as_deref());

    match cli.command {
        Commands::Ask { query, json } => cmd_ask(source, &query, json).await,
        Commands::Search { query, limit, json } => cmd_search(source, &query, limit, json).await,
        Commands::Check => cmd_check(source).await,
        Commands::Status => cmd_status(source).await,
        Commands::Chat { watch_secs } => cmd_chat(source, watch_secs).await,
    }
}

/// 엔진 열기 (설정은 환경변수 반영)
fn open_engine(source: &Path, config: EngineConfig) -> Result<KnowledgeEngine> {
    let table_source = source_for_path(source).context("지식베이스 소스 결정 실패")?;
    KnowledgeEngine::open(table_source, config).context("지식베이스 로드 실패")
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 진단 질의 명령어 (ask)
async fn cmd_ask(source: PathBuf, query: &str, json: bool) -> Result<()> {
    let engine = open_engine(&source, EngineConfig::from_env())?;
    let answer = engine.answer_query(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }

    Ok(())
}

/// 약재 검색 명령어 (search)
async fn cmd_search(source: PathBuf, query: &str, limit: usize, json: bool) -> Result<()> {
    let config = EngineConfig {
        search_limit: Some(limit),
        ..EngineConfig::from_env()
    };
    let engine = open_engine(&source, config)?;
    let results = engine.search_medicines(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("[OK] 검색 결과 ({} 건):\n", results.len());
    for (i, medicine) in results.iter().enumerate() {
        print_medicine(i + 1, medicine);
    }

    Ok(())
}

/// 소스 검증 명령어 (check)
///
/// 치명적 에러가 있으면 0이 아닌 종료 코드로 끝납니다.
async fn cmd_check(source: PathBuf) -> Result<()> {
    println!("[*] 소스 검증 중: {}", source.display());

    let table_source = source_for_path(&source).context("지식베이스 소스 결정 실패")?;
    let kb = KnowledgeBase::load(table_source.as_ref()).context("지식베이스 검증 실패")?;
    let stats = kb.stats();

    println!(
        "[OK] 질병 {} / 증상 {} / 원인 {} / 치료 {}",
        stats.disease_count, stats.symptom_count, stats.cause_count, stats.treatment_count
    );
    println!("     약재 {} / 연결 {}", stats.medicine_count, stats.link_count);

    if kb.warnings().is_empty() {
        println!("[OK] 잘못된 행 없음");
    } else {
        println!("\n[!] 건너뛴 행 {} 건:", kb.warnings().len());
        for warning in kb.warnings() {
            println!("    - {}", warning);
        }
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(source: PathBuf) -> Result<()> {
    println!("ayur-kb v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", get_data_dir().display());
    println!("[*] 소스: {}", source.display());

    let config = EngineConfig::from_env();
    println!(
        "[*] 가중치: vital={} symptom={} cause={}, 최소 점수: {}",
        config.weights.vital, config.weights.symptom, config.weights.cause, config.min_score
    );

    match open_engine(&source, config) {
        Ok(engine) => {
            let info = engine.snapshot().info();
            println!(
                "[OK] 질병: {} 건, 약재: {} 건, 연결: {} 건",
                info.stats.disease_count, info.stats.medicine_count, info.stats.link_count
            );
            if info.stats.warning_count > 0 {
                println!(
                    "[!] 건너뛴 행: {} 건 (자세히: ayur-kb check)",
                    info.stats.warning_count
                );
            }
            println!("     지문: {}", &info.fingerprint[..16]);
            println!("     로드 시각: {}", info.loaded_at.format("%Y-%m-%d %H:%M:%S"));
        }
        Err(e) => {
            println!("[!] 지식베이스 로드 실패: {:#}", e);
        }
    }

    Ok(())
}

/// 대화형 질의 명령어 (chat)
///
/// 표준 입력에서 한 줄씩 읽어 답변합니다.
/// 백그라운드 태스크가 주기적으로 소스 지문을 확인하고 바뀌면 리로드합니다.
async fn cmd_chat(source: PathBuf, watch_secs: u64) -> Result<()> {
    let engine = Arc::new(open_engine(&source, EngineConfig::from_env())?);

    let watcher = (watch_secs > 0).then(|| {
        tokio::spawn(watch_source(Arc::clone(&engine), Duration::from_secs(watch_secs)))
    });

    println!("[*] 증상을 입력하세요. 약재 검색은 '/search <검색어>', 종료는 '/quit'.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Reload => match engine.reload() {
                Ok(outcome) => println!("[OK] {:?}", outcome),
                Err(e) => println!("[!] 리로드 실패 (이전 데이터 유지): {}", e),
            },
            ChatInput::Search(query) => {
                let results = engine.search_medicines(query);
                if results.is_empty() {
                    println!("[!] 검색 결과가 없습니다.");
                }
                for (i, medicine) in results.iter().enumerate() {
                    print_medicine(i + 1, medicine);
                }
            }
            ChatInput::Ask(query) => print_answer(&engine.answer_query(query)),
        }
    }

    if let Some(handle) = watcher {
        handle.abort();
    }

    Ok(())
}

/// chat 입력 한 줄
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Quit,
    Reload,
    /// `/search <검색어>`
    Search(&'a str),
    /// 그 외는 증상 질의
    Ask(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(c, r)| (c, r.trim()));

        match command {
            "" => ChatInput::Empty,
            "/quit" | "/exit" => ChatInput::Quit,
            "/reload" => ChatInput::Reload,
            "/search" => ChatInput::Search(rest),
            _ => ChatInput::Ask(line),
        }
    }
}

/// 소스 변경 감시 루프
async fn watch_source(engine: Arc<KnowledgeEngine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // 첫 tick은 즉시 발생하므로 건너뜀
    interval.tick().await;

    loop {
        interval.tick().await;

        let engine = Arc::clone(&engine);
        let result = tokio::task::spawn_blocking(move || engine.reload_if_changed()).await;

        match result {
            Ok(Ok(ReloadOutcome::Reloaded { generation, .. })) => {
                tracing::info!("Knowledge source changed, now serving generation {}", generation);
            }
            Ok(Ok(ReloadOutcome::Unchanged)) => {}
            Ok(Err(e)) => {
                tracing::warn!("Background reload failed: {}", e);
            }
            Err(e) => {
                tracing::warn!("Reload task panicked: {}", e);
            }
        }
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_answer(answer: &Answer) {
    let Some(diagnosis) = &answer.diagnosis else {
        println!("\n[!] {}\n", answer.message);
        return;
    };

    println!();
    println!(
        "[OK] 진단: {} ({}) [점수: {}]",
        diagnosis.name, diagnosis.traditional_name, diagnosis.score
    );
    println!("     도샤: {}, 부위: {}", diagnosis.dosha, diagnosis.body_region);
    println!("     일치 단어: {}", diagnosis.matched_terms.join(", "));

    if !diagnosis.treatments.is_empty() {
        println!("\n   치료:");
        for treatment in &diagnosis.treatments {
            println!("   - {}", truncate_text(treatment, 120));
        }
    }

    if !diagnosis.medicines.is_empty() {
        println!("\n   약재:");
        for rec in &diagnosis.medicines {
            let m = &rec.medicine;
            println!(
                "   - [{} / {}] {} - {}, {} ({})",
                rec.role, rec.stage, m.name, m.dosage, m.frequency, m.vehicle
            );
        }
    }

    if !answer.alternatives.is_empty() {
        println!("\n   다른 후보:");
        for candidate in &answer.alternatives {
            println!("   - {} [점수: {}]", candidate.name, candidate.score);
        }
    }

    println!();
}

fn print_medicine(index: usize, medicine: &Medicine) {
    let brand = if medicine.brand.is_empty() {
        "-"
    } else {
        medicine.brand.as_str()
    };

    println!("{}. {} [{}] ({})", index, medicine.name, medicine.form, brand);
    println!(
        "   {} | {} | {}",
        medicine.dosage, medicine.frequency, medicine.vehicle
    );
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

// ============================================================================
// Tests
// ============================================================================
