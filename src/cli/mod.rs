//! CLI 모듈
//!
//! docqa-rag CLI 명령어 정의 및 구현
//!
//! 저장소가 메모리에만 있으므로 문서 수집과 질의는 한 프로세스 안에서 이뤄집니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::{has_anthropic_api_key, has_openai_api_key, RagConfig};
use crate::embedding::create_embedding_service;
use crate::error::RagError;
use crate::knowledge::{
    sentence_chunker, AnswerResult, ChunkConfig, Chunker, PipelineOptions, RetrievalPipeline,
    SentenceChunker, TiktokenCounter, TokenCounter, VectorStore,
};
use crate::llm::create_generator;
use crate::text::truncate_text;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "docqa-rag")]
#[command(version, about = "문서 기반 질의응답 RAG 시스템", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 문서를 수집한 뒤 질문 하나에 답변
    Ask {
        /// 질문
        query: String,

        /// 수집할 파일 경로 (여러 번 지정 가능)
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// 직접 입력할 텍스트 (여러 번 지정 가능)
        #[arg(short, long)]
        text: Vec<String>,

        /// 컨텍스트로 사용할 청크 수
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 문서를 수집한 뒤 표준 입력으로 받은 질문에 계속 답변
    Chat {
        /// 수집할 파일 경로 (여러 번 지정 가능)
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// 직접 입력할 텍스트 (여러 번 지정 가능)
        #[arg(short, long)]
        text: Vec<String>,

        /// 컨텍스트로 사용할 청크 수
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// 청킹 결과 미리보기 (API 호출 없음)
    Chunk {
        /// 분할할 파일 경로
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// 분할할 텍스트
        #[arg(short, long)]
        text: Option<String>,

        /// 청크당 최대 토큰 수
        #[arg(long, default_value = "500")]
        max_tokens: usize,

        /// 다음 청크로 이어지는 문장 수
        #[arg(long, default_value = "1")]
        overlap: usize,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            query,
            file,
            text,
            top_k,
            json,
        } => cmd_ask(&query, &file, text, top_k, json).await,
        Commands::Chat { file, text, top_k } => cmd_chat(&file, text, top_k).await,
        Commands::Chunk {
            file,
            text,
            max_tokens,
            overlap,
        } => cmd_chunk(file, text, max_tokens, overlap),
        Commands::Status => cmd_status(),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 질의 명령어 (ask)
async fn cmd_ask(
    query: &str,
    files: &[PathBuf],
    texts: Vec<String>,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("질문이 비어 있습니다");
    }

    let config = RagConfig::from_env().context("설정 로드 실패")?;
    let pipeline = build_pipeline(&config)?;

    let documents = load_documents(files, texts)?;
    ingest_documents(&pipeline, &documents, !json).await;

    let top_k = top_k.unwrap_or(pipeline.options().default_top_k);
    let result = pipeline.ask(query, top_k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_answer(&result);
    }

    Ok(())
}

/// 대화 명령어 (chat)
///
/// 한 번 수집한 저장소를 여러 질문이 공유합니다.
async fn cmd_chat(files: &[PathBuf], texts: Vec<String>, top_k: Option<usize>) -> Result<()> {
    let config = RagConfig::from_env().context("설정 로드 실패")?;
    let pipeline = build_pipeline(&config)?;

    let documents = load_documents(files, texts)?;
    ingest_documents(&pipeline, &documents, true).await;

    let top_k = top_k.unwrap_or(pipeline.options().default_top_k);

    println!("[*] 질문을 입력하세요 (종료: exit 또는 Ctrl-D)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" || query == "quit" {
            break;
        }

        let result = pipeline.ask(query, top_k).await?;
        print_answer(&result);
    }

    Ok(())
}

/// 청킹 미리보기 명령어 (chunk)
fn cmd_chunk(
    file: Option<PathBuf>,
    text: Option<String>,
    max_tokens: usize,
    overlap: usize,
) -> Result<()> {
    let content = match (file, text) {
        (Some(path), _) => read_document(&path)?,
        (None, Some(text)) => text,
        (None, None) => bail!("--file 또는 --text 중 하나를 지정해야 합니다"),
    };

    let counter = Arc::new(TiktokenCounter::cl100k()?);
    let chunker = SentenceChunker::new(
        ChunkConfig {
            max_tokens,
            overlap_sentences: overlap,
        },
        counter.clone(),
    );

    let chunks = chunker.chunk(&content);

    println!(
        "[*] 입력: {} ({} 토큰)",
        format_bytes(content.len()),
        counter.count(&content)
    );
    println!("[OK] 청크 {} 개 (max_tokens={}, overlap={})\n", chunks.len(), max_tokens, overlap);

    for (i, chunk) in chunks.iter().enumerate() {
        let tokens = counter.count(chunk);
        let marker = if tokens > max_tokens { " [한도 초과]" } else { "" };
        println!("{}. [{} 토큰]{}", i + 1, tokens, marker);
        println!("   {}", truncate_text(chunk, 200));
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status() -> Result<()> {
    println!("docqa-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    if has_openai_api_key() {
        println!("[OK] OPENAI_API_KEY: 설정됨");
    } else {
        println!("[!] OPENAI_API_KEY: 미설정 (임베딩에 필수)");
        println!("    설정: export OPENAI_API_KEY=your-key");
    }

    if has_anthropic_api_key() {
        println!("[OK] ANTHROPIC_API_KEY: 설정됨");
    } else {
        println!("[*] ANTHROPIC_API_KEY: 미설정 (Anthropic 백엔드 사용 시 필요)");
    }

    match RagConfig::from_env() {
        Ok(config) => {
            println!("[OK] 답변 백엔드: {} ({})", config.answer.backend, config.answer.model);
            println!(
                "[OK] 임베딩: {} (dimension: {})",
                config.embedding.model, config.embedding.dimension
            );
            println!(
                "     청킹: max_tokens={}, overlap={}",
                config.chunk.max_tokens, config.chunk.overlap_sentences
            );
            println!(
                "     검색: top_k={}, similarity={:?}",
                config.top_k, config.similarity
            );
        }
        Err(e) => {
            println!("[!] 설정 로드 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 설정으로 파이프라인 구성
///
/// 저장소는 여기서 한 번만 만들어 파이프라인에 넘깁니다.
pub fn build_pipeline(config: &RagConfig) -> Result<RetrievalPipeline> {
    let store = Arc::new(VectorStore::with_metric(config.similarity));
    let embedder = create_embedding_service(&config.embedding)?;
    let generator = create_generator(&config.answer)?;
    let chunker = sentence_chunker(config.chunk.clone())?;

    let options = PipelineOptions {
        default_top_k: config.top_k,
        model_options: config.model_options.clone(),
        ..PipelineOptions::default()
    };

    Ok(RetrievalPipeline::new(store, embedder, generator, chunker).with_options(options))
}

/// 파일과 직접 입력 텍스트를 (출처, 내용) 목록으로
fn load_documents(files: &[PathBuf], texts: Vec<String>) -> Result<Vec<(String, String)>> {
    let mut documents = Vec::with_capacity(files.len() + texts.len());

    for path in files {
        documents.push((path.display().to_string(), read_document(path)?));
    }
    for text in texts {
        documents.push(("direct-input".to_string(), text));
    }

    Ok(documents)
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("파일 읽기 실패: {}", path.display()))
}

/// 문서 수집 (빈 문서는 건너뜀)
async fn ingest_documents(
    pipeline: &RetrievalPipeline,
    documents: &[(String, String)],
    verbose: bool,
) {
    for (source, content) in documents {
        match pipeline.ingest(content).await {
            Ok(report) => {
                if verbose {
                    println!("[OK] {}: 청크 {} 개", source, report.chunks_created);
                    if report.degraded_chunks > 0 {
                        println!(
                            "     (임베딩 실패로 영벡터 대체: {} 개)",
                            report.degraded_chunks
                        );
                    }
                }
            }
            Err(RagError::Validation(msg)) => {
                tracing::warn!("Skipping {}: {}", source, msg);
            }
        }
    }
}

fn print_answer(result: &AnswerResult) {
    println!("\n{}\n", result.answer);
    println!("[*] 컨텍스트 {} 건 사용 ({:?})", result.context_used, result.status);
    for (i, preview) in result.context_preview.iter().enumerate() {
        println!("   {}. {}", i + 1, preview);
    }
    println!();
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
    use std::io::Write;

    use super::*;
    use crate::testing::{FakeEmbeddingService, RecordingGenerator};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_load_documents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Cats purr. Dogs bark.").unwrap();

        let docs = load_documents(&[file.path().to_path_buf()], vec!["Inline text.".to_string()])
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].1, "Cats purr. Dogs bark.");
        assert_eq!(docs[1], ("direct-input".to_string(), "Inline text.".to_string()));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = load_documents(&[missing], vec![]).unwrap_err();
        assert!(err.to_string().contains("파일 읽기 실패"));
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from([
            "docqa-rag", "ask", "what about cats", "-f", "a.txt", "-f", "b.txt", "-k", "5",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask {
                query,
                file,
                top_k,
                json,
                ..
            } => {
                assert_eq!(query, "what about cats");
                assert_eq!(file.len(), 2);
                assert_eq!(top_k, Some(5));
                assert!(json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[tokio::test]
    async fn test_ingest_documents_skips_empty() {
        let pipeline = RetrievalPipeline::new(
            Arc::new(VectorStore::new()),
            Arc::new(FakeEmbeddingService::new(4)),
            Arc::new(RecordingGenerator::new()),
            Box::new(SentenceChunker::new(
                ChunkConfig::default(),
                Arc::new(crate::testing::WordCounter),
            )),
        );
        let documents = vec![
            ("a".to_string(), "Cats purr.".to_string()),
            ("b".to_string(), "   ".to_string()),
            ("c".to_string(), "Dogs bark.".to_string()),
        ];

        ingest_documents(&pipeline, &documents, false).await;
        assert_eq!(pipeline.store_size(), 2);
    }

    #[test]
    fn test_build_pipeline() {
        let config = RagConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "RAG_TOP_K" => Some("7".to_string()),
            _ => None,
        })
        .unwrap();
        let pipeline = build_pipeline(&config).unwrap();
        assert_eq!(pipeline.options().default_top_k, 7);
        assert_eq!(pipeline.store_size(), 0);
    }
}
