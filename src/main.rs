//! BrdBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures_util::StreamExt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use brdbuddy::{
    backends::GenerationBackend,
    cli::{Args, Commands},
    config::Config,
    generation::{GenerationGateway, GenerationMode, GenerationResult, GenerationStream, PooledBackend, WorkerPool},
    logging,
    prefill::SectionPrefillEngine,
    rag::{ArtifactIndexer, RagOrchestrator, Retriever},
    store::{FileArtifactStore, FileBrdStore, FileTemplateCatalog},
    streaming::{BlockingOllamaClient, OllamaClient},
    summary::{BrdSummaryService, SummaryStatus},
    telemetry::TelemetryCollector,
    vector_db::QdrantVectorStore,
};

/// Services wired from configuration
struct Services {
    orchestrator: RagOrchestrator,
    summaries: BrdSummaryService,
    indexer: ArtifactIndexer,
    telemetry: TelemetryCollector,
    pool: Arc<WorkerPool>,
}

fn build_services(config: &Config) -> Result<Services> {
    let ollama = Arc::new(
        OllamaClient::with_config(
            &config.ollama.base_url,
            &config.ollama.model,
            &config.ollama.embedding_model,
            config.request_timeout(),
        )
        .context("Failed to create Ollama client")?,
    );
    let vectors = Arc::new(
        QdrantVectorStore::connect(&config.qdrant.url, &config.qdrant.collection)
            .context("Failed to connect to Qdrant")?,
    );

    let pool = Arc::new(WorkerPool::with_dispose_timeout(
        config.worker_pool.max_workers,
        config.dispose_timeout(),
    ));
    let generator: Arc<dyn GenerationBackend> = if config.ollama.blocking_generation {
        let blocking = BlockingOllamaClient::new(&config.ollama.base_url, &config.ollama.model, config.request_timeout());
        Arc::new(PooledBackend::new(blocking, pool.clone()))
    } else {
        ollama.clone()
    };

    let data_dir = config.store.data_dir.as_path();
    let retriever = Retriever::with_params(
        ollama,
        vectors.clone(),
        Arc::new(FileArtifactStore::new(data_dir)),
        config.search_params(),
    );
    let indexer = ArtifactIndexer::new(retriever.clone(), vectors);

    let telemetry = TelemetryCollector::new();
    let gateway = GenerationGateway::new(generator, telemetry.clone());

    let prefill = SectionPrefillEngine::new(retriever.clone(), gateway.clone())
        .with_vector_search_limit(config.retrieval.vector_search_limit)
        .with_max_concurrent_fields(config.prefill.max_concurrent_fields);

    let orchestrator = RagOrchestrator::with_prefill_engine(
        retriever,
        gateway.clone(),
        Arc::new(FileTemplateCatalog::new(data_dir)),
        prefill,
    );
    let summaries = BrdSummaryService::new(Arc::new(FileBrdStore::new(data_dir)), gateway);

    Ok(Services {
        orchestrator,
        summaries,
        indexer,
        telemetry,
        pool,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(model) = &args.model {
        config.ollama.model = model.clone();
    }

    logging::init(&config.logging.filter, args.verbose > 0);

    if matches!(args.command, Commands::Config) {
        return show_config(&config).await;
    }

    let services = build_services(&config)?;
    let outcome = run_command(&services, &args.command).await;
    services.pool.dispose().await;
    outcome
}

async fn run_command(services: &Services, command: &Commands) -> Result<()> {
    match command {
        Commands::Ask {
            question,
            document,
            stream,
            ..
        } => {
            let context_type = command.context_type().transpose()?;
            let mode = if *stream {
                GenerationMode::Stream
            } else {
                GenerationMode::Batch
            };

            let result = services
                .orchestrator
                .answer(question, context_type, document, mode)
                .await?;
            print_answer(result).await?;
            report_stats(&services.telemetry);
        }
        Commands::SummarizeBrd { id } => {
            let result = services.summaries.summarize(id).await?;

            match result.status {
                SummaryStatus::Success => println!("{}", "✓ Summary generated".green()),
                SummaryStatus::Failed => println!("{}", "✗ Summary failed".red()),
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Prefill {
            sections_file,
            documents,
            additional_context,
        } => {
            let sections = read_sections(sections_file).await?;

            let updated = services
                .orchestrator
                .prefill(Some(&sections), documents, additional_context.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
            report_stats(&services.telemetry);
        }
        Commands::Index { document } => {
            let written = services.indexer.index_document(document).await?;
            println!("{} Indexed {} chunks of {}", "✓".green(), written, document);
        }
        // Shown before services are built
        Commands::Config => {}
    }

    Ok(())
}

async fn read_sections(path: &Path) -> Result<serde_json::Value> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", path.display()))
}

async fn print_answer(result: GenerationResult) -> Result<()> {
    match result {
        GenerationResult::Complete(text) => println!("{}", text),
        GenerationResult::Stream(stream) => print_stream(stream).await?,
    }
    Ok(())
}

/// Print chunks as they arrive; Ctrl-C cancels the rest of the answer
async fn print_stream(mut stream: GenerationStream) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut interrupted = false;

    loop {
        tokio::select! {
            chunk = stream.next() => match chunk {
                Some(chunk) => {
                    write!(stdout, "{}", chunk?)?;
                    stdout.flush()?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
        }
    }

    println!();
    if interrupted {
        stream.cancel();
        eprintln!("{}", "Generation cancelled".yellow());
    }
    Ok(())
}

fn report_stats(telemetry: &TelemetryCollector) {
    let stats = telemetry.get_stats();
    tracing::debug!(
        retrievals = stats.retrievals,
        generations = stats.generations_completed,
        degraded_retries = stats.degraded_retries,
        elapsed_ms = telemetry.elapsed().as_millis() as u64,
        "request finished"
    );
}

async fn show_config(config: &Config) -> Result<()> {
    println!("{}", "BrdBuddy Configuration".bold());
    println!();

    let path = Config::config_path()?;
    println!("File:   {}", path.display());
    println!();
    println!("{}", toml::to_string_pretty(config).context("Failed to render config")?);

    let ollama = OllamaClient::with_config(
        &config.ollama.base_url,
        &config.ollama.model,
        &config.ollama.embedding_model,
        config.request_timeout(),
    )?;
    if ollama.health_check().await {
        println!("Ollama: {}", "reachable".green());
    } else {
        println!("Ollama: {}", "unreachable (start with: ollama serve)".red());
    }

    Ok(())
}
