//! resume-ats: semantic ATS scoring of resumes against job descriptions

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use resume_ats::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use resume_ats::config::Config;
use resume_ats::error::{Result, ResumeAtsError};
use resume_ats::input::file_detector::DocumentFormat;
use resume_ats::input::manager::InputManager;
use resume_ats::output::formatter::{save_report_to_file, ReportGenerator};
use resume_ats::output::report::ScoreReport;
use resume_ats::processing::analyzer::AtsEngine;
use resume_ats::processing::embedding_manager::EmbeddingModelManager;
use resume_ats::processing::embeddings::EmbeddingCapability;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, config_path).await {
        error!("Command failed: {}", e);
        eprintln!("❌ {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: PathBuf) -> Result<()> {
    match command {
        Commands::Score {
            resume,
            job,
            embedding,
            detailed,
            output,
            save,
        } => {
            cli::validate_file_extension(&resume, &["pdf", "txt", "md"])
                .map_err(|e| ResumeAtsError::InvalidInput(format!("Resume file: {}", e)))?;
            cli::validate_file_extension(&job, &["txt", "md"])
                .map_err(|e| ResumeAtsError::InvalidInput(format!("Job description file: {}", e)))?;

            let output_format = match output {
                Some(format) => cli::parse_output_format(&format).map_err(ResumeAtsError::InvalidInput)?,
                None => config.output.format,
            };
            let detailed = detailed || config.output.detailed;

            let mut input_manager = InputManager::new();
            let resume_text = input_manager
                .extract_text_as(&resume, &[DocumentFormat::Pdf, DocumentFormat::Text, DocumentFormat::Markdown])
                .await?;
            let job_text = input_manager
                .extract_text_as(&job, &[DocumentFormat::Text, DocumentFormat::Markdown])
                .await?;
            info!(
                "Resume: {} characters, job description: {} characters",
                resume_text.len(),
                job_text.len()
            );

            let capability = load_capability(embedding.as_deref(), &config).await;
            let embedding_model = capability.model_name().map(str::to_string);
            let engine = Arc::new(AtsEngine::new(capability, &config));
            let threshold = engine.threshold();

            let analysis = engine
                .analyze_with_timeout(resume_text, job_text, Duration::from_secs(config.matching.timeout_secs))
                .await;

            let report = ScoreReport::from_analysis(
                analysis,
                embedding_model,
                threshold,
                resume.to_string_lossy(),
                job.to_string_lossy(),
            );

            let use_colors = config.output.color_output && save.is_none();
            let generator = ReportGenerator::with_options(use_colors, detailed, true, true);
            let rendered = generator.generate_report(&report, output_format)?;

            match save {
                Some(path) => {
                    save_report_to_file(&rendered, &path)?;
                    println!("✅ Report saved to {}", path.display());
                    println!("📊 ATS score: {}%", report.result.score);
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Extract { job, top_n, embedding } => {
            cli::validate_file_extension(&job, &["txt", "md"])
                .map_err(|e| ResumeAtsError::InvalidInput(format!("Job description file: {}", e)))?;

            let mut config = config;
            if let Some(n) = top_n {
                if n == 0 {
                    return Err(ResumeAtsError::InvalidInput("--top-n must be at least 1".to_string()));
                }
                config.extraction.top_n = n;
            }

            let job_text = InputManager::new().extract_text(&job).await?;
            let capability = load_capability(embedding.as_deref(), &config).await;
            let engine = AtsEngine::new(capability, &config);

            let phrases = engine.extract_key_phrases(&job_text)?;
            if phrases.is_empty() {
                println!("⚠️  No key phrases found in {}", job.display());
                return Ok(());
            }

            println!("🔑 Key phrases for {}\n", job.display());
            for (i, phrase) in phrases.iter().enumerate() {
                println!("  {:>2}. {:<32} {:.3}", i + 1, phrase.text, phrase.relevance);
            }
        }

        Commands::Models { action } => run_models_command(action, &config).await?,

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration\n");
                println!("Config File: {}", config_path.display());
                println!("Models Directory: {}", config.models_dir().display());
                println!("Default Embedding Model: {}", config.models.default_embedding_model);
                println!("\nExtraction:");
                println!("  N-gram range: {}..={}", config.extraction.min_ngram, config.extraction.max_ngram);
                println!("  Top N: {}", config.extraction.top_n);
                println!("  Diversity: {:.2}", config.extraction.diversity);
                println!("\nMatching:");
                println!("  Similarity threshold: {:.2}", config.matching.similarity_threshold);
                println!("  Timeout: {}s", config.matching.timeout_secs);
                println!("\nProcessing:");
                println!("  Max tokens: {}", config.processing.max_tokens);
                println!("  Batch size: {}", config.processing.batch_size);
                println!(
                    "  Embedding cache: {} (capacity {})",
                    config.processing.enable_caching, config.processing.cache_capacity
                );
                println!("\nOutput: {:?} (detailed: {}, colors: {})",
                    config.output.format, config.output.detailed, config.output.color_output);
            }

            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                Config::default().save_to(&config_path)?;
                println!("✅ Configuration reset: {}", config_path.display());
            }

            Some(ConfigAction::Path) => println!("{}", config_path.display()),
        },
    }

    Ok(())
}

async fn run_models_command(action: ModelAction, config: &Config) -> Result<()> {
    let mut manager = EmbeddingModelManager::new(
        config.models_dir().clone(),
        config.models.available_models.clone(),
    )
    .await?;

    match action {
        ModelAction::List => {
            println!("📚 Embedding Models\n");
            for model in manager.list_available_models() {
                let status = if manager.is_model_downloaded(&model.name) {
                    "✅ Downloaded"
                } else {
                    "⬇️  Available"
                };
                let default_marker = if model.name == config.models.default_embedding_model {
                    " (default)"
                } else {
                    ""
                };
                println!("  • {}{} ({}) - {} MB [{}]", model.name, default_marker, model.repo_id, model.size_mb, status);
                println!("    {}", model.description);
            }

            if manager.list_downloaded_models().is_empty() {
                println!("\n💡 No models downloaded yet. Get started with:");
                println!("   resume-ats models download {}", config.models.default_embedding_model);
            }
        }

        ModelAction::Download { model, force } => {
            let spinner = spinner(&format!("Downloading {}...", model));
            let result = manager.download_model(&model, force).await;
            spinner.finish_and_clear();

            let model_path = result?;
            println!("✅ Model '{}' ready", model);
            println!("📁 Location: {}", model_path.display());
        }

        ModelAction::Remove { model } => {
            if manager.remove_model(&model).await? {
                println!("✅ Model '{}' removed", model);
            } else {
                println!("⚠️  Model '{}' is not downloaded", model);
            }
        }

        ModelAction::Info { model } => {
            let model_id = manager
                .resolve_model_id(&model)
                .ok_or_else(|| ResumeAtsError::ModelNotFound(model.clone()))?;
            let info = manager
                .get_model_info(&model_id)
                .ok_or_else(|| ResumeAtsError::ModelNotFound(model.clone()))?;

            println!("📋 Model Information for '{}'\n", info.name);
            println!("Repository: {}", info.repo_id);
            println!("Size: {} MB", info.size_mb);
            println!("Dimensions: {}", info.dimensions);
            println!("Description: {}", info.description);

            match manager.get_model_path(&model_id) {
                Some(path) => println!("Status: ✅ Downloaded ({})", path.display()),
                None => {
                    println!("Status: ⬇️  Available for download");
                    println!("\n💡 To download this model, run:");
                    println!("   resume-ats models download {}", info.name);
                }
            }
        }
    }

    Ok(())
}

/// Load the embedding model off the async runtime, showing a spinner
async fn load_capability(model: Option<&str>, config: &Config) -> EmbeddingCapability {
    let model = model
        .unwrap_or(&config.models.default_embedding_model)
        .to_string();
    let spinner = spinner(&format!("Loading embedding model {}...", model));

    let task_config = config.clone();
    let task_model = model.clone();
    let capability = tokio::task::spawn_blocking(move || EmbeddingCapability::load_model(&task_model, &task_config))
        .await
        .unwrap_or_else(|e| EmbeddingCapability::unavailable(format!("Model loading task failed: {}", e)));

    if capability.is_available() {
        spinner.finish_with_message(format!("✓ Loaded {}", model));
    } else {
        spinner.finish_with_message(format!("⚠️  Embedding model {} not available", model));
        if !model_exists_locally(&model, config) {
            eprintln!("💡 Run `resume-ats models download {}` first", model);
        }
    }
    capability
}

fn model_exists_locally(model: &str, config: &Config) -> bool {
    config.models_dir().join(model).exists() || Path::new(model).exists()
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
