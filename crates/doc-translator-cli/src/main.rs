//! Document Translator CLI - translate Word documents, estimate costs and
//! generate marketing fiches from the command line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use doc_translator_core::{
    AppConfig, CompletionCache, CostEstimate, DocxDocument, FicheGenerator, FicheKind, Glossary,
    Lang, PipelineProgress, Reviewer, TranslationOptions, TranslationPipeline, create_chat_model,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "doc-translate")]
#[command(author, version, about = "Translate and post-edit Word documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// DeepL API key
    #[arg(long, global = true, env = "DEEPL_API_KEY", hide_env_values = true)]
    deepl_api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, global = true, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// OpenAI API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model used for post-editing and fiches
    #[arg(long, global = true, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Disable the post-edit cache
    #[arg(long, global = true)]
    no_cache: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a .docx with DeepL, then improve it with a chat model
    Translate(TranslateArgs),
    /// Estimate time and cost for translating a .docx
    Estimate(EstimateArgs),
    /// Generate French and English marketing fiches from a .docx
    Fiche(FicheArgs),
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input .docx file
    input: PathBuf,

    /// Output .docx file
    output: PathBuf,

    /// Source language code (e.g., FR)
    #[arg(short, long)]
    source: String,

    /// Target language code (e.g., EN-GB)
    #[arg(short, long)]
    target: String,

    /// Also keep the raw DeepL translation here
    #[arg(long)]
    translated: Option<PathBuf>,

    /// Language level for the post-edit prompt (e.g., soutenu)
    #[arg(long)]
    level: Option<String>,

    /// Paragraphs sent to the model per request
    #[arg(long)]
    group_size: Option<usize>,

    /// Glossary for DeepL (.csv, .tsv or .xlsx)
    #[arg(long)]
    glossary_csv: Option<PathBuf>,

    /// Glossary for the post-edit prompt (.docx with "source: target" lines, or .csv)
    #[arg(long)]
    glossary_gpt: Option<PathBuf>,

    /// Skip the language-model pass
    #[arg(long)]
    no_post_edit: bool,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Input .docx file
    input: PathBuf,

    /// Paragraphs per post-edit request
    #[arg(long, default_value_t = 3)]
    group_size: usize,

    /// Reviewer: TOBY, TOBY+MIKE or MIKE
    #[arg(long, default_value = "TOBY")]
    reviewer: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindOption {
    Commercial,
    Shopify,
}

impl From<KindOption> for FicheKind {
    fn from(opt: KindOption) -> Self {
        match opt {
            KindOption::Commercial => Self::Commercial,
            KindOption::Shopify => Self::Shopify,
        }
    }
}

#[derive(Args, Debug)]
struct FicheArgs {
    /// Input .docx file
    input: PathBuf,

    /// Kind of fiche
    #[arg(long, value_enum, default_value = "commercial")]
    kind: KindOption,

    /// Output directory for french.pdf and english.pdf
    #[arg(long, default_value = "downloads/marketing")]
    out_dir: PathBuf,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config =
        AppConfig::load_layered(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(ref key) = cli.deepl_api_key {
        config.deepl.api_key = Some(key.clone());
    }
    if let Some(ref base) = cli.api_base {
        config.llm.api_base.clone_from(base);
    }
    if let Some(ref key) = cli.api_key {
        config.llm.api_key = Some(key.clone());
    }
    if let Some(ref model) = cli.model {
        config.llm.model.clone_from(model);
    }
    if cli.no_cache {
        config.cache.memory_enabled = false;
        config.cache.disk_enabled = false;
    }

    Ok(config)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.docx")
        .to_string()
}

fn read_glossary(path: &Path) -> Result<Glossary> {
    let bytes = std::fs::read(path).context(format!("Failed to read glossary: {}", path.display()))?;
    Glossary::from_upload(&file_name(path), &bytes)
        .context(format!("Failed to parse glossary: {}", path.display()))
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {msg:24} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

async fn run_translate(config: AppConfig, args: TranslateArgs) -> Result<()> {
    let mut options = TranslationOptions::new(&config, Lang::new(&args.source), Lang::new(&args.target));
    options.post_edit = !args.no_post_edit;
    if let Some(level) = args.level {
        options.language_level = level;
    }
    if let Some(group_size) = args.group_size {
        options.group_size = group_size;
    }
    if let Some(ref path) = args.glossary_csv {
        options.deepl_glossary = Some(read_glossary(path)?);
    }
    if let Some(ref path) = args.glossary_gpt {
        options.prompt_glossary = read_glossary(path)?;
    }

    info!("Loading document: {}", args.input.display());
    let document = std::fs::read(&args.input)
        .context(format!("Failed to read input: {}", args.input.display()))?;

    let cache = Arc::new(CompletionCache::new(&config.cache).context("Failed to open post-edit cache")?);
    let pipeline = TranslationPipeline::from_config(&config, cache)
        .context("Failed to initialize translation pipeline")?;

    let pb = progress_bar();
    let output = pipeline
        .run(document, &file_name(&args.input), &options, &|event| match event {
            PipelineProgress::Stage(stage) => pb.set_message(stage.describe()),
            PipelineProgress::Paragraphs { done, total } => {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
            }
        })
        .await
        .context("Translation failed")?;
    pb.finish_with_message("Translation complete");

    if let Some(ref path) = args.translated {
        std::fs::write(path, &output.translated)
            .context(format!("Failed to write translation: {}", path.display()))?;
    }
    std::fs::write(&args.output, output.final_document())
        .context(format!("Failed to write output: {}", args.output.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        if let Some(report) = output.report.filter(|r| !r.skipped_groups.is_empty()) {
            println!("Skipped groups (left out of the output): {:?}", report.skipped_groups);
        }
        println!("Translated document saved to: {}", args.output.display());
    }

    Ok(())
}

fn run_estimate(args: &EstimateArgs) -> Result<()> {
    let reviewer: Reviewer = args.reviewer.parse()?;
    let doc = DocxDocument::from_file(&args.input)
        .context(format!("Failed to read document: {}", args.input.display()))?;
    let estimate = CostEstimate::compute(&doc.stats(), args.group_size, reviewer);

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Words:            {}", estimate.words);
        println!("Characters:       {}", estimate.characters);
        println!("Paragraphs:       {}", estimate.paragraphs);
        println!("Pages (approx.):  {}", estimate.pages);
        println!("Translation time: {}", estimate.translation_time);
        println!("Translation cost: ${:.6}", estimate.translation_cost);
        println!("Review cost:      ${:.6} ({})", estimate.review_cost, estimate.reviewer);
        println!("Total cost:       ${:.6}", estimate.total_cost);
    }

    Ok(())
}

async fn run_fiche(config: AppConfig, args: FicheArgs) -> Result<()> {
    let bytes = std::fs::read(&args.input)
        .context(format!("Failed to read input: {}", args.input.display()))?;
    let text = FicheGenerator::read_upload(&file_name(&args.input), &bytes)?;

    let model = create_chat_model(&config.llm).context("Failed to initialize chat model")?;
    let generator = FicheGenerator::new(model, config.llm.clone());

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Analysing document");
    let analysis = generator.analyze_chunks(&text).await.context("Error analysing file")?;
    spinner.set_message("Writing fiches");
    let fiche = generator
        .generate(&analysis, args.kind.into())
        .await
        .context("Error generating fiches")?;
    let paths = FicheGenerator::save_pdfs(&fiche, &args.out_dir).context("Error saving PDFs")?;
    spinner.finish_and_clear();

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("French fiche:  {}", paths.french.display());
        println!("English fiche: {}", paths.english.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Command::Translate(args) => run_translate(config, args).await,
        Command::Estimate(ref args) => run_estimate(args),
        Command::Fiche(args) => run_fiche(config, args).await,
    }
}
