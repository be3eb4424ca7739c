use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod budget;
mod catalog;
mod config;
mod error;
mod estimate;
mod extract;
mod io;
mod logging;
mod oracle;
mod render;
mod slicer;
mod tokenizer;

use crate::render as render_mod;
use anyhow::Context as _;
use error::SliceError;
use estimate::{FixedPositions, RandomSampler, SamplePolicy};
use oracle::{BoundaryOracle, MockOracle, OpenAiOracle};
use slicer::{Slicer, SlicerConfig};
use std::time::Duration;
use tokenizer::{HeuristicCounter, TiktokenCounter, TokenCounter};
use tracing::warn;

#[derive(Parser, Debug, Clone)]
#[command(name = "piecewise", version, about = "Slice long documents into token-budgeted chunks at semantic boundaries", long_about = None)]
struct Cli {
    /// Active profile name
    #[arg(short = 'p', long = "profile", global = true)]
    profile: Option<String>,

    /// Model override
    #[arg(short = 'm', long = "model", global = true)]
    model: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long = "json", global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Timeout (seconds) for each oracle request
    #[arg(long = "timeout", global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Slice a document into chunks
    Slice(SliceArgs),

    /// Show the token ratio and character budget without calling the model
    Plan(PlanArgs),

    /// List known models and their context windows
    Models,

    /// Write a config profile
    Init(InitArgs),
}

#[derive(Args, Debug, Clone)]
struct BudgetArgs {
    /// Document to read (stdin when omitted or "-")
    #[arg(long)]
    file: Option<PathBuf>,
    /// Provider to use (openai or mock)
    #[arg(long)]
    provider: Option<String>,
    /// Share of the context window offered to one request (window / divisor)
    #[arg(long)]
    divisor: Option<u32>,
    /// Tokens held back as a safety margin
    #[arg(long = "padding")]
    padding_tokens: Option<u32>,
    /// Context window in tokens, for models missing from the catalog
    #[arg(long)]
    window: Option<u32>,
    /// Instruction prompt file (bundled prompt when omitted)
    #[arg(long = "prompt-file")]
    prompt_file: Option<PathBuf>,
    /// Fixed character positions for ratio sampling instead of random ones
    #[arg(long = "sample-at", value_delimiter = ',')]
    sample_at: Vec<usize>,
}

#[derive(Args, Debug, Clone)]
struct SliceArgs {
    #[command(flatten)]
    budget: BudgetArgs,
    /// Give up after this many consecutive unusable oracle answers
    #[arg(long = "max-retries")]
    max_retries: Option<u64>,
    /// Check the model against the provider's live model list first
    #[arg(long = "verify-model")]
    verify_model: bool,
    /// One JSON object per chunk per line (ignored with --json)
    #[arg(long)]
    jsonl: bool,
}

#[derive(Args, Debug, Clone)]
struct PlanArgs {
    #[command(flatten)]
    budget: BudgetArgs,
}

#[derive(Args, Debug, Clone)]
struct InitArgs {
    /// Provider name (openai or mock)
    #[arg(long)]
    provider: Option<String>,
    /// API key to store in the profile
    #[arg(long = "api-key")]
    api_key: Option<String>,
    /// Default model
    #[arg(long)]
    default_model: Option<String>,
    /// API base URL for OpenAI-compatible servers
    #[arg(long = "api-base")]
    api_base: Option<String>,
    /// Profile name to create or update
    #[arg(long, default_value = "default")]
    profile: String,
    /// Default divisor
    #[arg(long)]
    divisor: Option<u32>,
    /// Default padding tokens
    #[arg(long = "padding")]
    padding_tokens: Option<u32>,
    /// Default retry ceiling
    #[arg(long = "max-retries")]
    max_retries: Option<u64>,
}

#[derive(Debug, Clone)]
struct GlobalOpts {
    profile: Option<String>,
    model: Option<String>,
    json: bool,
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Cli {
        profile,
        model,
        json,
        verbose,
        timeout_secs,
        command,
    } = cli;

    logging::init_tracing(verbose);

    let globals = GlobalOpts {
        profile,
        model,
        json,
        timeout_secs,
    };

    let result = match command {
        Commands::Slice(args) => cmd_slice(&globals, args).await,
        Commands::Plan(args) => cmd_plan(&globals, args).await,
        Commands::Models => cmd_models(&globals),
        Commands::Init(args) => cmd_init(&globals, args),
    };

    if let Err(e) = result {
        if globals.json {
            let (code, hint) = classify_error(&e);
            let msg = format!("{:#}", e);
            render_mod::print_json_error(code, &msg, hint);
        } else {
            eprintln!("{:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn classify_error(e: &anyhow::Error) -> (&'static str, Option<&'static str>) {
    if let Some(se) = e.downcast_ref::<SliceError>() {
        return (se.code(), se.hint());
    }
    let msg = e.to_string().to_lowercase();
    if msg.contains("file not found") {
        return ("file_not_found", Some("check the file path"));
    }
    if msg.contains("config") {
        return ("invalid_config", None);
    }
    ("unknown", None)
}

/// Everything needed before the loop: settings, engine, tokenizer.
struct Prepared {
    settings: config::EffectiveSettings,
    slicer: Slicer,
    counter: Box<dyn TokenCounter>,
    policy: Box<dyn SamplePolicy>,
}

async fn prepare(globals: &GlobalOpts, args: &BudgetArgs, max_retries: Option<u64>) -> anyhow::Result<Prepared> {
    dotenvy::dotenv().ok();

    let overrides = config::CliOverrides {
        profile: globals.profile.clone(),
        provider: args.provider.clone(),
        model: globals.model.clone(),
        divisor: args.divisor,
        padding_tokens: args.padding_tokens,
        max_retries,
        prompt_path: args.prompt_file.clone(),
        timeout_secs: globals.timeout_secs,
    };
    let settings = config::resolve_effective_settings(&overrides)?;
    if !settings.is_mock() {
        catalog::check_min_tier(&settings.model, Some(&settings.config))?;
    }

    let text = io::read_document(args.file.as_deref()).await?;
    let prompt = config::load_prompt(settings.prompt_path.as_deref())?;
    let cfg = SlicerConfig {
        model: settings.model.clone(),
        window_override: args.window,
        divisor: settings.divisor,
        padding_tokens: settings.padding_tokens,
        prompt,
        max_retries: settings.max_retries,
    };
    let slicer = Slicer::new(&text, cfg, Some(&settings.config))?;
    let counter = token_counter_for(&settings)?;
    let policy: Box<dyn SamplePolicy> = if args.sample_at.is_empty() {
        Box::new(RandomSampler)
    } else {
        Box::new(FixedPositions(args.sample_at.clone()))
    };
    Ok(Prepared { settings, slicer, counter, policy })
}

/// tiktoken for models it knows; models the user configured by hand fall
/// back to the 4 chars per token heuristic.
fn token_counter_for(settings: &config::EffectiveSettings) -> anyhow::Result<Box<dyn TokenCounter>> {
    match TiktokenCounter::for_model(&settings.model) {
        Ok(c) => Ok(Box::new(c)),
        Err(_) if settings.config.find_model_override(&settings.model).is_some() => {
            warn!(model = %settings.model, "no tiktoken encoding; using heuristic token counts");
            Ok(Box::new(HeuristicCounter::default()))
        }
        Err(e) => Err(SliceError::from(e).into()),
    }
}

fn build_oracle(settings: &config::EffectiveSettings) -> anyhow::Result<Box<dyn BoundaryOracle>> {
    if settings.is_mock() {
        return Ok(Box::new(MockOracle));
    }
    if !settings.provider.eq_ignore_ascii_case("openai") {
        anyhow::bail!(SliceError::InvalidConfig(format!("unsupported provider: {}", settings.provider)));
    }
    let api_key = settings
        .api_key
        .clone()
        .ok_or_else(|| SliceError::MissingApiKey(settings.provider.clone()))?;
    let oracle = OpenAiOracle::new_with_timeout(
        api_key,
        settings.api_base.clone(),
        Duration::from_secs(settings.timeout_secs),
    )
    .map_err(SliceError::from)?;
    Ok(Box::new(oracle))
}

async fn verify_model_available(settings: &config::EffectiveSettings) -> anyhow::Result<()> {
    let api_key = settings
        .api_key
        .clone()
        .ok_or_else(|| SliceError::MissingApiKey(settings.provider.clone()))?;
    let client = OpenAiOracle::new_with_timeout(api_key, settings.api_base.clone(), Duration::from_secs(settings.timeout_secs))
        .map_err(SliceError::from)?;
    let models = client.list_models().await.map_err(SliceError::from)?;
    if !models.iter().any(|m| m == &settings.model) {
        return Err(SliceError::ModelNotFound(settings.model.clone()))
            .context("model is not available to this account");
    }
    Ok(())
}

async fn cmd_slice(globals: &GlobalOpts, args: SliceArgs) -> anyhow::Result<()> {
    let Prepared { settings, slicer, counter, mut policy } =
        prepare(globals, &args.budget, args.max_retries).await?;
    let oracle = build_oracle(&settings)?;
    if args.verify_model && !settings.is_mock() {
        verify_model_available(&settings).await?;
    }

    let (plan, outcome) = slicer.run(counter.as_ref(), policy.as_mut(), oracle.as_ref()).await?;
    if !outcome.unconsumed().is_empty() {
        warn!(chars = outcome.unconsumed().chars().count(), "stopped early; trailing text was not chunked");
    }

    if globals.json {
        render_mod::print_json(&render_mod::SliceReport::new(&plan, &outcome));
    } else if args.jsonl {
        render_mod::print_jsonl(outcome.chunks());
    } else {
        render_mod::render_chunks_text(outcome.chunks());
    }
    Ok(())
}

async fn cmd_plan(globals: &GlobalOpts, args: PlanArgs) -> anyhow::Result<()> {
    let Prepared { slicer, counter, mut policy, .. } = prepare(globals, &args.budget, None).await?;
    let plan = slicer.plan(counter.as_ref(), policy.as_mut())?;
    let content_chars = slicer.content().chars().count();
    let min_chunks = content_chars.div_ceil(plan.char_budget);

    if globals.json {
        #[derive(serde::Serialize)]
        struct Out<'a> {
            #[serde(flatten)]
            plan: &'a slicer::SlicePlan,
            window_source: catalog::WindowSource,
            content_chars: usize,
            min_chunks: usize,
        }
        render_mod::print_json(&Out {
            plan: &plan,
            window_source: slicer.profile().source,
            content_chars,
            min_chunks,
        });
    } else {
        println!("model:             {}", plan.model);
        println!("context window:    {}", plan.window);
        println!("chars per token:   {:.3}", plan.ratio);
        println!("prompt tokens:     {}", plan.prompt_tokens);
        println!("available tokens:  {}", plan.available_tokens);
        println!("char budget:       {}", plan.char_budget);
        println!("content chars:     {}", content_chars);
        println!("min chunks:        {}", min_chunks);
    }
    Ok(())
}

fn cmd_models(globals: &GlobalOpts) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ModelInfo {
        name: String,
        context_window: u32,
        source: &'static str,
    }

    let cfg_path = config::default_config_path()?;
    let cfg = config::load_config_if_exists(&cfg_path)?.unwrap_or_default();

    let mut models: Vec<ModelInfo> = catalog::MODEL_WINDOWS
        .iter()
        .map(|(name, w)| ModelInfo { name: name.to_string(), context_window: *w, source: "catalog" })
        .collect();
    for (name, ovr) in &cfg.model_overrides {
        if let Some(w) = ovr.context_window {
            models.retain(|m| &m.name != name);
            models.push(ModelInfo { name: name.clone(), context_window: w, source: "config" });
        }
    }

    if globals.json {
        render_mod::print_json(&models);
    } else {
        for m in models {
            println!("{}\tcw={}\t{}", m.name, m.context_window, m.source);
        }
    }
    Ok(())
}

fn cmd_init(_globals: &GlobalOpts, args: InitArgs) -> anyhow::Result<()> {
    use config::{default_config_path, load_config_if_exists, write_config, Profile};

    let path = default_config_path()?;
    let mut cfg = load_config_if_exists(&path)?.unwrap_or_default();

    let prof = cfg
        .profiles
        .entry(args.profile.clone())
        .or_insert_with(Profile::default);
    if let Some(p) = args.provider { prof.provider = Some(p); }
    if let Some(k) = args.api_key { prof.api_key = Some(k); }
    if let Some(m) = args.default_model { prof.model = Some(m); }
    if let Some(b) = args.api_base { prof.api_base = Some(b); }
    if let Some(d) = args.divisor { cfg.slicing.divisor = Some(d); }
    if let Some(p) = args.padding_tokens { cfg.slicing.padding_tokens = Some(p); }
    if let Some(r) = args.max_retries { cfg.slicing.max_retries = Some(r); }
    if cfg.default_profile.is_none() { cfg.default_profile = Some(args.profile); }

    write_config(&path, &cfg)?;
    println!("config written: {}", path.display());
    Ok(())
}
