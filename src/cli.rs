use crate::{
    config::Config,
    extract,
    input::Image,
    llm::ChatClient,
    ocr::{self, TextExtractor, python::PythonOcr},
    pipeline::Pipeline,
    probe, record, render,
    report::{ItemDump, JobReport},
    util::{
        ensure_dir, hash_bytes, looks_like_url, now_rfc3339, prepare_job_dir, sha256_hex,
        write_json_pretty,
    },
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

#[derive(Parser, Debug)]
#[command(name = "product-lister")]
#[command(about = "Batch product listing orchestrator (PaddleOCR + chat completion + JSON export)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./product-lister.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the OCR runner and show the configured completion endpoint.
    Doctor {},
    /// OCR a single image and print the recognized text.
    Ocr {
        #[arg(long)]
        input: PathBuf,
    },
    /// Re-parse a saved listing response without calling any service.
    Parse {
        #[arg(long)]
        input: PathBuf,
    },
    /// Process a batch of product images into listings.
    Run {
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            doctor(&cfg)
        }
        Command::Ocr { input } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            ocr_one(&cfg, input)
        }
        Command::Parse { input } => {
            let _guard = init_logging(&args, &cfg, None)?;
            parse_saved(input)
        }
        Command::Run { input, out_dir } => run(&args, &cfg, input, out_dir.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let default = PathBuf::from("product-lister.toml");
    if default.exists() {
        default
    } else {
        PathBuf::from("product-lister.example.toml")
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = match file_path {
        Some(path) => {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            ensure_dir(parent)?;
            let file = std::fs::File::create(path)
                .with_context(|| format!("create log file: {}", path.display()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = PythonOcr::new(cfg)?;
    let diag = engine.doctor()?;
    let key_present = cfg.llm.resolve_api_key().is_ok();
    if !key_present {
        warn!("{} is not set; `run` will fail", cfg.llm.api_key_env);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "ocr": diag,
            "llm": {
                "base_url": cfg.llm.base_url,
                "model": cfg.llm.model,
                "api_key_env": cfg.llm.api_key_env,
                "api_key_present": key_present,
            },
        }))?
    );
    Ok(())
}

fn ocr_one(cfg: &Config, input: &Path) -> Result<()> {
    validate_input(cfg, input)?;
    let image = Image::from_path(input)?;
    let probe = probe::probe_image(cfg, &image)?;
    let engine = PythonOcr::new(cfg)?;
    let groups = engine.extract(&image)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "probe": probe,
            "groups": groups,
            "text": ocr::flatten_text(&groups),
        }))?
    );
    Ok(())
}

fn parse_saved(input: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading response: {}", input.display()))?;
    let out = match extract::parse_listing(&raw) {
        Ok(record) => serde_json::json!({ "ok": true, "record": record }),
        Err(err) => serde_json::json!({
            "ok": false,
            "error_kind": err.kind(),
            "error": err.to_string(),
            "span": extract::isolate_json(&raw),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run(args: &Args, cfg: &Config, inputs: &[PathBuf], out_override: Option<&Path>) -> Result<()> {
    if inputs.len() > cfg.limits.max_images_per_batch {
        return Err(anyhow!(
            "{} images exceed max_images_per_batch ({})",
            inputs.len(),
            cfg.limits.max_images_per_batch
        ));
    }
    for input in inputs {
        validate_input(cfg, input)?;
    }
    let images = inputs
        .iter()
        .map(|p| Image::from_path(p))
        .collect::<Result<Vec<_>>>()?;

    let cfg_hash = sha256_hex(cfg.normalized_for_hash().as_bytes());
    let input_hashes = images
        .iter()
        .map(|img| hash_bytes(cfg, &img.bytes))
        .collect::<Result<Vec<_>>>()?;
    let job_id = sha256_hex(format!("{}:{}", cfg_hash, input_hashes.join(",")).as_bytes());

    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let job_dir = out_root.join(&job_id);

    if job_dir.exists() && !cfg.global.overwrite_existing {
        return Err(anyhow!(
            "job_dir already exists and overwrite_existing=false: {}",
            job_dir.display()
        ));
    }

    let api_key = cfg.llm.resolve_api_key()?;
    let generator = ChatClient::new(&cfg.llm, api_key)?;
    let extractor = PythonOcr::new(cfg)?;

    prepare_job_dir(&job_dir)?;
    let final_dir = job_dir.join("final");
    let items_dir = job_dir.join("items");

    let log_path = resolve_log_path(cfg, Some(&job_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!("job_id={job_id} images={} out={}", images.len(), job_dir.display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(job_dir.join("effective-config.toml"), raw)?;
    }

    let pipeline = Pipeline::new(cfg, extractor, generator);

    let started = now_rfc3339();
    let batch = pipeline.run(&images);

    if cfg.output.write_item_json {
        for item in &batch.items {
            let dump = ItemDump::from_item(item, cfg.debug.keep_raw_responses);
            write_json_pretty(&items_dir.join(format!("item_{:05}.json", item.index)), &dump)?;
        }
    }

    let export_path = final_dir.join(&cfg.output.export_filename);
    let exported = cfg.output.write_export_json && !batch.records.is_empty();
    if exported {
        std::fs::write(&export_path, record::export_json(&batch.records)?)
            .with_context(|| format!("writing {}", export_path.display()))?;
    } else if batch.records.is_empty() {
        warn!("no listings were extracted; export skipped");
    }

    if cfg.output.write_markdown {
        std::fs::write(
            final_dir.join(&cfg.output.markdown_filename),
            render::render_markdown(cfg, &batch.items),
        )?;
    }

    let report = JobReport::from_batch(&cfg.global.job_name, &cfg.llm.model, &batch);
    if cfg.output.write_report_json {
        write_json_pretty(&final_dir.join(&cfg.output.report_filename), &report)?;
    }

    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "job_id": job_id,
            "started": started,
            "finished": now_rfc3339(),
            "inputs": inputs,
            "export": exported.then(|| format!("final/{}", cfg.output.export_filename)),
            "listings": format!("final/{}", cfg.output.markdown_filename),
            "report": format!("final/{}", cfg.output.report_filename),
        });
        write_json_pretty(&job_dir.join("index.json"), &index)?;
    }

    if cfg.global.print_summary {
        let failures = batch
            .failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "index": f.index,
                    "source": f.source,
                    "error": f.error.to_string(),
                })
            })
            .collect::<Vec<_>>();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "job_id": job_id,
                "job_dir": job_dir,
                "succeeded": report.succeeded,
                "failed": report.failed,
                "export": exported.then_some(&export_path),
                "failures": failures,
            }))?
        );
    }

    Ok(())
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    match input.extension().and_then(|s| s.to_str()) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {}
        Some(_) => return Err(anyhow!("input is not a jpeg/png image: {}", input.display())),
        None => warn!("input has no extension; format will be sniffed: {}", input.display()),
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(job_dir) = job_dir {
        return Some(job_dir.join("logs").join("product-lister.log"));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("product-lister.log"))
}
