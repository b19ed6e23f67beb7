use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};

use reach_pipeline::{
    ErrorContext, ErrorDetail, config::Config, procure,
    progress::{self, BatchPhase},
    publish::{FeatureServiceClient, publish_reaches},
    reach::Reach,
    warning,
};

#[derive(Parser)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep reach documents from the upstream source into the local cache.
    Download {
        #[clap(short, long, env = "REACH_PIPELINE_CONFIG")]
        config: PathBuf,
        /// First reach id to try; defaults to the highest cached id.
        #[clap(long)]
        start_id: Option<u64>,
        /// Give up after this many consecutive ids without a document.
        #[clap(long, default_value_t = 5000)]
        max_failures: u64,
    },
    /// Normalize cached documents and publish them to the feature service.
    Publish {
        #[clap(short, long, env = "REACH_PIPELINE_CONFIG")]
        config: PathBuf,
    },
}

async fn load_config(path: &Path) -> anyhow::Result<Config> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| "read config")?;
    let config: Config = serde_yaml::from_str(&raw)
        .with_context(|| format!("parse config from {}", path.display()))?;
    config.validate().map_err(|msg| anyhow!("{msg}"))?;
    Ok(config)
}

async fn download(config: Config, start_id: Option<u64>, max_failures: u64) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.cache_dir)
        .await
        .with_context(|| format!("create {}", config.cache_dir.display()))?;
    let client = procure::build_client()?;

    let existing = procure::cached_reach_ids(&config.cache_dir);
    if let Some(last) = existing.last() {
        info!(
            cached = existing.len(),
            last, "resuming after already cached documents"
        );
    }
    let mut reach_id = start_id.unwrap_or_else(|| existing.last().copied().unwrap_or(1));

    let mut failures = 0;
    while failures < max_failures {
        if existing.binary_search(&reach_id).is_ok() {
            debug!(reach_id, "already cached");
            reach_id += 1;
            continue;
        }
        let path = procure::cache_path(&config.cache_dir, reach_id);
        match procure::fetch_reach_document(&client, &config.source.base_url, reach_id).await {
            Ok(document) => {
                let body = serde_json::to_vec_pretty(&document)?;
                tokio::fs::write(&path, body)
                    .await
                    .with_context(|| format!("write {}", path.display()))?;
                info!(reach_id, path = %path.display(), "downloaded");
                failures = 0;
            }
            Err(error) => {
                debug!(reach_id, %error, failures, "could not retrieve document");
                failures += 1;
            }
        }
        reach_id += 1;
    }
    info!(max_failures, "stopping after a run of missing documents");
    Ok(())
}

async fn normalize_document(path: &Path) -> Result<(Reach, Vec<String>), ErrorDetail> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(ErrorDetail::ReadDocument)?;
    let document: serde_json::Value = serde_json::from_str(&raw).map_err(ErrorDetail::ParseJson)?;
    let (reach, warnings) = warning::scoped(|| Reach::from_document(&document));
    Ok((reach?, warnings))
}

async fn publish(config: Config) -> anyhow::Result<()> {
    let progress = progress::create_reporter();

    progress.set_phase(BatchPhase::LoadingDocuments);
    let paths = procure::cached_document_paths(&config.cache_dir);
    if paths.is_empty() {
        anyhow::bail!("no cached documents under {}", config.cache_dir.display());
    }
    progress.register_documents(paths.len());

    // The collection is fully materialized before schema derivation; the
    // schema needs a complete pass over every record.
    progress.set_phase(BatchPhase::Normalizing);
    let mut reaches = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let context = ErrorContext::new(path.clone());
        match normalize_document(path).await {
            Ok((reach, warnings)) => {
                for warning in warnings {
                    warn!(reach_id = reach.reach_id(), path = %path.display(), "{warning}");
                }
                progress.document_done(&name);
                reaches.push(reach);
            }
            Err(detail) if detail.is_document_scoped() => {
                let error = context.error(detail);
                warn!(%error, "skipping document");
                progress.document_skipped(&name, &error.detail.to_string());
            }
            Err(detail) => {
                let error = context.error(detail);
                progress.set_phase(BatchPhase::Failed(error.to_string()));
                progress.finish();
                return Err(error.into());
            }
        }
    }
    if reaches.is_empty() {
        anyhow::bail!("every cached document was skipped; nothing to publish");
    }

    let client =
        FeatureServiceClient::new(config.service.url.clone(), config.service.token.clone())?;
    match publish_reaches(
        &client,
        &config.service.layer_name,
        config.service.layer_id,
        &reaches,
        config.chunk_size(),
        progress.as_ref(),
    )
    .await
    {
        Ok(summary) => {
            progress.set_phase(BatchPhase::Completed);
            progress.finish();
            info!(
                features = summary.features,
                batches = summary.batches,
                "publish complete"
            );
            Ok(())
        }
        Err(detail) => {
            progress.set_phase(BatchPhase::Failed(detail.to_string()));
            progress.finish();
            Err(detail.into())
        }
    }
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let result = match opts.command {
        Command::Download {
            config,
            start_id,
            max_failures,
        } => match load_config(&config).await {
            Ok(config) => download(config, start_id, max_failures).await,
            Err(e) => Err(e),
        },
        Command::Publish { config } => match load_config(&config).await {
            Ok(config) => publish(config).await,
            Err(e) => Err(e),
        },
    };
    if let Err(e) = result {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
