use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use songknn::datasets::load_ratings;
use songknn::server::{serve, AppState};
use songknn::{AggregationPolicy, EngineConfig, KnnRecommender, Metric};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "songknn", about = "KNN song recommendation server")]
pub struct Args {
    /// CSV with user_id, song_id, rating, song_name, artist, genre
    #[arg(long, default_value = "data/colombia_music_dataset.csv")]
    dataset: PathBuf,
    /// Engine config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, default_value_t = 8000)]
    port: u16,
    /// Overrides `k` from the config file
    #[arg(long)]
    k: Option<usize>,
    /// euclidean | cosine
    #[arg(long)]
    metric: Option<Metric>,
    /// threshold | weighted
    #[arg(long)]
    policy: Option<AggregationPolicy>,
}

fn engine_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(k) = args.k {
        config.k = k;
    }
    if let Some(metric) = args.metric {
        config.metric = metric;
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = engine_config(&args)?;
    tracing::info!(
        "Engine: metric={}, policy={}, k={}, max_results={}",
        config.metric,
        config.policy,
        config.k,
        config.max_results
    );

    // The index is complete before the listener binds.
    let (index, _report) = load_ratings(&args.dataset)?;
    let recommender = KnnRecommender::new(Arc::new(index), config)?;

    serve(AppState::new(recommender), SocketAddr::new(args.host, args.port)).await
}
