use std::path::PathBuf;

use featurecollection::{EncoderChannels, EncoderOptions, FeatureCollectionEncoder, WofFeature};
use tokio::io::BufWriter;
use tokio_util::sync::CancellationToken;

mod config;
mod driver;

fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .filter_module("featurecollection", log::LevelFilter::Debug)
        .parse_default_env()
        .init();
}

async fn open_options(config: &config::FcConfig) -> anyhow::Result<EncoderOptions> {
    match config.out() {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
            Ok(EncoderOptions::new(config.mode(), BufWriter::new(file)))
        }
        None => Ok(EncoderOptions {
            mode: config.mode(),
            ..EncoderOptions::stdout()
        }),
    }
}

async fn run() -> anyhow::Result<bool> {
    let config = config::config()?;
    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        log::warn!("no paths given, writing an empty collection");
    }

    let encoder = FeatureCollectionEncoder::new(open_options(config).await?).await?;
    log::info!("encoding {} paths in {} mode", paths.len(), encoder.mode());
    let EncoderChannels {
        features,
        done,
        mut errors,
        task,
    } = encoder.listen_with_capacity::<WofFeature>(config.queue());

    let drain = tokio::spawn(async move {
        let mut reported = 0usize;
        while let Some(e) = errors.recv().await {
            log::error!("{:#}", e);
            reported += 1;
        }
        reported
    });

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("ctrl+c received");
            cancel_clone.cancel();
        }
    });

    let indexed = driver::index_paths(&paths, &features, &cancel).await;

    // the document is closed even when indexing failed part way
    drop(features);
    let _ = done.send(());
    task.await?;
    let reported = drain.await?;

    let stats = indexed?;
    log::info!(
        "wrote {} features ({} skipped, {} failed to load, {} encoder errors)",
        stats.sent,
        stats.skipped,
        stats.failed,
        reported
    );
    Ok(reported == 0)
}

#[tokio::main]
async fn main() {
    init_logging();

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
