//! NeuXTP Daemon - Main Entry Point

use std::sync::Arc;
use std::time::Duration;

use nxtp_classify::{ClassificationGateway, GatewayConfig, HeuristicBackend, ScoreBackend, SocketBackend};
use nxtp_common::NxtpConfig;
use nxtp_dataplane::{BufferPool, ChannelIo, Engine, NullSink, TrafficGenerator, WorkerIo};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("NeuXTP daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path =
        std::env::var("NXTP_CONFIG").unwrap_or_else(|_| "/etc/neuxtp/nxtpd.json".into());
    let config = NxtpConfig::load(&config_path).unwrap_or_else(|_| {
        tracing::warn!("Config not found, using defaults");
        NxtpConfig::default()
    });

    // Oracle transport: a local scoring daemon when one is configured,
    // otherwise the embedded heuristic model.
    let backend: Arc<dyn ScoreBackend> = match std::env::var("NXTP_ORACLE_ADDR") {
        Ok(addr) => {
            tracing::info!(%addr, "using socket oracle");
            let io_timeout = Duration::from_millis((config.classify.deadline_ms * 2).max(50));
            Arc::new(SocketBackend::new(addr, io_timeout))
        }
        Err(_) => Arc::new(HeuristicBackend),
    };

    let gateway = ClassificationGateway::spawn(GatewayConfig::from(&config.classify), backend)?;
    let pool = BufferPool::new(config.buffer_pool_size);

    let mut engine = Engine::new(config.clone(), gateway);
    let cancel = engine.cancel_token();
    let aggregator = engine.aggregator();

    if config.generator.enabled {
        tracing::info!(
            interval_us = config.generator.interval_us,
            payload_len = config.generator.payload_len,
            "running in load-test mode"
        );
        let gen_config = config.generator.clone();
        let gen_pool = pool.clone();
        engine.start(move |worker_id, _queues| WorkerIo {
            source: Box::new(TrafficGenerator::new(worker_id, &gen_config, gen_pool.clone())),
            sink: Box::new(NullSink),
        })?;
    } else {
        let io = ChannelIo::new(config.num_ports, config.queues_per_port, 1024);
        engine.start(move |_, _| WorkerIo {
            source: Box::new(io.clone()),
            sink: Box::new(io.clone()),
        })?;
    }

    let stats_cancel = cancel.clone();
    let stats_thread = std::thread::Builder::new()
        .name("nxtp-stats".into())
        .spawn(move || aggregator.run(&stats_cancel))?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    cancel.cancel();
    engine.stop();
    let _ = stats_thread.join();

    let totals = engine.aggregator().totals();
    tracing::info!(
        rx = totals.rx_packets,
        tx = totals.tx_packets,
        dropped = totals.dropped,
        malformed = totals.malformed,
        classifier_miss = totals.classifier_miss,
        "final totals"
    );

    Ok(())
}
