use clap::Parser;
use forgekit::extension::{EventFlow, ServerEvent};
use forgekit::modules::blocks::BlocksCache;
use forgekit::modules::crafts::{CraftsCache, RecipeBook};
use forgekit::modules::decor::DecorCache;
use forgekit::modules::items::ItemsCache;
use forgekit::modules::players::PlayersCache;
use forgekit::{
    Config, DiscoverySource, Extension, ExtensionKind, Runtime, Scheduler, TokioScheduler,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "forgekit", about = "Game-server extension runtime")]
struct Args {
    /// Config file; falls back to environment variables when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Logs every dispatched event; stands in for real content listeners.
struct TraceListener;

impl Extension for TraceListener {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::Listener
    }

    fn name(&self) -> &'static str {
        "trace_listener"
    }

    fn on_event(&self, event: &ServerEvent, flow: &mut EventFlow) {
        tracing::debug!(event = %event.name, cancelled = flow.is_cancelled(), "event");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let cfg = Arc::new(match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    });

    let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);
    let mut runtime = Runtime::new(cfg.clone(), scheduler);

    let source = DiscoverySource::new().with(|| Box::new(TraceListener));
    runtime.discover(&source)?;

    // Crafts is installed last on purpose: blocks and items park their
    // recipe registrations on a barrier until it comes up.
    let book = RecipeBook::new();
    runtime.add_module(Box::new(BlocksCache::new(book.clone())?))?;
    runtime.add_module(Box::new(ItemsCache::new(book.clone())?))?;
    runtime.add_module(Box::new(DecorCache::new()?))?;
    runtime.add_module(Box::new(PlayersCache::new()?))?;
    runtime.add_module(Box::new(CraftsCache::new(book)?))?;

    runtime.load_all()?;
    tracing::info!(
        modules = runtime.modules().count(),
        extensions = runtime.extension_count(),
        "forgekit runtime up"
    );

    tokio::signal::ctrl_c().await?;
    runtime.shutdown();

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().unwrap();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
}
