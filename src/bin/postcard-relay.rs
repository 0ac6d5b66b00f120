use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use postcard_relay::route::DEFAULT_ID_LEN;
use postcard_relay::{
    CANONICAL_ORDER, Compositor, Config, HopState, Host, Node, OverlaySet, Relay, Route, advance,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "postcard-relay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the relay endpoints.
    Serve(ConfigArgs),
    /// Check a configuration file and exit.
    Validate(ConfigArgs),
    /// Run a whole circuit in-process and write the finished postcard.
    Circuit(CircuitArgs),
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// TOML configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CircuitArgs {
    /// Directory of stamp overlays, one `<host>.png` per canonical host.
    #[arg(long)]
    images: PathBuf,

    /// Starting postcard image.
    #[arg(long)]
    postcard: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Visit hosts in random order.
    #[arg(long)]
    random: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Serve(args) => cmd_serve(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Circuit(args) => cmd_circuit(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut cfg = match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("load config '{}'", path.display()))?
        }
        None => Config::default(),
    };
    cfg.apply_env()?;
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_validate(args: ConfigArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    eprintln!("config ok: listening on {}", cfg.listen);
    Ok(())
}

fn cmd_serve(args: ConfigArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    runtime.block_on(serve(cfg))
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let relay = Arc::new(Relay::from_config(&cfg).await?);
    let app = postcard_relay::router(relay);

    let listener = tokio::net::TcpListener::bind(cfg.listen)
        .await
        .with_context(|| format!("bind {}", cfg.listen))?;
    tracing::info!(listen = %cfg.listen, "postcard-relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for shutdown signal");
            }
        })
        .await
        .context("serve http")?;
    Ok(())
}

fn cmd_circuit(args: CircuitArgs) -> anyhow::Result<()> {
    let overlays = OverlaySet::load_dir(&args.images)?;
    let compositor = Compositor::new(
        overlays,
        postcard_relay::postcard::load_fonts(Some(&args.images)),
    );

    let bytes = std::fs::read(&args.postcard)
        .with_context(|| format!("read postcard '{}'", args.postcard.display()))?;
    let postcard = postcard_relay::postcard::decode_image(&bytes)?;

    let mut rng = rand::thread_rng();
    let mut route = Route::new(Route::new_id(&mut rng, DEFAULT_ID_LEN));
    for (i, name) in CANONICAL_ORDER.iter().enumerate() {
        route.add_node(Node::new(Host {
            name: name.to_string(),
            private: format!("local-{i}"),
            ..Host::default()
        }));
    }
    route.set_postcard(&postcard)?;
    route.order(&mut rng)?;
    route.snapshot_topology();
    if args.random {
        route.shuffle(&mut rng);
    }

    let hosts: Vec<String> = route.nodes.iter().map(|n| n.host.name.clone()).collect();
    for host in &hosts {
        let report = advance(&mut route, host, &compositor, &mut rng)?;
        if report.state == HopState::Completed {
            break;
        }
    }

    let finished = route.postcard_bitmap()?;
    let png = postcard_relay::postcard::encode_png(&finished)?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "circuit {} completed in {:.6} seconds, wrote {}",
        route.id,
        route.transit_time(),
        args.out.display()
    );
    Ok(())
}
