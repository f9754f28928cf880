//! Webtop shell entry point.
//!
//! Runs the shell headlessly: loads configuration, restores the icon layout,
//! replays a scripted input session, and waits for every icon save to land.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML from --config or the platform dir
//!                                 (--write-config writes it back and exits)
//!  └─ Shell::new()             -- bus + services, wired together
//!  └─ load_icons()             -- TomlIconStore
//!  └─ for event in script      -- ScriptedInputSource
//!       ├─ shell.handle_input(event)
//!       └─ shell.pump()        -- spawn batched saves
//!  └─ shell.settle()           -- wait for in-flight saves
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use webtop_core::Viewport;
use webtop_shell::application::shell::Shell;
use webtop_shell::infrastructure::input_source::scripted::ScriptedInputSource;
use webtop_shell::infrastructure::input_source::InputSource;
use webtop_shell::infrastructure::storage::config::{self, load_config};
use webtop_shell::infrastructure::storage::icon_store::TomlIconStore;

/// Headless Webtop desktop shell.
#[derive(Debug, Parser)]
#[command(name = "webtop-shell", version, about)]
struct Cli {
    /// Configuration file.  Defaults to the platform config directory.
    #[arg(long, env = "WEBTOP_CONFIG")]
    config: Option<PathBuf>,

    /// JSON input script to replay.
    #[arg(long, env = "WEBTOP_SCRIPT")]
    script: Option<PathBuf>,

    /// Icon layout file.  Overrides `[icons] store_path`.
    #[arg(long, env = "WEBTOP_ICONS")]
    icons: Option<PathBuf>,

    /// Initial viewport as WIDTHxHEIGHT.
    #[arg(long, env = "WEBTOP_VIEWPORT", default_value = "1440x900", value_parser = parse_viewport)]
    viewport: (f64, f64),

    /// The viewport is a touch screen.
    #[arg(long, env = "WEBTOP_TOUCH")]
    touch: bool,

    /// Write the effective configuration (defaults filled in) to the config
    /// file and exit.
    #[arg(long)]
    write_config: bool,
}

fn parse_viewport(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: f64 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if !(width > 0.0 && height > 0.0) {
        return Err(format!("viewport must be positive, got {s:?}"));
    }
    Ok((width, height))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.write_config {
        let path = config::write_effective_config(cli.config.as_deref())
            .context("writing configuration")?;
        println!("configuration written to {}", path.display());
        return Ok(());
    }

    let cfg = load_config(cli.config.as_deref()).context("loading configuration")?;

    // Structured logging.  `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.shell.log_level)),
        )
        .init();

    info!("Webtop shell starting");

    let icons_path = match cli.icons.or_else(|| cfg.icons.store_path.clone()) {
        Some(path) => path,
        None => config::default_icon_store_path().context("resolving icon layout path")?,
    };
    let store = Arc::new(TomlIconStore::new(icons_path));

    let (width, height) = cli.viewport;
    let mut shell = Shell::new(
        cfg.shell_settings(),
        Viewport::new(width, height, cli.touch),
        store,
    );

    // Every published event, as JSON, at debug level.
    let _trace = shell.bus().subscribe_all(|event| {
        let json = serde_json::to_string(event)?;
        debug!(channel = %event.channel(), event = %json, "bus");
        Ok(())
    });

    match shell.load_icons().await {
        Ok(count) => info!(icons = count, "icon layout restored"),
        Err(e) => warn!(error = %e, "could not restore icon layout, starting empty"),
    }
    shell.announce();

    let Some(script) = cli.script else {
        bail!("no input script given; pass --script <FILE> or set WEBTOP_SCRIPT");
    };
    let source = ScriptedInputSource::from_path(&script)
        .with_context(|| format!("reading input script {}", script.display()))?;
    let events = source.start().context("starting input source")?;

    let mut replayed = 0usize;
    for event in events.iter() {
        shell.handle_input(event);
        shell.pump();
        replayed += 1;
        // Let spawned saves make progress between events.
        tokio::task::yield_now().await;
    }
    source.stop();
    shell.flush_device();

    shell.settle().await;
    info!(
        events = replayed,
        processes = shell.window_manager().process_count(),
        "script replayed"
    );

    shell.shutdown();
    info!("Webtop shell stopped");
    Ok(())
}
