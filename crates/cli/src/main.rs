//! Fashion Shop CLI - Cart inspection and management from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the server cart and adopt it locally
//! shop-cli cart show
//!
//! # Show the persisted local cart without contacting the server
//! shop-cli cart local
//!
//! # Add two units of variant 12 of product 3
//! shop-cli cart add --product 3 --variant 12 --quantity 2
//!
//! # Change or remove a line
//! shop-cli cart update 41 3
//! shop-cli cart remove 41
//!
//! # Empty the cart
//! shop-cli cart clear
//!
//! # Forget the local copy only
//! shop-cli cart reset
//! ```
//!
//! Configuration is read from the environment (see
//! `fashion_shop_client::config`). Set `SHOP_LOG_FORMAT=json` for JSON logs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use fashion_shop_client::config::ClientConfig;
use fashion_shop_client::error::AppError;
use fashion_shop_client::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Fashion Shop cart client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Fetch the server cart and replace the local copy with it
    Show,
    /// Show the locally persisted cart
    Local,
    /// Alias of `show`
    Sync,
    /// Add units of a product variant
    Add {
        /// Product ID
        #[arg(short, long)]
        product: u32,

        /// Variant ID
        #[arg(short, long)]
        variant: u32,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a cart line (0 removes it)
    Update {
        /// Cart item ID
        id: u32,
        /// New quantity
        quantity: u32,
    },
    /// Remove a cart line
    Remove {
        /// Cart item ID
        id: u32,
    },
    /// Remove every line from the cart
    Clear,
    /// Delete the locally persisted cart (the server cart is untouched)
    Reset,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fashion_shop_client=warn,fashion_shop_cli=info".into());
    let json = std::env::var("SHOP_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        if e.is_user_error() {
            tracing::warn!("Command failed: {e}");
        } else {
            tracing::error!("Command failed: {e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), AppError> {
    let Commands::Cart { action } = cli.command;

    // Reset runs without loading the stored cart, which may be unreadable
    if matches!(action, CartAction::Reset) {
        return commands::cart::reset(&config);
    }
    let state = AppState::new(config)?;

    match action {
        CartAction::Show | CartAction::Sync => commands::cart::show(&state).await?,
        CartAction::Local => commands::cart::local(&state),
        CartAction::Add {
            product,
            variant,
            quantity,
        } => commands::cart::add(&state, product, variant, quantity).await?,
        CartAction::Update { id, quantity } => {
            commands::cart::update(&state, id, quantity).await?;
        }
        CartAction::Remove { id } => commands::cart::remove(&state, id).await?,
        CartAction::Clear => commands::cart::clear(&state).await?,
        CartAction::Reset => commands::cart::reset(state.config())?,
    }
    Ok(())
}
