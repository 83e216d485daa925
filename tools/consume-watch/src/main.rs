use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use consume_client::config::DEFAULT_API_URL;
use consume_client::{BadgeState, CacheTtls, ClientConfig, MarketClient};
use consume_common::identity::{StoreId, User, UserId};

#[derive(Parser)]
#[command(name = "consume-watch", about = "Follow a user's marketplace badge counters")]
struct Cli {
    /// Base URL of the function server.
    #[arg(long, env = "CONSUME_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Bearer key sent with every request.
    #[arg(long, env = "CONSUME_API_KEY")]
    api_key: Option<String>,

    /// User whose counters to follow.
    #[arg(long)]
    user: String,

    /// Store owned by the user, for seller-side pending orders.
    #[arg(long)]
    store: Option<String>,

    /// Seconds between counter refreshes.
    #[arg(long, default_value_t = 30)]
    poll_secs: u64,

    /// Seconds a computed set of counters stays cached.
    #[arg(long, default_value_t = 15)]
    counters_ttl_secs: u64,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Print the counters once and exit.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let ttls = CacheTtls {
            counters: Duration::from_secs(self.counters_ttl_secs),
            ..CacheTtls::default()
        };
        let mut config = ClientConfig::new()
            .with_api_url(&self.api_url)
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
            .with_counters_poll(Duration::from_secs(self.poll_secs))
            .with_ttls(ttls);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key);
        }
        config
    }

    fn user(&self) -> User {
        User {
            id: UserId::new(&self.user),
            phone: String::new(),
            name: self.user.clone(),
            has_store: self.store.is_some(),
            store_id: self.store.as_deref().map(StoreId::new),
            created_at: None,
        }
    }
}

fn log_badges(user: &UserId, state: &BadgeState) {
    let c = state.counters;
    if state.stale {
        tracing::warn!(
            "{user}: seller {} / buyer {} / unread {} (stale)",
            c.pending_orders_for_seller,
            c.pending_orders_for_buyer,
            c.unread_messages
        );
    } else {
        tracing::info!(
            "{user}: seller {} / buyer {} / unread {}",
            c.pending_orders_for_seller,
            c.pending_orders_for_buyer,
            c.unread_messages
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let user = cli.user();
    let client = MarketClient::connect(cli.config()).context("invalid client configuration")?;

    if cli.once {
        let report = client.get_counters(&user.id, user.selling_store(), true).await;
        let mut state = BadgeState::default();
        state.apply(&report);
        log_badges(&user.id, &state);
        if report.is_degraded() {
            anyhow::bail!("counters incomplete, failed reads: {:?}", report.degraded);
        }
        return Ok(());
    }

    let badges = client.mount_counter_badges(user.clone());
    let mut updates = badges.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *updates.borrow_and_update();
                log_badges(&user.id, &state);
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    badges.unmount().await;
    Ok(())
}
