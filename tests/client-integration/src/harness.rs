use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use consume_client::{
    ChatSession, ClientConfig, Clock, CounterReport, ManualClock, MarketClient, MemoryStore,
};
use consume_common::identity::User;
use consume_common::order::{Order, OrderStatus};
use consume_common::product::Product;
use consume_common::resource::Resource;

use crate::{make_dummy_order, make_product, make_store, make_user};

/// One app instance: a user with their own client cache.
pub struct Participant {
    pub user: User,
    pub client: MarketClient,
}

impl Participant {
    pub async fn counters(&self, force_refresh: bool) -> CounterReport {
        self.client
            .get_counters(&self.user.id, self.user.selling_store(), force_refresh)
            .await
    }

    /// Open the chat with `other`, which also marks it read.
    pub async fn open_chat(&self, other: &Participant) -> ChatSession {
        self.client
            .chat(self.user.clone(), other.user.id.clone())
            .await
            .expect("open chat")
    }

    /// Send one message to `other` through a fresh chat view.
    pub async fn send_message(&self, other: &Participant, text: &str) -> ChatSession {
        let mut chat = self.open_chat(other).await;
        chat.send(text).await.expect("send message");
        chat
    }

    pub async fn place_order(&self, product: &Product, quantity: u32, at: DateTime<Utc>) -> Order {
        let order = make_dummy_order(product, &self.user.id, quantity, OrderStatus::Pending, at);
        self.client
            .create(Resource::Orders, &order)
            .await
            .expect("place order");
        order
    }

    pub async fn set_order_status(&self, order: &Order, status: OrderStatus) {
        self.client
            .update(Resource::Orders, &order.id.0, json!({ "status": status }))
            .await
            .expect("update order status");
    }
}

/// Shared backend, shared clock and three participants:
/// Gary sells tortillas, Alice and Bob buy.
pub struct TestHarness {
    pub remote: Arc<MemoryStore>,
    pub clock: ManualClock,
    pub gary: Participant,
    pub alice: Participant,
    pub bob: Participant,
    pub tortillas: Product,
}

impl TestHarness {
    pub fn setup() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        tracing_subscriber::fmt::try_init().ok();

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let remote = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));

        let gary = make_user("u-gary", "Gary", Some("s-gary"));
        let alice = make_user("u-alice", "Alice", None);
        let bob = make_user("u-bob", "Bob", None);
        let store = make_store("s-gary", &gary.id, "Tortillería Gary");
        let tortillas = make_product("p-tortillas", &store.id, "Tortillas", 5.0, start);

        remote
            .seed(Resource::Users, [gary.clone(), alice.clone(), bob.clone()])
            .unwrap();
        remote.seed(Resource::Stores, [store]).unwrap();
        remote.seed(Resource::Products, [tortillas.clone()]).unwrap();
        tracing::info!("Harness seeded at {start}");

        let participant = |user: User| Participant {
            user,
            client: MarketClient::with_clock(
                remote.clone(),
                config.clone(),
                Arc::new(clock.clone()),
            ),
        };

        TestHarness {
            gary: participant(gary),
            alice: participant(alice),
            bob: participant(bob),
            remote: remote.clone(),
            clock: clock.clone(),
            tortillas,
        }
    }

    /// Move the shared clock forward and return the new instant.
    pub fn tick(&self, seconds: i64) -> DateTime<Utc> {
        self.clock.advance(Duration::seconds(seconds))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
