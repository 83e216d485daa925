use consume_client::{ClientError, Op, SendPhase, SubRead};
use consume_common::identity::User;
use consume_common::order::OrderStatus;
use consume_common::product::Product;
use consume_common::resource::Resource;
use consume_client_integration::harness::TestHarness;
use consume_client_integration::make_product;

/// Bob writes three times, Alice reads the chat, Bob writes again:
/// Alice's unread badge goes 3 → 0 → 1.
#[tokio::test]
async fn unread_badge_follows_reads_and_new_messages() {
    let h = TestHarness::setup();
    for text in ["hola", "¿sigue la oferta?", "te espero en el mercado"] {
        h.tick(1);
        h.bob.send_message(&h.alice, text).await;
    }
    assert_eq!(h.alice.counters(false).await.counters.unread_messages, 3);

    let chat = h.alice.open_chat(&h.bob).await;
    assert_eq!(chat.messages().len(), 3);
    assert_eq!(h.alice.counters(false).await.counters.unread_messages, 0);

    h.tick(1);
    h.bob.send_message(&h.alice, "¿ya viste?").await;
    // Alice's counters are still within their freshness window.
    assert_eq!(h.alice.counters(false).await.counters.unread_messages, 0);

    h.tick(16);
    let report = h.alice.counters(false).await;
    assert!(!report.from_cache);
    assert_eq!(report.counters.unread_messages, 1);
}

#[tokio::test]
async fn repeated_reads_within_ttl_hit_cache() {
    let h = TestHarness::setup();
    let first = h.alice.client.cached_read::<Product>(None, false).await.unwrap();
    let second = h.alice.client.cached_read::<Product>(None, false).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.remote.calls(Op::List(Resource::Products)), 1);

    h.tick(31);
    h.alice.client.cached_read::<Product>(None, false).await.unwrap();
    assert_eq!(h.remote.calls(Op::List(Resource::Products)), 2);
}

#[tokio::test]
async fn write_invalidates_so_next_read_fetches_exactly_once() {
    let h = TestHarness::setup();
    let store = h.tortillas.store_id.clone();
    h.gary.client.cached_read::<Product>(None, false).await.unwrap();
    h.alice.client.cached_read::<Product>(None, false).await.unwrap();
    h.remote.reset_calls();

    let pan = make_product("p-pan", &store, "Pan dulce", 3.0, h.now());
    h.gary.client.create(Resource::Products, &pan).await.unwrap();

    let after = h.gary.client.cached_read::<Product>(None, false).await.unwrap();
    h.gary.client.cached_read::<Product>(None, false).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(h.remote.calls(Op::List(Resource::Products)), 1);

    // Other instances keep their own copy until it expires.
    assert_eq!(h.alice.client.cached_read::<Product>(None, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_send_shows_only_what_the_backend_has() {
    let h = TestHarness::setup();
    h.tick(1);
    h.bob.send_message(&h.alice, "hola").await;

    let mut chat = h.alice.open_chat(&h.bob).await;
    h.remote.fail(
        Op::Create(Resource::Chats),
        ClientError::rejected(Some(500), "storage unavailable"),
    );
    h.tick(1);
    let err = chat.send("¿cuánto cuestan?").await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(chat.phase(), SendPhase::RolledBack);
    assert_eq!(chat.messages().len(), 1);
    assert_eq!(chat.messages()[0].text, "hola");

    h.remote.recover(Op::Create(Resource::Chats));
    chat.send("¿cuánto cuestan?").await.unwrap();
    assert_eq!(chat.phase(), SendPhase::Committed);
    let texts: Vec<_> = chat.messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["hola", "¿cuánto cuestan?"]);
}

#[tokio::test]
async fn marking_read_never_moves_the_watermark_back() {
    let h = TestHarness::setup();
    let first = h.alice.open_chat(&h.bob).await;
    let conversation = first.conversation_id().clone();
    let start = h.now();

    let later = h.tick(5);
    h.alice.open_chat(&h.bob).await;
    assert_eq!(h.remote.watermark(&h.alice.user.id, &conversation), Some(later));

    // A clock that jumps back must not undo the later mark.
    h.clock.set(start);
    first.close().await;
    assert_eq!(h.remote.watermark(&h.alice.user.id, &conversation), Some(later));
}

#[tokio::test]
async fn pending_orders_follow_the_order_lifecycle() {
    let h = TestHarness::setup();
    let order = h.alice.place_order(&h.tortillas, 10, h.now()).await;

    assert_eq!(h.gary.counters(true).await.counters.pending_orders_for_seller, 1);
    assert_eq!(h.alice.counters(true).await.counters.pending_orders_for_buyer, 1);
    assert_eq!(h.bob.counters(true).await.counters.pending_orders_for_buyer, 0);

    h.gary.set_order_status(&order, OrderStatus::Confirmed).await;
    assert_eq!(h.gary.counters(false).await.counters.pending_orders_for_seller, 0);
    assert_eq!(h.alice.counters(true).await.counters.pending_orders_for_buyer, 1);

    h.gary.set_order_status(&order, OrderStatus::Completed).await;
    assert_eq!(h.alice.counters(true).await.counters.pending_orders_for_buyer, 0);
}

#[tokio::test]
async fn watermark_outage_does_not_resurrect_read_messages() {
    let h = TestHarness::setup();
    for text in ["hola", "¿hay tamales hoy?"] {
        h.tick(1);
        h.bob.send_message(&h.alice, text).await;
    }
    h.alice.open_chat(&h.bob).await;

    h.remote.fail(Op::GetWatermarks, ClientError::NetworkFailure("timeout".into()));
    let report = h.alice.counters(true).await;
    assert_eq!(report.counters.unread_messages, 0);
    assert_eq!(report.degraded, vec![SubRead::Watermarks]);
    assert!(!h.alice.counters(false).await.from_cache);
}

#[tokio::test(start_paused = true)]
async fn two_pollers_share_one_cache() {
    let h = TestHarness::setup();
    let alice: User = h.alice.user.clone();
    let first = h.alice.client.mount_counter_badges(alice.clone());
    let second = h.alice.client.mount_counter_badges(alice);
    let (mut a, mut b) = (first.subscribe(), second.subscribe());

    a.changed().await.unwrap();
    b.changed().await.unwrap();
    assert_eq!(first.current(), second.current());
    assert_eq!(h.remote.calls(Op::List(Resource::Orders)), 1);
    assert_eq!(h.remote.calls(Op::GetWatermarks), 1);

    first.unmount().await;
    second.unmount().await;
}

#[tokio::test]
async fn logout_drops_cached_reads() {
    let h = TestHarness::setup();
    h.alice.client.cached_read::<User>(None, false).await.unwrap();
    h.alice.client.logout();
    let users = h.alice.client.cached_read::<User>(None, false).await.unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(h.remote.calls(Op::List(Resource::Users)), 2);
}
