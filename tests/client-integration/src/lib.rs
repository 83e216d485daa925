use chrono::{DateTime, Utc};

use consume_common::chat::{Conversation, ConversationId};
use consume_common::identity::{StoreId, User, UserId};
use consume_common::message::{Message, MessageId};
use consume_common::order::{Order, OrderId, OrderItem, OrderStatus};
use consume_common::product::{Product, ProductId};
use consume_common::storefront::Store;

pub mod harness;

/// A user, selling through `store` when one is given.
pub fn make_user(id: &str, name: &str, store: Option<&str>) -> User {
    User {
        id: UserId::new(id),
        phone: format!("5555{:04}", id.len()),
        name: name.to_string(),
        has_store: store.is_some(),
        store_id: store.map(StoreId::new),
        created_at: None,
    }
}

pub fn make_store(id: &str, owner: &UserId, name: &str) -> Store {
    Store {
        id: StoreId::new(id),
        user_id: owner.clone(),
        name: name.to_string(),
        description: format!("{name}, home made"),
        logo: None,
        location: "Zona 1".to_string(),
        verified: false,
        rating: 0.0,
        total_reviews: 0,
    }
}

pub fn make_product(
    id: &str,
    store: &StoreId,
    title: &str,
    price: f64,
    created_at: DateTime<Utc>,
) -> Product {
    Product {
        id: ProductId(id.to_string()),
        store_id: store.clone(),
        title: title.to_string(),
        description: format!("Fresh {title}"),
        price,
        category: "food".to_string(),
        images: Vec::new(),
        created_at,
        in_stock: true,
        is_product_of_the_day: false,
        expires_at: None,
    }
}

/// A single-line order, id derived from `created_at`.
pub fn make_dummy_order(
    product: &Product,
    buyer: &UserId,
    quantity: u32,
    status: OrderStatus,
    created_at: DateTime<Utc>,
) -> Order {
    Order {
        id: OrderId(format!("o-{}", created_at.timestamp_millis())),
        buyer_id: buyer.clone(),
        store_id: product.store_id.clone(),
        items: vec![OrderItem {
            product_id: product.id.clone(),
            quantity,
            price: product.price,
            selected_image_index: None,
        }],
        total: product.price * f64::from(quantity),
        status,
        created_at,
        buyer_notes: None,
        seller_notes: None,
        adjusted_total: None,
    }
}

pub fn make_message(from: &UserId, to: &UserId, text: &str, at: DateTime<Utc>) -> Message {
    Message {
        id: MessageId(format!("m-{}-{from}", at.timestamp_millis())),
        conversation_id: ConversationId::between(from, to),
        sender_id: from.clone(),
        receiver_id: to.clone(),
        text: text.to_string(),
        timestamp: at,
    }
}

/// Conversation record holding `messages`, keyed by the first message's
/// participants.
pub fn make_conversation(messages: Vec<Message>) -> Option<Conversation> {
    let id = messages.first()?.conversation_id.clone();
    Some(Conversation {
        id,
        messages,
        created_at: None,
    })
}
