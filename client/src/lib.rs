//! Client core of the ConsumeLocal marketplace.
//!
//! Reads go through a TTL cache, mutations invalidate it, badge counters are
//! derived from orders, chats and per-conversation read watermarks, and chat
//! sends are shown optimistically before the backend confirms them.

pub mod cache;
pub mod chat_session;
pub mod client;
pub mod clock;
pub mod config;
pub mod counters;
pub mod error;
pub mod facade;
pub mod notifications;
pub mod polling;
pub mod remote;
pub mod watermark;

pub use consume_common;

pub use chat_session::{ChatSession, SendPhase};
pub use client::MarketClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheTtls, ClientConfig};
pub use counters::{CounterReport, Counters, SubRead};
pub use error::{ClientError, Result};
pub use polling::{BadgeState, CounterBadges, NotificationBell, PollHandle};
pub use remote::{HttpStore, MemoryStore, Op, RemoteStore};
