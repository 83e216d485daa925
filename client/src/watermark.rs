//! Per-user "last seen" timestamps, one per conversation.
//!
//! The remote copy is authoritative across devices. This client also keeps a
//! mirror of what it wrote: reads merge the two by taking the later instant,
//! and a failed remote read is answered from the mirror alone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use consume_common::chat::ConversationId;
use consume_common::identity::UserId;

use crate::error::Result;
use crate::remote::{RemoteStore, Watermarks};

/// Result of a bulk watermark read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatermarkSnapshot {
    pub marks: Watermarks,
    /// The remote read failed; `marks` only holds what this client wrote.
    pub from_mirror: bool,
}

impl WatermarkSnapshot {
    pub fn last_seen(&self, conversation: &ConversationId) -> Option<DateTime<Utc>> {
        self.marks.get(conversation).copied()
    }
}

pub struct WatermarkStore {
    remote: Arc<dyn RemoteStore>,
    mirror: Mutex<HashMap<UserId, Watermarks>>,
}

impl WatermarkStore {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            mirror: Mutex::new(HashMap::new()),
        }
    }

    fn mirror(&self) -> MutexGuard<'_, HashMap<UserId, Watermarks>> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every watermark of `user` in one remote round trip. Never fails.
    pub async fn get_all(&self, user: &UserId) -> WatermarkSnapshot {
        match self.remote.get_watermarks(user).await {
            Ok(mut marks) => {
                if let Some(local) = self.mirror().get(user) {
                    for (conversation, at) in local {
                        let entry = marks.entry(conversation.clone()).or_insert(*at);
                        if *at > *entry {
                            *entry = *at;
                        }
                    }
                }
                WatermarkSnapshot {
                    marks,
                    from_mirror: false,
                }
            }
            Err(err) => {
                tracing::warn!("Watermark read for {user} failed, using local copy: {err}");
                WatermarkSnapshot {
                    marks: self.mirror().get(user).cloned().unwrap_or_default(),
                    from_mirror: true,
                }
            }
        }
    }

    /// Record that `user` has seen `conversation` up to `at`.
    ///
    /// Writing an instant at or before the one already recorded here is a
    /// no-op, so repeated marks never move the watermark backwards. The local
    /// copy is updated even when the remote write fails.
    pub async fn set(
        &self,
        user: &UserId,
        conversation: &ConversationId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        {
            let mut mirror = self.mirror();
            let marks = mirror.entry(user.clone()).or_default();
            if marks.get(conversation).is_some_and(|seen| *seen >= at) {
                tracing::trace!("Watermark {user}/{conversation} already at or past {at}");
                return Ok(());
            }
            marks.insert(conversation.clone(), at);
        }
        self.remote.set_watermark(user, conversation, at).await
    }

    /// What this client last wrote for the pair, if anything.
    pub fn last_written(
        &self,
        user: &UserId,
        conversation: &ConversationId,
    ) -> Option<DateTime<Utc>> {
        self.mirror()
            .get(user)
            .and_then(|marks| marks.get(conversation).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::remote::{MemoryStore, Op};
    use chrono::Duration;

    fn setup() -> (WatermarkStore, Arc<MemoryStore>) {
        let remote = Arc::new(MemoryStore::new());
        (WatermarkStore::new(remote.clone()), remote)
    }

    fn ids() -> (UserId, ConversationId) {
        let a = UserId::new("a");
        let conv = ConversationId::between(&a, &UserId::new("b"));
        (a, conv)
    }

    #[tokio::test]
    async fn set_then_get_all() {
        let (store, remote) = setup();
        let (a, conv) = ids();
        let t = Utc::now();
        store.set(&a, &conv, t).await.unwrap();
        let snapshot = store.get_all(&a).await;
        assert_eq!(snapshot.last_seen(&conv), Some(t));
        assert!(!snapshot.from_mirror);
        assert_eq!(remote.calls(Op::GetWatermarks), 1);
    }

    #[tokio::test]
    async fn older_mark_does_not_regress() {
        let (store, remote) = setup();
        let (a, conv) = ids();
        let t = Utc::now();
        store.set(&a, &conv, t).await.unwrap();
        store.set(&a, &conv, t - Duration::seconds(5)).await.unwrap();
        store.set(&a, &conv, t).await.unwrap();
        assert_eq!(remote.calls(Op::SetWatermark), 1);
        assert_eq!(store.get_all(&a).await.last_seen(&conv), Some(t));
    }

    #[tokio::test]
    async fn remote_behind_mirror_is_merged_forward() {
        let (store, remote) = setup();
        let (a, conv) = ids();
        let t = Utc::now();
        store.set(&a, &conv, t).await.unwrap();
        // Another writer lands an older value remotely afterwards.
        remote.set_watermark(&a, &conv, t - Duration::seconds(30)).await.unwrap();
        assert_eq!(store.get_all(&a).await.last_seen(&conv), Some(t));
    }

    #[tokio::test]
    async fn failed_read_serves_mirror() {
        let (store, remote) = setup();
        let (a, conv) = ids();
        let t = Utc::now();
        store.set(&a, &conv, t).await.unwrap();
        remote.fail(Op::GetWatermarks, ClientError::NetworkFailure("offline".into()));
        let snapshot = store.get_all(&a).await;
        assert!(snapshot.from_mirror);
        assert_eq!(snapshot.last_seen(&conv), Some(t));
    }

    #[tokio::test]
    async fn failed_write_still_recorded_locally() {
        let (store, remote) = setup();
        let (a, conv) = ids();
        let t = Utc::now();
        remote.fail(Op::SetWatermark, ClientError::NetworkFailure("offline".into()));
        assert!(store.set(&a, &conv, t).await.is_err());
        assert_eq!(store.last_written(&a, &conv), Some(t));
        assert_eq!(remote.watermark(&a, &conv), None);
    }
}
