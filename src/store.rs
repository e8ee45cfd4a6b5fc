//! The shared typed store.
//!
//! Every key holds exactly one kind of value at a time. Operations that
//! expect a different kind fail with [`StoreError::WrongType`] and leave the
//! key untouched. Values live in a map behind a readers-writer lock; the
//! waiter registries for blocking reads sit under their own locks so that
//! waking a blocked client never holds the value lock across delivery.
//!
//! `Store` is a cheap handle over shared state. Cloning it hands the same
//! underlying data to another connection task.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::Instant;

use crate::stream_id::{self, EntryIdSpec, RangeId, StreamId, StreamIdError};

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Invalid data type for key")]
    WrongType,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("invalid range")]
    InvalidRange,
    #[error("{0}")]
    StreamId(#[from] StreamIdError),
    #[error("system time is before the unix epoch")]
    Clock,
}

/// One entry of a stream: an identifier plus its field-value pairs in
/// insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(Bytes, Bytes)>,
}

/// The three kinds of value a key can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    String(Bytes),
    List(VecDeque<Bytes>),
    Stream(Vec<StreamEntry>),
}

impl StoredValue {
    fn kind(&self) -> &'static str {
        match self {
            StoredValue::String(_) => "string",
            StoredValue::List(_) => "list",
            StoredValue::Stream(_) => "stream",
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
    generation: u64,
}

impl Entry {
    fn new(value: StoredValue, generation: u64) -> Self {
        Entry {
            value,
            expires_at: None,
            generation,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[derive(Debug)]
struct ListWaiterHandle {
    id: u64,
    tx: oneshot::Sender<()>,
}

#[derive(Debug)]
struct StreamWaiterHandle {
    id: u64,
    since: StreamId,
    tx: mpsc::Sender<()>,
}

type Entries = HashMap<Bytes, Entry>;
type ListWaiterRegistry = HashMap<Bytes, VecDeque<ListWaiterHandle>>;
type StreamWaiterRegistry = HashMap<Bytes, VecDeque<StreamWaiterHandle>>;

/// The shared key-value store.
///
/// Built once in the entry point; each connection task gets a clone of the
/// handle.
#[derive(Clone, Debug, Default)]
pub struct Store {
    entries: Arc<RwLock<Entries>>,
    list_waiters: Arc<Mutex<ListWaiterRegistry>>,
    stream_waiters: Arc<Mutex<StreamWaiterRegistry>>,
    access: Arc<RwLock<()>>,
    generation: Arc<AtomicU64>,
    waiter_id: Arc<AtomicU64>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    /// Shared side of the access gate, held for one command's critical
    /// section. Never hold this across a blocking wait.
    pub async fn shared_access(&self) -> RwLockReadGuard<'_, ()> {
        self.access.read().await
    }

    /// Exclusive side of the access gate, held across a whole transaction
    /// body so no other client's command lands between two commands of the
    /// batch.
    pub async fn exclusive_access(&self) -> RwLockWriteGuard<'_, ()> {
        self.access.write().await
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Stores a string value, replacing whatever the key held before.
    ///
    /// A positive TTL schedules a removal at `now + ttl`. The scheduled task
    /// re-checks the generation stamped here, so a SET that lands after this
    /// one is never clobbered by this TTL firing late.
    pub async fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        let generation = self.next_generation();
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);

        {
            let mut entries = self.entries.write().await;
            entries.insert(
                key.clone(),
                Entry {
                    value: StoredValue::String(value),
                    expires_at,
                    generation,
                },
            );
        }

        if let Some(deadline) = expires_at {
            let entries = Arc::clone(&self.entries);
            tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;

                let mut entries = entries.write().await;
                if entries
                    .get(&key)
                    .is_some_and(|entry| entry.generation == generation)
                {
                    entries.remove(&key);
                }
            });
        }
    }

    pub async fn get(&self, key: &Bytes) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.read().await;

        match live(&entries, key) {
            Some(entry) => match &entry.value {
                StoredValue::String(data) => Ok(Some(data.clone())),
                _ => Err(StoreError::WrongType),
            },
            None => Ok(None),
        }
    }

    /// Increments the integer stored at `key`, initializing an absent key
    /// to 1.
    pub async fn incr(&self, key: &Bytes) -> Result<i64, StoreError> {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);

        let Some(entry) = entries.get_mut(key) else {
            let generation = self.next_generation();
            entries.insert(
                key.clone(),
                Entry::new(StoredValue::String(Bytes::from_static(b"1")), generation),
            );
            return Ok(1);
        };

        match &mut entry.value {
            StoredValue::String(data) => {
                let current = std::str::from_utf8(data)
                    .ok()
                    .and_then(|text| text.parse::<i64>().ok())
                    .ok_or(StoreError::NotAnInteger)?;

                let incremented = current.checked_add(1).ok_or(StoreError::NotAnInteger)?;
                *data = Bytes::from(incremented.to_string());

                Ok(incremented)
            }
            _ => Err(StoreError::WrongType),
        }
    }

    /// Appends (`front == false`) or prepends (`front == true`) values to
    /// the list at `key`, creating it when absent, and returns the new
    /// length. Prepending happens one value at a time, so the last argument
    /// ends up at index 0.
    ///
    /// Afterwards up to `values.len()` blocked poppers are woken, oldest
    /// registration first.
    pub async fn push(
        &self,
        key: &Bytes,
        values: Vec<Bytes>,
        front: bool,
    ) -> Result<usize, StoreError> {
        let inserted = values.len();

        let length = {
            let mut entries = self.entries.write().await;
            purge_expired(&mut entries, key);

            let generation = self.next_generation();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(StoredValue::List(VecDeque::new()), generation));

            let StoredValue::List(list) = &mut entry.value else {
                return Err(StoreError::WrongType);
            };

            for value in values {
                if front {
                    list.push_front(value);
                } else {
                    list.push_back(value);
                }
            }

            list.len()
        };

        self.notify_list_waiters(key, inserted);

        Ok(length)
    }

    /// Inclusive range with negative indices counting from the end.
    pub async fn lrange(
        &self,
        key: &Bytes,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Bytes>, StoreError> {
        let entries = self.entries.read().await;

        let Some(entry) = live(&entries, key) else {
            return Ok(Vec::new());
        };
        let StoredValue::List(list) = &entry.value else {
            return Err(StoreError::WrongType);
        };

        let len = list.len() as i64;
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };
        start = start.max(0);
        stop = stop.min(len - 1);

        if start >= len || start > stop {
            return Ok(Vec::new());
        }

        Ok(list.range(start as usize..=stop as usize).cloned().collect())
    }

    pub async fn llen(&self, key: &Bytes) -> Result<usize, StoreError> {
        let entries = self.entries.read().await;

        match live(&entries, key) {
            Some(entry) => match &entry.value {
                StoredValue::List(list) => Ok(list.len()),
                _ => Err(StoreError::WrongType),
            },
            None => Ok(0),
        }
    }

    /// Removes up to `count` elements from the left of the list and returns
    /// them in pop order. A list drained to zero elements is dropped from
    /// the map, keeping empty lists indistinguishable from absent keys.
    pub async fn lpop(&self, key: &Bytes, count: usize) -> Result<Vec<Bytes>, StoreError> {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);

        let Some(entry) = entries.get_mut(key) else {
            return Ok(Vec::new());
        };
        let StoredValue::List(list) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };

        let mut removed = Vec::new();
        for _ in 0..count {
            match list.pop_front() {
                Some(value) => removed.push(value),
                None => break,
            }
        }

        if list.is_empty() {
            entries.remove(key);
        }

        Ok(removed)
    }

    /// Single-element pop used by BLPOP.
    pub async fn pop_front(&self, key: &Bytes) -> Result<Option<Bytes>, StoreError> {
        Ok(self.lpop(key, 1).await?.pop())
    }

    pub async fn kind_of(&self, key: &Bytes) -> &'static str {
        let entries = self.entries.read().await;

        match live(&entries, key) {
            Some(entry) => entry.value.kind(),
            None => "none",
        }
    }

    /// Appends an entry to the stream at `key`, resolving the candidate
    /// identifier against the current top item, and wakes every blocked
    /// stream reader whose since-id the new entry exceeds.
    pub async fn xadd(
        &self,
        key: &Bytes,
        candidate: EntryIdSpec,
        fields: Vec<(Bytes, Bytes)>,
    ) -> Result<StreamId, StoreError> {
        let now_ms = unix_time_ms()?;

        let id = {
            let mut entries = self.entries.write().await;
            purge_expired(&mut entries, key);

            // Resolve the identifier before touching the map so a rejected
            // candidate leaves no empty stream behind.
            let last = match entries.get(key) {
                Some(entry) => match &entry.value {
                    StoredValue::Stream(stream) => stream.last().map(|entry| entry.id),
                    _ => return Err(StoreError::WrongType),
                },
                None => None,
            };

            let id = stream_id::next_id(candidate, last, now_ms)?;

            let generation = self.next_generation();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(StoredValue::Stream(Vec::new()), generation));

            let StoredValue::Stream(stream) = &mut entry.value else {
                return Err(StoreError::WrongType);
            };

            stream.push(StreamEntry { id, fields });
            id
        };

        self.notify_stream_waiters(key, id);

        Ok(id)
    }

    /// Inclusive identifier range. The monotonic-id invariant turns both
    /// boundaries into binary searches.
    pub async fn xrange(
        &self,
        key: &Bytes,
        start: RangeId,
        end: RangeId,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let lo = start.start_bound();
        let hi = end.end_bound();

        if lo > hi {
            return Err(StoreError::InvalidRange);
        }

        let entries = self.entries.read().await;

        let Some(entry) = live(&entries, key) else {
            return Ok(Vec::new());
        };
        let StoredValue::Stream(stream) = &entry.value else {
            return Err(StoreError::WrongType);
        };

        let from = stream.partition_point(|entry| entry.id < lo);
        let to = stream.partition_point(|entry| entry.id <= hi);

        Ok(stream[from..to].to_vec())
    }

    /// Every entry with an identifier strictly greater than `since`.
    pub async fn entries_after(
        &self,
        key: &Bytes,
        since: StreamId,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let entries = self.entries.read().await;

        let Some(entry) = live(&entries, key) else {
            return Ok(Vec::new());
        };
        let StoredValue::Stream(stream) = &entry.value else {
            return Err(StoreError::WrongType);
        };

        let from = stream.partition_point(|entry| entry.id <= since);

        Ok(stream[from..].to_vec())
    }

    pub async fn last_stream_id(&self, key: &Bytes) -> Result<Option<StreamId>, StoreError> {
        let entries = self.entries.read().await;

        match live(&entries, key) {
            Some(entry) => match &entry.value {
                StoredValue::Stream(stream) => Ok(stream.last().map(|entry| entry.id)),
                _ => Err(StoreError::WrongType),
            },
            None => Ok(None),
        }
    }

    /// Registers a one-shot waiter at the tail of the key's pop queue.
    pub fn list_waiter(&self, key: &Bytes) -> ListWaiter {
        let (tx, rx) = oneshot::channel();
        let id = self.waiter_id.fetch_add(1, Ordering::Relaxed);

        let mut waiters = self.list_waiters.lock().unwrap();
        waiters
            .entry(key.clone())
            .or_default()
            .push_back(ListWaiterHandle { id, tx });
        drop(waiters);

        ListWaiter {
            registry: Arc::clone(&self.list_waiters),
            key: key.clone(),
            id,
            rx,
        }
    }

    /// Registers a stream waiter that fires once an entry with an
    /// identifier greater than `since` is appended. One blocked XREAD can
    /// watch several keys by handing in clones of a single channel sender.
    pub fn stream_waiter(&self, key: &Bytes, since: StreamId, tx: mpsc::Sender<()>) -> StreamWaiter {
        let id = self.waiter_id.fetch_add(1, Ordering::Relaxed);

        let mut waiters = self.stream_waiters.lock().unwrap();
        waiters
            .entry(key.clone())
            .or_default()
            .push_back(StreamWaiterHandle { id, since, tx });
        drop(waiters);

        StreamWaiter {
            registry: Arc::clone(&self.stream_waiters),
            key: key.clone(),
            id,
        }
    }

    /// Delivers at most `count` signals to the oldest registered poppers.
    fn notify_list_waiters(&self, key: &Bytes, count: usize) {
        let mut waiters = self.list_waiters.lock().unwrap();

        let Some(queue) = waiters.get_mut(key) else {
            return;
        };

        for _ in 0..count {
            let Some(handle) = queue.pop_front() else {
                break;
            };
            let _ = handle.tx.send(());
        }

        if queue.is_empty() {
            waiters.remove(key);
        }
    }

    fn notify_stream_waiters(&self, key: &Bytes, id: StreamId) {
        let mut waiters = self.stream_waiters.lock().unwrap();

        let Some(queue) = waiters.get_mut(key) else {
            return;
        };

        queue.retain(|handle| {
            if handle.since < id {
                let _ = handle.tx.try_send(());
                false
            } else {
                true
            }
        });

        if queue.is_empty() {
            waiters.remove(key);
        }
    }
}

/// A registered list waiter.
///
/// Dropping the waiter removes its registration, so a timed-out or
/// cancelled caller never leaves a stale handle in the queue.
pub struct ListWaiter {
    registry: Arc<Mutex<ListWaiterRegistry>>,
    key: Bytes,
    id: u64,
    rx: oneshot::Receiver<()>,
}

impl ListWaiter {
    /// Waits for a push signal. Returns false once `deadline` passes; a
    /// `None` deadline waits forever.
    pub async fn wait(&mut self, deadline: Option<Instant>) -> bool {
        match deadline {
            None => (&mut self.rx).await.is_ok(),
            Some(deadline) => match tokio::time::timeout_at(deadline, &mut self.rx).await {
                Ok(result) => result.is_ok(),
                Err(_) => false,
            },
        }
    }
}

impl Drop for ListWaiter {
    fn drop(&mut self) {
        let mut waiters = self.registry.lock().unwrap();

        if let Some(queue) = waiters.get_mut(&self.key) {
            queue.retain(|handle| handle.id != self.id);
            if queue.is_empty() {
                waiters.remove(&self.key);
            }
        }
    }
}

/// A registered stream waiter; the signal arrives on the channel sender the
/// caller handed to [`Store::stream_waiter`].
pub struct StreamWaiter {
    registry: Arc<Mutex<StreamWaiterRegistry>>,
    key: Bytes,
    id: u64,
}

impl Drop for StreamWaiter {
    fn drop(&mut self) {
        let mut waiters = self.registry.lock().unwrap();

        if let Some(queue) = waiters.get_mut(&self.key) {
            queue.retain(|handle| handle.id != self.id);
            if queue.is_empty() {
                waiters.remove(&self.key);
            }
        }
    }
}

fn live<'a>(entries: &'a Entries, key: &Bytes) -> Option<&'a Entry> {
    entries.get(key).filter(|entry| !entry.is_expired())
}

fn purge_expired(entries: &mut Entries, key: &Bytes) {
    if entries.get(key).is_some_and(Entry::is_expired) {
        entries.remove(key);
    }
}

fn unix_time_ms() -> Result<u64, StoreError> {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .map_err(|_| StoreError::Clock)
}
