use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::broadcast;

enum Role<K: Hash + Eq, T> {
    Leader(Flight<K, T>),
    Follower(broadcast::Receiver<T>),
}

/// Per-key single-flight group
///
/// The first caller for a key runs the work, later callers wait for its
/// result. If the leader is dropped before finishing, its waiters retry and
/// one of them takes over.
pub(crate) struct Coalescer<K, T> {
    // Map key -> Broadcast channel sender
    inflight: Arc<DashMap<K, broadcast::Sender<T>>>,
}

impl<K, T> Clone for Coalescer<K, T> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Whether work for `key` is running right now
    #[cfg(test)]
    pub(crate) fn is_inflight(&self, key: &K) -> bool {
        self.inflight.contains_key(key)
    }

    /// Join the running work for `key`, or become its leader
    fn join_or_lead(&self, key: &K) -> Role<K, T> {
        // The entry lock is held only inside this function
        match self.inflight.entry(key.clone()) {
            Entry::Occupied(o) => Role::Follower(o.get().subscribe()),
            Entry::Vacant(v) => {
                let (tx, _rx) = broadcast::channel(1);
                v.insert(tx.clone());
                Role::Leader(Flight {
                    inflight: Arc::clone(&self.inflight),
                    key: key.clone(),
                    tx,
                })
            }
        }
    }

    /// Claim `key` for work the caller runs later, unless it is taken
    ///
    /// Callers joining through [`run`](Self::run) while the flight is held
    /// wait for its result.
    pub(crate) fn try_lead(&self, key: &K) -> Option<Flight<K, T>> {
        match self.join_or_lead(key) {
            Role::Leader(flight) => Some(flight),
            Role::Follower(_) => None,
        }
    }

    /// Run `f` for `key` unless it already runs, and share its result
    pub(crate) async fn run<F, Fut>(&self, key: &K, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            match self.join_or_lead(key) {
                Role::Leader(flight) => return flight.complete(f()).await,
                Role::Follower(mut rx) => match rx.recv().await {
                    Ok(value) => return value,
                    // Leader was dropped without a result
                    Err(_) => continue,
                },
            }
        }
    }
}

/// A claimed key; dropping it unfinished releases the key and wakes the
/// waiters so one of them takes over
pub(crate) struct Flight<K: Hash + Eq, T> {
    inflight: Arc<DashMap<K, broadcast::Sender<T>>>,
    key: K,
    tx: broadcast::Sender<T>,
}

impl<K: Hash + Eq, T: Clone> Flight<K, T> {
    /// Drive `work` to completion and hand its result to every waiter
    pub(crate) async fn complete<Fut>(self, work: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        let value = work.await;
        let tx = self.tx.clone();

        // Late callers start a new flight from here on
        drop(self);
        let _ = tx.send(value.clone());
        value
    }
}

impl<K: Hash + Eq, T> Drop for Flight<K, T> {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
    }
}
