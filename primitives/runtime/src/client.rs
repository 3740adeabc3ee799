//! Client handles shared by the routes of one registration.
//!
//! Routes never hold a client stub directly. They check one out of a
//! [`SharedClient`] per request, so the registration can close the underlying
//! connection: once released, every stub clone is gone and the channel's
//! worker shuts the connection down.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tonic::Status;

type Reconnect<C> = dyn Fn() -> C + Send + Sync;

/// A client stub that routes check out per request.
///
/// A fixed client lives until [`SharedClient::release`]. A dialed client is
/// also dropped after sitting unused for its idle lifetime and is rebuilt
/// with its reconnect function on the next checkout.
pub struct SharedClient<C> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    state: Mutex<State<C>>,
    idle: Option<(Duration, Box<Reconnect<C>>)>,
    reconnected: Notify,
}

struct State<C> {
    client: Option<C>,
    last_used: Instant,
    released: bool,
}

impl<C> Clone for SharedClient<C> {
    fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<C> std::fmt::Debug for SharedClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("SharedClient")
            .field("connected", &state.client.is_some())
            .field("released", &state.released)
            .field("idle_lifetime", &self.inner.idle.as_ref().map(|(lifetime, _)| *lifetime))
            .finish()
    }
}

impl<C: Clone> SharedClient<C> {
    /// Share `client` until released
    pub fn new(client: C) -> Self { Self::build(client, None) }

    /// Share a client over a dialed connection.
    ///
    /// The connection is dropped once unused for `idle_lifetime`; the next
    /// checkout builds a new client with `reconnect`.
    pub fn dialed(client: C, idle_lifetime: Duration, reconnect: impl Fn() -> C + Send + Sync + 'static) -> Self {
        Self::build(client, Some((idle_lifetime, Box::new(reconnect))))
    }

    fn build(client: C, idle: Option<(Duration, Box<Reconnect<C>>)>) -> Self {
        let state = State { client: Some(client), last_used: Instant::now(), released: false };
        Self { inner: Arc::new(Inner { state: Mutex::new(state), idle, reconnected: Notify::new() }) }
    }

    /// Check out a client for one call.
    ///
    /// Fails with `Unavailable` once the handle is released.
    pub fn get(&self) -> Result<C, Status> {
        let mut state = self.inner.lock();
        if state.released {
            return Err(Status::unavailable("gateway connection released"));
        }
        state.last_used = Instant::now();
        if let Some(client) = &state.client {
            return Ok(client.clone());
        }
        let Some((_, reconnect)) = &self.inner.idle else {
            return Err(Status::unavailable("gateway connection released"));
        };
        let client = reconnect();
        state.client = Some(client.clone());
        drop(state);
        tracing::debug!("reconnected idle gateway connection");
        self.inner.reconnected.notify_one();
        Ok(client)
    }

    /// Drop the client for good; later checkouts fail
    pub fn release(&self) {
        let client = {
            let mut state = self.inner.lock();
            state.released = true;
            state.client.take()
        };
        drop(client);
    }

    /// Whether [`SharedClient::release`] was called
    pub fn is_released(&self) -> bool { self.inner.lock().released }

    /// Whether a client is currently held
    pub fn is_connected(&self) -> bool { self.inner.lock().client.is_some() }

    /// Drop a dialed client unused since before `now - idle_lifetime`.
    ///
    /// Returns whether it was dropped.
    pub fn release_if_idle(&self, now: Instant) -> bool {
        let Some((lifetime, _)) = &self.inner.idle else {
            return false;
        };
        let client = {
            let mut state = self.inner.lock();
            if state.client.is_none() || now.saturating_duration_since(state.last_used) < *lifetime {
                return false;
            }
            state.client.take()
        };
        drop(client);
        tracing::debug!(idle_lifetime = ?lifetime, "closed idle gateway connection");
        true
    }

    /// When the held client becomes idle, if it can
    fn idle_deadline(&self) -> Option<Instant> {
        let (lifetime, _) = self.inner.idle.as_ref()?;
        let state = self.inner.lock();
        state.client.as_ref().map(|_| state.last_used + *lifetime)
    }

    /// Close idle connections until `shutdown` completes, then release.
    pub async fn supervise(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            let deadline = self.idle_deadline();
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.inner.reconnected.notified() => {}
                _ = sleep_until(deadline) => {
                    self.release_if_idle(Instant::now());
                }
            }
        }
        self.release();
    }
}

impl<C> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, State<C>> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
