use crate::application::ports::ConnectivityStatus;
use crate::shared::config::ConnectivityConfig;
use std::time::Duration;
use tokio::sync::watch;

/// Tracks the platform's online/offline signal.
///
/// `report` is fed by the host; consumers either ask `is_online` or hold an
/// [`OnlineTransitions`] subscription for debounced offline-to-online edges.
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
    debounce: Duration,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool, debounce: Duration) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state, debounce }
    }

    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(config.assume_online_at_start, config.debounce())
    }

    /// Records the latest platform signal. Repeated identical reports are ignored.
    pub fn report(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });

        if changed {
            tracing::info!(target: "fieldsync::connectivity", online, "connectivity changed");
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// New subscription. The state at subscription time counts as already seen.
    pub fn subscribe(&self) -> OnlineTransitions {
        OnlineTransitions {
            state: self.state.subscribe(),
            debounce: self.debounce,
        }
    }
}

impl ConnectivityStatus for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        ConnectivityMonitor::is_online(self)
    }
}

/// One consumer's view of the `became-online` edge stream.
pub struct OnlineTransitions {
    state: watch::Receiver<bool>,
    debounce: Duration,
}

impl OnlineTransitions {
    /// Waits for the next offline-to-online edge that stays online for the
    /// debounce window. Flapping inside the window yields at most one edge.
    /// Returns `None` once the monitor is gone.
    pub async fn next_became_online(&mut self) -> Option<()> {
        loop {
            self.state.changed().await.ok()?;
            if !*self.state.borrow_and_update() {
                continue;
            }
            if self.debounce.is_zero() || self.settled_online().await {
                tracing::debug!(target: "fieldsync::connectivity", "became online");
                return Some(());
            }
        }
    }

    // Online must hold for a full quiet window; any change restarts it.
    async fn settled_online(&mut self) -> bool {
        loop {
            match tokio::time::timeout(self.debounce, self.state.changed()).await {
                Err(_) => return *self.state.borrow(),
                Ok(Err(_)) => return *self.state.borrow(),
                Ok(Ok(())) => {
                    if !*self.state.borrow_and_update() {
                        return false;
                    }
                }
            }
        }
    }
}
