/// Immediate online/offline answer for producers that cannot wait for an event.
pub trait ConnectivityStatus: Send + Sync {
    fn is_online(&self) -> bool;
}
