use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Re-ranks the home sections on a fixed interval. A refresh that is still
/// running when the next tick fires is cancelled by the worker.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    period: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>, period: Duration) -> Self {
        Self { network_requests, period }
    }

    pub async fn run(self) {
        let mut sections_interval = interval(self.period);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        sections_interval.tick().await;

        loop {
            sections_interval.tick().await;
            if self
                .network_requests
                .send(NetworkRequest::RefreshSections)
                .await
                .is_err()
            {
                break;
            }
        }
    }
}
