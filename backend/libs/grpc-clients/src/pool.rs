/// Connection Pool Management
///
/// A handful of independent HTTP/2 connections to identity-service. Each
/// channel multiplexes concurrent calls; spreading load over several keeps one
/// slow connection from stalling every request.
use crate::config::AuthClientConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use tonic::transport::Channel;

#[derive(Debug)]
pub struct ChannelPool {
    channels: Vec<Channel>,
    current_index: AtomicUsize,
}

impl ChannelPool {
    /// Create the pool without dialing.
    ///
    /// Channels connect on first use and reconnect after failures, so the
    /// caller can start before identity-service is reachable; calls made
    /// while it is down fail as unavailable.
    pub fn new(config: &AuthClientConfig) -> Result<Self, tonic::transport::Error> {
        let endpoint = config.make_endpoint()?;
        let size = config.connection_pool_size.max(1);

        let channels = (0..size).map(|_| endpoint.connect_lazy()).collect();

        tracing::debug!(
            url = %config.identity_service_url,
            size,
            tls = config.tls.is_some(),
            "identity-service channel pool created"
        );

        Ok(Self {
            channels,
            current_index: AtomicUsize::new(0),
        })
    }

    /// Get next connection from pool (round-robin)
    pub fn get(&self) -> Channel {
        let index = self.current_index.fetch_add(1, Ordering::Relaxed);
        self.channels[index % self.channels.len()].clone()
    }

    pub fn size(&self) -> usize {
        self.channels.len()
    }
}
