//! Channel multiplexer
//!
//! Drives any number of simulated buses through a fixed number of outbound
//! connections:
//!
//! ```text
//!   Producer ─┐
//!   Producer ─┼──► lane 0 (bounded, C) ──► SenderTask ──► ws ──► relay
//!   Producer ─┘
//!   Producer ─┬──► lane 1 (bounded, C) ──► SenderTask ──► ws ──► relay
//!   Producer ─┘
//! ```
//!
//! Each producer is bound to a uniformly random lane at creation and never
//! moves. A full lane suspends its producers until the sender catches up;
//! this is the only flow control in the generator.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::positions::Position;

use super::config::EmulatorConfig;
use super::producer::{start_offset, Producer, RouteWalk};
use super::route::Route;
use super::sender::SenderTask;

/// Running fleet of producers and lane senders
pub struct ChannelMultiplexer {
    lanes: Vec<JoinHandle<()>>,
    producers: Vec<JoinHandle<()>>,
}

impl ChannelMultiplexer {
    /// Create the lanes and spawn every sender and producer
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &EmulatorConfig, routes: Vec<Route>) -> Result<Self> {
        config.validate()?;

        let mut lane_txs: Vec<mpsc::Sender<Position>> = Vec::with_capacity(config.websockets_number);
        let mut lanes = Vec::with_capacity(config.websockets_number);

        for lane_id in 0..config.websockets_number {
            let (tx, rx) = mpsc::channel(config.channel_capacity);
            let sender = SenderTask::new(lane_id, config.server_url.as_str(), rx, config.reconnect_delay);
            lanes.push(tokio::spawn(sender.run()));
            lane_txs.push(tx);
        }

        let route_limit = config.routes_number.unwrap_or(usize::MAX);
        let mut producers = Vec::new();
        let mut rng = rand::rng();

        for route in routes.into_iter().take(route_limit) {
            let route = Arc::new(route);

            for bus_index in 0..config.buses_per_route {
                let lane = rng.random_range(0..lane_txs.len());
                let start = start_offset(route.len(), bus_index, config.buses_per_route);
                let producer = Producer::new(
                    config.bus_id(&route.name, bus_index),
                    Arc::clone(&route),
                    RouteWalk::new(route.len(), start, config.step, config.looped),
                    config.refresh_timeout,
                    config.start_jitter,
                    lane_txs[lane].clone(),
                );
                producers.push(tokio::spawn(producer.run()));
            }
        }

        // Lanes close once their last producer is gone
        drop(lane_txs);

        tracing::info!(
            lanes = lanes.len(),
            buses = producers.len(),
            url = %config.server_url,
            "Fleet started"
        );

        Ok(Self { lanes, producers })
    }

    /// Number of outbound connections
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Number of simulated buses
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Wait until every bus finished its route and every lane drained
    ///
    /// Never returns for looping fleets.
    pub async fn join(self) {
        for handle in self.producers.into_iter().chain(self.lanes) {
            let _ = handle.await;
        }
    }

    /// Stop the fleet
    ///
    /// Aborting the senders closes every lane, so each producer ends at its
    /// next send.
    pub async fn shutdown(self) {
        for handle in &self.lanes {
            handle.abort();
        }
        for handle in self.lanes {
            let _ = handle.await;
        }
        for handle in self.producers {
            let _ = handle.await;
        }
        tracing::info!("Fleet stopped");
    }
}
