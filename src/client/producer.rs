//! Simulated bus
//!
//! A producer walks its route and pushes one position per refresh period
//! into the lane it was assigned at creation. A full lane suspends it; a
//! closed lane ends it.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

use crate::positions::Position;

use super::route::Route;

/// Index of the first waypoint for bus `bus_index` of `buses_per_route`
///
/// Spreads buses sharing a route evenly along it instead of stacking them
/// at the first stop.
pub fn start_offset(route_len: usize, bus_index: usize, buses_per_route: usize) -> usize {
    if buses_per_route == 0 {
        return 0;
    }
    (route_len * bus_index) / buses_per_route
}

/// Waypoint indices visited by one bus
///
/// Advances by `step`; past the end it restarts at 0 when looping, or ends.
#[derive(Debug, Clone)]
pub struct RouteWalk {
    len: usize,
    next: usize,
    step: usize,
    looped: bool,
}

impl RouteWalk {
    pub fn new(len: usize, start: usize, step: usize, looped: bool) -> Self {
        Self {
            len,
            next: start,
            step: step.max(1),
            looped,
        }
    }
}

impl Iterator for RouteWalk {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        if self.next >= self.len {
            if !self.looped {
                return None;
            }
            self.next = 0;
        }

        let current = self.next;
        self.next += self.step;
        Some(current)
    }
}

/// One simulated bus bound to one lane
pub struct Producer {
    bus_id: String,
    route: Arc<Route>,
    walk: RouteWalk,
    period: Duration,
    max_jitter: Duration,
    lane: mpsc::Sender<Position>,
}

impl Producer {
    pub fn new(
        bus_id: String,
        route: Arc<Route>,
        walk: RouteWalk,
        period: Duration,
        max_jitter: Duration,
        lane: mpsc::Sender<Position>,
    ) -> Self {
        Self {
            bus_id,
            route,
            walk,
            period,
            max_jitter,
            lane,
        }
    }

    /// Drive the bus until its route ends or its lane closes
    pub async fn run(mut self) {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            rand::rng().random_range(Duration::ZERO..=self.max_jitter)
        };
        tokio::time::sleep(jitter).await;

        while let Some(index) = self.walk.next() {
            let waypoint = self.route.waypoints[index];
            let position = Position::new(
                self.bus_id.as_str(),
                round6(waypoint.lat),
                round6(waypoint.lng),
                self.route.name.as_str(),
            );

            if self.lane.send(position).await.is_err() {
                tracing::debug!(bus_id = %self.bus_id, "Lane closed, bus stopping");
                return;
            }

            tokio::time::sleep(self.period).await;
        }

        tracing::debug!(bus_id = %self.bus_id, "Route finished");
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
