//! Scheduler for the crawl frontier and request pacing
//!
//! This module handles:
//! - The per-site breadth-first frontier with its seen-set
//! - Level-by-level draining so every page of depth `d` is fetched before depth `d + 1`
//! - Respecting a minimum delay between outbound requests

use crate::url::crawl_key;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Minimum spacing between request starts
///
/// Callers reserve the next free slot under a lock and then sleep until it
/// arrives, so concurrent callers are served in reservation order and never
/// start closer together than `interval`.
#[derive(Debug)]
pub struct RequestThrottle {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until the caller may start its request
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    pub url: Url,

    /// Link distance from the nearest start URL
    pub depth: u32,
}

/// Breadth-first frontier for one site
///
/// A URL is claimed in the seen-set when it is enqueued, so it is fetched
/// at most once per site run no matter how many pages link to it.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<QueuedUrl>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a URL unless its crawl key was seen before
    ///
    /// Returns true if the URL was added.
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        if !self.claim(&url) {
            return false;
        }
        self.queue.push_back(QueuedUrl { url, depth });
        true
    }

    /// Marks a URL as seen without queueing it
    ///
    /// Used for redirect targets, which were fetched under another URL.
    /// Returns false if the URL was already claimed.
    pub fn claim(&mut self, url: &Url) -> bool {
        self.seen.insert(crawl_key(url))
    }

    /// Removes and returns every queued URL at the shallowest depth
    ///
    /// Enqueue order is preserved within the level.
    pub fn next_level(&mut self) -> Vec<QueuedUrl> {
        let Some(depth) = self.queue.front().map(|queued| queued.depth) else {
            return Vec::new();
        };

        let count = self
            .queue
            .iter()
            .take_while(|queued| queued.depth == depth)
            .count();
        self.queue.drain(..count).collect()
    }

    /// Number of URLs still queued
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
