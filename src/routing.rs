//! Orthogonal wire layout with at most one vertical channel per wire.
//!
//! A [`Router`] lives for exactly one layout pass. It remembers the vertical channels claimed by
//! the wires routed so far in that pass and steers each new channel away from them, so two wires
//! whose vertical spans overlap never share a channel column. Nothing survives between passes:
//! the connection manager builds a fresh router and routes every wire again after each edit.

use egui::{Pos2, pos2};

use crate::config::RoutingConfig;

/// Wire attachment points in grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoints {
    pub start: Pos2,
    pub end: Pos2,
}

/// A vertical channel segment reserved during the current pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelClaim {
    pub x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ChannelClaim {
    fn conflicts(&self, x: f32, min_y: f32, max_y: f32, spacing: f32) -> bool {
        (self.x - x).abs() < spacing && self.min_y < max_y && self.max_y > min_y
    }
}

pub struct Router<'a> {
    config: &'a RoutingConfig,
    claims: Vec<ChannelClaim>,
    fallbacks: usize,
}

impl<'a> Router<'a> {
    pub fn new(config: &'a RoutingConfig) -> Self {
        Self {
            config,
            claims: Vec::new(),
            fallbacks: 0,
        }
    }

    pub fn claims(&self) -> &[ChannelClaim] {
        &self.claims
    }

    /// Wires in this pass whose channel search ran out of attempts.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Lay out one wire. Returns two points for a level wire, four otherwise.
    pub fn route(&mut self, ep: Endpoints) -> Vec<Pos2> {
        let Endpoints { start, end } = ep;

        if (start.y - end.y).abs() < self.config.straight_epsilon {
            return vec![start, end];
        }

        let min_y = start.y.min(end.y);
        let max_y = start.y.max(end.y);
        let natural = (start.x + end.x) / 2.0;

        let mut x = self.search_channel(natural, min_y, max_y);

        let lo = start.x.min(end.x) + self.config.clamp_margin;
        let hi = start.x.max(end.x) - self.config.clamp_margin;
        if hi > lo {
            x = x.clamp(lo, hi);
        }

        self.claims.push(ChannelClaim { x, min_y, max_y });

        vec![start, pos2(x, start.y), pos2(x, end.y), end]
    }

    /// Try the natural column, then alternate outward by one spacing step at a time:
    /// `+s, -s, +2s, -2s, ...`.
    fn search_channel(&mut self, natural: f32, min_y: f32, max_y: f32) -> f32 {
        let spacing = self.config.channel_spacing;
        let mut offset = 0.0_f32;
        let mut last_tried = natural;

        for _ in 0..self.config.max_attempts {
            let candidate = natural + offset;
            last_tried = candidate;
            let taken = self
                .claims
                .iter()
                .any(|c| c.conflicts(candidate, min_y, max_y, spacing));
            if !taken {
                return candidate;
            }

            offset = if offset <= 0.0 {
                -offset + spacing
            } else {
                -offset
            };
        }

        self.fallbacks += 1;
        log::warn!(
            "no free channel near x={natural} for y {min_y}..{max_y}, using x={last_tried}"
        );
        last_tried
    }
}
