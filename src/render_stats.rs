//! Render statistics tracking for debugging and performance analysis.
//!
//! Every renderer owns a [`RenderStats`]. Counters accumulate until
//! [`RenderStats::reset`] and a summary is logged at `debug` level at most
//! once per second from [`RenderStats::end_frame`]:
//! - frames rendered
//! - draw calls (render nodes drawn)
//! - batch flushes
//! - cached surfaces redrawn
//! - render nodes regenerated

use std::time::{Duration, Instant};

/// Snapshot of accumulated render statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub frames_rendered: u64,
    pub draw_calls: u64,
    pub batch_flushes: u64,
    pub cache_redraws: u64,
    pub nodes_regenerated: u64,
}

#[derive(Debug)]
pub struct RenderStats {
    counters: StatsSnapshot,
    // Counters since the last printed summary
    window: StatsSnapshot,
    last_print: Instant,
}

impl Default for RenderStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderStats {
    pub fn new() -> Self {
        Self {
            counters: StatsSnapshot::default(),
            window: StatsSnapshot::default(),
            last_print: Instant::now(),
        }
    }

    /// Record render nodes drawn into a buffer.
    #[inline]
    pub fn record_draw_calls(&mut self, count: u64) {
        self.counters.draw_calls += count;
        self.window.draw_calls += count;
    }

    /// Record vertex batches submitted to the GPU.
    #[inline]
    pub fn record_batch_flushes(&mut self, count: u64) {
        self.counters.batch_flushes += count;
        self.window.batch_flushes += count;
    }

    /// Record a cached-bitmap surface that had to be redrawn.
    #[inline]
    pub fn record_cache_redraw(&mut self) {
        self.counters.cache_redraws += 1;
        self.window.cache_redraws += 1;
    }

    /// Record a render node regenerated from dirty content.
    #[inline]
    pub fn record_node_regenerated(&mut self) {
        self.counters.nodes_regenerated += 1;
        self.window.nodes_regenerated += 1;
    }

    /// Return a snapshot of the totals.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.counters.clone()
    }

    /// Reset all stats to zero.
    pub fn reset(&mut self) {
        self.counters = StatsSnapshot::default();
        self.window = StatsSnapshot::default();
        self.last_print = Instant::now();
    }

    /// Called at the end of each rendered frame to count it and maybe log
    /// a summary.
    pub fn end_frame(&mut self) {
        self.counters.frames_rendered += 1;
        self.window.frames_rendered += 1;

        if self.last_print.elapsed() < Duration::from_secs(1) {
            return;
        }

        let w = &self.window;
        let draws_per_frame = if w.frames_rendered > 0 {
            w.draw_calls as f64 / w.frames_rendered as f64
        } else {
            0.0
        };
        log::debug!(
            "[Render Stats] frames={} draw_calls={} ({:.1}/frame) flushes={} cache_redraws={} regenerated={}",
            w.frames_rendered,
            w.draw_calls,
            draws_per_frame,
            w.batch_flushes,
            w.cache_redraws,
            w.nodes_regenerated
        );

        self.window = StatsSnapshot::default();
        self.last_print = Instant::now();
    }
}
