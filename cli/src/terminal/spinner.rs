use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use colored::*;
use indicatif::ProgressStyle;
use reachr_core::metrics::RunMetrics;
use reachr_core::scanner::ProgressCallback;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::{colors, print};

/// Probes between two message refreshes.
const REFRESH_EVERY: u64 = 64;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// Spinner line driven by the run's counters. Lives in a tracing span so
/// log lines are printed above it instead of tearing it.
pub struct ProgressSpinner {
    span: Span,
    metrics: Arc<RunMetrics>,
    last_refresh: Arc<AtomicU64>,
}

impl ProgressSpinner {
    pub fn start(metrics: Arc<RunMetrics>) -> Self {
        let span: Span = info_span!("progress", indicatif.pb_show = true);

        let style = ProgressStyle::with_template("{spinner:.blue} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        span.pb_set_style(&style);
        span.pb_set_message(&format!("{}", "Warming up...".italic()));
        span.pb_start();

        Self {
            span,
            metrics,
            last_refresh: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn callback(&self) -> ProgressCallback {
        let span: Span = self.span.clone();
        let metrics: Arc<RunMetrics> = self.metrics.clone();
        let last_refresh: Arc<AtomicU64> = self.last_refresh.clone();

        Arc::new(move |probed: u64| {
            let last: u64 = last_refresh.load(Ordering::Relaxed);
            if probed < last + REFRESH_EVERY {
                return;
            }
            if last_refresh
                .compare_exchange(last, probed, Ordering::Relaxed, Ordering::Relaxed)
                .is_err()
            {
                return;
            }
            span.pb_set_message(&message(probed, metrics.good()));
        })
    }

    /// Removes the spinner line once the last clone of the span is gone.
    pub fn finish(self) {
        drop(self.span);
    }
}

fn message(probed: u64, good: u64) -> String {
    format!(
        "Tested {} ips, {} answered",
        probed.to_string().color(colors::SECONDARY).bold(),
        print::count(good)
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
