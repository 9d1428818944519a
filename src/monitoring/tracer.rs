/*!
 * Tracing
 * Subscriber setup and spans around reclamation passes
 */

use crate::memory::types::MemoryPressure;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Reclamation passes slower than this are reported at `warn`
const SLOW_RECLAIM_MS: u128 = 10;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - HEAP_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("HEAP_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one call into the reclaimer
///
/// [`ReclaimSpan::finish`] records how many bytes the pass released and how
/// long it took.
pub struct ReclaimSpan {
    span: Span,
    start: Instant,
    pressure: MemoryPressure,
    allocated_before: usize,
}

impl ReclaimSpan {
    pub fn new(pressure: MemoryPressure, allocated_before: usize) -> Self {
        let span = span!(
            Level::DEBUG,
            "reclaim",
            pressure = %pressure,
            allocated_before,
            released = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            pressure,
            allocated_before,
        }
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Close the pass with the heap's allocated byte count afterwards
    pub fn finish(self, allocated_after: usize) {
        let released = self.allocated_before.saturating_sub(allocated_after);
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        self.span.record("released", released);
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration.as_millis() > SLOW_RECLAIM_MS {
            warn!(
                pressure = %self.pressure,
                released,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow reclamation pass"
            );
        } else {
            debug!(
                pressure = %self.pressure,
                released,
                duration_us = duration.as_micros() as u64,
                "reclamation pass completed"
            );
        }
    }
}
