use std::{fmt::Write, time::Duration};

use tracing_timing::{group, Histogram};

pub type TimingLayer = tracing_timing::TimingLayer<group::ByName, group::ByMessage>;

/// Records how long layout passes and frame ticks take, grouped by span.
pub fn timing_layer() -> TimingLayer {
    tracing_timing::Builder::default()
        .layer(|| Histogram::new_with_max(100_000_000, 2).expect("valid histogram bounds"))
}

/// Renders the histograms recorded so far, or `None` when the current
/// subscriber has no timing layer.
pub fn timing_report() -> Option<String> {
    tracing::dispatcher::get_default(|d| d.downcast_ref::<TimingLayer>().map(format_histograms))
}

fn format_histograms(timing_layer: &TimingLayer) -> String {
    let mut out = String::new();
    timing_layer.force_synchronize();
    timing_layer.with_histograms(|hs| {
        let _ = writeln!(out, "Histograms:");
        for (span, hs) in hs {
            for (event, h) in hs {
                let ns = |nanos| Duration::from_nanos(nanos);
                let _ = writeln!(out, "{span} -> {event} ({} events)", h.len());
                let _ = writeln!(out, "    mean: {:?}", ns(h.mean() as u64));
                let _ = writeln!(out, "    min: {:?}", ns(h.min()));
                let _ = writeln!(out, "    p50: {:?}", ns(h.value_at_quantile(0.50)));
                let _ = writeln!(out, "    p90: {:?}", ns(h.value_at_quantile(0.90)));
                let _ = writeln!(out, "    p99: {:?}", ns(h.value_at_quantile(0.99)));
                let _ = writeln!(out, "    max: {:?}", ns(h.max()));
            }
        }
    });
    out
}
