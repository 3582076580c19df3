// prometheus exporter setup and shared metric helpers

use std::time::Instant;

use axum::{routing::get, Router};
use metrics::Label;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub fn setup_metrics_recorder() -> PrometheusHandle {
    const TIMING_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ];
    const BATCH_SIZES: &[f64] = &[
        1.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0,
    ];

    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), TIMING_SECONDS)
        .unwrap()
        .set_buckets_for_metric(Matcher::Suffix("_batch_size".to_string()), BATCH_SIZES)
        .unwrap()
        .install_recorder()
        .unwrap()
}

/// Install the recorder and expose it on `/metrics` of the given router.
pub fn setup_metrics_routes(router: Router) -> Router {
    let handle = setup_metrics_recorder();
    router.route(
        "/metrics",
        get(move || std::future::ready(handle.render())),
    )
}

pub async fn serve(router: Router, bind: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, router).await
}

/// Times a section of code into a histogram, either at `fin()` or on drop.
pub struct TimingGuard {
    name: &'static str,
    labels: Vec<Label>,
    start: Instant,
    recorded: bool,
}

pub fn timing_guard(name: &'static str, labels: &[(&'static str, &str)]) -> TimingGuard {
    TimingGuard {
        name,
        labels: labels
            .iter()
            .map(|(k, v)| Label::new(*k, v.to_string()))
            .collect(),
        start: Instant::now(),
        recorded: false,
    }
}

impl TimingGuard {
    pub fn label(mut self, key: &'static str, value: &str) -> Self {
        self.labels.push(Label::new(key, value.to_string()));
        self
    }

    pub fn fin(mut self) {
        self.record();
    }

    fn record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        metrics::histogram!(self.name, self.labels.clone()).record(self.start.elapsed().as_secs_f64());
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        self.record();
    }
}
