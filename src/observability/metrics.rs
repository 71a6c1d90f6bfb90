use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub route_points_appended_total: IntCounter,
    pub notifications_total: IntCounterVec,
    pub notification_queue_depth: IntGauge,
    pub notification_latency_seconds: HistogramVec,
    pub active_streams: IntGauge,
    pub driver_lookups_total: IntCounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let route_points_appended_total = IntCounter::new(
            "route_points_appended_total",
            "Route points appended to orders",
        )
        .expect("valid route_points_appended_total metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notification dispatches by type and outcome"),
            &["type", "outcome"],
        )
        .expect("valid notifications_total metric");

        let notification_queue_depth = IntGauge::new(
            "notification_queue_depth",
            "Notifications waiting in the outbound queue",
        )
        .expect("valid notification_queue_depth metric");

        let notification_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "notification_latency_seconds",
                "Time spent delivering a queued notification in seconds",
            ),
            &["outcome"],
        )
        .expect("valid notification_latency_seconds metric");

        let active_streams = IntGauge::new("active_streams", "Open tracking subscription streams")
            .expect("valid active_streams metric");

        let driver_lookups_total = IntCounterVec::new(
            Opts::new("driver_lookups_total", "Driver phone lookups by outcome"),
            &["outcome"],
        )
        .expect("valid driver_lookups_total metric");

        registry
            .register(Box::new(route_points_appended_total.clone()))
            .expect("register route_points_appended_total");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(notification_queue_depth.clone()))
            .expect("register notification_queue_depth");
        registry
            .register(Box::new(notification_latency_seconds.clone()))
            .expect("register notification_latency_seconds");
        registry
            .register(Box::new(active_streams.clone()))
            .expect("register active_streams");
        registry
            .register(Box::new(driver_lookups_total.clone()))
            .expect("register driver_lookups_total");

        Self {
            registry,
            route_points_appended_total,
            notifications_total,
            notification_queue_depth,
            notification_latency_seconds,
            active_streams,
            driver_lookups_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
