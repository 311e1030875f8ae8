use crate::domain::{DataPoint, Topic};
use crate::infrastructure::dispatcher::{DispatcherHandle, TopicActivations};
use rand::Rng;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, interval_at};

/// Generation cadence for synthetic topics.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Interval for topics without a specific override.
    pub default_interval: Duration,
    /// Per-topic interval overrides, keyed by topic name.
    pub per_topic: HashMap<String, Duration>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            default_interval: Duration::from_secs(5),
            per_topic: HashMap::new(),
        }
    }
}

impl ProducerConfig {
    fn interval_for(&self, topic: &Topic) -> Duration {
        self.per_topic
            .get(topic.as_str())
            .copied()
            .unwrap_or(self.default_interval)
    }
}

/// Demo data source for the dashboards.
///
/// Listens for topic activations from the dispatcher and runs one
/// generation loop per activated topic, feeding the engine through the
/// same `publish()` any other producer would use. The engine never
/// depends on this component.
pub struct SyntheticProducer {
    driver: JoinHandle<()>,
}

impl SyntheticProducer {
    pub fn spawn(
        handle: DispatcherHandle,
        activations: TopicActivations,
        config: ProducerConfig,
    ) -> Self {
        let driver = tokio::spawn(run(handle, activations, config));
        SyntheticProducer { driver }
    }

    /// Stop the activation listener and every generation loop.
    pub fn shutdown(&self) {
        self.driver.abort();
    }
}

impl Drop for SyntheticProducer {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn run(handle: DispatcherHandle, mut activations: TopicActivations, config: ProducerConfig) {
    // Generation tasks live in the JoinSet, so aborting the driver takes
    // them all down with it.
    let mut generators = JoinSet::new();

    while let Some(topic) = activations.recv().await {
        let interval = config.interval_for(&topic);
        tracing::info!(
            topic = %topic,
            interval_ms = interval.as_millis() as u64,
            "starting topic generator"
        );
        generators.spawn(generate(handle.clone(), topic, interval));
    }

    tracing::info!("topic activation stream closed, producer stopping");
}

async fn generate(handle: DispatcherHandle, topic: Topic, interval: Duration) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    loop {
        ticker.tick().await;
        if handle.is_closed() {
            break;
        }
        handle.publish(DataPoint::generated(topic.clone(), synthesize(&topic)));
    }
}

/// One plausible-looking payload per dashboard topic.
fn synthesize(topic: &Topic) -> Value {
    let mut rng = rand::thread_rng();
    match topic.as_str() {
        "seo-metrics" => json!({
            "organic_traffic": rng.gen_range(800..12_000),
            "domain_authority": rng.gen_range(20..80),
            "backlinks": rng.gen_range(150..25_000),
            "indexed_pages": rng.gen_range(40..3_000),
        }),
        "keyword-ranking" => json!({
            "tracked_keywords": rng.gen_range(50..500),
            "top_ten": rng.gen_range(5..120),
            "average_position": (rng.gen_range(1.0..55.0_f64) * 10.0).round() / 10.0,
            "movement": rng.gen_range(-15..15),
        }),
        "performance" => json!({
            "lcp_ms": rng.gen_range(900..4_200),
            "cls": (rng.gen_range(0.0..0.4_f64) * 100.0).round() / 100.0,
            "ttfb_ms": rng.gen_range(80..900),
            "speed_score": rng.gen_range(35..100),
        }),
        "competitor" => json!({
            "visibility_score": rng.gen_range(10..95),
            "shared_keywords": rng.gen_range(20..800),
            "traffic_gap": rng.gen_range(-5_000..5_000),
        }),
        _ => json!({
            "value": (rng.gen_range(0.0..100.0_f64) * 100.0).round() / 100.0,
        }),
    }
}
