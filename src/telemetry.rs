use std::time::Instant;

use swerve_module::TelemetrySink;

use crate::bus::Topic;

/// One dashboard value.
#[derive(Debug, Clone)]
pub struct Sample {
    pub channel: String,
    pub value: f64,
    pub at: Instant,
}

/// Telemetry sink publishing every sample on a [`Topic`].
#[derive(Debug, Clone)]
pub struct TopicTelemetry {
    topic: Topic<Sample>,
}

impl TopicTelemetry {
    pub fn new(topic: Topic<Sample>) -> Self {
        Self { topic }
    }
}

impl TelemetrySink for TopicTelemetry {
    fn record(&self, channel: &str, value: f64) {
        self.topic.publish(Sample {
            channel: channel.to_string(),
            value,
            at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_reach_subscribers() {
        let topic = Topic::new("telemetry", 8);
        let mut rx = topic.subscribe();
        let sink = TopicTelemetry::new(topic);

        sink.record("module/9/measured_abs_rotation", 0.5);
        let sample = rx.try_recv().unwrap();
        assert_eq!(sample.channel, "module/9/measured_abs_rotation");
        assert_eq!(sample.value, 0.5);
    }
}
