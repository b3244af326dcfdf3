use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("nomadia.client.requests");
pub(crate) static CLIENT_FAILURES: Counter = Counter::new("nomadia.client.failures");
pub(crate) static CLIENT_CANCELLATIONS: Counter = Counter::new("nomadia.client.cancellations");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("nomadia.stream.chunks");
pub(crate) static STREAM_BYTES: Counter = Counter::new("nomadia.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("nomadia.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("nomadia.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("nomadia.session.turns");
pub(crate) static SESSION_REJECTED_TURNS: Counter =
    Counter::new("nomadia.session.rejected_turns");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("nomadia.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_FAILURES);
    collector.register_counter(&CLIENT_CANCELLATIONS);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_REJECTED_TURNS);
    collector.register_moments(&SESSION_TURN_DURATION);
}
