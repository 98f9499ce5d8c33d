use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("quill.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("quill.client.request_errors");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("quill.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("quill.stream.errors");
pub(crate) static STREAM_TTFB: Moments = Moments::new("quill.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("quill.stream.duration_seconds");

pub(crate) static TURN_DURATION: Moments = Moments::new("quill.chat.turn_duration_seconds");
pub(crate) static TURNS_CANCELLED: Counter = Counter::new("quill.chat.turns_cancelled");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_moments(&TURN_DURATION);
    collector.register_counter(&TURNS_CANCELLED);
}
