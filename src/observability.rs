use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("seekchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("seekchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("seekchat.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("seekchat.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("seekchat.stream.errors");

pub(crate) static SESSION_STARTED: Counter = Counter::new("seekchat.session.started");
pub(crate) static SESSION_COMMITTED: Counter = Counter::new("seekchat.session.committed");
pub(crate) static SESSION_EMPTY: Counter = Counter::new("seekchat.session.empty");
pub(crate) static SESSION_FAILED: Counter = Counter::new("seekchat.session.failed");
pub(crate) static SESSION_CANCELLED: Counter = Counter::new("seekchat.session.cancelled");
pub(crate) static SESSION_DURATION: Moments = Moments::new("seekchat.session.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&SESSION_STARTED);
    collector.register_counter(&SESSION_COMMITTED);
    collector.register_counter(&SESSION_EMPTY);
    collector.register_counter(&SESSION_FAILED);
    collector.register_counter(&SESSION_CANCELLED);
    collector.register_moments(&SESSION_DURATION);
}
