pub const EVENTS_EMITTED: &str = "feed_producer_events_emitted";
pub const SUBMISSIONS_DEDUPED: &str = "feed_producer_submissions_deduped";
pub const RECORDS_SKIPPED: &str = "feed_producer_records_skipped";
pub const FEED_POLL_ERRORS: &str = "feed_producer_feed_poll_errors";
