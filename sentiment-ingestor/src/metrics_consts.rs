pub const TICK_BATCH_SIZE: &str = "ingestor_tick_batch_size";
pub const TICK_TIME: &str = "ingestor_tick_seconds";
pub const SUBMISSIONS_PERSISTED: &str = "ingestor_submissions_persisted";
pub const COMMENTS_PERSISTED: &str = "ingestor_comments_persisted";
pub const ENRICHMENT_FAILURES: &str = "ingestor_enrichment_failures";
pub const TOPIC_ASSIGN_FAILURES: &str = "ingestor_topic_assign_failures";
pub const RECORDS_SKIPPED: &str = "ingestor_records_skipped";
pub const TICKS_ABANDONED: &str = "ingestor_ticks_abandoned";
