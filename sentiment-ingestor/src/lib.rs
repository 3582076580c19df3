pub mod app_context;
pub mod batch;
pub mod config;
pub mod enrichment;
pub mod ingestor;
pub mod metrics_consts;
pub mod topics;
