//! Ingestion pipeline services

pub mod classifier;
pub mod feed;
pub mod ingest;
pub mod normalizer;
pub mod scheduler;
pub mod tempo;
pub mod token;

pub use classifier::is_of_interest;
pub use feed::FeedClient;
pub use ingest::IngestService;
pub use normalizer::{normalize, CanonicalRecord};
pub use scheduler::Scheduler;
pub use tempo::TempoScorer;
pub use token::TokenManager;
