pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod db;
pub mod metadata;
pub mod model;
pub mod parser;
pub mod service;
pub mod utils;
pub mod worker;

pub use analyzer::{CorpusAnalyzer, FrequencyCounters};
pub use catalog::{CatalogEntry, TagCatalog};
pub use config::AnalysisConfig;
pub use db::{CorpusEntry, TagCache};
pub use metadata::{PromptReadError, PromptReader};
pub use model::{ModelBuilder, TagCategory, TagDictionaryEntry, TagModels};
pub use parser::{extract_tags, tokenize};
pub use service::TagModelService;
pub use worker::ModelWorker;
