mod crawl_config;

pub use crawl_config::{ConfigCreationError, CrawlConfig};
