pub mod cache;
pub mod generator;
pub mod llm;
pub mod narrative;
pub mod prompt;
pub mod proof;
pub mod puzzle;
pub mod scoring;
pub mod text;
pub mod types;

pub use cache::{cache_key, ClueCache, MemoryCache, RedisCache};
pub use generator::{ClueGenerator, ClueStats};
pub use llm::{LlmProvider, Providers};
pub use types::{ClueRequest, ClueType, GeneratedClue};
