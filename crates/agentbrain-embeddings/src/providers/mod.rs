pub mod http;
pub mod mock;
pub mod reranker;
pub mod summarization;

pub use self::http::HttpEmbeddingProvider;
pub use self::mock::MockEmbeddingProvider;
pub use self::reranker::{PassThroughReranker, RerankerProvider};
pub use self::summarization::{HttpSummarizationProvider, MockSummarizationProvider, SummarizationProvider};
