pub mod chunk_id;
pub mod code;
pub mod prose;
pub mod tiktoken_counter;
pub mod traits;

pub use self::chunk_id::compute_chunk_id;
pub use self::code::CodeChunker;
pub use self::prose::ProseChunker;
pub use self::tiktoken_counter::TiktokenCounter;
pub use self::traits::TokenCounter;
