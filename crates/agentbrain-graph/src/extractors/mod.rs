pub mod code_metadata;
pub mod llm;

pub use code_metadata::{extract_from_metadata, extract_from_text, module_name_from_path, CodeChunkFacts};
pub use llm::{HttpLlmTripleExtractor, LlmTripleExtractor, NullLlmTripleExtractor};
