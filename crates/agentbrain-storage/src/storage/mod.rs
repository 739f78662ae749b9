pub mod columnar;
pub mod mock;
pub mod relational;
pub mod traits;

pub use self::columnar::ColumnarBackend;
pub use self::mock::MockStorage;
pub use self::relational::RelationalBackend;
pub use self::traits::{
    EmbeddingMetadata, SearchFilter, SearchResult, StorageBackend, UpsertDocument,
    validate_embedding_compatibility,
};
