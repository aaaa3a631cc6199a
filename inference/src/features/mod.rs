//! Feature extraction over a bounded event window.

pub mod embedding;
pub mod extractor;

pub use embedding::{make_seq_embedding, SEQ_EMBEDDING_DIM};
pub use extractor::{
    classify_url, extract_features, is_checkout_complete, is_checkout_start, FeatureRecord,
    UrlCategory,
};
