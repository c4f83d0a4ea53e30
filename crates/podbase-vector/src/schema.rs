//! Arrow schema of the chunk collection.
//!
//! `chunk_id` is the primary key; the writer enforces uniqueness, the store
//! itself does not. The embedding column and the three tag-embedding slots
//! share one fixed dimension.

use arrow_schema::{DataType, Field, Schema};
use podbase_core::types::TAG_SLOTS;
use std::sync::Arc;

pub const DEFAULT_EMBEDDING_DIM: i32 = 1024;

fn vector_field(name: &str, dim: i32) -> Field {
    Field::new(
        name,
        DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
        true,
    )
}

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    let mut fields = vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("episode_id", DataType::Int64, false),
        Field::new("podcast_id", DataType::Int64, false),
        Field::new("podcast_name", DataType::Utf8, false),
        Field::new("author", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("episode_title", DataType::Utf8, false),
        Field::new("duration", DataType::Utf8, false),
        Field::new("published_date", DataType::Utf8, false),
        Field::new("apple_rating", DataType::Float64, true),
        Field::new("chunk_text", DataType::Utf8, false),
        vector_field("embedding", dim),
    ];
    for i in 1..=TAG_SLOTS {
        fields.push(vector_field(&format!("tag_embedding_{i}"), dim));
    }
    fields.extend([
        Field::new("language", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
        Field::new("source_model", DataType::Utf8, false),
        // JSON-encoded array of tag strings
        Field::new("tags", DataType::Utf8, false),
    ]);
    Arc::new(Schema::new(fields))
}
