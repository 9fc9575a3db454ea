//! Write-side ingestion: async writers, batching and the writer registry

pub mod async_writer;
pub mod batch;
pub mod registry;

pub use async_writer::AsyncWriter;
pub use batch::BatchBuffer;
pub use registry::{WriterFactory, WriterRegistry};
