pub mod export_dataset;

pub use export_dataset::{ExportDatasetQuery, ExportError, ExportedFile};
