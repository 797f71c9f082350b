pub mod analyze_image_job;
pub mod batch;
pub mod store;

pub use analyze_image_job::{
    variant_sku, AnalyzeImageJob, ImageMetadata, ImageStatus, JobOutcome, JobRunner, VariantSuggestion,
};
pub use batch::{process_waiting_images, BatchReport};
pub use store::{ImageStore, LocalImageStore};
