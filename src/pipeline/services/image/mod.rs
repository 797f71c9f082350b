pub mod analysis;

pub use analysis::{AnalysisConfig, AnalysisOrchestrator, AnalysisRequest};
