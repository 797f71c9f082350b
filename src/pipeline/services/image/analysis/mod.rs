pub mod config;
pub mod core;
pub mod dominant_color;
pub mod features;
pub mod heuristics;
pub mod orchestrator;
pub mod variance;

pub use config::{AnalysisConfig, DominantColorConfig, HeuristicSamplingConfig};
pub use core::{AnalysisContext, DetectionResult, ImageDetector, ImageRegion, Rgb8};
pub use dominant_color::DominantColorExtractor;
pub use features::FeatureExtractor;
pub use heuristics::{NeutralBackgroundDetector, ProductOnlyHeuristic};
pub use orchestrator::{AnalysisOrchestrator, AnalysisRequest};
pub use variance::{color_variance, variance, ChannelStats};
