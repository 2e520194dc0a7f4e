mod config;
mod document;
mod evidence;
mod normalize;
mod paragraphs;
mod segment;
mod segment_rules;
mod types;
mod viewpoints;

pub use config::PipelineConfig;
pub use document::{DocumentPipeline, ensure_extractable};
pub use types::{DocumentFormat, DocumentSource, ParseStats, ParsedDocument, SegmentStrategyKind};
