pub mod analysis;
pub mod cascade;
pub mod context;
pub mod domain;
pub mod providers;
pub mod strategies;
pub mod voting;

pub use cascade::{ClassificationPipeline, ClassificationPipelineBuilder};
pub use domain::{ClassificationResult, ColorCandidate, DebugTrace, SourceMethod, StageOutcome};
pub use providers::{HuggingFaceProvider, InferenceProvider, VisionChatProvider};
pub use strategies::{ColorStrategy, StageAttempt};
pub use voting::{EnsembleVote, EnsembleVoter};
