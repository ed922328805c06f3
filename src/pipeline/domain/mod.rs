pub mod candidate;
pub mod result;
pub mod trace;

pub use candidate::{sort_candidates, ColorCandidate, SourceMethod};
pub use result::ClassificationResult;
pub use trace::{
    CategoryTrace, DebugTrace, ProviderFailure, StageDetails, StageOutcome, StageRecord,
};
