use crate::pipeline::domain::CategoryTrace;

// Markers to track how far a request has progressed through the classifier
pub struct ResolvedState;
pub struct CategorizedState {
    pub(super) category: CategoryTrace,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for ResolvedState {
    fn state_name() -> &'static str {
        "Resolved"
    }
}

impl ProcessingState for CategorizedState {
    fn state_name() -> &'static str {
        "Categorized"
    }
}
