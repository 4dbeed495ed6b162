use crate::reports::ReportContext;
use crate::storage::CallStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CallStore>,
    pub context: ReportContext,
}

impl AppState {
    pub fn new(store: CallStore, context: ReportContext) -> Self {
        Self {
            store: Arc::new(store),
            context,
        }
    }
}
