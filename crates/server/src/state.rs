use std::sync::Arc;

use service::records::RecordService;

/// Shared handler state, built once in `startup` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<RecordService>,
}

impl AppState {
    pub fn new(records: RecordService) -> Self {
        Self { records: Arc::new(records) }
    }
}
