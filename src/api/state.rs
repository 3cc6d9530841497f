use std::sync::Arc;

use crate::interview::SessionRegistry;

use super::routes::report::ReportTemplates;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub templates: Arc<ReportTemplates>,
}

impl AppState {
    pub fn new(registry: SessionRegistry) -> anyhow::Result<Self> {
        Ok(Self {
            registry,
            templates: Arc::new(ReportTemplates::new()?),
        })
    }
}
