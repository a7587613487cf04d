use std::sync::Arc;

use crate::config::Config;
use crate::service::RollService;

pub struct AppState {
    pub roll_service: RollService,
    pub config: Arc<Config>,
}

pub type SharedState = Arc<AppState>;
