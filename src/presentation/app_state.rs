// Application state for HTTP handlers
use crate::application::backtest_service::BacktestService;

#[derive(Clone)]
pub struct AppState {
    pub backtest_service: BacktestService,
}
