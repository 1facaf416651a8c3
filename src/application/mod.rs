// Application layer - Use cases and the replay engine
pub mod backtest_service;
pub mod backtest_source;
pub mod error;
pub mod replay_machine;
pub mod replay_session;
pub mod validation;
