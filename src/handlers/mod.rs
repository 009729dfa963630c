pub mod extract;
pub mod logs_api;
pub mod metrics_handler;
