mod error_handler;
mod rate_limit;

pub use error_handler::{handle_timeout, log_errors};
pub use rate_limit::{UNKNOWN_CLIENT, client_identity, rate_limit};
