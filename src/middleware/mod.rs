pub mod rate_limit;
pub mod recover;

pub use rate_limit::ClientRateLimiter;
