//! Resilient HTTP fetching for catalog providers and listing crawlers.
//!
//! [`FetchClient`] wraps `reqwest` with bounded retries, exponential backoff,
//! charset-aware body decoding and an optional anti-bot [`ChallengeSolver`]
//! whose solutions are remembered per origin.

pub mod client;
pub mod error;
pub mod request;
pub mod solutions;
pub mod solver;

pub use client::{DEFAULT_USER_AGENT, FetchClient, FetchConfig, backoff_delay, is_retryable_status};
pub use error::FetchError;
pub use request::{Body, DEFAULT_RETRIES, FetchRequest, FetchResponse, Method, UserAgent};
pub use solutions::{Solution, SolutionStore, origin_of};
pub use solver::{ChallengeSolver, FlareSolverr};
