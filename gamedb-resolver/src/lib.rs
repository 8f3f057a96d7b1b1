pub mod chain;
pub mod config;
pub mod error;
pub mod gog;
pub mod igdb;
pub mod matching;
pub mod provider;
pub mod session;
pub mod steam;
pub mod types;

pub use chain::{Resolution, ResolverChain};
pub use config::{
    FIELDS, SettingField, SettingSource, Settings, Thresholds, TwitchCredentials, config_path,
};
pub use error::{ConfigError, ResolveError};
pub use gog::GogProvider;
pub use igdb::IgdbProvider;
pub use matching::{Candidate, CandidateSearch, best_match, resolve_two_pass};
pub use provider::{IdentityProvider, MAX_EMPTY_RETRIES};
pub use session::TwitchSession;
pub use steam::SteamProvider;
