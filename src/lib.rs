pub mod config;
mod error;
pub mod fetch;
pub mod settings;
pub mod walk;

pub use config::{ConfigError, ConfigFragment, ConfigIndex, ResolveError, ResolvedRequest};
pub use error::Error;
pub use fetch::{
    Event, FetchError, Getafix, GetafixBuilder, HttpClient, HttpResponse, LogNotifier, Notifier,
    ReqwestClient, RunOptions, RunSummary, TransportError,
};
pub use settings::{HttpSettings, LogFormat, Settings, SettingsError};
