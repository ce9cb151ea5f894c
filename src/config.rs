//! Settings that change how the server behaves between local development and
//! deployed builds.

use std::fmt::Display;

use clap::ValueEnum;

/// The environment the server is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    /// Local development. Offline caching is disabled so that changes to pages
    /// and scripts show up on the next reload.
    Development,
    /// Any deployed build.
    #[default]
    Production,
}

impl Environment {
    /// Whether this is a local development build.
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}
