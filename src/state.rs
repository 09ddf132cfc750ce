use crate::{api::ApiClient, config::Config, lifecycle::Lifecycle};

/// Shared application state: immutable configuration plus the API client
/// built from it. Safe to share across concurrently running commands.
pub struct AppState {
  pub config: Config,
  pub api: ApiClient,
}

impl AppState {
  pub fn new(config: Config) -> Self {
    let api = ApiClient::new(&config);
    Self { config, api }
  }

  pub fn lifecycle(&self) -> Lifecycle<'_> {
    Lifecycle::new(&self.api)
  }
}
