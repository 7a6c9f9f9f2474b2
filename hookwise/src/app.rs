//! The application object.
//!
//! An [`App`] owns the frozen handler registry and the authenticator. It is
//! assembled with an [`AppBuilder`]: handlers are registered directly with
//! [`AppBuilder::on`] or by plugin functions passed to [`AppBuilder::load`].
//!
//! # Example
//!
//! ```rust,ignore
//! fn greeter(app: &mut AppBuilder) -> Result<(), RegistryError> {
//!     app.on("issues.opened", |_event, ctx: Context| async move {
//!         let issue = ctx.issue()?;
//!         let path = format!("/repos/{}/{}/issues/{}/comments", issue.owner, issue.repo, issue.number);
//!         ctx.client().request(ApiRequest::post(path, json!({ "body": "Thanks!" }))).await?;
//!         Ok::<_, BoxError>(())
//!     })?;
//!     Ok(())
//! }
//!
//! let mut builder = AppBuilder::from_config(&AppConfig::from_env()?)?;
//! builder.load(greeter)?;
//! let app = builder.build();
//! app.receive(event).await?;
//! ```

use hookwise_core::{
    AuthError, DispatchError, Event, Handler, InstallationId, IntoPatterns, RegistryError,
    SharedClient,
};
use hookwise_std::{
    AppConfig, Authenticator, ConfigError, DispatchReport, Dispatcher, HandlerRegistry,
    HttpClientFactory, RegistryBuilder,
};
use std::fmt;
use std::sync::Arc;

/// Assembles an [`App`].
pub struct AppBuilder {
    authenticator: Authenticator,
    registry: RegistryBuilder,
}

impl AppBuilder {
    /// Start an app authenticating through `authenticator`.
    pub fn new(authenticator: Authenticator) -> Self {
        Self {
            authenticator,
            registry: RegistryBuilder::new(),
        }
    }

    /// Start an app talking to the GitHub API as configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is incomplete or the
    /// private key cannot be used.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let issuer = config.issuer()?;
        let clients = HttpClientFactory::new(config.client_options());
        tracing::info!(
            app_id = issuer.app_id(),
            base_url = %config.base_url,
            "configured app"
        );
        Ok(Self::new(Authenticator::with_cache(
            issuer,
            clients,
            config.token_cache(),
        )))
    }

    /// Register `handler` for one pattern or a list of patterns.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for an invalid or empty pattern list; nothing
    /// is registered in that case.
    pub fn on<P, H>(&mut self, patterns: P, handler: H) -> Result<&mut Self, RegistryError>
    where
        P: IntoPatterns,
        H: Handler,
    {
        self.registry.on(patterns, handler)?;
        Ok(self)
    }

    /// Run a plugin function that registers its own handlers.
    ///
    /// # Errors
    ///
    /// Returns whatever the plugin returns.
    pub fn load<F>(&mut self, plugin: F) -> Result<&mut Self, RegistryError>
    where
        F: FnOnce(&mut AppBuilder) -> Result<(), RegistryError>,
    {
        let before = self.registry.len();
        plugin(self)?;
        tracing::debug!(
            registered = self.registry.len() - before,
            "loaded plugin"
        );
        Ok(self)
    }

    /// The authenticator the app will use.
    ///
    /// Handlers can capture a clone to authenticate as another installation.
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Freeze the registrations and build the app.
    pub fn build(self) -> App {
        let registry = self.registry.build();
        tracing::debug!(handlers = registry.len(), "app built");
        App {
            dispatcher: Dispatcher::from_shared(Arc::new(registry), self.authenticator),
        }
    }
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// A running application.
///
/// Cloning is cheap; clones share the registry and token cache.
#[derive(Clone)]
pub struct App {
    dispatcher: Dispatcher<HandlerRegistry>,
}

impl App {
    /// Dispatch one event to every matching handler.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::receive`].
    pub async fn receive(
        &self,
        event: impl Into<Arc<Event>>,
    ) -> Result<DispatchReport, DispatchError> {
        self.dispatcher.receive(event).await
    }

    /// A client for the installation, or for the app when `installation` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when signing or issuance fails.
    pub async fn auth(
        &self,
        installation: Option<InstallationId>,
    ) -> Result<SharedClient, AuthError> {
        self.dispatcher.authenticator().auth(installation).await
    }

    /// The frozen handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        self.dispatcher.provider()
    }

    /// The dispatcher behind [`App::receive`].
    pub fn dispatcher(&self) -> &Dispatcher<HandlerRegistry> {
        &self.dispatcher
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("handlers", &self.registry().len())
            .finish_non_exhaustive()
    }
}
