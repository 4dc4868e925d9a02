use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::info;

use crate::handlers;
use crate::middleware::{logger, recovery};
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};

/// Router plus server bootstrap.
///
/// `App` dereferences to [`Router`], so routes, groups and middleware are
/// registered on it directly.
///
/// ```rust,no_run
/// use http::StatusCode;
/// use sol::dispatcher::Context;
/// use sol::{handlers, App};
///
/// let mut app = App::new().with_logger();
/// app.get("/", handlers![|c: &mut Context| c.string(StatusCode::OK, "hello")]);
/// app.run(Some("127.0.0.1:8080")).unwrap();
/// ```
pub struct App {
    router: Router,
    config: RuntimeConfig,
}

impl App {
    /// New app with [`recovery`] installed as the first global middleware and
    /// configuration read from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut router = Router::new();
        router.use_middleware(handlers![recovery()]);
        Self { router, config }
    }

    /// Add the access-log middleware.
    #[must_use]
    pub fn with_logger(mut self) -> Self {
        self.router.use_middleware(handlers![logger()]);
        self
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Listen address: the argument if non-empty, else the configured one.
    #[must_use]
    pub fn resolve_addr(&self, addr: Option<&str>) -> String {
        addr.map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.config.addr.as_str())
            .to_string()
    }

    /// Start serving in the background.
    ///
    /// # Errors
    ///
    /// Fails if the address does not resolve or cannot be bound.
    pub fn start(self, addr: Option<&str>) -> io::Result<ServerHandle> {
        let addr = self.resolve_addr(addr);
        may::config().set_stack_size(self.config.stack_size);

        self.router.log_routes();
        info!(
            url = %format_listen_url(&addr),
            stack_size = self.config.stack_size,
            "Sol starting"
        );

        let service = AppService::new(Arc::new(self.router));
        HttpServer(service).start(bind_address(&addr))
    }

    /// Start serving and block until the server exits.
    ///
    /// # Errors
    ///
    /// Fails if the server cannot start or its coroutine panics.
    pub fn run(self, addr: Option<&str>) -> io::Result<()> {
        let handle = self.start(addr)?;
        handle
            .join()
            .map_err(|_| io::Error::other("server coroutine panicked"))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for App {
    type Target = Router;

    fn deref(&self) -> &Router {
        &self.router
    }
}

impl DerefMut for App {
    fn deref_mut(&mut self) -> &mut Router {
        &mut self.router
    }
}

/// `:8080` binds every interface.
fn bind_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Human-friendly URL for a listen address.
///
/// Wildcard hosts become `localhost` and port 80 is omitted. An address
/// without a port is returned unchanged.
///
/// ```
/// use sol::format_listen_url;
///
/// assert_eq!(format_listen_url(":23719"), "http://localhost:23719");
/// assert_eq!(format_listen_url("0.0.0.0:80"), "http://localhost");
/// assert_eq!(format_listen_url("api.local:8080"), "http://api.local:8080");
/// ```
#[must_use]
pub fn format_listen_url(addr: &str) -> String {
    let Some((host, port)) = addr.rsplit_once(':') else {
        return addr.to_string();
    };
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return addr.to_string();
    }
    let host = match host {
        "" | "0.0.0.0" | "::" | "[::]" => "localhost",
        other => other,
    };
    if port == "80" {
        format!("http://{host}")
    } else {
        format!("http://{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_listen_url() {
        assert_eq!(format_listen_url(":23719"), "http://localhost:23719");
        assert_eq!(format_listen_url("[::]:9000"), "http://localhost:9000");
        assert_eq!(format_listen_url("127.0.0.1:80"), "http://127.0.0.1");
        assert_eq!(format_listen_url("[::1]:3000"), "http://[::1]:3000");
        assert_eq!(format_listen_url("localhost"), "localhost");
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(bind_address(":8080"), "0.0.0.0:8080");
        assert_eq!(bind_address("127.0.0.1:8080"), "127.0.0.1:8080");
    }

    #[test]
    fn test_resolve_addr_precedence() {
        let app = App::with_config(RuntimeConfig {
            addr: ":9999".to_string(),
            ..RuntimeConfig::default()
        });
        assert_eq!(app.resolve_addr(Some("127.0.0.1:1")), "127.0.0.1:1");
        assert_eq!(app.resolve_addr(Some("  ")), ":9999");
        assert_eq!(app.resolve_addr(None), ":9999");
    }

    #[test]
    fn test_new_installs_recovery() {
        let app = App::with_config(RuntimeConfig::default());
        assert_eq!(app.middlewares().len(), 1);
        assert_eq!(app.with_logger().middlewares().len(), 2);
    }
}
