//! Client session handling
//!
//! One [`ClientSession`] per accepted connection, driven by its own task.
//! The session reads command lines until the client authenticates and sends
//! a whitelisted command, then hands the connection to the relay and stops
//! interpreting traffic.
//!
//! ```text
//! greeting → read line ─┬─ AUTHINFO USER → 381 → AUTHINFO PASS → 281 / 502
//!                       ├─ whitelisted   → relay until either side closes
//!                       ├─ QUIT          → 205, close
//!                       └─ anything else → 502, keep reading
//! ```

mod auth;
mod reader;
mod relay;
mod state;

pub use auth::AuthFailure;
pub use relay::{RelayEnd, TransferMetrics, relay};
pub use state::{AttachedBackend, SessionState};

use anyhow::Result;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::auth::{BackendConnector, CredentialStore};
use crate::command::{AllowedCommands, CommandAction, CommandHandler, Rejection};
use crate::config::Config;
use crate::constants::{buffer::READER_CAPACITY, user::ANONYMOUS};
use crate::protocol;
use crate::registry::ConnectionRegistry;
use crate::router::BackendSelector;
use crate::stream::AsyncStream;
use reader::{LineRead, line_text, read_command_line};

/// Collaborators shared by every session
#[derive(Debug)]
pub struct SessionContext {
    pub credentials: Arc<CredentialStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub selector: BackendSelector,
    pub connector: BackendConnector,
    pub commands: CommandHandler,
    /// Custom banner text; `None` sends the default greeting
    pub greeting: Option<String>,
}

impl SessionContext {
    /// Build every collaborator from a validated config
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(ConnectionRegistry::from_config(config));
        Ok(Self {
            credentials: Arc::new(CredentialStore::from_users(&config.users)),
            selector: BackendSelector::new(config.backends.clone(), Arc::clone(&registry)),
            registry,
            connector: BackendConnector::new(&config.backends, config.frontend.handshake_timeout)?,
            commands: CommandHandler::new(AllowedCommands::new(&config.frontend.allowed_commands)),
            greeting: config.frontend.greeting.clone(),
        })
    }
}

enum Flow {
    Continue,
    Close,
}

/// A single client connection
pub struct ClientSession<S> {
    client: BufReader<S>,
    client_addr: SocketAddr,
    ctx: Arc<SessionContext>,
    state: SessionState,
    line: Vec<u8>,
}

impl<S: AsyncStream> ClientSession<S> {
    pub fn new(stream: S, client_addr: SocketAddr, ctx: Arc<SessionContext>) -> Self {
        Self {
            client: BufReader::with_capacity(READER_CAPACITY, stream),
            client_addr,
            ctx,
            state: SessionState::new(),
            line: Vec::with_capacity(512),
        }
    }

    /// Serve the client until it disconnects, then release everything
    ///
    /// Client I/O errors end the session and are returned after teardown.
    pub async fn run(mut self) -> io::Result<()> {
        let result = self.serve().await;
        self.teardown().await;
        result
    }

    async fn serve(&mut self) -> io::Result<()> {
        protocol::send_proxy_greeting(&mut self.client, self.ctx.greeting.as_deref()).await?;
        debug!("Sent proxy greeting to client {}", self.client_addr);

        loop {
            if let Flow::Close = self.next_command().await? {
                return Ok(());
            }
        }
    }

    async fn next_command(&mut self) -> io::Result<Flow> {
        let mut raw = std::mem::take(&mut self.line);
        let flow = self.dispatch_line(&mut raw).await;
        self.line = raw;
        flow
    }

    async fn dispatch_line(&mut self, raw: &mut Vec<u8>) -> io::Result<Flow> {
        match read_command_line(&mut self.client, raw).await? {
            LineRead::Line => {}
            LineRead::Eof => return Ok(Flow::Close),
            LineRead::TooLong => {
                self.write(protocol::UNKNOWN_SYNTAX).await?;
                return Ok(Flow::Close);
            }
        }

        let line = line_text(raw);
        let action = self.ctx.commands.handle_command(&line);
        self.state.last_command = match action {
            CommandAction::StartAuth { .. } => "AUTHINFO USER".to_string(),
            _ => line.clone(),
        };
        debug!(client = %self.client_addr, "Command: {}", self.state.last_command);

        match action {
            CommandAction::StartAuth { username } => self.handle_auth(username).await,
            CommandAction::Forward => {
                if self.state.is_authenticated() {
                    self.start_relay(raw).await;
                    Ok(Flow::Close)
                } else {
                    self.write(protocol::AUTH_REQUIRED_FOR_COMMAND).await?;
                    Ok(Flow::Continue)
                }
            }
            CommandAction::Quit => {
                if self.state.is_authenticated() {
                    self.start_relay(raw).await;
                } else {
                    self.write(protocol::GOODBYE).await?;
                }
                Ok(Flow::Close)
            }
            CommandAction::Reject(Rejection::UnknownSyntax) => {
                self.write(protocol::UNKNOWN_SYNTAX).await?;
                Ok(Flow::Continue)
            }
            CommandAction::Reject(Rejection::NotAllowed(verb)) => {
                debug!(client = %self.client_addr, "Rejecting command {}", verb);
                self.write(protocol::command_not_allowed(verb).as_bytes())
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn handle_auth(&mut self, username: &str) -> io::Result<Flow> {
        if self.state.is_authenticated() {
            // Already bound to a backend; a second login is not supported
            self.write(protocol::UNKNOWN_SYNTAX).await?;
            return Ok(Flow::Continue);
        }

        self.write(protocol::AUTH_CONTINUE).await?;

        let mut raw = Vec::new();
        match read_command_line(&mut self.client, &mut raw).await? {
            LineRead::Line => {}
            LineRead::Eof => return Ok(Flow::Close),
            LineRead::TooLong => {
                self.write(protocol::UNKNOWN_SYNTAX).await?;
                return Ok(Flow::Close);
            }
        }

        let line = line_text(&raw);
        let Some(password) = CommandHandler::expect_auth_pass(&line) else {
            self.state.last_command = line;
            self.write(protocol::UNKNOWN_SYNTAX).await?;
            return Ok(Flow::Continue);
        };
        self.state.last_command = "AUTHINFO PASS".to_string();

        match self.ctx.authenticate_and_attach(username, password).await {
            Ok(attached) => {
                info!(
                    client = %self.client_addr,
                    username,
                    backend = attached.backend_name(),
                    "Client authenticated"
                );
                self.state.attach(attached);
                self.write(protocol::AUTH_ACCEPTED).await?;
            }
            Err(failure) => {
                debug!(client = %self.client_addr, username, "Authentication refused: {}", failure);
                self.write(failure.response()).await?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn start_relay(&mut self, first_line: &[u8]) {
        let client_addr = self.client_addr;
        let Some(attached) = self.state.attached_mut() else {
            return;
        };
        let (end, metrics) = relay(&mut self.client, &mut attached.stream, first_line).await;
        relay::log_relay_end(
            client_addr,
            attached.username(),
            attached.backend_name(),
            &end,
            metrics,
        );
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.client.write_all(data).await?;
        self.client.flush().await
    }

    /// Release reservations and close both transports
    ///
    /// Safe to call more than once.
    async fn teardown(&mut self) {
        let username = self.state.username().unwrap_or(ANONYMOUS).to_string();
        if let Some(mut attached) = self.state.detach() {
            let _ = attached.stream.shutdown().await;
            debug!(
                client = %self.client_addr,
                username = %username,
                backend = attached.backend_name(),
                "Closed backend connection"
            );
            drop(attached);
        }
        let _ = self.client.shutdown().await;
        debug!(client = %self.client_addr, username = %username, "Session closed");
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, UserConfig};
    use tokio::io::{AsyncBufReadExt, DuplexStream};

    fn context(allowed: &[&str]) -> Arc<SessionContext> {
        let mut config = Config {
            backends: vec![
                BackendConfig::builder("127.0.0.1", 1)
                    .name("unreachable")
                    .max_connections(1)
                    .build()
                    .unwrap(),
            ],
            users: vec![
                UserConfig::new("alice", crate::auth::hash_password("secret", 4).unwrap(), 1)
                    .unwrap(),
            ],
            ..Default::default()
        };
        config.frontend.allowed_commands = allowed.iter().map(|c| c.to_string()).collect();
        config.frontend.handshake_timeout = std::time::Duration::from_secs(1);
        Arc::new(SessionContext::from_config(&config).unwrap())
    }

    fn start(ctx: Arc<SessionContext>) -> BufReader<DuplexStream> {
        let (client, server) = tokio::io::duplex(4096);
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        tokio::spawn(ClientSession::new(server, addr, ctx).run());
        BufReader::new(client)
    }

    async fn exchange(client: &mut BufReader<DuplexStream>, line: &str) -> String {
        client.get_mut().write_all(line.as_bytes()).await.unwrap();
        read(client).await
    }

    async fn read(client: &mut BufReader<DuplexStream>) -> String {
        let mut reply = String::new();
        client.read_line(&mut reply).await.unwrap();
        reply
    }

    #[tokio::test]
    async fn test_greeting_then_syntax_errors() {
        let mut client = start(context(&["ARTICLE"]));
        assert_eq!(read(&mut client).await, "200 Welcome to NNTP Proxy!\r\n");
        assert_eq!(exchange(&mut client, "\r\n").await, "502 Unknown Syntax!\r\n");
        assert_eq!(
            exchange(&mut client, "xover 1-10\r\n").await,
            "502 xover not allowed\r\n"
        );
        assert_eq!(
            exchange(&mut client, "article 5\r\n").await,
            "480 Authentication required\r\n"
        );
    }

    #[tokio::test]
    async fn test_quit_closes_session() {
        let mut client = start(context(&["ARTICLE"]));
        read(&mut client).await;
        assert_eq!(exchange(&mut client, "QUIT\r\n").await, "205 Goodbye\r\n");
        assert_eq!(read(&mut client).await, "");
    }

    #[tokio::test]
    async fn test_whitelisted_quit_needs_auth() {
        let mut client = start(context(&["QUIT"]));
        read(&mut client).await;
        assert_eq!(
            exchange(&mut client, "QUIT\r\n").await,
            "480 Authentication required\r\n"
        );
    }

    #[tokio::test]
    async fn test_failed_backend_leaves_nothing_reserved() {
        let ctx = context(&["ARTICLE"]);
        let mut client = start(Arc::clone(&ctx));
        read(&mut client).await;
        assert_eq!(
            exchange(&mut client, "AUTHINFO USER alice\r\n").await,
            "381 Continue\r\n"
        );
        assert_eq!(
            exchange(&mut client, "AUTHINFO PASS secret\r\n").await,
            "502 Backend AUTH Failed!\r\n"
        );
        assert_eq!(ctx.registry.user_active("alice"), Some(0));
        assert_eq!(ctx.registry.backend_active("unreachable"), Some(0));
    }

    #[tokio::test]
    async fn test_authenticate_and_attach_rejects_bad_password() {
        let ctx = context(&[]);
        let err = ctx.authenticate_and_attach("alice", "nope").await.unwrap_err();
        assert_eq!(err, AuthFailure::InvalidCredentials);
        assert_eq!(ctx.registry.user_active("alice"), Some(0));
    }

    #[tokio::test]
    async fn test_last_command_redacts_password() {
        let ctx = context(&[]);
        let (client, server) = tokio::io::duplex(4096);
        let mut client = BufReader::new(client);
        let addr: SocketAddr = "127.0.0.1:40001".parse().unwrap();
        let mut session = ClientSession::new(server, addr, ctx);

        let driver = async {
            read(&mut client).await;
            exchange(&mut client, "AUTHINFO USER alice\r\n").await;
            exchange(&mut client, "AUTHINFO PASS hunter2\r\n").await;
            client.get_mut().shutdown().await.unwrap();
        };
        let (result, ()) = tokio::join!(session.serve(), driver);
        result.unwrap();

        assert_eq!(session.state().last_command, "AUTHINFO PASS");
        assert!(!session.state().is_authenticated());
    }
}
