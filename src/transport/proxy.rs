//! # Relay
//!
//! Accepts the game client's connection, opens one to the real server and
//! pushes every frame in both directions through the [`Interceptor`].
//!
//! One task owns both framed halves and the injection queue. Frames are
//! dispatched one at a time in arrival order, and handlers never run
//! concurrently with each other.

use crate::config::ProxyConfig;
use crate::core::codec::FrameCodec;
use crate::core::frame::Relay;
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::{Interceptor, Session};
use crate::protocol::identifier::Direction;
use crate::utils::timeout::with_timeout_error;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

/// Relay one connection pair until either side closes.
///
/// Attaches `session` to `interceptor` for the duration and detaches it on
/// return, whatever the outcome.
#[instrument(skip_all, fields(client = %session.client))]
pub async fn run_session<C, S>(
    client_io: C,
    server_io: S,
    interceptor: Interceptor,
    session: Session,
    max_frame_size: usize,
) -> Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut client = Framed::new(client_io, FrameCodec::new(max_frame_size));
    let mut server = Framed::new(server_io, FrameCodec::new(max_frame_size));
    let mut relay_rx = interceptor.attach(session);

    let result = relay(&mut client, &mut server, &interceptor, &mut relay_rx).await;
    interceptor.detach();

    match &result {
        Ok(()) => info!("Session closed"),
        Err(e) => warn!(error = %e, "Session ended with error"),
    }
    interceptor.metrics().log_metrics();
    result
}

async fn relay<C, S>(
    client: &mut Framed<C, FrameCodec>,
    server: &mut Framed<S, FrameCodec>,
    interceptor: &Interceptor,
    relay_rx: &mut mpsc::UnboundedReceiver<Relay>,
) -> Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            Some(queued) = relay_rx.recv() => match queued.direction {
                Direction::Outgoing => server.send(queued.frame).await?,
                Direction::Incoming => client.send(queued.frame).await?,
            },

            frame = client.next() => match frame {
                Some(Ok(frame)) => {
                    if let Some(frame) = interceptor.dispatch(Direction::Outgoing, frame) {
                        server.send(frame).await?;
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    debug!("Client disconnected");
                    return Ok(());
                }
            },

            frame = server.next() => match frame {
                Some(Ok(frame)) => {
                    if let Some(frame) = interceptor.dispatch(Direction::Incoming, frame) {
                        client.send(frame).await?;
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    debug!("Server disconnected");
                    return Ok(());
                }
            },
        }
    }
}

/// Bind the configured address and relay until `shutdown_rx` fires.
#[instrument(skip_all, fields(listen = %config.listen_address, remote = %config.remote_address))]
pub async fn listen_with_shutdown(
    config: ProxyConfig,
    interceptor: Interceptor,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(&config.listen_address).await?;
    info!(address = %config.listen_address, "Listening for the game client");
    serve(listener, config, interceptor, shutdown_rx).await
}

/// Bind the configured address and relay until CTRL+C.
pub async fn listen(config: ProxyConfig, interceptor: Interceptor) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });
    listen_with_shutdown(config, interceptor, shutdown_rx).await
}

/// Accept loop over an already bound listener.
///
/// The interceptor tracks one session, so a second client is turned away
/// while one is connected.
pub async fn serve(
    listener: TcpListener,
    config: ProxyConfig,
    interceptor: Interceptor,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let mut active: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down relay");
                if let Some(handle) = active.take() {
                    wind_down(handle, &config, &interceptor).await;
                }
                return Ok(());
            }

            accepted = listener.accept() => {
                let (client_stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                        continue;
                    }
                };

                if active.as_ref().is_some_and(|h| !h.is_finished()) {
                    warn!(%peer, "Rejecting connection, a session is already active");
                    continue;
                }

                let server_stream = match connect_remote(&config).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!(error = %e, remote = %config.remote_address, "Failed to reach server");
                        continue;
                    }
                };

                info!(%peer, "Client connected");
                let session = Session::new(config.client, config.client_version.clone());
                let interceptor = interceptor.clone();
                let max_frame_size = config.max_frame_size;
                active = Some(tokio::spawn(async move {
                    let _ = run_session(
                        client_stream,
                        server_stream,
                        interceptor,
                        session,
                        max_frame_size,
                    )
                    .await;
                }));
            }
        }
    }
}

async fn connect_remote(config: &ProxyConfig) -> Result<TcpStream> {
    let stream = with_timeout_error(
        async {
            TcpStream::connect(&config.remote_address)
                .await
                .map_err(ProtocolError::from)
        },
        config.connect_timeout,
    )
    .await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn wind_down(mut handle: JoinHandle<()>, config: &ProxyConfig, interceptor: &Interceptor) {
    tokio::select! {
        _ = &mut handle => info!("Session finished"),
        _ = tokio::time::sleep(config.shutdown_timeout) => {
            warn!("Shutdown timeout reached, closing session");
            handle.abort();
            // The aborted task never reaches its own detach.
            interceptor.detach();
        }
    }
}
