use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::protocol::{Command, Limits, NOT_RECOGNIZED_RESPONSE, encode_file_frame};
use crate::session::Session;
use crate::size::format_size;
use std::io;
use std::net::SocketAddr;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, lookup_host};
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 11000;
pub const PENDING_CONNECTIONS: u32 = 100;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub limits: Limits,
}

/// First address the host name resolves to.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    lookup_host((host, port)).await?.next().ok_or_else(|| {
        Error::Transport(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{host} did not resolve to any address"),
        ))
    })
}

pub fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    Ok(socket.listen(PENDING_CONNECTIONS)?)
}

pub async fn run_server(catalog: Catalog, config: ServerConfig) -> Result<()> {
    let addr = resolve(&config.host, config.port).await?;
    let listener = bind(addr)?;
    if catalog.is_empty() {
        warn!("Catalog is empty, every file request will be answered as not found");
    }
    for entry in catalog.entries() {
        debug!("Catalog entry {} -> {:?}", entry.id, entry.location);
    }
    info!(
        "Server listening on {} serving {} files",
        listener.local_addr()?,
        catalog.len()
    );
    serve(listener, catalog, config.limits).await
}

/// Accepts one connection, finishes it, and only then accepts the next.
pub async fn serve(listener: TcpListener, catalog: Catalog, limits: Limits) -> Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let session = Session::new(socket, peer.to_string());
        if let Err(e) = handle_connection(session, &catalog, limits).await {
            warn!("Connection with {} abandoned: {}", peer, e);
        }
    }
}

/// Runs one request/response exchange. The session is closed whether or not
/// the exchange succeeded.
pub async fn handle_connection<S>(
    mut session: Session<S>,
    catalog: &Catalog,
    limits: Limits,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let exchanged = exchange(&mut session, catalog, limits).await;
    let closed = session.close().await;
    exchanged.and(closed)
}

async fn exchange<S>(session: &mut Session<S>, catalog: &Catalog, limits: Limits) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = session.receive_once(limits.max_command_size).await?;
    info!(
        "Received request {:?} from {}",
        String::from_utf8_lossy(&request),
        session.peer()
    );

    let response = dispatch(catalog, &request).await?;
    session.send(&response).await?;
    info!(
        "Sent response of {} to {}",
        format_size(response.len() as u64),
        session.peer()
    );
    Ok(())
}

/// Response bytes for a raw request. An unknown id yields an empty payload;
/// an unreadable catalog file yields `Error::NoResponse`.
pub async fn dispatch(catalog: &Catalog, request: &[u8]) -> Result<Vec<u8>> {
    match Command::decode(request) {
        Ok(Command::ListFiles) => Ok(catalog.render().into_bytes()),
        Ok(Command::GetFile { id }) => {
            let Some(entry) = catalog.lookup(id) else {
                debug!("No catalog entry with id {}", id);
                return Ok(Vec::new());
            };
            let content = fs::read(&entry.location)
                .await
                .map_err(|source| Error::NoResponse { id, source })?;
            debug!("Serving {:?} ({})", entry.name, format_size(content.len() as u64));
            Ok(encode_file_frame(&entry.name, &content)?)
        }
        Err(e) => {
            debug!("{}", e);
            Ok(NOT_RECOGNIZED_RESPONSE.as_bytes().to_vec())
        }
    }
}
