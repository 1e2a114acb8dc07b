//! Local port forwarding through tunnels.
//!
//! Each accepted local connection gets its own tunnel; bytes read locally are
//! pushed, pulled bytes are written back, until either side closes.

use crate::client::{ClientError, Pulled, Tunnel, TunnelClient};
use crate::transport::Transport;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Largest chunk read from the local side per push.
const CHUNK_SIZE: usize = 16 * 1024;

/// Pump a local TCP connection through `tunnel` until either side closes.
pub async fn forward_connection<T: Transport>(
    tunnel: Tunnel<T>,
    stream: TcpStream,
) -> Result<(), ClientError> {
    let (reader, writer) = stream.into_split();
    forward_stream(tunnel, reader, writer).await
}

/// Pump any local reader/writer pair through `tunnel` until either side closes.
///
/// Local end of file stops pushing but keeps pulling: returns once the
/// remote sends its quit, or on the first error in either direction.
pub async fn forward_stream<T, R, W>(
    tunnel: Tunnel<T>,
    mut reader: R,
    mut writer: W,
) -> Result<(), ClientError>
where
    T: Transport,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let local_to_remote = async {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, ClientError>(());
            }
            tunnel.push(&buf[..n]).await?;
        }
    };

    let remote_to_local = async {
        loop {
            match tunnel.pull().await? {
                Pulled::Data(bytes) => {
                    writer.write_all(&bytes).await?;
                    writer.flush().await?;
                }
                Pulled::Quit(reason) => {
                    tracing::info!("Tunnel {} closed by remote: {}", tunnel.id(), reason);
                    let _ = writer.shutdown().await;
                    return Ok::<_, ClientError>(());
                }
            }
        }
    };

    tokio::pin!(local_to_remote, remote_to_local);

    // Run both directions concurrently until the remote quits. Local EOF only
    // stops pushing; replies still in flight are pulled and written.
    tokio::select! {
        result = &mut local_to_remote => {
            result?;
            tracing::debug!("Tunnel {}: local side ended, draining remote", tunnel.id());
            remote_to_local.await
        }
        result = &mut remote_to_local => result,
    }
}

/// Accept connections on `listener` and forward each to `host:port`.
///
/// Runs until accepting fails. Failures of individual connections are
/// logged and do not stop the loop.
pub async fn serve_forward<T: Transport + 'static>(
    client: Arc<TunnelClient<T>>,
    listener: TcpListener,
    host: String,
    port: u16,
) -> Result<(), ClientError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::info!("Accepted {} for {}:{}", peer, host, port);

        let client = Arc::clone(&client);
        let host = host.clone();
        tokio::spawn(async move {
            let result = match client.connect(&host, port).await {
                Ok(tunnel) => forward_connection(tunnel, stream).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => tracing::info!("Connection from {} finished", peer),
                Err(e) => tracing::warn!("Connection from {} failed: {}", peer, e),
            }
        });
    }
}
