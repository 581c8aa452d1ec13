/// UI layer: the port transport between the UI runtime and the bridge
///
/// `serve` wires a byte stream from the UI (stdin in the binary) through
/// the bridge and back out to the UI (stdout).

pub mod ports;

// Re-export commonly used types
pub use ports::{decode_request, encode_response, read_requests, write_responses};

use crate::backend::Backend;
use crate::bridge::{Bridge, Notifier};
use crate::error::Result;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::info;

/// Inbound requests buffered between the reader and the bridge
const REQUEST_BUFFER_SIZE: usize = 64;

/// Relay one UI stream until its input closes
///
/// Every request read before end of input gets its response written
/// before this returns.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (bridge, responses) = Bridge::new(backend, notifier);
    let (requests_tx, requests_rx) = mpsc::channel(REQUEST_BUFFER_SIZE);

    let (read, (), written) = tokio::join!(
        read_requests(reader, requests_tx),
        bridge.run(requests_rx),
        write_responses(writer, responses),
    );

    info!("Relayed {} request(s), wrote {} response(s)", read?, written?);
    Ok(())
}
