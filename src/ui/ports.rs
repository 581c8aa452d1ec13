/// JSON-lines port transport
///
/// The UI runtime sends one `{"port": .., "data": ..}` envelope per line and
/// reads responses back the same way. Malformed lines are logged and
/// skipped; they never stop the relay.

use crate::bridge::{Request, Response};
use crate::error::Result;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Decode one inbound line
pub fn decode_request(line: &str) -> Result<Request> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Encode one outbound envelope, newline-terminated
pub fn encode_response(response: &Response) -> Result<String> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    Ok(line)
}

/// Forward every decodable line from `reader` to the bridge
///
/// Returns once the reader hits end of input or the bridge stops
/// listening, with the number of requests forwarded.
pub async fn read_requests<R>(reader: R, requests: mpsc::Sender<Request>) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).split(b'\n');
    let mut forwarded = 0;

    while let Some(raw) = lines.next_segment().await? {
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping port message that is not UTF-8: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match decode_request(line) {
            Ok(request) => {
                debug!("Inbound {}", request.port());
                if requests.send(request).await.is_err() {
                    warn!("Bridge stopped, no longer reading UI input");
                    break;
                }
                forwarded += 1;
            }
            Err(e) => warn!("Skipping malformed port message: {}", e),
        }
    }

    info!("UI input closed after {} request(s)", forwarded);
    Ok(forwarded)
}

/// Write responses to `writer` until every sender is gone
pub async fn write_responses<W>(
    mut writer: W,
    mut responses: mpsc::UnboundedReceiver<Response>,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;

    while let Some(response) = responses.recv().await {
        let line = encode_response(&response)?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        debug!("Outbound {}", response.port());
        written += 1;
    }

    Ok(written)
}
