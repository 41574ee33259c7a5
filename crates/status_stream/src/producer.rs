use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::debug;

use crate::diagnostics::{DiagnosticKind, SessionContext, SessionState};
use crate::error::ReadError;
use crate::reader::RecordReader;
use crate::relay::RelaySender;

/// Reads records and offers them to the relay until the byte stream closes.
///
/// The relay sender is dropped when this returns, which lets the consumer observe
/// the end of the buffered records.
pub(crate) async fn run_producer<R>(
    mut reader: RecordReader<R>,
    relay: RelaySender,
    ctx: Arc<SessionContext>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        if relay.is_closed() {
            debug!("status stream consumer went away; stopping producer");
            break;
        }

        match reader.read_record().await {
            Ok(record) => {
                ctx.record_read();
                if !relay.offer(record) {
                    let dropped = ctx.stats().records_dropped + 1;
                    ctx.report(
                        DiagnosticKind::QueueOverflow,
                        &format!("relay queue full; dropped record (total dropped: {dropped})"),
                    );
                }
            }
            Err(ReadError::Malformed { reason }) => {
                ctx.report(DiagnosticKind::MalformedRecord, &reason);
            }
            Err(err) => {
                ctx.report(DiagnosticKind::StreamClosed, &err.to_string());
                break;
            }
        }
    }

    ctx.advance(SessionState::Draining);
}
