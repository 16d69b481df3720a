//! Query packet sending and the server response loop.

use ch_codec::{InputStream, OutputStream};
use native_protocol::{
    CompressionState, ExceptionPacket, ProfileInfo, Progress, QueryPacket, Revision, ServerCode,
    encode_empty_block,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::block::Block;
use crate::error::Result;
use crate::exception::RemoteError;
use crate::result::QueryResult;
use crate::type_cache::TypeCache;

/// What to send for one query.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryRequest<'a> {
    pub text: &'a str,
    pub user: &'a str,
    pub revision: Revision,
    pub compression: bool,
    pub default_settings: &'a [(String, String)],
    pub settings: &'a [(&'a str, &'a str)],
}

/// Write the query packet and the trailing empty block, then flush.
pub(crate) async fn send_query<S>(
    request: QueryRequest<'_>,
    input: &mut InputStream<S>,
    output: &mut OutputStream,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let settings = request
        .default_settings
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .chain(
            request
                .settings
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        );
    let packet = QueryPacket::new(request.text, request.user, request.revision)
        .with_settings(settings)
        .with_compression(CompressionState::from_flag(request.compression));

    tracing::debug!(
        query = request.text,
        revision = %request.revision,
        settings = packet.settings.len(),
        "sending query"
    );
    packet.encode(output.buffer_mut());
    encode_empty_block(output.buffer_mut());
    output.flush(input.transport_mut()).await?;
    Ok(())
}

/// Read an exception body; the code has already been consumed.
///
/// A stream that ends inside the body yields [`RemoteError::unknown`].
pub(crate) async fn read_exception<S>(input: &mut InputStream<S>) -> Result<RemoteError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    match input.read_frame(|src| ExceptionPacket::decode(src)).await {
        Ok(packet) => Ok(packet.into()),
        Err(e) if e.is_eof() => {
            tracing::debug!(error = %e, "stream ended inside exception packet");
            Ok(RemoteError::unknown())
        }
        Err(e) => Err(e.into()),
    }
}

/// Consume server packets until the query ends.
///
/// The loop ends on END_OF_STREAM, on an EXCEPTION (stored in the result),
/// or when the server closes the stream between packets. Unrecognized
/// packet codes are logged and skipped.
pub(crate) async fn receive_result<S>(
    input: &mut InputStream<S>,
    types: &mut TypeCache,
) -> Result<QueryResult>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut result = QueryResult::new();

    loop {
        if input.at_end().await? {
            tracing::debug!("server closed the stream; ending result");
            break;
        }

        let raw = input.read_varint().await?;
        let code = match ServerCode::from_u64(raw) {
            Ok(code) => code,
            Err(_) => {
                tracing::warn!(code = raw, "ignoring unrecognized packet code");
                continue;
            }
        };
        tracing::debug!(packet = %code, "received packet");

        match code {
            ServerCode::Data => {
                // Temporary table name.
                input.read_string().await?;
                result.blocks.push(Block::read(input, types).await?);
            }
            ServerCode::Exception => {
                result.exception = Some(read_exception(input).await?);
                break;
            }
            ServerCode::Progress => {
                result.progress = input.read_frame(|src| Progress::decode(src)).await?;
            }
            ServerCode::ProfileInfo => {
                result.profile = input.read_frame(|src| ProfileInfo::decode(src)).await?;
            }
            ServerCode::Totals => {
                input.read_string().await?;
                result.totals = Some(Block::read(input, types).await?);
            }
            ServerCode::Extremes => {
                input.read_string().await?;
                result.extremes = Some(Block::read(input, types).await?);
            }
            ServerCode::EndOfStream => break,
            ServerCode::Pong => {}
            other => {
                tracing::warn!(packet = %other, "ignoring unsupported packet");
            }
        }
    }

    tracing::debug!(
        blocks = result.blocks.len(),
        rows = result.row_count(),
        exception = result.has_exception(),
        "query finished"
    );
    Ok(result)
}
