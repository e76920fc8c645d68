//! Line-framed stdio transport

use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use log::{debug, error, info, trace, warn};
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::providers::Invoker;
use serde_json::Value;
use crate::rpc::{handle_line, JsonRpcResponse, PARSE_ERROR};

/// Serve MCP on the process stdin/stdout until EOF or a signal
pub async fn run<I>(dispatcher: Arc<Dispatcher<I>>) -> Result<()>
where I: Invoker + 'static
{   info!("GPT-5 MCP server running on stdio");
    serve(
      dispatcher,
      tokio::io::stdin(),
      tokio::io::stdout(),
      shutdown_signal()
    ).await
}

/// Main transport loop
///
/// Every message is handled on its own task so slow upstream calls
/// interleave. Replies funnel through one writer task so frames never
/// overlap on the output. Lines that are not UTF-8 get a parse error
/// reply; only I/O errors end the loop. EOF drains in-flight calls; `shutdown`
/// abandons them.
pub async fn serve<I, R, W, S>(
  dispatcher: Arc<Dispatcher<I>>
, reader: R
, writer: W
, shutdown: S
) -> Result<()>
where I: Invoker + 'static
    , R: AsyncRead + Unpin
    , W: AsyncWrite + Unpin + Send + 'static
    , S: Future<Output = ()>
{   let (reply_tx, reply_rx)
      = mpsc::unbounded_channel::<JsonRpcResponse>();
    let writer_task = tokio::spawn(run_writer(writer, reply_rx));

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut in_flight = JoinSet::new();
    tokio::pin!(shutdown);

    let drain = loop
    { tokio::select!
      { _ = &mut shutdown => {
          warn!(
            "Shutting down with {} call(s) in flight",
            in_flight.len()
          );
          in_flight.abort_all();
          break false;
        }
      , Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
          if let Err(e) = joined
          {   error!("Call task failed: {}", e);
          }
        }
        // partial reads stay in `buf` if another branch wins
      , read = reader.read_until(b'\n', &mut buf) => {
          let eof = read? == 0;
          let frame = std::mem::take(&mut buf);
          if !frame.is_empty()
          {   dispatch_frame(&dispatcher, &reply_tx, &mut in_flight, frame);
          }
          if eof
          {   info!("Input closed");
              break true;
          }
        }
      }
    };

    if drain
    {   while let Some(joined) = in_flight.join_next().await
        {   if let Err(e) = joined
            {   error!("Call task failed: {}", e);
            }
        }
    }

    drop(reply_tx);
    writer_task.await
      .map_err(|e| Error::Io(format!("writer task failed: {}", e)))?
}

/// Decode one raw frame and hand it to a call task
///
/// Frames that are not UTF-8 get a parse error reply directly.
fn dispatch_frame<I>(
  dispatcher: &Arc<Dispatcher<I>>
, reply_tx: &mpsc::UnboundedSender<JsonRpcResponse>
, in_flight: &mut JoinSet<()>
, frame: Vec<u8>
)
where I: Invoker + 'static
{   let line = match String::from_utf8(frame)
    {   Ok(line) => line
      , Err(e) => {
          warn!("Frame is not valid UTF-8: {}", e);
          let reply = JsonRpcResponse::error(
            Value::Null,
            PARSE_ERROR,
            format!("Parse error: {}", e)
          );
          if reply_tx.send(reply).is_err()
          {   debug!("Writer gone, dropping reply");
          }
          return;
        }
    };
    if line.trim().is_empty()
    {   return;
    }

    let dispatcher = dispatcher.clone();
    let reply_tx = reply_tx.clone();
    in_flight.spawn(async move {
      if let Some(reply) = handle_line(&*dispatcher, line.trim_end()).await
      {   if reply_tx.send(reply).is_err()
          {   debug!("Writer gone, dropping reply");
          }
      }
    });
}

/// Owns the output stream; one JSON document per line
async fn run_writer<W>(
  mut writer: W
, mut reply_rx: mpsc::UnboundedReceiver<JsonRpcResponse>
) -> Result<()>
where W: AsyncWrite + Unpin
{   while let Some(reply) = reply_rx.recv().await
    {   let mut frame = serde_json::to_vec(&reply)?;
        trace!("-> {}", String::from_utf8_lossy(&frame));
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
    debug!("Writer finished");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
pub async fn shutdown_signal()
{   let interrupt = async {
      if let Err(e) = tokio::signal::ctrl_c().await
      {   error!("Failed to listen for SIGINT: {}", e);
          std::future::pending::<()>().await;
      }
    };

    #[cfg(unix)]
    let terminate = async {
      use tokio::signal::unix::{signal, SignalKind};
      match signal(SignalKind::terminate())
      {   Ok(mut stream) => {
            stream.recv().await;
          }
        , Err(e) => {
            error!("Failed to listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
          }
      }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select!
    { _ = interrupt => {
        info!("Received SIGINT, shutting down gracefully...");
      }
    , _ = terminate => {
        info!("Received SIGTERM, shutting down gracefully...");
      }
    }
}
