use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Size of a single read from the port. Commands are short.
const READ_CHUNK: usize = 64;
const QUEUE_LENGTH: usize = 15;

/// Arduino `println` ends lines with CRLF.
const LINE_ENDING: &str = "\r\n";

/// Serial port split into a byte source and a line sink.
pub struct Comm {
    /// Lines to write out, without terminator.
    pub tx: mpsc::Sender<String>,
    /// Raw chunks as they arrive.
    pub rx: mpsc::Receiver<Vec<u8>>,
    pub reader: JoinHandle<anyhow::Result<()>>,
    pub writer: JoinHandle<anyhow::Result<()>>,
}

async fn reader<T: AsyncRead>(
    mut port: ReadHalf<T>,
    channel: mpsc::Sender<Vec<u8>>,
) -> anyhow::Result<()> {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let read_len: usize = match port.read(&mut buf).await {
            Ok(count) if count > 0 => count,
            Ok(_) => {
                anyhow::bail!("Reader disconnected");
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => {
                anyhow::bail!("Error while reading from port {:?}", e);
            }
        };

        debug!("USB->RX: {} bytes: {:02x?}", read_len, &buf[0..read_len]);
        channel.send(buf[0..read_len].to_vec()).await?;
    }
}

async fn writer<T: AsyncWrite>(
    mut port: WriteHalf<T>,
    mut channel: mpsc::Receiver<String>,
) -> anyhow::Result<()> {
    loop {
        let line = if let Some(line) = channel.recv().await {
            line
        } else {
            return Ok(());
        };

        let mut msg = line.into_bytes();
        msg.extend_from_slice(LINE_ENDING.as_bytes());

        match port.write_all(&msg).await {
            Ok(()) => {
                debug!("TX->USB: {} bytes: {:?}", msg.len(), String::from_utf8_lossy(&msg));
            }
            Err(err) => {
                anyhow::bail!("Error while sending to port {:?}", err);
            }
        }
        if let Err(err) = port.flush().await {
            warn!("Flush failed {:?}", err);
        }
    }
}

impl Comm {
    /// Start reader and writer tasks over any byte stream.
    pub fn from_stream<T>(stream: T) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (port_read, port_write) = tokio::io::split(stream);

        let (out_tx, out_rx) = mpsc::channel(QUEUE_LENGTH);
        let (in_tx, in_rx) = mpsc::channel(QUEUE_LENGTH);

        let reader_handle = tokio::spawn(reader(port_read, in_tx));
        let writer_handle = tokio::spawn(writer(port_write, out_rx));

        Comm {
            tx: out_tx,
            rx: in_rx,
            writer: writer_handle,
            reader: reader_handle,
        }
    }

    /// Stop both tasks and log how they ended. Lines already queued are
    /// written first. Returns the writer's error, if any.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let Comm {
            tx,
            rx,
            reader,
            writer,
        } = self;
        drop(tx);
        drop(rx);

        let written = match writer.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!("Serial writer stopped: {}", err);
                Err(err)
            }
            Err(err) => {
                warn!("Serial writer task failed: {}", err);
                Err(err.into())
            }
        };

        // Reader may still be parked on a read.
        if !reader.is_finished() {
            reader.abort();
        }
        match reader.await {
            Ok(Err(err)) => warn!("Serial reader stopped: {}", err),
            Err(err) if !err.is_cancelled() => warn!("Serial reader task failed: {}", err),
            _ => {}
        }
        written
    }
}

#[tracing::instrument]
pub async fn run(port_name: String, baud_rate: u32) -> anyhow::Result<Comm> {
    let builder = tokio_serial::new(port_name, baud_rate);
    let stream = tokio_serial::SerialStream::open(&builder)?;

    Ok(Comm::from_stream(stream))
}
