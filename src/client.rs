use crate::command::Command;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_serial::SerialStream;
use tracing::{debug, info};

/// Host side of the link: sends gate commands to a controller.
pub struct GateClient<T> {
    stream: BufReader<T>,
}

impl GateClient<SerialStream> {
    /// Open the controller's serial port.
    ///
    /// Boards that reset when the port opens need `settle` before they
    /// listen.
    #[tracing::instrument]
    pub async fn connect(
        port_name: &str,
        baud_rate: u32,
        settle: Duration,
    ) -> anyhow::Result<Self> {
        let builder = tokio_serial::new(port_name, baud_rate);
        let stream = SerialStream::open(&builder)?;
        tokio::time::sleep(settle).await;
        info!("Connected to gate controller on {}", port_name);
        Ok(Self::new(stream))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> GateClient<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    pub async fn send_command(&mut self, command: Command) -> anyhow::Result<()> {
        let line = format!("{}\n", command);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await?;
        info!("Command {:?} sent", command.as_str());
        Ok(())
    }

    pub async fn open_gate(&mut self) -> anyhow::Result<()> {
        self.send_command(Command::Open).await
    }

    pub async fn close_gate(&mut self) -> anyhow::Result<()> {
        self.send_command(Command::Close).await
    }

    /// Next status line from the controller, trimmed. `None` on timeout.
    pub async fn read_reply(&mut self, wait: Duration) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        match tokio::time::timeout(wait, self.stream.read_line(&mut line)).await {
            Ok(Ok(0)) => anyhow::bail!("Controller closed the connection"),
            Ok(Ok(_)) => {
                let line = line.trim().to_string();
                debug!("RX: {}", line);
                Ok(Some(line))
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Ok(None),
        }
    }
}
