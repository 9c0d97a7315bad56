//! TCP keypad listener.
//!
//! The vote-pad gateway speaks a newline-delimited text protocol: each
//! frame is `<device-id> <key>`, answered with one JSON line. One task
//! per connection; frames from concurrent pads serialize on the shared
//! state lock inside the processor.

use plenum_application::PulsationProcessor;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

pub struct KeypadListener {
    processor: Arc<PulsationProcessor>,
}

impl KeypadListener {
    pub fn new(processor: Arc<PulsationProcessor>) -> Self {
        Self { processor }
    }

    /// Bind and serve until the task is dropped.
    pub async fn serve(self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr, "keypad listener bound");
        self.run(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "keypad connection accepted");
            let processor = self.processor.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, processor).await {
                    warn!(%peer, "keypad connection error: {}", e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    processor: Arc<PulsationProcessor>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = handle_frame(&processor, &line);
        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}

/// Parse one `<device> <key>` frame and run it through the processor.
fn handle_frame(processor: &PulsationProcessor, line: &str) -> String {
    let mut parts = line.split_whitespace();
    let (device, key) = match (parts.next(), parts.next(), parts.next()) {
        (Some(device), Some(key), None) => (device, key),
        _ => {
            return json!({
                "accepted": false,
                "code": "malformed_frame",
                "reason": format!("Expected `<device> <key>`, got {:?}", line),
            })
            .to_string();
        }
    };

    match processor.process(device, key) {
        Ok(result) => json!({
            "accepted": true,
            "member": result.member,
            "action": result.action,
        })
        .to_string(),
        Err(e) => json!({
            "accepted": false,
            "code": e.code(),
            "reason": e.to_string(),
        })
        .to_string(),
    }
}
