//! WebSocket mock of the OpenSpeech streaming endpoint
//!
//! Accepts a single connection, records the upgrade `Authorization` header and
//! the submit frame, then plays a script of steps.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use openspeech_relay::core::tts::openspeech::protocol::gzip_decompress;

/// One scripted action of the mock upstream.
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a binary frame.
    Send(Vec<u8>),
    /// Send a text message (not part of the protocol).
    SendText(String),
    /// Block until the client closes the connection.
    WaitForClose,
    /// Close the connection from the server side.
    Close,
}

/// What the mock observed during the session.
#[derive(Debug, Default)]
pub struct MockReport {
    pub authorization: Option<String>,
    pub submit: Option<Vec<u8>>,
    pub client_closed: bool,
}

impl MockReport {
    /// Decodes the gzip JSON body of the submit frame.
    pub fn submit_json(&self) -> serde_json::Value {
        let submit = self.submit.as_ref().expect("no submit frame received");
        let body = gzip_decompress(&submit[8..]).expect("submit body is not gzip");
        serde_json::from_slice(&body).expect("submit body is not JSON")
    }
}

/// A running mock upstream.
pub struct OpenSpeechMock {
    pub url: String,
    handle: JoinHandle<Vec<MockReport>>,
}

impl OpenSpeechMock {
    /// Binds a local port and serves one connection with `script`.
    pub async fn start(script: Vec<Step>) -> Self {
        Self::start_sequence(vec![script]).await
    }

    /// Serves one connection per script, one after another.
    pub async fn start_sequence(scripts: Vec<Vec<Step>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut reports = Vec::with_capacity(scripts.len());
            for script in scripts {
                let (stream, _) = listener.accept().await.unwrap();
                reports.push(serve_connection(stream, script).await);
            }
            reports
        });

        Self {
            url: format!("ws://{addr}/api/v1/tts/ws_binary"),
            handle,
        }
    }

    /// Waits for the scripted session to finish and returns its report.
    pub async fn finish(self) -> MockReport {
        self.finish_all()
            .await
            .into_iter()
            .next()
            .expect("mock upstream served no connection")
    }

    /// Waits for every scripted session to finish.
    pub async fn finish_all(self) -> Vec<MockReport> {
        tokio::time::timeout(std::time::Duration::from_secs(5), self.handle)
            .await
            .expect("mock upstream did not finish")
            .expect("mock upstream panicked")
    }
}

async fn serve_connection(stream: TcpStream, script: Vec<Step>) -> MockReport {
    let mut report = MockReport::default();

    let mut authorization = None;
    let callback = |req: &Request, resp: Response| {
        authorization = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok::<Response, ErrorResponse>(resp)
    };
    let mut ws = accept_hdr_async(stream, callback).await.unwrap();
    report.authorization = authorization;

    if let Some(Ok(Message::Binary(data))) = ws.next().await {
        report.submit = Some(data.to_vec());
    }

    for step in script {
        match step {
            Step::Send(frame) => {
                if ws.send(Message::Binary(Bytes::from(frame))).await.is_err() {
                    break;
                }
            }
            Step::SendText(text) => {
                if ws.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Step::WaitForClose => {
                while let Some(message) = ws.next().await {
                    match message {
                        Ok(Message::Close(_)) => {
                            report.client_closed = true;
                            break;
                        }
                        Err(_) => break,
                        Ok(_) => continue,
                    }
                }
                return report;
            }
            Step::Close => {
                let _ = ws.close(None).await;
                return report;
            }
        }
    }

    report
}

/// Builders for raw server frames.
pub mod frames {
    use openspeech_relay::core::tts::openspeech::protocol::gzip_compress;

    fn header(message_type: u8, flags: u8, compression: u8) -> Vec<u8> {
        vec![0x11, (message_type << 4) | flags, 0x10 | compression, 0x00]
    }

    /// Audio-only response without a sequence number.
    pub fn ack() -> Vec<u8> {
        header(0xB, 0x0, 0x0)
    }

    /// Sequenced audio chunk; a negative sequence marks the last one.
    pub fn audio(sequence: i32, bytes: &[u8]) -> Vec<u8> {
        let flags = if sequence < 0 { 0x3 } else { 0x1 };
        let mut raw = header(0xB, flags, 0x0);
        raw.extend_from_slice(&sequence.to_be_bytes());
        raw.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        raw.extend_from_slice(bytes);
        raw
    }

    /// Error frame with a gzip-compressed message.
    pub fn error(code: u32, message: &str) -> Vec<u8> {
        let body = gzip_compress(message.as_bytes()).unwrap();
        let mut raw = header(0xF, 0x0, 0x1);
        raw.extend_from_slice(&code.to_be_bytes());
        raw.extend_from_slice(&(body.len() as u32).to_be_bytes());
        raw.extend_from_slice(&body);
        raw
    }

    /// Frontend metadata frame with a gzip-compressed JSON body.
    pub fn frontend(json: &str) -> Vec<u8> {
        let body = gzip_compress(json.as_bytes()).unwrap();
        let mut raw = header(0xC, 0x0, 0x1);
        raw.extend_from_slice(&(body.len() as u32).to_be_bytes());
        raw.extend_from_slice(&body);
        raw
    }
}
