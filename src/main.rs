mod board;
mod engine;
mod game;
mod movegen;
mod render;
mod session;

use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex};
use clap::Parser;
use log::{info, warn, error};
use tokio::net::{TcpListener, TcpStream};
use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::protocol::Message;
use crate::session::{Event, Geometry, Session};

#[derive(Parser, Debug)]
#[command(author, version, about = "Checkers against a minimax engine, served to a WebSocket front-end", long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 7000)]
    port: u16,
    /// Board width in pixels, as drawn by the front-end
    #[arg(long, default_value_t = 700.0)]
    width: f64,
    /// Board height in pixels, as drawn by the front-end
    #[arg(long, default_value_t = 700.0)]
    height: f64,
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    let level = args.log_level.parse::<log::Level>().ok();
    simple_logger::init_with_level(level.unwrap_or(log::Level::Info))
        .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;
    if level.is_none() {
        warn!("Unknown log level {:?}, using info", args.log_level);
    }
    if !(args.width > 0.0 && args.height > 0.0) {
        return Err(Error::new(ErrorKind::InvalidInput, "Board width and height must be positive"));
    }

    let geometry = Geometry::new(args.width, args.height);
    let address = format!("{}:{}", args.host, args.port);

    let listener = TcpListener::bind(&address).await?;
    info!("Listening on: {}", address);

    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            if let Err(e) = accept_connection(stream, geometry).await {
                error!("Connection failed: {:?}", e);
            }
        });
    }

    Ok(())
}

async fn accept_connection(stream: TcpStream, geometry: Geometry) -> Result<(), Error> {
    let addr = stream.peer_addr()?;
    info!("Peer address: {}", addr);

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::new(ErrorKind::ConnectionAborted, e.to_string()))?;
    info!("New WebSocket connection: {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let session_mutex = Arc::new(Mutex::new(Session::new(geometry)));
    let opening = serde_json::to_value(lock(&session_mutex)?.frame())?;
    send(&mut write, opening).await?;

    while let Some(raw_message) = read.next().await {
        match raw_message {
            Ok(text_message) => {
                if text_message.is_close() { break; }
                if !text_message.is_text() && !text_message.is_binary() { continue; }
                match serde_json::from_slice::<Value>(&text_message.into_data()) {
                    Ok(data) => {
                        info!("Received: {}", data);
                        let response = match handle_message(&session_mutex, data).await {
                            Ok(Some(resp)) => resp,
                            Ok(None) => {
                                write.send(Message::Close(None)).await
                                    .map_err(|e| Error::new(ErrorKind::BrokenPipe, e.to_string()))?;
                                break;
                            }
                            Err(e) => {
                                error!("Error handling message: {:?}", e);
                                json!({"error": e.to_string()})
                            }
                        };
                        send(&mut write, response).await?;
                    },
                    Err(e) => { error!("Error parsing JSON: {:?}", e); }
                }
            }
            Err(e) => { error!("Error reading websocket message: {:?}", e); }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

fn lock(session_mutex: &Mutex<Session>) -> Result<std::sync::MutexGuard<'_, Session>, Error> {
    session_mutex.lock().map_err(|_| Error::new(ErrorKind::Other, "Session lock poisoned"))
}

async fn send<S>(write: &mut S, response: Value) -> Result<(), Error>
where
    S: Sink<Message> + Unpin,
    <S as Sink<Message>>::Error: std::fmt::Display,
{
    let response_str = response.to_string();
    write.send(Message::text(response_str.clone())).await
        .map_err(|e| Error::new(ErrorKind::BrokenPipe, format!("Failed to send message {}: {}", response_str, e)))?;
    info!("Sent: {}", response_str);
    Ok(())
}

// client message protocol: "click", "quit", "frame"
// server message protocol: frame object, or "error"
async fn handle_message(session_mutex: &Arc<Mutex<Session>>, data: Value) -> Result<Option<Value>, Error> {
    if !data.is_object() {
        return Err(Error::new(ErrorKind::InvalidInput, "Expected a dict"));
    }
    let event: Event = serde_json::from_value(data)?;

    // the search blocks, so keep it off the reactor threads
    let session = Arc::clone(session_mutex);
    let frame = tokio::task::spawn_blocking(move || lock(&session).and_then(|mut s| s.handle(event)))
        .await
        .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))??;

    frame.map(serde_json::to_value).transpose().map_err(Error::from)
}
