//! Decodes a status stream from stdin and prints a line per event.
//! Usage:
//! ```bash
//! curl -sN "$STREAM_URL" | cargo run -p status_stream --example print_stream
//! cargo run -p status_stream --example print_stream -- --length-prefixed --capacity 200 < sample.json
//! ```
//! Set `RUST_LOG=status_stream=debug` to see unknown records and session transitions.

use std::{env, error::Error};

use status_stream::{Event, Framing, StreamSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let (framing, capacity) = parse_args()?;
    let session = StreamSession::builder()
        .framing(framing)
        .queue_capacity(capacity)
        .start(tokio::io::stdin())?;

    let events = session.events();
    while let Ok(event) = events.next_event().await {
        match event {
            Event::Status(status) => {
                let name = status.user.name.as_deref().unwrap_or("?");
                let handle = status.user.screen_name.as_deref().unwrap_or("?");
                println!("Status from {name} ({handle})");
                println!("  {}", status.text);
            }
            Event::Deletion(deletion) => {
                let id = deletion.status.id_str.as_deref().unwrap_or("?");
                let owner = deletion.status.user_id_str.as_deref().unwrap_or("?");
                println!("Status {id} deleted by {owner}");
            }
            Event::Unknown(raw) => {
                println!("Unrecognized record: {raw}");
            }
        }
        println!("--------------------------------------------------");
    }

    let stats = session.stats();
    println!(
        "Disconnected: {} read, {} delivered, {} dropped, {} malformed, {} undecodable",
        stats.records_read,
        stats.events_delivered,
        stats.records_dropped,
        stats.malformed_records,
        stats.decode_failures
    );
    Ok(())
}

fn parse_args() -> Result<(Framing, usize), Box<dyn Error>> {
    let mut framing = Framing::Concatenated;
    let mut capacity = status_stream::DEFAULT_QUEUE_CAPACITY;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--length-prefixed" => framing = Framing::LengthPrefixed,
            "--capacity" => {
                let raw = args.next().ok_or("--capacity needs a value")?;
                capacity = raw.parse()?;
            }
            other => return Err(format!("unrecognized argument `{other}`").into()),
        }
    }
    Ok((framing, capacity))
}
