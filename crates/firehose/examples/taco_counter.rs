//! Counts mexican dishes mentioned in a stream of tweets.
//!
//! Reads newline-delimited json tweets from stdin, pipes each tweet's text to stdout as
//! a json string and prints the counts to stderr when the input ends or after a minute:
//!
//! ```text
//! cargo run --example taco_counter < tweets.ndjson
//! ```

use futures::{SinkExt, StreamExt};
use micro_firehose::codec::NdjsonEncoder;
use micro_firehose::config::StreamConfig;
use micro_firehose::pipeline::FirehoseStream;
use micro_firehose::protocol::{Event, MessageKind, Subscription};
use micro_firehose::transport::ReaderTransport;
use serde_json::Value;
use std::io;
use std::time::Duration;
use tokio_util::codec::FramedWrite;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEADLINE: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Tally {
    tacos: usize,
    burritos: usize,
    enchiladas: usize,
}

impl Tally {
    fn count(&mut self, text: &str) {
        let words = text.split(|c: char| !c.is_alphanumeric()).map(str::to_lowercase).collect::<Vec<_>>();
        let mentions = |dish: &str| words.iter().any(|word| word == dish || word.strip_suffix('s') == Some(dish));

        if mentions("taco") {
            self.tacos += 1;
        }
        if mentions("burrito") {
            self.burritos += 1;
        }
        if mentions("enchilada") {
            self.enchiladas += 1;
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).with_writer(io::stderr).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // the text is piped out by hand, so nothing is mirrored onto `data`
    let config = StreamConfig::builder().compression(false).subscription(Subscription::disabled()).build();
    let mut stream = FirehoseStream::new(ReaderTransport::new(tokio::io::stdin()), &config);

    let cancel = stream.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(DEADLINE).await;
        info!(deadline = ?DEADLINE, "deadline reached, stop the stream");
        cancel.cancel();
    });

    let mut tally = Tally::default();
    let mut output = FramedWrite::new(tokio::io::stdout(), NdjsonEncoder::new());

    while let Some(event) = stream.next().await {
        match event {
            Event::Message { kind: MessageKind::Tweet, payload } => {
                let Some(text) = payload.get("text").and_then(Value::as_str) else {
                    warn!("skip tweet without text");
                    continue;
                };

                tally.count(text);
                output.send(text).await?;
            }
            Event::Error(e) => error!(cause = %e, "Uh oh"),
            _ => {}
        }
    }

    SinkExt::<&str>::flush(&mut output).await?;

    eprintln!();
    eprintln!("THE RESULTS");
    eprintln!("===========");
    eprintln!("Tacos: {}", tally.tacos);
    eprintln!("Burritos: {}", tally.burritos);
    eprintln!("Enchiladas: {}", tally.enchiladas);

    Ok(())
}
