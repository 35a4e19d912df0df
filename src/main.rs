use chatstream::client::ChatClient;
use chatstream::config::ClientConfig;
use chatstream::session::ChatSession;
use chatstream::sink::FnSink;

use color_eyre::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so they never interleave with the streamed reply.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    println!("chatstream {} - {}", VERSION, config.chat_url());
    println!("Type a message and press Enter; Ctrl-D to exit.");

    let client = ChatClient::with_config(config);
    let mut session = ChatSession::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        // Print only the suffix the response grew by since the last render.
        let mut printed = 0usize;
        let mut sink = FnSink(|response: &str| {
            print!("{}", &response[printed..]);
            let _ = std::io::stdout().flush();
            printed = response.len();
        });

        match client.send_message(&mut session, text, &mut sink).await {
            Ok(_) => println!(),
            Err(e) => eprintln!("\nerror: {}", e),
        }
    }

    Ok(())
}
