use clap::Parser;
use log::{error, info, LevelFilter, Metadata, Record};
use rconsole::{Client, TcpTransport};
use std::{error::Error, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

/// Run commands on a Source engine server over rcon.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Server address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server rcon port
    #[arg(short, long, default_value_t = 27015)]
    port: u16,

    /// Rcon password
    #[arg(long, env = "RCON_PASSWORD", hide_env_values = true)]
    password: String,

    /// Give up on connect, send or receive after this many seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// More output, repeat for more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command to run. Without one, commands are read from stdin, one per line.
    command: Vec<String>,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level(args.verbose)));

    let mut transport = TcpTransport::new();
    if let Some(secs) = args.timeout {
        transport = transport.with_timeout(Duration::from_secs(secs));
    }
    let client = Client::new(transport);

    client.connect(&args.host, args.port).await?;
    info!("connected to {}:{}", args.host, args.port);

    if !client.authenticate(&args.password).await? {
        error!("server rejected the rcon password");
        client.close().await?;
        return Err("authentication failed".into());
    }

    let result = if args.command.is_empty() {
        run_stdin(&client).await
    } else {
        run_one(&client, &args.command.join(" ")).await
    };

    client.close().await?;
    info!("bye");
    result
}

async fn run_one(client: &Client, command: &str) -> Result<(), Box<dyn Error>> {
    let output = client.execute_command(command).await?;
    print!("{}", output);
    if !output.is_empty() && !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

async fn run_stdin(client: &Client) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        run_one(client, command).await?;
    }
    Ok(())
}
