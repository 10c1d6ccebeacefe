//! radiohttp CLI: fetch or stream an HTTP audio resource from the terminal

use std::fs::File;
use std::io::{self, SeekFrom, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::Receiver;
use tracing_subscriber::EnvFilter;

use radiohttp::config::network::{CONNECT_TIMEOUT_SECS, IO_TIMEOUT_SECS};
use radiohttp::{HttpSession, HttpcError, ProxyConfig, SessionConfig, StreamMetadata};

const COPY_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Parser)]
#[command(name = "radiohttp", about = "Fetch or stream an HTTP audio resource", version)]
struct Cli {
    /// Resource URL (http:// only)
    url: String,

    /// Route requests through an HTTP proxy
    #[arg(long, value_name = "HOST:PORT")]
    proxy: Option<String>,

    /// Comma-separated domains that bypass the proxy
    #[arg(long, value_name = "LIST")]
    no_proxy: Option<String>,

    /// Connect timeout in seconds
    #[arg(long, value_name = "S", default_value_t = CONNECT_TIMEOUT_SECS)]
    connect_timeout: u64,

    /// Read/write timeout in seconds
    #[arg(long, value_name = "S", default_value_t = IO_TIMEOUT_SECS)]
    timeout: u64,

    /// Resume from this byte offset
    #[arg(long, value_name = "BYTES", default_value_t = 0)]
    start: u64,

    /// Seek after opening; negative values count from the end
    #[arg(long, value_name = "OFFSET", allow_hyphen_values = true)]
    seek: Option<i64>,

    /// Stop after copying this many bytes
    #[arg(long, value_name = "N")]
    max_bytes: Option<u64>,

    /// Write the body here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(exit_code(&e));
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "radiohttp=debug",
        _ => "radiohttp=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Result codes are negative; the process exits with their magnitude.
fn exit_code(err: &HttpcError) -> i32 {
    err.code().saturating_neg()
}

fn session_config(cli: &Cli) -> Result<SessionConfig, HttpcError> {
    let mut config = SessionConfig::default().with_timeouts(
        Duration::from_secs(cli.connect_timeout),
        Duration::from_secs(cli.timeout),
    );
    if let Some(proxy) = &cli.proxy {
        let (host, port) = parse_host_port(proxy)
            .ok_or_else(|| HttpcError::Url(format!("invalid proxy address {proxy:?}")))?;
        let mut proxy = ProxyConfig::new(host, port);
        if let Some(list) = &cli.no_proxy {
            proxy = proxy.with_no_proxy(list);
        }
        config = config.with_proxy(proxy);
    }
    Ok(config)
}

fn parse_host_port(s: &str) -> Option<(&str, u16)> {
    let (host, port) = s.rsplit_once(':')?;
    let port = port.parse().ok().filter(|&p| p != 0)?;
    (!host.is_empty()).then_some((host, port))
}

fn run(cli: &Cli) -> Result<(), HttpcError> {
    let config = session_config(cli)?;
    let (tx, rx) = crossbeam_channel::unbounded();

    let mut session = HttpSession::builder(config)
        .metadata_sink(tx)
        .start_at(cli.start)
        .open(&cli.url)?;

    eprintln!("{}", session.headers().describe());
    eprintln!("Mode: {}", session.mode());
    if session.effective_url().absolute() != session.origin_url() {
        eprintln!("Serving URL: {}", session.effective_url());
    }
    if let Some(hint) = session.format_hint() {
        eprintln!("Format: {hint}");
    }

    if let Some(offset) = cli.seek {
        let pos = if offset < 0 {
            SeekFrom::End(offset)
        } else {
            SeekFrom::Start(offset as u64)
        };
        match session.seek(pos) {
            Some(at) => eprintln!("Seeked to byte {at}"),
            None => eprintln!("Resource is not seekable, ignoring --seek"),
        }
    }

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path).map_err(HttpcError::Io)?),
        None => Box::new(io::stdout().lock()),
    };

    let copied = copy_body(&mut session, &mut out, cli.max_bytes, &rx)?;
    out.flush().map_err(HttpcError::Io)?;
    print_metadata(&rx);
    session.close();

    tracing::info!("copied {copied} bytes");
    Ok(())
}

fn copy_body(
    session: &mut HttpSession,
    out: &mut dyn Write,
    max_bytes: Option<u64>,
    metadata: &Receiver<StreamMetadata>,
) -> Result<u64, HttpcError> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        print_metadata(metadata);

        let want = match max_bytes {
            Some(max) if copied >= max => break,
            Some(max) => (max - copied).min(buf.len() as u64) as usize,
            None => buf.len(),
        };
        let n = session.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(HttpcError::Io)?;
        copied += n as u64;
    }
    Ok(copied)
}

fn print_metadata(rx: &Receiver<StreamMetadata>) {
    for event in rx.try_iter() {
        if event.is_empty() {
            continue;
        }
        match event.stream_title() {
            Some(title) => eprintln!("Now playing: {title}"),
            None => {
                for field in &event.fields {
                    eprintln!("{:?} {}: {}", event.source, field.key, field.value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_port_parsing() {
        assert_eq!(parse_host_port("proxy.lan:3128"), Some(("proxy.lan", 3128)));
        assert_eq!(parse_host_port("proxy.lan"), None);
        assert_eq!(parse_host_port(":3128"), None);
        assert_eq!(parse_host_port("proxy.lan:0"), None);
        assert_eq!(parse_host_port("proxy.lan:http"), None);
    }

    #[test]
    fn exit_codes_are_positive() {
        assert_eq!(exit_code(&HttpcError::Url("x".into())), 1);
        assert_eq!(exit_code(&HttpcError::Closed), 6);
    }

    #[test]
    fn cli_arguments() {
        let cli = Cli::parse_from([
            "radiohttp",
            "http://example.com/a.mp3",
            "--proxy",
            "proxy.lan:3128",
            "--no-proxy",
            "intranet, local",
            "--seek",
            "-100",
            "-vv",
        ]);
        assert_eq!(cli.seek, Some(-100));
        assert_eq!(cli.verbose, 2);
        let config = session_config(&cli).unwrap();
        let proxy = config.proxy.unwrap();
        assert_eq!(proxy.host, "proxy.lan");
        assert_eq!(proxy.no_proxy, vec!["intranet", "local"]);
    }
}
