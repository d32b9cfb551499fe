use std::io;
use std::process::ExitCode;
use std::sync::mpsc;

use echo_ping::{resolve, GenericError, Outcome, PingError, RawSocket, Session, SessionConfig, SystemClock};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(argh::FromArgs)]
/// echo-ping - send ICMP ECHO_REQUEST packets to an IPv4 host
struct Args {
    #[argh(switch, short = 'v')]
    /// verbose output
    verbose: bool,

    #[argh(positional)]
    /// host name or IPv4 address
    host: String,

    #[argh(positional)]
    /// data size (default: 56) then packet count (default: unlimited), as `[datalen] [npackets]`
    sizes: Vec<usize>,
}

impl Args {
    fn session_config(&self) -> Result<SessionConfig, String> {
        let mut config = SessionConfig::default();
        match self.sizes[..] {
            [] => {}
            [datalen] => config.datalen = datalen,
            [datalen, npackets] => {
                config.datalen = datalen;
                let npackets = u32::try_from(npackets).map_err(|_| format!("npackets too large: {npackets}"))?;
                // Zero means unlimited.
                config.count = (npackets > 0).then_some(npackets);
            }
            _ => return Err("too many arguments, expected: [-v] host [datalen] [npackets]".to_string()),
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_writer(io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("echo-ping: could not install log subscriber: {e}");
    }

    let config = match args.session_config() {
        Ok(config) => config,
        Err(usage) => {
            eprintln!("echo-ping: {usage}");
            return ExitCode::FAILURE;
        }
    };

    match ping(&args.host, config) {
        Ok(Outcome::Finished(report)) => {
            tracing::debug!("finished: {:?}", report.summary);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Interrupted) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("echo-ping: {e}");
            ExitCode::FAILURE
        }
    }
}

fn ping(host: &str, config: SessionConfig) -> Result<Outcome, GenericError> {
    let target = resolve(host)?;
    config.packet_size()?;

    let socket = RawSocket::new(config.timeout).map_err(|e| {
        PingError::Io(io::Error::new(e.kind(), format!("failed to create raw socket (try running as root): {e}")))
    })?;

    let (halt_tx, halt_rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = halt_tx.send(());
    })?;

    let mut session = Session::new(config, target, socket, SystemClock, io::stdout().lock())?;
    Ok(session.run(&halt_rx)?)
}
