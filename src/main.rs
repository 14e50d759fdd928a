use mysh::Interpreter;
use mysh::config::{self, LOG_ENV};
use mysh::line_source;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.first().map(String::as_str).unwrap_or("mysh");
    let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();

    let config = config::parse_args(command, &rest)?;
    tracing::debug!(?config, "starting");

    let mut source = line_source::open(&config)?;
    Interpreter::default().run(&mut *source)
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
