use std::env;
use std::net::SocketAddr;
use std::process;

use getopts::Options;
use tokio::time::Duration;

const JUHE_API_KEY: &str = "JUHE_API_KEY";
const JUHE_BASE_URL: &str = "JUHE_BASE_URL";

#[derive(Debug)]
pub struct Args {
    pub address: SocketAddr,
    pub enable_cache: bool,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub window_days: u32,
    pub almanac_days: u32,
    pub almanac_timeout: Duration,
    pub juhe_api_key: String,
    pub juhe_base_url: Option<String>,
}

#[derive(Debug)]
enum Parsed {
    Run(Args),
    Help(String),
    Version,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optflag("V", "version", "Print version information");
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optflag(
        "n",
        "no-cache",
        "Rebuild calendars on every request instead of caching them",
    );
    opts.optopt(
        "t",
        "cache-ttl",
        "Time-to-live for cached calendars [Default: 21600]",
        "SECONDS",
    );
    opts.optopt(
        "r",
        "refresh-interval",
        "Interval at which all cached calendars are dropped [Default: 3600]",
        "SECONDS",
    );
    opts.optopt(
        "w",
        "window-days",
        "Days ahead published by rule-based calendars [Default: 730]",
        "DAYS",
    );
    opts.optopt(
        "d",
        "almanac-days",
        "Days ahead fetched for the almanac calendar [Default: 30]",
        "DAYS",
    );
    opts.optopt(
        "",
        "almanac-timeout",
        "Timeout for a single almanac request [Default: 10]",
        "SECONDS",
    );
    opts
}

/// Version banner; commit, branch and build time are stamped in by the
/// build environment when available.
fn version() -> String {
    let rows = [
        ("Version", env!("CARGO_PKG_VERSION")),
        ("Commit", option_env!("GIT_COMMIT").unwrap_or("unknown")),
        ("Branch", option_env!("GIT_BRANCH").unwrap_or("unknown")),
        ("BuildTime", option_env!("BUILD_TIME").unwrap_or("unknown")),
    ];

    rows.iter()
        .map(|(label, value)| format!("{:<11}{value}", format!("{label}:")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn positive<T: PartialOrd + Default>(name: &str, value: T) -> Result<T, String> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(format!("Provided value for option '{name}' must be positive"))
    }
}

fn try_parse(args: Vec<String>) -> Result<Parsed, String> {
    let opts = opts();
    let matches = opts.parse(args).map_err(|fail| fail.to_string())?;

    if matches.opt_present("help") {
        return Ok(Parsed::Help(
            opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))),
        ));
    }

    if matches.opt_present("version") {
        return Ok(Parsed::Version);
    }

    let address = matches
        .opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
        .map_err(|err| format!("Provided value for option 'address' is invalid: {err}"))?;

    let enable_cache = !matches.opt_present("no-cache");

    let secs = |name: &str, default: u64| -> Result<Duration, String> {
        let value = matches
            .opt_get_default(name, default)
            .map_err(|err| format!("Provided value for option '{name}' is invalid: {err}"))?;
        positive(name, value).map(Duration::from_secs)
    };

    let cache_ttl = secs("cache-ttl", 6 * 60 * 60)?;
    let refresh_interval = secs("refresh-interval", 60 * 60)?;
    let almanac_timeout = secs("almanac-timeout", 10)?;

    let days = |name: &str, default: u32| -> Result<u32, String> {
        let value = matches
            .opt_get_default(name, default)
            .map_err(|err| format!("Provided value for option '{name}' is invalid: {err}"))?;
        positive(name, value)
    };

    let window_days = days("window-days", 730)?;
    let almanac_days = days("almanac-days", 30)?;

    Ok(Parsed::Run(Args {
        address,
        enable_cache,
        cache_ttl,
        refresh_interval,
        window_days,
        almanac_days,
        almanac_timeout,
        juhe_api_key: String::new(),
        juhe_base_url: None,
    }))
}

pub fn parse(args: Vec<String>) -> Args {
    match try_parse(args) {
        Ok(Parsed::Run(mut args)) => {
            args.juhe_api_key = env::var(JUHE_API_KEY).unwrap_or_default();
            args.juhe_base_url = env::var(JUHE_BASE_URL).ok();
            args
        }
        Ok(Parsed::Help(usage)) => {
            println!("{usage}");
            process::exit(0);
        }
        Ok(Parsed::Version) => {
            println!("{}", version());
            process::exit(0);
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
