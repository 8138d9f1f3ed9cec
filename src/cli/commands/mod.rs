use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("pordisto")
        .about("Login gate and admin verification for a restaurant back-office")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PORDISTO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Connection string for the attempt counter database")
                .env("PORDISTO_DSN")
                .required(true),
        )
        .arg(
            Arg::new("provider-url")
                .long("provider-url")
                .help("Base URL of the identity provider, example: https://auth.example.com")
                .env("PORDISTO_PROVIDER_URL")
                .required(true),
        )
        .arg(
            Arg::new("provider-key")
                .long("provider-key")
                .help("Service key used to call the identity provider")
                .env("PORDISTO_PROVIDER_KEY")
                .required(true),
        )
        .arg(
            Arg::new("allowed-origins")
                .long("allowed-origins")
                .help("Comma separated list of origins allowed for CORS, first entry is the fallback")
                .env("PORDISTO_ALLOWED_ORIGINS")
                .default_value("https://stellina-ristorante.de,http://localhost:5173")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("window-seconds")
                .long("window-seconds")
                .help("Length of the failed-attempt window in seconds")
                .default_value("300")
                .env("PORDISTO_WINDOW_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("attempt-limit")
                .long("attempt-limit")
                .help("Login attempts allowed per client and account within one window")
                .default_value("5")
                .env("PORDISTO_ATTEMPT_LIMIT")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PORDISTO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
