use crate::cli::actions::Action;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        allowed_origins: matches
            .get_many::<String>("allowed-origins")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        window_seconds: matches
            .get_one::<u64>("window-seconds")
            .copied()
            .unwrap_or(300),
        attempt_limit: matches
            .get_one::<i64>("attempt-limit")
            .copied()
            .unwrap_or(5),
    })
}
