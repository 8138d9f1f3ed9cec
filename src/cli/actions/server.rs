use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::pordisto::{self, state::GateConfig};
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            allowed_origins,
            window_seconds,
            attempt_limit,
        } => {
            let config = GateConfig::new(allowed_origins)
                .with_window_seconds(window_seconds)
                .with_attempt_limit(attempt_limit);

            pordisto::new(port, dsn, globals, config).await?;
        }
    }

    Ok(())
}
