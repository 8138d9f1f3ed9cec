pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        allowed_origins: Vec<String>,
        window_seconds: u64,
        attempt_limit: i64,
    },
}
