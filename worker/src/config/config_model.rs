#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub internal_api: InternalApi,
    pub sweeps: Sweeps,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct InternalApi {
    /// Internal trigger endpoints answer 503 while unset.
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Sweeps {
    pub subscription_interval_secs: u64,
    pub deletion_interval_secs: u64,
    pub delete_buffer_days: u32,
    pub erasure_statement_timeout_secs: u64,
}
