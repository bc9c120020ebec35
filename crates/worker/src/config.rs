/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Seconds between claim-queue polls (default: `1`).
    pub poll_interval_secs: u64,
    /// Batches in flight at once within one stage (default: `4`).
    pub batch_parallelism: usize,
    /// Whether the optional CMS pages stage runs (default: `false`).
    pub include_cms_pages: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default |
    /// |---------------------|---------|
    /// | `POLL_INTERVAL_SECS`| `1`     |
    /// | `BATCH_PARALLELISM` | `4`     |
    /// | `INCLUDE_CMS_PAGES` | `false` |
    pub fn from_env() -> Self {
        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let batch_parallelism: usize = std::env::var("BATCH_PARALLELISM")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("BATCH_PARALLELISM must be a valid usize");

        let include_cms_pages = std::env::var("INCLUDE_CMS_PAGES")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            poll_interval_secs,
            batch_parallelism,
            include_cms_pages,
        }
    }
}
