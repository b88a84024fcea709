pub mod session {

    pub const USER_ID_KEY: &str = "user_id";

    pub const PIPELINE_KEY: &str = "pipeline";
}

pub mod limits {

    /// Upper bound for an uploaded sequence document, in bytes.
    pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

    pub const DEFAULT_SEQUENCE_LIMIT: u64 = 50;

    pub const DEFAULT_TERM_THRESHOLD: f64 = 0.0;
}
