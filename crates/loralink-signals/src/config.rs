/// Controls how signal database files are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Maximum bytes read from a database file.
    pub max_file_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_file_size: 4 * 1024 * 1024,
        }
    }
}
