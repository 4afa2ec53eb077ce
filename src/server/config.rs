use super::RequestsLoggingLevel;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Feed page size when the request does not ask for one.
    pub default_page_size: usize,
    /// Larger requested page sizes are clamped down to this.
    pub max_page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3002,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}
