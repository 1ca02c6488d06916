use std::env;

/// Process-wide configuration, loaded once at startup and passed by
/// reference into the services that need it. Never mutated after init.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Number of trailing characters of a device number kept in the
    /// fast-search index column.
    pub fast_search_chars: usize,
    /// Default cap for device lookup results.
    pub device_lookup_limit: usize,
}

const DEFAULT_FAST_SEARCH_CHARS: usize = 8;
const DEFAULT_DEVICE_LOOKUP_LIMIT: usize = 10;

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let fast_search_chars = match env::var("MDM_FAST_SEARCH_CHARS") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| format!("MDM_FAST_SEARCH_CHARS must be a positive integer, got '{raw}'"))?,
            Err(_) => DEFAULT_FAST_SEARCH_CHARS,
        };
        if fast_search_chars == 0 {
            return Err("MDM_FAST_SEARCH_CHARS must be greater than zero".to_string());
        }

        let device_lookup_limit = match env::var("MDM_DEVICE_LOOKUP_LIMIT") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| format!("MDM_DEVICE_LOOKUP_LIMIT must be a positive integer, got '{raw}'"))?,
            Err(_) => DEFAULT_DEVICE_LOOKUP_LIMIT,
        };

        Ok(ServerConfig {
            fast_search_chars,
            device_lookup_limit,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            fast_search_chars: DEFAULT_FAST_SEARCH_CHARS,
            device_lookup_limit: DEFAULT_DEVICE_LOOKUP_LIMIT,
        }
    }
}
