use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Frame-loop rate for every room.
    pub tick_rate_hz: u32,
    /// Inactivity window after which a room is torn down. Renewed whenever
    /// the room accepts a shot.
    pub room_lease: Duration,
    /// Fixed seed for rack order and turn assignment; `None` seeds from
    /// entropy.
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            tick_rate_hz: 20,
            room_lease: Duration::from_secs(30 * 60),
            rng_seed: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tick_rate_hz must be positive")]
    ZeroTickRate,
    #[error("room_lease must be positive")]
    ZeroLease,
    #[error("listen_addr must not be empty")]
    EmptyListenAddr,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.room_lease.is_zero() {
            return Err(ConfigError::ZeroLease);
        }
        if self.listen_addr.is_empty() {
            return Err(ConfigError::EmptyListenAddr);
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }
}
