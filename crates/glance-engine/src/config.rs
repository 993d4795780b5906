use std::time::Duration;

use glance_core::TrackerConfig;

/// Engine configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Similarity threshold for a positive match, on the cosine scale.
    pub similarity_threshold: f32,
    /// Idle time after which an unreported track is evicted.
    pub idle_ttl: Duration,
    /// Streak increment per positively-matched frame.
    pub streak_step: u32,
    /// Streak value at which login is confirmed.
    pub login_streak: u32,
    /// Soft timeout for one frame's extraction pass. Generous because
    /// embedding inference can stall.
    pub frame_timeout: Duration,
    /// Expected embedding length from the external model.
    pub embedding_dim: usize,
    /// Output surface size for bounding-box scaling (width, height).
    pub screen_size: (u32, u32),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            idle_ttl: Duration::from_millis(1000),
            streak_step: 2,
            login_streak: 10,
            frame_timeout: Duration::from_secs(15),
            embedding_dim: 192,
            screen_size: (1080, 1920),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `GLANCE_*` environment variables,
    /// falling back to the canonical policy values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            similarity_threshold: env_f32(
                "GLANCE_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            ),
            idle_ttl: Duration::from_millis(env_u64(
                "GLANCE_IDLE_TTL_MS",
                defaults.idle_ttl.as_millis() as u64,
            )),
            streak_step: env_u32("GLANCE_STREAK_STEP", defaults.streak_step),
            login_streak: env_u32("GLANCE_LOGIN_STREAK", defaults.login_streak),
            frame_timeout: Duration::from_secs(env_u64(
                "GLANCE_FRAME_TIMEOUT_SECS",
                defaults.frame_timeout.as_secs(),
            )),
            embedding_dim: env_usize("GLANCE_EMBEDDING_DIM", defaults.embedding_dim),
            screen_size: (
                env_u32("GLANCE_SCREEN_WIDTH", defaults.screen_size.0),
                env_u32("GLANCE_SCREEN_HEIGHT", defaults.screen_size.1),
            ),
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            similarity_threshold: self.similarity_threshold,
            streak_step: self.streak_step,
            idle_ttl: self.idle_ttl,
            login_streak: self.login_streak,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_canonical_policy() {
        let config = EngineConfig::default();
        assert_eq!(config.similarity_threshold, 0.8);
        assert_eq!(config.idle_ttl, Duration::from_millis(1000));
        assert_eq!(config.streak_step, 2);
        assert_eq!(config.login_streak, 10);
        assert_eq!(config.embedding_dim, 192);
    }

    #[test]
    fn test_tracker_config_conversion() {
        let config = EngineConfig::default();
        let tc = config.tracker_config();
        assert_eq!(tc.idle_ttl, config.idle_ttl);
        assert_eq!(tc.login_streak, config.login_streak);
    }
}
