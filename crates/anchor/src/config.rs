use pagemark_resolve::ResolverConfig;
use pagemark_selector::GeneratorConfig;
use std::time::Duration;

pub const DEFAULT_CREATION_GRACE: Duration = Duration::from_secs(2);
pub const DEFAULT_ANCHOR_TEXT_LEN: usize = 100;

/// Tuning for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fuzzy resolution tuning, forwarded to the embedded resolver.
    pub resolver: ResolverConfig,
    /// Selector generation tuning, used on note creation and manual reanchor.
    pub generator: GeneratorConfig,
    /// Window after a record is created in this session during which a failed
    /// re-resolution leaves it Pending (awaiting the next mutation batch)
    /// instead of running fuzzy matching. Zero disables the window. Records
    /// loaded from persistence never get one.
    pub creation_grace: Duration,
    /// Snapshot length for remembered anchor text, in characters.
    pub anchor_text_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            generator: GeneratorConfig::default(),
            creation_grace: DEFAULT_CREATION_GRACE,
            anchor_text_len: DEFAULT_ANCHOR_TEXT_LEN,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.resolver.validate()?;
        self.generator.validate()?;
        if self.anchor_text_len == 0 {
            return Err("anchor_text_len must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_snapshot_length_rejected() {
        let config = EngineConfig {
            anchor_text_len: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_grace_is_allowed() {
        let config = EngineConfig {
            creation_grace: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_config_errors_propagate() {
        let mut config = EngineConfig::default();
        config.resolver.min_accept_score = 101;
        assert!(config.validate().is_err());
    }
}
