use serde::{Deserialize, Serialize};

/// Scan bounds for the function-block heuristic. Every scan is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Max lines scanned backward for a signature, and forward while balancing braces
    pub window: usize,

    /// Half-width of the snippet when no signature is found
    pub fallback_radius: usize,

    /// Max lines scanned after the signature for the opening brace
    pub brace_search_lines: usize,

    /// Half-width of the snippet when the signature has no opening brace
    pub signature_radius: usize,

    /// Max lines past the opening brace when braces never balance
    pub max_body_lines: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            window: 400,
            fallback_radius: 40,
            brace_search_lines: 20,
            signature_radius: 10,
            max_body_lines: 200,
        }
    }
}

impl ExtractorConfig {
    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.window == 0 {
            return Err("window must be > 0".to_string());
        }
        if self.brace_search_lines == 0 {
            return Err("brace_search_lines must be > 0".to_string());
        }
        if self.max_body_lines == 0 {
            return Err("max_body_lines must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_bounds_rejected() {
        assert!(ExtractorConfig::default().with_window(0).validate().is_err());
        let config = ExtractorConfig {
            max_body_lines: 0,
            ..ExtractorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
