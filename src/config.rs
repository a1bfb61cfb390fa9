/// Silence allowed between two received bytes before retry/timeout kicks in
pub const DEFAULT_BYTE_TIMEOUT_MS: u32 = 20;
pub const DEFAULT_CARRIER_DUTY_PERCENT: u8 = 50;
/// Recommended retransmission count for requests expecting a reply
pub const DEFAULT_RETRANSMISSIONS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub byte_timeout_ms: u32,
    /// Clamped to 100
    pub carrier_duty_percent: u8,
}

impl LinkConfig {
    pub const fn new() -> LinkConfig {
        LinkConfig {
            byte_timeout_ms: DEFAULT_BYTE_TIMEOUT_MS,
            carrier_duty_percent: DEFAULT_CARRIER_DUTY_PERCENT,
        }
    }

    pub const fn with_byte_timeout_ms(mut self, ms: u32) -> LinkConfig {
        self.byte_timeout_ms = ms;
        self
    }

    pub const fn with_carrier_duty_percent(mut self, percent: u8) -> LinkConfig {
        self.carrier_duty_percent = if percent > 100 { 100 } else { percent };
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.byte_timeout_ms, 20);
        assert_eq!(config.carrier_duty_percent, 50);
    }

    #[test]
    fn builders() {
        let config = LinkConfig::new()
            .with_byte_timeout_ms(100)
            .with_carrier_duty_percent(180);
        assert_eq!(config.byte_timeout_ms, 100);
        assert_eq!(config.carrier_duty_percent, 100);
    }
}
