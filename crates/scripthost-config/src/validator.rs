//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_kv(config, &mut result);
        Self::validate_event(config, &mut result);
        Self::validate_websocket(config, &mut result);
        Self::validate_invocation(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_kv(config: &Config, result: &mut ValidationResult) {
        let kv = &config.kv;
        if kv.default_list_limit == 0 {
            result.add_error(ValidationError::new(
                "kv.default_list_limit",
                "default_list_limit must be greater than 0",
            ));
        }

        if kv.max_list_limit == 0 {
            result.add_error(ValidationError::new(
                "kv.max_list_limit",
                "max_list_limit must be greater than 0",
            ));
        }

        if kv.default_list_limit > kv.max_list_limit {
            result.add_error(ValidationError::new(
                "kv.default_list_limit",
                format!(
                    "default_list_limit ({}) exceeds max_list_limit ({})",
                    kv.default_list_limit, kv.max_list_limit
                ),
            ));
        }

        if kv.sweep_interval_secs == 0 {
            result.add_warning(ValidationWarning::new(
                "kv.sweep_interval_secs",
                "Expired entries are only reclaimed lazily when the sweep is disabled",
            ));
        }
    }

    fn validate_event(config: &Config, result: &mut ValidationResult) {
        if config.event.retention == 0 {
            result.add_error(ValidationError::new(
                "event.retention",
                "retention must be greater than 0",
            ));
        }

        if config.event.subscriber_backlog == 0 {
            result.add_error(ValidationError::new(
                "event.subscriber_backlog",
                "subscriber_backlog must be greater than 0",
            ));
        }

        if config.event.max_topics == 0 {
            result.add_error(ValidationError::new(
                "event.max_topics",
                "max_topics must be greater than 0",
            ));
        }

        if config.event.max_consumers_per_topic == 0 {
            result.add_error(ValidationError::new(
                "event.max_consumers_per_topic",
                "max_consumers_per_topic must be greater than 0",
            ));
        }
    }

    fn validate_websocket(config: &Config, result: &mut ValidationResult) {
        let ws = &config.websocket;
        if ws.ping_interval_secs == 0 {
            result.add_warning(ValidationWarning::new(
                "websocket.ping_interval_secs",
                "Keep-alive pings are disabled, dead peers are only noticed on read",
            ));
        } else if ws.ping_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "websocket.ping_timeout_secs",
                "ping_timeout_secs must be greater than 0 when pings are enabled",
            ));
        }

        if ws.max_frame_bytes == 0 {
            result.add_error(ValidationError::new(
                "websocket.max_frame_bytes",
                "max_frame_bytes must be greater than 0",
            ));
        }
    }

    fn validate_invocation(config: &Config, result: &mut ValidationResult) {
        if config.invocation.http_timeout().is_none() {
            result.add_warning(ValidationWarning::new(
                "invocation.http_timeout_secs",
                "HTTP invocations run without a deadline",
            ));
        }

        if config.invocation.commit.trim().is_empty() {
            result.add_error(ValidationError::new(
                "invocation.commit",
                "commit cannot be empty",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "level cannot be empty",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
