//! Bundle validation.
//!
//! This module checks a stack's bundle before anything is planned, so that
//! malformed names, ports and images surface as configuration errors rather
//! than as failed control-plane calls halfway through an apply.

use crate::error::{ConfigError, Result, WhaleprintError};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{BundlePort, BundleService, Stack};

/// Longest fully-qualified service name the control plane accepts.
const MAX_SERVICE_NAME_LEN: usize = 63;

/// Protocols a port may declare.
const KNOWN_PROTOCOLS: &[&str] = &["", "tcp", "udp"];

/// Validator for bundles.
#[derive(Debug, Default)]
pub struct BundleValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl BundleValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a stack, failing on the first error.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self, stack: &Stack) -> Result<ValidationResult> {
        let result = self.check(stack);

        if result.errors.is_empty() {
            debug!("Bundle validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(WhaleprintError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every error and warning for a stack.
    #[must_use]
    pub fn check(&self, stack: &Stack) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !is_valid_name(&stack.name) {
            result.errors.push(ValidationError {
                field: String::from("stack"),
                message: format!(
                    "Stack name '{}' is invalid. Must start with a letter or digit and \
                     contain only letters, digits, '_', '.' or '-'.",
                    stack.name
                ),
            });
        }

        if stack.bundle.services.is_empty() {
            result.warnings.push(String::from("No services defined in bundle"));
        }

        let mut published = HashSet::new();
        for (name, service) in &stack.bundle.services {
            let prefix = format!("Services.{name}");

            if !is_valid_name(name) {
                result.errors.push(ValidationError {
                    field: prefix.clone(),
                    message: format!("Service name '{name}' is invalid"),
                });
            }

            let full = stack.name.len() + 1 + name.len();
            if full > MAX_SERVICE_NAME_LEN {
                result.errors.push(ValidationError {
                    field: prefix.clone(),
                    message: format!(
                        "Service name '{}_{name}' is {full} characters; \
                         the limit is {MAX_SERVICE_NAME_LEN}",
                        stack.name
                    ),
                });
            }

            Self::validate_image(service, &prefix, &mut result);
            Self::validate_ports(&service.ports, &prefix, &mut published, &mut result);
            Self::validate_networks(service, &prefix, &mut result);
        }

        result
    }

    fn validate_image(service: &BundleService, prefix: &str, result: &mut ValidationResult) {
        if service.image.is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.Image"),
                message: String::from("Container image cannot be empty"),
            });
        } else if service.image.ends_with(":latest") {
            result.warnings.push(format!(
                "{prefix}.Image: Using ':latest' tag makes plans non-reproducible"
            ));
        }
    }

    /// Validates port configurations.
    fn validate_ports(
        ports: &[BundlePort],
        prefix: &str,
        published: &mut HashSet<u32>,
        result: &mut ValidationResult,
    ) {
        let mut seen = HashSet::new();

        for (i, port) in ports.iter().enumerate() {
            let field = format!("{prefix}.Ports[{i}]");

            if port.port == 0 || port.port > u32::from(u16::MAX) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!("Port {} is out of range (1-65535)", port.port),
                });
            }

            if !KNOWN_PROTOCOLS.contains(&port.protocol.as_str()) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!("Unknown protocol '{}'", port.protocol),
                });
            }

            let protocol = if port.protocol.is_empty() { "tcp" } else { port.protocol.as_str() };
            if !seen.insert((port.port, protocol)) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!("Duplicate port {}/{protocol}", port.port),
                });
            }

            if let Some(p) = port.published_port
                && !published.insert(p)
            {
                result.errors.push(ValidationError {
                    field,
                    message: format!("Published port {p} is used by more than one service"),
                });
            }
        }
    }

    fn validate_networks(service: &BundleService, prefix: &str, result: &mut ValidationResult) {
        let mut seen = HashSet::new();
        for (i, network) in service.networks.iter().enumerate() {
            if !is_valid_name(network) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.Networks[{i}]"),
                    message: format!("Network name '{network}' is invalid"),
                });
            }
            if !seen.insert(network) {
                result
                    .warnings
                    .push(format!("{prefix}.Networks[{i}]: '{network}' is listed twice"));
            }
        }
    }
}

/// Validates that a name is usable as a stack, service or network name.
/// Names start with an ASCII letter or digit and continue with letters,
/// digits, `_`, `.` or `-`.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphanumeric() {
        return false;
    }

    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::Bundlefile;

    fn stack(services: Vec<(&str, BundleService)>) -> Stack {
        let mut bundle = Bundlefile::new();
        for (name, service) in services {
            bundle.services.insert(name.to_string(), service);
        }
        Stack {
            name: String::from("app"),
            bundle,
        }
    }

    fn service(image: &str) -> BundleService {
        BundleService {
            image: image.to_string(),
            ..BundleService::default()
        }
    }

    fn port(port: u32, protocol: &str) -> BundlePort {
        BundlePort {
            protocol: protocol.to_string(),
            port,
            published_port: None,
        }
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("web"));
        assert!(is_valid_name("my_stack.v2"));
        assert!(is_valid_name("1st-service"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("-web"));
        assert!(!is_valid_name("web service"));
        assert!(!is_valid_name("web/api"));
    }

    #[test]
    fn test_valid_bundle_passes() {
        let mut web = service("nginx:1.11");
        web.ports = vec![port(80, "tcp"), port(53, "udp"), port(53, "")];
        web.networks = vec![String::from("front")];

        let result = BundleValidator::new().validate(&stack(vec![("web", web)])).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_empty_image_is_an_error() {
        let result = BundleValidator::new().check(&stack(vec![("web", service(""))]));

        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "Services.web.Image");
    }

    #[test]
    fn test_port_checks() {
        let mut web = service("nginx");
        web.ports = vec![
            port(0, "tcp"),
            port(70000, "tcp"),
            port(80, "sctp"),
            port(8080, ""),
            port(8080, "tcp"),
        ];

        let result = BundleValidator::new().check(&stack(vec![("web", web)]));
        let messages: Vec<&str> = result.errors.iter().map(|e| e.message.as_str()).collect();

        assert_eq!(
            messages,
            [
                "Port 0 is out of range (1-65535)",
                "Port 70000 is out of range (1-65535)",
                "Unknown protocol 'sctp'",
                "Duplicate port 8080/tcp",
            ]
        );
    }

    #[test]
    fn test_published_port_collision_across_services() {
        let mut a = service("a");
        a.ports = vec![BundlePort {
            published_port: Some(30000),
            ..port(80, "tcp")
        }];
        let b = BundleService {
            image: String::from("b"),
            ports: a.ports.clone(),
            ..BundleService::default()
        };

        let result = BundleValidator::new().check(&stack(vec![("a", a), ("b", b)]));
        assert_eq!(result.error_count(), 1);
        assert!(result.errors[0].message.contains("30000"));
    }

    #[test]
    fn test_empty_bundle_warns() {
        let result = BundleValidator::new().validate(&stack(vec![])).unwrap();
        assert_eq!(result.warnings, ["No services defined in bundle"]);
    }

    #[test]
    fn test_validate_fails_with_first_error() {
        let err = BundleValidator::new()
            .validate(&stack(vec![("bad name", service("x"))]))
            .unwrap_err();

        assert!(matches!(
            err,
            WhaleprintError::Config(ConfigError::ValidationError { field: Some(ref f), .. })
                if f == "Services.bad name"
        ));
    }
}
