use crate::Error;
use http::header::HeaderName;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU16;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListenerProtocol {
    Http,
    Https,
}

/// The public entry point a gateway listens on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub port: NonZeroU16,
    pub protocol: ListenerProtocol,
}

/// A fixed response returned without touching any backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// The terminal action a listener takes for a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    FixedResponse(FixedResponse),

    /// Forward, unmodified, to a target group by name.
    Forward(String),
}

/// Matches the exact presence of a header with an exact value.
///
/// Header names compare case-insensitively; values compare exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMatch {
    name: String,
    value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerRule {
    /// Lower priorities are evaluated first.
    pub priority: u32,
    pub condition: HeaderMatch,
    pub action: Action,
}

/// A public listener: ordered conditional rules over a deny-by-default
/// action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySpec {
    pub listener: Listener,
    pub rules: Vec<ListenerRule>,
    pub default_action: Action,
}

// === impl HeaderMatch ===

impl HeaderMatch {
    pub fn new(name: &str, value: impl ToString) -> Result<Self, Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::configuration("gateway-header", e))?;
        Ok(Self {
            name: name.as_str().to_string(),
            value: value.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, name: &str, value: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.value == value
    }
}

// === impl GatewaySpec ===

impl GatewaySpec {
    /// Resolves the action taken for a request carrying the given headers.
    ///
    /// Rules are evaluated in priority order and the first match wins; a
    /// request matching no rule receives the default action. This mirrors
    /// exactly what the provisioned listener enforces.
    pub fn evaluate(&self, headers: &[(&str, &str)]) -> &Action {
        let mut rules: Vec<&ListenerRule> = self.rules.iter().collect();
        rules.sort_by_key(|rule| rule.priority);

        for rule in rules {
            if headers
                .iter()
                .any(|(name, value)| rule.condition.matches(name, value))
            {
                return &rule.action;
            }
        }
        &self.default_action
    }

    /// Rules whose action forwards to a target group.
    pub fn forward_rules(&self) -> impl Iterator<Item = &ListenerRule> {
        self.rules
            .iter()
            .filter(|rule| matches!(rule.action, Action::Forward(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_compare_case_insensitively() {
        let m = HeaderMatch::new("X-ApiGateway-Token", "s3cret").unwrap();
        assert_eq!(m.name(), "x-apigateway-token");
        assert!(m.matches("X-ApiGateway-Token", "s3cret"));
        assert!(!m.matches("x-apigateway-token", "S3CRET"));
        assert!(!m.matches("x-other", "s3cret"));
    }

    #[test]
    fn invalid_header_name_is_a_configuration_error() {
        let err = HeaderMatch::new("not a header\n", "v").unwrap_err();
        assert!(matches!(err, Error::Configuration { ref entity, .. } if entity == "gateway-header"));
    }

    #[test]
    fn evaluation_honors_priority_order() {
        let spec = GatewaySpec {
            listener: Listener {
                port: 80.try_into().unwrap(),
                protocol: ListenerProtocol::Http,
            },
            rules: vec![
                ListenerRule {
                    priority: 10,
                    condition: HeaderMatch::new("x-token", "late").unwrap(),
                    action: Action::Forward("late-tg".to_string()),
                },
                ListenerRule {
                    priority: 1,
                    condition: HeaderMatch::new("x-token", "early").unwrap(),
                    action: Action::Forward("early-tg".to_string()),
                },
            ],
            default_action: Action::FixedResponse(FixedResponse {
                status: 403,
                content_type: "text/plain".to_string(),
                body: "denied".to_string(),
            }),
        };

        assert_eq!(
            spec.evaluate(&[("x-token", "early")]),
            &Action::Forward("early-tg".to_string()),
        );
        assert_eq!(
            spec.evaluate(&[("x-token", "late")]),
            &Action::Forward("late-tg".to_string()),
        );
        assert!(matches!(
            spec.evaluate(&[("x-token", "neither")]),
            Action::FixedResponse(_),
        ));
    }
}
