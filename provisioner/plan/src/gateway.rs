use std::num::NonZeroU16;
use vidsite_provisioner_core::{
    gateway::{
        Action, FixedResponse, GatewaySpec, HeaderMatch, Listener, ListenerProtocol, ListenerRule,
    },
    target::TargetGroup,
    Result,
};

pub const DENY_STATUS: u16 = 403;
pub const DENY_BODY: &str = "Acesso Direto Negado. Use o API Gateway.";

/// Priority of the shared-secret forwarding rule. Any rule added later must
/// use a higher number so the access-control boundary is evaluated first.
pub const FORWARD_RULE_PRIORITY: u32 = 1;

/// Configures the public listener that gates all ingress to the backend.
///
/// The default action denies every request with a fixed 403; the single rule
/// forwards requests carrying the shared-secret header, unmodified, to the
/// backend target group. Together with the security-group chain this makes
/// the API gateway the only viable path to the workload.
pub fn configure(
    listener_port: NonZeroU16,
    backend: &TargetGroup,
    header_name: &str,
    header_value: &str,
) -> Result<GatewaySpec> {
    let condition = HeaderMatch::new(header_name, header_value)?;

    Ok(GatewaySpec {
        listener: Listener {
            port: listener_port,
            protocol: ListenerProtocol::Http,
        },
        rules: vec![ListenerRule {
            priority: FORWARD_RULE_PRIORITY,
            condition,
            action: Action::Forward(backend.name.clone()),
        }],
        default_action: Action::FixedResponse(FixedResponse {
            status: DENY_STATUS,
            content_type: "text/plain".to_string(),
            body: DENY_BODY.to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidsite_provisioner_core::target::{HealthCheck, TargetType};

    const HEADER: &str = "x-apigateway-token";
    const TOKEN: &str = "tech-challenge-hackathon";

    fn target_group() -> TargetGroup {
        TargetGroup {
            name: "video-api-tg".to_string(),
            port: 8000.try_into().unwrap(),
            protocol: ListenerProtocol::Http,
            target_type: TargetType::Ip,
            health_check: HealthCheck::default(),
        }
    }

    fn spec() -> GatewaySpec {
        configure(80.try_into().unwrap(), &target_group(), HEADER, TOKEN).unwrap()
    }

    #[test]
    fn correct_header_is_forwarded() {
        assert_eq!(
            spec().evaluate(&[(HEADER, TOKEN)]),
            &Action::Forward("video-api-tg".to_string()),
        );
    }

    #[test]
    fn wrong_value_receives_the_deny_response() {
        match spec().evaluate(&[(HEADER, "wrong")]) {
            Action::FixedResponse(resp) => {
                assert_eq!(resp.status, DENY_STATUS);
                assert_eq!(resp.body, DENY_BODY);
            }
            action => panic!("expected deny, got {:?}", action),
        }
    }

    #[test]
    fn absent_header_receives_the_deny_response() {
        match spec().evaluate(&[("user-agent", "curl/8.0")]) {
            Action::FixedResponse(resp) => {
                assert_eq!(resp.status, DENY_STATUS);
                assert_eq!(resp.body, DENY_BODY);
            }
            action => panic!("expected deny, got {:?}", action),
        }
    }

    #[test]
    fn exactly_one_rule_forwards_to_the_backend() {
        let spec = spec();
        let forwards = spec.forward_rules().collect::<Vec<_>>();
        assert_eq!(forwards.len(), 1);
        assert_eq!(
            forwards[0].action,
            Action::Forward("video-api-tg".to_string())
        );
    }

    #[test]
    fn forwarding_rule_sorts_before_later_rules() {
        let mut spec = spec();
        spec.rules.push(ListenerRule {
            priority: FORWARD_RULE_PRIORITY + 9,
            condition: HeaderMatch::new(HEADER, TOKEN).unwrap(),
            action: Action::FixedResponse(FixedResponse {
                status: 503,
                content_type: "text/plain".to_string(),
                body: "shadowed".to_string(),
            }),
        });

        // The shared-secret rule still wins.
        assert_eq!(
            spec.evaluate(&[(HEADER, TOKEN)]),
            &Action::Forward("video-api-tg".to_string()),
        );
    }
}
