use std::fmt;

use stratus_core::resource_id::{IdParseError, ParseResult, ResourceIdentifier, ScopeId, Segment};

/// Parse the scope of a scoped ID with the same casing rules as the rest of it
fn parse_scope(parsed: &ParseResult) -> Result<ScopeId, IdParseError> {
    let raw = parsed.get("scope")?;
    if parsed.insensitively {
        ScopeId::parse_insensitively(raw)
    } else {
        ScopeId::parse(raw)
    }
}

/// `{scope}/providers/Microsoft.PolicyInsights/remediations/{remediationName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemediationId {
    pub scope: String,
    pub remediation_name: String,
}

impl RemediationId {
    pub fn new(scope: impl Into<String>, remediation_name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            remediation_name: remediation_name.into(),
        }
    }

    pub fn scope_id(&self) -> Result<ScopeId, IdParseError> {
        ScopeId::parse(&self.scope)
    }
}

impl ResourceIdentifier for RemediationId {
    const TYPE_NAME: &'static str = "Remediation";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::scope("scope"),
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftPolicyInsights", "Microsoft.PolicyInsights"),
            Segment::literal("staticRemediations", "remediations"),
            Segment::user("remediationName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        let scope = parse_scope(parsed)?;
        Ok(Self::new(scope.id(), parsed.get("remediationName")?))
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.PolicyInsights/remediations/{}",
            self.scope, self.remediation_name
        )
    }
}

impl fmt::Display for RemediationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Remediation (Scope: {:?} / Remediation Name: {:?})",
            self.scope, self.remediation_name
        )
    }
}

/// `{scope}/providers/Microsoft.Authorization/policyAssignments/{policyAssignmentName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyAssignmentId {
    pub scope: String,
    pub policy_assignment_name: String,
}

impl PolicyAssignmentId {
    pub fn new(scope: impl Into<String>, policy_assignment_name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            policy_assignment_name: policy_assignment_name.into(),
        }
    }
}

impl ResourceIdentifier for PolicyAssignmentId {
    const TYPE_NAME: &'static str = "Policy Assignment";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::scope("scope"),
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftAuthorization", "Microsoft.Authorization"),
            Segment::literal("staticPolicyAssignments", "policyAssignments"),
            Segment::user("policyAssignmentName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        let scope = parse_scope(parsed)?;
        Ok(Self::new(scope.id(), parsed.get("policyAssignmentName")?))
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.Authorization/policyAssignments/{}",
            self.scope, self.policy_assignment_name
        )
    }
}

impl fmt::Display for PolicyAssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Policy Assignment (Scope: {:?} / Policy Assignment Name: {:?})",
            self.scope, self.policy_assignment_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUB: &str = "/subscriptions/12345678-1234-9876-4563-123456789012";

    #[test]
    fn remediation_at_every_scope() {
        let scopes = [
            SUB.to_string(),
            format!("{SUB}/resourceGroups/example-resource-group"),
            "/providers/Microsoft.Management/managementGroups/mg1".to_string(),
            format!("{SUB}/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1"),
        ];
        for scope in scopes {
            let input = format!("{scope}/providers/Microsoft.PolicyInsights/remediations/fix-tags");
            let id = RemediationId::parse(&input).unwrap();
            assert_eq!(id.scope, scope);
            assert_eq!(id.remediation_name, "fix-tags");
            assert_eq!(id.id(), input);
        }
    }

    #[test]
    fn resource_scope_is_typed() {
        let input = format!(
            "{SUB}/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1/providers/Microsoft.PolicyInsights/remediations/r1"
        );
        let id = RemediationId::parse(&input).unwrap();
        assert!(matches!(id.scope_id(), Ok(ScopeId::Resource(_))));
    }

    #[test]
    fn rejects_invalid_remediations() {
        assert!(RemediationId::parse("").is_err());
        assert!(
            RemediationId::parse(&format!("{SUB}/providers/Microsoft.PolicyInsights/remediations/"))
                .is_err()
        );
        assert!(
            RemediationId::parse(&format!("{SUB}/providers/Microsoft.PolicyInsights/Remediations/r1"))
                .is_err()
        );
        assert!(
            RemediationId::parse_insensitively(&format!(
                "{SUB}/providers/Microsoft.PolicyInsights/Remediations/r1"
            ))
            .is_ok()
        );
    }

    #[test]
    fn policy_assignment_ids() {
        let input = format!("{SUB}/providers/Microsoft.Authorization/policyAssignments/require-tags");
        let id = PolicyAssignmentId::parse(&input).unwrap();
        assert_eq!(id.scope, SUB);
        assert_eq!(id.policy_assignment_name, "require-tags");
        assert_eq!(id.id(), input);
        assert_eq!(
            id.to_string(),
            format!("Policy Assignment (Scope: {SUB:?} / Policy Assignment Name: \"require-tags\")")
        );
    }
}
