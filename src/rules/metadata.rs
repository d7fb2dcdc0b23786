use serde::{Deserialize, Serialize};

/// Outcome of evaluating one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    /// Nothing to evaluate, or the data could not be retrieved.
    #[serde(rename = "NA")]
    NotApplicable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::NotApplicable => "NA",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security Hub severity label of a control.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// AWS service a control inspects. The slug is the first path segment of the
/// control's HTTP route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Account,
    ApiGateway,
    CloudFront,
    DocumentDb,
    Ec2,
    Ecs,
    S3,
}

impl Service {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::ApiGateway => "apigateway",
            Self::CloudFront => "cloudfront",
            Self::DocumentDb => "documentdb",
            Self::Ec2 => "ec2",
            Self::Ecs => "ecs",
            Self::S3 => "s3",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "Account"),
            Self::ApiGateway => write!(f, "API Gateway"),
            Self::CloudFront => write!(f, "CloudFront"),
            Self::DocumentDb => write!(f, "DocumentDB"),
            Self::Ec2 => write!(f, "EC2"),
            Self::Ecs => write!(f, "ECS"),
            Self::S3 => write!(f, "S3"),
        }
    }
}

/// Static description of a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlMetadata {
    /// Security Hub control id, e.g. `CloudFront.5`.
    pub id: &'static str,
    /// CLI subcommand and HTTP route name.
    pub command: &'static str,
    pub title: &'static str,
    pub service: Service,
    pub severity: Severity,
}

impl ControlMetadata {
    /// Lowercased id, accepted as a CLI alias (`s3.1`).
    pub fn alias(&self) -> String {
        self.id.to_lowercase()
    }

    pub fn route(&self) -> String {
        format!("/{}/{}", self.service.slug(), self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_serializes_as_upper_case_label() {
        assert_eq!(serde_json::to_string(&Verdict::Pass).unwrap(), "\"PASS\"");
        assert_eq!(
            serde_json::to_string(&Verdict::NotApplicable).unwrap(),
            "\"NA\""
        );
        assert_eq!(Verdict::Fail.to_string(), "FAIL");
    }

    #[test]
    fn severity_parses_leniently_and_orders() {
        assert_eq!(Severity::from_str_lenient("CRIT"), Some(Severity::Critical));
        assert_eq!(Severity::from_str_lenient("med"), Some(Severity::Medium));
        assert_eq!(Severity::from_str_lenient("urgent"), None);
        assert!(Severity::Critical > Severity::High);
    }

    #[test]
    fn route_and_alias() {
        let meta = ControlMetadata {
            id: "CloudFront.5",
            command: "cloudfront-accesslogs-enabled",
            title: "CloudFront distributions should have logging enabled",
            service: Service::CloudFront,
            severity: Severity::Medium,
        };
        assert_eq!(meta.alias(), "cloudfront.5");
        assert_eq!(meta.route(), "/cloudfront/cloudfront-accesslogs-enabled");
    }
}
