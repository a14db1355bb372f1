use {
    crate::{
        display_json, from_str_json, serutil::StringLikeList, ActionList, Condition, Effect, Principal, Resource,
        ResourceList,
    },
    derive_builder::Builder,
    serde::{
        de::{Deserializer, MapAccess, Visitor},
        Deserialize, Serialize,
    },
    std::fmt::{Formatter, Result as FmtResult},
};

/// A single policy statement.
///
/// A statement may lack both `Action`/`NotAction` or both `Resource`/`NotResource`; such a statement never
/// matches anything (implicit deny) but is not a parse error. Mutually exclusive pairs set together are rejected.
#[derive(Builder, Clone, Debug, Eq, PartialEq, Serialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Statement {
    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "Sid", skip_serializing_if = "Option::is_none")]
    sid: Option<String>,

    #[serde(rename = "Effect")]
    effect: Effect,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "Action", skip_serializing_if = "Option::is_none")]
    action: Option<ActionList>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "NotAction", skip_serializing_if = "Option::is_none")]
    not_action: Option<ActionList>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "Resource", skip_serializing_if = "Option::is_none")]
    resource: Option<ResourceList>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "NotResource", skip_serializing_if = "Option::is_none")]
    not_resource: Option<ResourceList>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "Principal", skip_serializing_if = "Option::is_none")]
    principal: Option<Principal>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "NotPrincipal", skip_serializing_if = "Option::is_none")]
    not_principal: Option<Principal>,

    #[builder(setter(into, strip_option), default)]
    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,

    /// The ARN of the policy (or entity) this statement came from, attached while bundling identity statements.
    /// Never part of the wire format.
    #[builder(setter(into, strip_option), default)]
    #[serde(skip)]
    origin_arn: Option<String>,
}

impl Statement {
    pub fn builder() -> StatementBuilder {
        StatementBuilder::default()
    }

    #[inline]
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    #[inline]
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    #[inline]
    pub fn action(&self) -> Option<&ActionList> {
        self.action.as_ref()
    }

    #[inline]
    pub fn not_action(&self) -> Option<&ActionList> {
        self.not_action.as_ref()
    }

    #[inline]
    pub fn resource(&self) -> Option<&ResourceList> {
        self.resource.as_ref()
    }

    #[inline]
    pub fn not_resource(&self) -> Option<&ResourceList> {
        self.not_resource.as_ref()
    }

    #[inline]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    #[inline]
    pub fn not_principal(&self) -> Option<&Principal> {
        self.not_principal.as_ref()
    }

    #[inline]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    #[inline]
    pub fn origin_arn(&self) -> Option<&str> {
        self.origin_arn.as_deref()
    }

    pub fn set_origin_arn<S: Into<String>>(&mut self, origin_arn: S) {
        self.origin_arn = Some(origin_arn.into());
    }

    /// A copy of this statement annotated with the ARN it came from.
    pub fn with_origin_arn<S: Into<String>>(&self, origin_arn: S) -> Self {
        let mut statement = self.clone();
        statement.set_origin_arn(origin_arn);
        statement
    }

    /// A copy with the target resource filled in when the statement names none. Resource policies (trust
    /// policies in particular) implicitly apply to the resource they are attached to.
    pub(crate) fn with_default_resource<S: Into<String>>(&self, arn: S) -> Self {
        if self.resource.is_some() || self.not_resource.is_some() {
            return self.clone();
        }

        let mut statement = self.clone();
        statement.resource = Some(ResourceList::from(Resource::Pattern(arn.into())));
        statement
    }
}

display_json!(Statement);
from_str_json!(Statement);

impl<'de> Deserialize<'de> for Statement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(StatementVisitor {})
    }
}

struct StatementVisitor;
impl<'de> Visitor<'de> for StatementVisitor {
    type Value = Statement;

    fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("a map of statement properties")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Statement, A::Error> {
        let mut builder = Statement::builder();
        let mut sid_seen = false;
        let mut effect_seen = false;
        let mut action_seen = false;
        let mut not_action_seen = false;
        let mut resource_seen = false;
        let mut not_resource_seen = false;
        let mut principal_seen = false;
        let mut not_principal_seen = false;
        let mut condition_seen = false;

        while let Some(key) = access.next_key::<&str>()? {
            match key {
                "Sid" => {
                    if sid_seen {
                        return Err(serde::de::Error::duplicate_field("Sid"));
                    }

                    sid_seen = true;
                    builder.sid(access.next_value::<&str>()?);
                }
                "Effect" => {
                    if effect_seen {
                        return Err(serde::de::Error::duplicate_field("Effect"));
                    }

                    effect_seen = true;
                    builder.effect(access.next_value::<Effect>()?);
                }
                "Action" => {
                    if action_seen {
                        return Err(serde::de::Error::duplicate_field("Action"));
                    }

                    action_seen = true;
                    builder.action(access.next_value::<ActionList>()?);
                }
                "NotAction" => {
                    if not_action_seen {
                        return Err(serde::de::Error::duplicate_field("NotAction"));
                    }

                    not_action_seen = true;
                    builder.not_action(access.next_value::<ActionList>()?);
                }
                "Resource" => {
                    if resource_seen {
                        return Err(serde::de::Error::duplicate_field("Resource"));
                    }

                    resource_seen = true;
                    builder.resource(access.next_value::<ResourceList>()?);
                }
                "NotResource" => {
                    if not_resource_seen {
                        return Err(serde::de::Error::duplicate_field("NotResource"));
                    }

                    not_resource_seen = true;
                    builder.not_resource(access.next_value::<ResourceList>()?);
                }
                "Principal" => {
                    if principal_seen {
                        return Err(serde::de::Error::duplicate_field("Principal"));
                    }

                    principal_seen = true;
                    builder.principal(access.next_value::<Principal>()?);
                }
                "NotPrincipal" => {
                    if not_principal_seen {
                        return Err(serde::de::Error::duplicate_field("NotPrincipal"));
                    }

                    not_principal_seen = true;
                    builder.not_principal(access.next_value::<Principal>()?);
                }
                "Condition" => {
                    if condition_seen {
                        return Err(serde::de::Error::duplicate_field("Condition"));
                    }

                    condition_seen = true;
                    builder.condition(access.next_value::<Condition>()?);
                }
                _ => {
                    return Err(serde::de::Error::unknown_field(
                        key,
                        &[
                            "Sid",
                            "Effect",
                            "Action",
                            "NotAction",
                            "Resource",
                            "NotResource",
                            "Principal",
                            "NotPrincipal",
                            "Condition",
                        ],
                    ));
                }
            }
        }

        builder.build().map_err(|e| match e {
            StatementBuilderError::ValidationError(s) => {
                let msg2 = s.replace('.', ";").trim_end_matches(|c| c == ';').to_string();
                serde::de::Error::custom(StatementBuilderError::ValidationError(msg2))
            }
            _ => serde::de::Error::custom(e),
        })
    }
}

impl StatementBuilder {
    fn validate(&self) -> Result<(), StatementBuilderError> {
        let mut errors = Vec::with_capacity(3);
        if self.effect.is_none() {
            errors.push("Effect must be set.");
        }

        if let (Some(Some(_)), Some(Some(_))) = (&self.action, &self.not_action) {
            errors.push("Action and NotAction cannot both be set.");
        }

        if let (Some(Some(_)), Some(Some(_))) = (&self.resource, &self.not_resource) {
            errors.push("Resource and NotResource cannot both be set.");
        }

        if let (Some(Some(_)), Some(Some(_))) = (&self.principal, &self.not_principal) {
            errors.push("Principal and NotPrincipal cannot both be set.");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StatementBuilderError::ValidationError(errors.join(" ")))
        }
    }
}

pub type StatementList = StringLikeList<Statement>;

#[cfg(test)]
mod tests {
    use {
        crate::{Action, Effect, PolicyDocument, Resource, Statement},
        indoc::indoc,
        pretty_assertions::assert_eq,
        std::str::FromStr,
    };

    #[test_log::test]
    fn test_typical_statement() {
        let statement = Statement::from_str(indoc! { r#"
            {
                "Sid": "1",
                "Effect": "Allow",
                "Action": [
                    "ec2:Get*",
                    "ecs:*"
                ],
                "Resource": "*",
                "Condition": {
                    "StringEquals": {
                        "aws:RequestedRegion": [
                            "us-west-2"
                        ]
                    }
                }
            }"# })
        .unwrap();

        assert_eq!(statement.sid(), Some("1"));
        assert_eq!(*statement.effect(), Effect::Allow);
        assert_eq!(statement.action().unwrap().len(), 2);
        assert_eq!(statement.action().unwrap()[0], Action::from_str("ec2:Get*").unwrap());
        assert!(statement.condition().is_some());
        assert!(statement.origin_arn().is_none());
    }

    #[test_log::test]
    fn test_missing_action_and_resource_parse() {
        // Not a parse error; such statements simply never match.
        let statement = Statement::from_str(r#"{"Effect": "Deny"}"#).unwrap();
        assert!(statement.action().is_none());
        assert!(statement.not_action().is_none());
        assert!(statement.resource().is_none());
    }

    #[test_log::test]
    fn test_conflicting_blocks() {
        let e = Statement::from_str(
            r#"{"Effect": "Allow", "Action": "s3:GetObject", "NotAction": "s3:PutObject", "Resource": "*"}"#,
        )
        .unwrap_err();
        assert!(e.to_string().contains("Action and NotAction cannot both be set"));

        let e = Statement::from_str(
            r#"{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*", "NotResource": "*"}"#,
        )
        .unwrap_err();
        assert!(e.to_string().contains("Resource and NotResource cannot both be set"));

        let e = Statement::from_str(
            r#"{"Effect": "Allow", "Action": "*", "Resource": "*", "Principal": "*", "NotPrincipal": "*"}"#,
        )
        .unwrap_err();
        assert!(e.to_string().contains("Principal and NotPrincipal cannot both be set"));

        let e = Statement::from_str(r#"{"Effect": "Allow", "Effect": "Deny", "Action": "*", "Resource": "*"}"#)
            .unwrap_err();
        assert!(e.to_string().contains("duplicate field `Effect`"));
    }

    #[test_log::test]
    fn test_unknown_field() {
        let e = PolicyDocument::from_str(indoc! { r#"
            {
                "Version": "2012-10-17",
                "Statement": {
                    "Effect": "Allow",
                    "Action": "*",
                    "Instance": "i-0123456789abcdef0",
                    "Resource": "*"
                }
            }"# })
        .unwrap_err();
        assert!(e.to_string().contains("unknown field `Instance`"));
    }

    #[test_log::test]
    fn test_origin_arn_annotation() {
        let statement = Statement::builder()
            .effect(Effect::Allow)
            .action(Action::from_str("s3:GetObject").unwrap())
            .resource(Resource::from_str("*").unwrap())
            .build()
            .unwrap();

        let annotated = statement.with_origin_arn("arn:aws:iam::123456789012:policy/ReadOnly");
        assert_eq!(annotated.origin_arn(), Some("arn:aws:iam::123456789012:policy/ReadOnly"));
        // The annotation never reaches the wire format.
        assert_eq!(serde_json::to_string(&annotated).unwrap(), serde_json::to_string(&statement).unwrap());
    }
}
