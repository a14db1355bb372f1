//! Condition handling: the typed sub-language of the `Condition` element.
//!
//! Evaluation is three-valued. A block either matches, fails, or is inconclusive: a key the operator needs is
//! absent from the request context and the engine refuses to guess its value rather than declare the condition
//! failed.

mod arn;
mod binary;
mod boolean;
mod date;
mod ipaddr;
mod null;
mod numeric;
mod op;
mod string;
mod variant;

pub use {
    arn::ArnCmp,
    date::DateCmp,
    numeric::NumericCmp,
    op::{ConditionOp, OpTest},
    string::StringCmp,
    variant::{Quantifier, Variant},
};

use {
    crate::{context::RequestContext, from_str_json, serutil::StringList},
    serde::{de::Deserializer, ser::Serializer, Deserialize, Serialize},
    std::{
        borrow::Borrow,
        collections::{
            btree_map::{Entry, Iter},
            BTreeMap,
        },
    },
};

/// A map of condition key names to their allowed values.
pub type ConditionMap = BTreeMap<String, StringList>;

/// Keys whose absence makes a condition verdict [Inconclusive](ConditionDecision::Inconclusive) rather than a
/// plain miss: these gate network paths, org membership, and service-to-service forwarding, and a snapshot that
/// lacks them cannot prove the condition either way.
const CRITICAL_KEYS: [&str; 13] = [
    "aws:sourcearn",
    "aws:sourcevpc",
    "aws:sourcevpce",
    "aws:principalorgid",
    "aws:resourceorgid",
    "aws:principalorgpaths",
    "aws:resourceorgpaths",
    "aws:sourceaccount",
    "aws:resourceaccount",
    "aws:viaawsservice",
    "aws:calledvia",
    "aws:calledviafirst",
    "aws:calledvialast",
];

/// The verdict of evaluating a condition block.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ConditionDecision {
    Matched,
    Failed,
    Inconclusive,
}

/// The evaluation of a single (operator, key, values) triple, kept for diagnostics.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeyEvaluation {
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Operator")]
    pub operator: String,

    #[serde(rename = "Values")]
    pub values: Vec<String>,

    #[serde(rename = "Matched")]
    pub matched: bool,

    /// The context value the key resolved to, rendered; absent when the key was missing.
    #[serde(rename = "ResolvedValue", skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

/// The full result of evaluating a condition block against a request context.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConditionEval {
    #[serde(rename = "Result")]
    pub result: ConditionDecision,

    #[serde(rename = "Evaluations", skip_serializing_if = "Vec::is_empty", default)]
    pub evaluations: Vec<KeyEvaluation>,

    #[serde(rename = "MissingKeys", skip_serializing_if = "Vec::is_empty", default)]
    pub missing_keys: Vec<String>,
}

impl Default for ConditionDecision {
    fn default() -> Self {
        Self::Matched
    }
}

impl ConditionEval {
    /// A condition block that is absent or empty matches unconditionally.
    pub fn matched() -> Self {
        Self::default()
    }

    /// Matched and Inconclusive both let the containing statement proceed; only Failed blocks it.
    #[inline]
    pub fn passed(&self) -> bool {
        !matches!(self.result, ConditionDecision::Failed)
    }
}

/// A condition clause in a statement: a two-level map from operator to key to allowed values.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Condition {
    map: BTreeMap<ConditionOp, ConditionMap>,
}

from_str_json!(Condition);

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::deserialize(deserializer)?;

        Ok(Self {
            map,
        })
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.map.serialize(serializer)
    }
}

impl Condition {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn insert(&mut self, key: ConditionOp, value: ConditionMap) -> Option<ConditionMap> {
        self.map.insert(key, value)
    }

    #[inline]
    pub fn entry(&mut self, key: ConditionOp) -> Entry<'_, ConditionOp, ConditionMap> {
        self.map.entry(key)
    }

    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&ConditionMap>
    where
        ConditionOp: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(key)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, ConditionOp, ConditionMap> {
        self.map.iter()
    }

    /// Evaluate every (operator, key, values) triple in this block against the context.
    ///
    /// The verdict starts at Matched. A failing triple downgrades it to Failed. A missing key that the operator
    /// cannot tolerate records a miss; if the key is one of the critical keys, a Matched verdict is promoted to
    /// Inconclusive instead (never demoting a Failed). `ForAllValues`-quantified operators treat a missing key
    /// as the empty set and match vacuously.
    pub fn evaluate(&self, context: &RequestContext) -> ConditionEval {
        if self.map.is_empty() {
            return ConditionEval::matched();
        }

        let mut result = ConditionDecision::Matched;
        let mut evaluations = Vec::new();
        let mut missing_keys = Vec::new();

        for (op, key_map) in &self.map {
            for (key, values) in key_map {
                let resolved = context.key_value(key);
                let tolerates_missing =
                    op.if_exists() || op.is_null_test() || op.quantifier() == Quantifier::ForAllValues;

                if resolved.is_none() && !tolerates_missing {
                    missing_keys.push(key.clone());
                    if result == ConditionDecision::Matched && is_critical_key(key) {
                        result = ConditionDecision::Inconclusive;
                    }

                    evaluations.push(KeyEvaluation {
                        key: key.clone(),
                        operator: op.name().to_string(),
                        values: values.iter().cloned().collect(),
                        matched: false,
                        resolved: None,
                    });
                    continue;
                }

                let rendered = resolved.as_ref().map(|value| value.to_string());
                let value = resolved.unwrap_or(crate::context::ContextValue::Null);
                let matched = op.matches(values, &value);

                evaluations.push(KeyEvaluation {
                    key: key.clone(),
                    operator: op.name().to_string(),
                    values: values.iter().cloned().collect(),
                    matched,
                    resolved: rendered,
                });

                if !matched && result != ConditionDecision::Inconclusive {
                    result = ConditionDecision::Failed;
                }
            }
        }

        ConditionEval {
            result,
            evaluations,
            missing_keys,
        }
    }
}

fn is_critical_key(key: &str) -> bool {
    let key = key.to_lowercase();
    CRITICAL_KEYS.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use {
        crate::{
            condition::{Condition, ConditionDecision},
            context::RequestContext,
        },
        indoc::indoc,
        pretty_assertions::assert_eq,
        std::str::FromStr,
    };

    fn context_with_region(region: &str) -> RequestContext {
        let mut context = RequestContext::default();
        context.set_requested_region(region);
        context
    }

    #[test_log::test]
    fn test_empty_block_matches() {
        let condition = Condition::new();
        let eval = condition.evaluate(&RequestContext::default());
        assert_eq!(eval.result, ConditionDecision::Matched);
        assert!(eval.passed());
        assert!(eval.evaluations.is_empty());
    }

    #[test_log::test]
    fn test_string_equals_match_and_fail() {
        let condition = Condition::from_str(indoc! { r#"
            {
                "StringEquals": {
                    "aws:RequestedRegion": ["us-east-1", "us-east-2"]
                }
            }"# })
        .unwrap();

        let eval = condition.evaluate(&context_with_region("us-east-1"));
        assert_eq!(eval.result, ConditionDecision::Matched);
        assert_eq!(eval.evaluations.len(), 1);
        assert_eq!(eval.evaluations[0].resolved.as_deref(), Some("us-east-1"));

        let eval = condition.evaluate(&context_with_region("eu-west-1"));
        assert_eq!(eval.result, ConditionDecision::Failed);
        assert!(!eval.passed());
    }

    #[test_log::test]
    fn test_missing_critical_key_is_inconclusive() {
        let condition = Condition::from_str(indoc! { r#"
            {
                "StringEquals": {
                    "aws:SourceArn": "arn:aws:sns:us-east-1:123456789012:topic"
                }
            }"# })
        .unwrap();

        let eval = condition.evaluate(&RequestContext::default());
        assert_eq!(eval.result, ConditionDecision::Inconclusive);
        assert!(eval.passed());
        assert_eq!(eval.missing_keys, vec!["aws:SourceArn".to_string()]);
    }

    #[test_log::test]
    fn test_missing_noncritical_key_records_miss_only() {
        let condition = Condition::from_str(indoc! { r#"
            {
                "StringEquals": {
                    "s3:prefix": "uploads/"
                }
            }"# })
        .unwrap();

        let eval = condition.evaluate(&RequestContext::default());
        assert_eq!(eval.result, ConditionDecision::Matched);
        assert_eq!(eval.missing_keys, vec!["s3:prefix".to_string()]);
    }

    #[test_log::test]
    fn test_failed_is_not_promoted_to_inconclusive() {
        let condition = Condition::from_str(indoc! { r#"
            {
                "StringEquals": {
                    "aws:RequestedRegion": "us-east-1"
                },
                "StringLike": {
                    "aws:SourceArn": "arn:aws:sns:*"
                }
            }"# })
        .unwrap();

        // Region fails first (BTreeMap orders StringEquals before StringLike), then the critical key miss must
        // not upgrade the verdict.
        let eval = condition.evaluate(&context_with_region("eu-west-1"));
        assert_eq!(eval.result, ConditionDecision::Failed);
    }

    #[test_log::test]
    fn test_if_exists_passes_on_missing() {
        let condition = Condition::from_str(indoc! { r#"
            {
                "StringEqualsIfExists": {
                    "s3:prefix": "uploads/"
                }
            }"# })
        .unwrap();

        let eval = condition.evaluate(&RequestContext::default());
        assert_eq!(eval.result, ConditionDecision::Matched);
        assert!(eval.missing_keys.is_empty());
    }

    #[test_log::test]
    fn test_null_operator() {
        let condition = Condition::from_str(indoc! { r#"
            {
                "Null": {
                    "aws:TokenIssueTime": "true"
                }
            }"# })
        .unwrap();

        let eval = condition.evaluate(&RequestContext::default());
        assert_eq!(eval.result, ConditionDecision::Matched);

        let mut context = RequestContext::default();
        context.set_token_issue_time(chrono::Utc::now());
        let eval = condition.evaluate(&context);
        assert_eq!(eval.result, ConditionDecision::Failed);
    }

    #[test_log::test]
    fn test_round_trip() {
        let text = indoc! { r#"
            {
                "ForAnyValue:StringLike": {
                    "aws:PrincipalOrgPaths": "o-a1b2c3d4e5/*"
                },
                "NumericLessThanEquals": {
                    "s3:max-keys": "10"
                }
            }"# };
        let condition = Condition::from_str(text).unwrap();
        assert_eq!(condition.len(), 2);
        assert_eq!(serde_json::to_string_pretty(&condition).unwrap().replace("  ", "    "), text.to_string());
    }
}
