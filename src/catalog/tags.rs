//! Optional enrichment mapping actions to risk categories, off the evaluation hot path.

use {
    crate::EngineError,
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// The shape of the iam-dataset tags file: category names mapped to the actions they label, in original and
/// lowercase forms for both the API and IAM spellings.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ActionTagData {
    #[serde(default)]
    pub api: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub api_lower: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub iam: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub iam_lower: HashMap<String, Vec<String>>,
}

/// Supplies the action-classifier tag dataset. Fetching and caching the upstream JSON is the host's concern.
pub trait ActionTagsProvider: Send + Sync {
    fn fetch_tags(&self) -> Result<ActionTagData, EngineError>;
}

impl ActionTagsProvider for ActionTagData {
    fn fetch_tags(&self) -> Result<ActionTagData, EngineError> {
        Ok(self.clone())
    }
}

/// Joins risk categories for actions from the tag dataset.
#[derive(Clone, Debug, Default)]
pub struct ActionClassifier {
    by_action: HashMap<String, Vec<String>>,
}

impl ActionClassifier {
    pub fn from_provider(provider: &dyn ActionTagsProvider) -> Result<Self, EngineError> {
        let data = provider.fetch_tags()?;
        let mut by_action: HashMap<String, Vec<String>> = HashMap::new();

        for source in [&data.iam_lower, &data.api_lower] {
            for (category, actions) in source {
                for action in actions {
                    let categories = by_action.entry(action.to_lowercase()).or_default();
                    if !categories.contains(category) {
                        categories.push(category.clone());
                    }
                }
            }
        }

        for categories in by_action.values_mut() {
            categories.sort();
        }

        Ok(Self {
            by_action,
        })
    }

    /// The categories for an action, case-insensitively. Unlabeled actions yield an empty list.
    pub fn categories(&self, action: &str) -> Vec<String> {
        self.by_action.get(action.to_lowercase().as_str()).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{ActionClassifier, ActionTagData},
        pretty_assertions::assert_eq,
    };

    #[test_log::test]
    fn test_classifier_joins_categories() {
        let data: ActionTagData = serde_json::from_str(
            r#"{
                "iam_lower": {
                    "PrivEsc": ["iam:passrole", "iam:createaccesskey"],
                    "Write": ["iam:passrole"]
                },
                "api_lower": {
                    "Mutating": ["iam:passrole"]
                }
            }"#,
        )
        .unwrap();

        let classifier = ActionClassifier::from_provider(&data).unwrap();
        assert_eq!(
            classifier.categories("iam:PassRole"),
            vec!["Mutating".to_string(), "PrivEsc".to_string(), "Write".to_string()]
        );
        assert_eq!(classifier.categories("iam:createaccesskey"), vec!["PrivEsc".to_string()]);
        assert!(classifier.categories("s3:GetObject").is_empty());
    }
}
