//! The single pattern matcher used throughout the engine.
//!
//! Action names, resource ARNs, principal identifiers, `StringLike`/`ArnLike` condition values, and service names
//! all match through [glob_matches]: case-insensitive, `*` matches any run of characters, `?` matches exactly one
//! character, everything else is literal.

use {
    lazy_static::lazy_static,
    parking_lot::Mutex,
    regex::{Regex, RegexBuilder},
    std::{collections::HashMap, sync::Arc},
};

lazy_static! {
    // Policies repeat the same handful of patterns across thousands of evaluations; compiled forms are kept for
    // the life of the process.
    static ref GLOB_CACHE: Mutex<HashMap<String, Arc<Regex>>> = Mutex::new(HashMap::new());
}

/// Build an anchored, case-insensitive regular expression from a glob pattern. Regex metacharacters other than `*`
/// and `?` are escaped.
pub(crate) fn regex_from_glob(s: &str) -> Arc<Regex> {
    if let Some(regex) = GLOB_CACHE.lock().get(s) {
        return regex.clone();
    }

    let mut pattern = String::with_capacity(2 + s.len());
    pattern.push('^');

    for c in s.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            _ => {
                let escaped: String = regex::escape(&String::from(c));
                pattern.push_str(&escaped);
            }
        }
    }
    pattern.push('$');

    let regex = Arc::new(
        RegexBuilder::new(&pattern).case_insensitive(true).build().expect("glob pattern produced an invalid regex"),
    );
    GLOB_CACHE.lock().insert(s.to_string(), regex.clone());
    regex
}

/// Indicates whether `input` matches the glob `pattern`.
pub fn glob_matches(pattern: &str, input: &str) -> bool {
    regex_from_glob(pattern).is_match(input)
}

/// Indicates whether two ARN patterns could describe the same resource, ignoring the resource name.
///
/// Both patterns are split on `:` into the six ARN segments. The prefix segments (`arn`, partition, service,
/// region) and the account ID must be pairwise wildcard-compatible in at least one direction. The resource segment
/// is ignored: the caller of a create-style action controls the resource name and can always pick one that
/// satisfies both patterns.
pub fn arn_segments_compatible(a: &str, b: &str) -> bool {
    if a == "*" || b == "*" {
        return true;
    }

    let a_parts: Vec<&str> = a.splitn(6, ':').collect();
    let b_parts: Vec<&str> = b.splitn(6, ':').collect();
    if a_parts.len() != 6 || b_parts.len() != 6 {
        return false;
    }

    for i in 0..5 {
        if !segment_compatible(a_parts[i], b_parts[i]) {
            return false;
        }
    }

    true
}

fn segment_compatible(a: &str, b: &str) -> bool {
    glob_matches(a, b) || glob_matches(b, a)
}

/// Extract the account ID segment from an ARN-shaped string, if present.
pub fn account_id_from_arn(arn: &str) -> Option<&str> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() == 6 && parts[0] == "arn" {
        Some(parts[4])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{account_id_from_arn, arn_segments_compatible, glob_matches},
        pretty_assertions::assert_eq,
    };

    #[test_log::test]
    fn test_glob_basic() {
        assert!(glob_matches("s3:GetObject", "s3:GetObject"));
        assert!(glob_matches("s3:Get*", "s3:GetObject"));
        assert!(glob_matches("s3:Get?bject", "s3:GetObject"));
        assert!(glob_matches("*", "anything at all"));
        assert!(!glob_matches("s3:Get", "s3:GetObject"));
        assert!(!glob_matches("s3:Get?", "s3:GetObject"));
    }

    #[test_log::test]
    fn test_glob_case_insensitive() {
        assert!(glob_matches("S3:GETOBJECT", "s3:getobject"));
        assert!(glob_matches("iam:passrole", "iam:PassRole"));
        assert!(glob_matches("lambda:I*", "lambda:invokeFunction"));
    }

    #[test_log::test]
    fn test_glob_literal_metacharacters() {
        // A dot in the pattern is a literal dot, not a regex wildcard.
        assert!(glob_matches("lambda.amazonaws.com", "lambda.amazonaws.com"));
        assert!(!glob_matches("lambda.amazonaws.com", "lambdaXamazonawsXcom"));
        assert!(glob_matches("a+b(c)", "a+b(c)"));
        assert!(!glob_matches("a+b", "aab"));
    }

    #[test_log::test]
    fn test_trailing_star_never_shrinks() {
        let inputs = ["s3:GetObject", "s3:GetObjectAcl", "s3:Get"];
        for input in inputs {
            if glob_matches("s3:Get", input) {
                assert!(glob_matches("s3:Get*", input));
            }
        }
    }

    #[test_log::test]
    fn test_arn_segments_compatible() {
        assert!(arn_segments_compatible(
            "arn:aws:codebuild:us-east-1:123456789012:project/*",
            "arn:aws:codebuild:us-east-1:123456789012:project/build-me"
        ));
        assert!(arn_segments_compatible(
            "arn:aws:codebuild:*:123456789012:project/x",
            "arn:aws:codebuild:us-east-1:123456789012:project/y"
        ));
        // The resource segment is ignored entirely.
        assert!(arn_segments_compatible(
            "arn:aws:lambda:us-east-1:123456789012:function:alpha",
            "arn:aws:lambda:us-east-1:123456789012:function:omega"
        ));
        assert!(!arn_segments_compatible(
            "arn:aws:codebuild:us-east-1:123456789012:project/x",
            "arn:aws:codebuild:us-east-1:999999999999:project/x"
        ));
        assert!(!arn_segments_compatible(
            "arn:aws:codebuild:us-east-1:123456789012:project/x",
            "arn:aws:lambda:us-east-1:123456789012:function:x"
        ));
        assert!(arn_segments_compatible("*", "arn:aws:lambda:us-east-1:123456789012:function:x"));
        assert!(!arn_segments_compatible("not-an-arn", "arn:aws:lambda:us-east-1:123456789012:function:x"));
    }

    #[test_log::test]
    fn test_account_id_from_arn() {
        assert_eq!(account_id_from_arn("arn:aws:iam::123456789012:user/alice"), Some("123456789012"));
        assert_eq!(account_id_from_arn("arn:aws:s3:::bucket/key"), Some(""));
        assert_eq!(account_id_from_arn("lambda.amazonaws.com"), None);
        assert_eq!(account_id_from_arn("arn:aws:iam"), None);
    }
}
