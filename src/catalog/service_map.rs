//! Static tables of valid (action, resource-type) pairs and ARN patterns per service.

use {
    lazy_static::lazy_static,
    log::debug,
    regex::{Regex, RegexBuilder},
    std::collections::HashMap,
};

/// The resource-type name used for service pseudo-resources (`lambda.amazonaws.com`): create-style actions with
/// no pre-existing target accept those identifiers.
const SERVICE_TYPE: &str = "service";

struct ServiceMap {
    resource_types: HashMap<&'static str, Regex>,
    action_resources: HashMap<&'static str, Vec<&'static str>>,
}

fn arn_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern).case_insensitive(true).build().expect("service map regex is invalid")
}

fn service_map(
    resource_types: Vec<(&'static str, &'static str)>,
    action_resources: Vec<(&'static str, Vec<&'static str>)>,
) -> ServiceMap {
    ServiceMap {
        resource_types: resource_types.into_iter().map(|(name, pattern)| (name, arn_regex(pattern))).collect(),
        action_resources: action_resources.into_iter().collect(),
    }
}

lazy_static! {
    static ref SERVICE_PSEUDO_RESOURCE: Regex = arn_regex(r"^[a-z0-9.-]+\.amazonaws\.com$");

    static ref SERVICE_MAPS: HashMap<&'static str, ServiceMap> = {
        let mut maps = HashMap::new();

        maps.insert(
            "iam",
            service_map(
                vec![
                    ("user", r"^arn:[^:]*:iam::[0-9]{12}:user/.+$"),
                    ("role", r"^arn:[^:]*:iam::[0-9]{12}:role/.+$"),
                    ("group", r"^arn:[^:]*:iam::[0-9]{12}:group/.+$"),
                    ("policy", r"^arn:[^:]*:iam::[0-9]{12}:policy/.+$"),
                    ("instance-profile", r"^arn:[^:]*:iam::[0-9]{12}:instance-profile/.+$"),
                    (SERVICE_TYPE, r"^iam\.amazonaws\.com$"),
                ],
                vec![
                    ("passrole", vec!["role"]),
                    ("createaccesskey", vec!["user"]),
                    ("createloginprofile", vec!["user"]),
                    ("updateloginprofile", vec!["user"]),
                    ("putuserpolicy", vec!["user"]),
                    ("attachuserpolicy", vec!["user"]),
                    ("addusertogroup", vec!["group", "user"]),
                    ("createuser", vec!["user", SERVICE_TYPE]),
                    ("createrole", vec!["role", SERVICE_TYPE]),
                    ("createpolicy", vec!["policy", SERVICE_TYPE]),
                    ("createpolicyversion", vec!["policy"]),
                    ("setdefaultpolicyversion", vec!["policy"]),
                    ("putrolepolicy", vec!["role"]),
                    ("attachrolepolicy", vec!["role"]),
                    ("updateassumerolepolicy", vec!["role"]),
                    ("putgrouppolicy", vec!["group"]),
                    ("attachgrouppolicy", vec!["group"]),
                ],
            ),
        );

        maps.insert(
            "sts",
            service_map(
                vec![("role", r"^arn:[^:]*:iam::[0-9]{12}:role/.+$")],
                vec![
                    ("assumerole", vec!["role"]),
                    ("assumerolewithsaml", vec!["role"]),
                    ("assumerolewithwebidentity", vec!["role"]),
                ],
            ),
        );

        maps.insert(
            "ec2",
            service_map(
                vec![
                    ("instance", r"^arn:[^:]*:ec2:[^:]*:[0-9]{12}:instance/.+$"),
                    ("image", r"^arn:[^:]*:ec2:[^:]*:[0-9]*:image/.+$"),
                    ("subnet", r"^arn:[^:]*:ec2:[^:]*:[0-9]{12}:subnet/.+$"),
                    ("network-interface", r"^arn:[^:]*:ec2:[^:]*:[0-9]{12}:network-interface/.+$"),
                    ("security-group", r"^arn:[^:]*:ec2:[^:]*:[0-9]{12}:security-group/.+$"),
                    ("key-pair", r"^arn:[^:]*:ec2:[^:]*:[0-9]{12}:key-pair/.+$"),
                    ("volume", r"^arn:[^:]*:ec2:[^:]*:[0-9]{12}:volume/.+$"),
                    (SERVICE_TYPE, r"^ec2\.amazonaws\.com$"),
                ],
                vec![
                    (
                        "runinstances",
                        vec![
                            "instance",
                            "image",
                            "subnet",
                            "network-interface",
                            "security-group",
                            "key-pair",
                            "volume",
                            SERVICE_TYPE,
                        ],
                    ),
                    ("modifyinstanceattribute", vec!["instance"]),
                ],
            ),
        );

        maps.insert(
            "cloudformation",
            service_map(
                vec![
                    ("stack", r"^arn:[^:]*:cloudformation:[^:]*:[0-9]{12}:stack/.+$"),
                    (SERVICE_TYPE, r"^cloudformation\.amazonaws\.com$"),
                ],
                vec![
                    ("createstack", vec!["stack", SERVICE_TYPE]),
                    ("updatestack", vec!["stack"]),
                    ("setstackpolicy", vec!["stack"]),
                ],
            ),
        );

        maps.insert(
            "lambda",
            service_map(
                vec![
                    ("function", r"^arn:[^:]*:lambda:[^:]*:[0-9]{12}:function:.+$"),
                    ("event-source-mapping", r"^arn:[^:]*:lambda:[^:]*:[0-9]{12}:event-source-mapping:.+$"),
                    (SERVICE_TYPE, r"^lambda\.amazonaws\.com$"),
                ],
                vec![
                    ("createfunction", vec!["function", SERVICE_TYPE]),
                    ("updatefunctioncode", vec!["function"]),
                    ("updatefunctionconfiguration", vec!["function"]),
                    ("invokefunction", vec!["function"]),
                    ("addpermission", vec!["function"]),
                    ("createeventsourcemapping", vec!["event-source-mapping", SERVICE_TYPE]),
                ],
            ),
        );

        maps.insert(
            "ecs",
            service_map(
                vec![
                    ("task-definition", r"^arn:[^:]*:ecs:[^:]*:[0-9]{12}:task-definition/.+$"),
                    ("cluster", r"^arn:[^:]*:ecs:[^:]*:[0-9]{12}:cluster/.+$"),
                    ("cluster-service", r"^arn:[^:]*:ecs:[^:]*:[0-9]{12}:service/.+$"),
                    (SERVICE_TYPE, r"^ecs\.amazonaws\.com$"),
                ],
                vec![
                    ("registertaskdefinition", vec!["task-definition", SERVICE_TYPE]),
                    ("runtask", vec!["task-definition"]),
                    ("starttask", vec!["task-definition"]),
                    ("updateservice", vec!["cluster-service"]),
                ],
            ),
        );

        maps.insert(
            "ssm",
            service_map(
                vec![
                    ("document", r"^arn:[^:]*:ssm:[^:]*:[0-9]*:document/.+$"),
                    ("automation-definition", r"^arn:[^:]*:ssm:[^:]*:[0-9]*:automation-definition/.+$"),
                    ("parameter", r"^arn:[^:]*:ssm:[^:]*:[0-9]{12}:parameter/.+$"),
                    // SendCommand and StartSession target EC2 managed instances.
                    ("instance", r"^arn:[^:]*:ec2:[^:]*:[0-9]{12}:instance/.+$"),
                    (SERVICE_TYPE, r"^ssm\.amazonaws\.com$"),
                ],
                vec![
                    ("sendcommand", vec!["document", "instance"]),
                    ("startautomationexecution", vec!["automation-definition"]),
                    ("startsession", vec!["instance"]),
                ],
            ),
        );

        maps.insert(
            "glue",
            service_map(
                vec![
                    ("devendpoint", r"^arn:[^:]*:glue:[^:]*:[0-9]{12}:devEndpoint/.+$"),
                    ("job", r"^arn:[^:]*:glue:[^:]*:[0-9]{12}:job/.+$"),
                    (SERVICE_TYPE, r"^glue\.amazonaws\.com$"),
                ],
                vec![
                    ("createdevendpoint", vec!["devendpoint", SERVICE_TYPE]),
                    ("updatedevendpoint", vec!["devendpoint"]),
                    ("createjob", vec!["job", SERVICE_TYPE]),
                    ("updatejob", vec!["job"]),
                    ("startjobrun", vec!["job"]),
                ],
            ),
        );

        maps.insert(
            "datapipeline",
            service_map(
                vec![
                    ("pipeline", r"^arn:[^:]*:datapipeline:[^:]*:[0-9]{12}:pipeline/.+$"),
                    (SERVICE_TYPE, r"^datapipeline\.amazonaws\.com$"),
                ],
                vec![
                    ("createpipeline", vec!["pipeline", SERVICE_TYPE]),
                    ("putpipelinedefinition", vec!["pipeline"]),
                    ("activatepipeline", vec!["pipeline"]),
                ],
            ),
        );

        maps.insert(
            "codebuild",
            service_map(
                vec![
                    ("project", r"^arn:[^:]*:codebuild:[^:]*:[0-9]{12}:project/.+$"),
                    (SERVICE_TYPE, r"^codebuild\.amazonaws\.com$"),
                ],
                vec![
                    ("createproject", vec!["project", SERVICE_TYPE]),
                    ("startbuild", vec!["project"]),
                    ("startbuildbatch", vec!["project"]),
                ],
            ),
        );

        maps
    };
}

/// Indicates whether an identifier is a service pseudo-resource (`service.amazonaws.com`).
pub fn is_service_pseudo_resource(identifier: &str) -> bool {
    SERVICE_PSEUDO_RESOURCE.is_match(identifier)
}

/// Indicates whether the action may legitimately target the resource.
///
/// Unknown services are treated as valid (optimistic); an unknown action within a known service is a structural
/// deny. A `*` resource is always valid.
pub fn is_valid_action_for_resource(action: &str, resource: &str) -> bool {
    if resource == "*" {
        return true;
    }

    let (service, name) = match action.split_once(':') {
        Some(parts) => parts,
        None => return false,
    };

    let map = match SERVICE_MAPS.get(service.to_lowercase().as_str()) {
        Some(map) => map,
        None => {
            debug!("Unknown service for action {}; treating resource {} as valid", action, resource);
            return true;
        }
    };

    let resource_types = match map.action_resources.get(name.to_lowercase().as_str()) {
        Some(resource_types) => resource_types,
        None => return false,
    };

    resource_types.iter().any(|resource_type| {
        map.resource_types.get(resource_type).map(|regex| regex.is_match(resource)).unwrap_or(false)
    })
}

/// The ARN patterns for the resource types an action targets. Empty for unknown services or actions.
pub fn resource_patterns_for_action(action: &str) -> Vec<&'static Regex> {
    let (service, name) = match action.split_once(':') {
        Some(parts) => parts,
        None => return vec![],
    };

    let map = match SERVICE_MAPS.get(service.to_lowercase().as_str()) {
        Some(map) => map,
        None => return vec![],
    };

    match map.action_resources.get(name.to_lowercase().as_str()) {
        Some(resource_types) => {
            resource_types.iter().filter_map(|resource_type| map.resource_types.get(resource_type)).collect()
        }
        None => vec![],
    }
}

/// Indicates whether the action is create-style: one of its valid resource types is the service pseudo-resource.
pub(crate) fn action_accepts_service_resource(action: &str) -> bool {
    let (service, name) = match action.split_once(':') {
        Some(parts) => parts,
        None => return false,
    };

    SERVICE_MAPS
        .get(service.to_lowercase().as_str())
        .and_then(|map| map.action_resources.get(name.to_lowercase().as_str()))
        .map(|resource_types| resource_types.contains(&SERVICE_TYPE))
        .unwrap_or(false)
}
