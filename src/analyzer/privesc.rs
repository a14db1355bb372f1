//! The fixed allowlist of privilege-escalation actions the driver enumerates per principal.

/// Actions that let a principal mint, broaden, or borrow credentials, directly or through a compute service that
/// runs with a passed role. Lowercase.
pub const PRIV_ESC_ACTIONS: [&str; 48] = [
    "iam:passrole",
    "iam:createaccesskey",
    "iam:createloginprofile",
    "iam:updateloginprofile",
    "iam:attachuserpolicy",
    "iam:attachgrouppolicy",
    "iam:attachrolepolicy",
    "iam:putuserpolicy",
    "iam:putgrouppolicy",
    "iam:putrolepolicy",
    "iam:createpolicy",
    "iam:createpolicyversion",
    "iam:setdefaultpolicyversion",
    "iam:addusertogroup",
    "iam:updateassumerolepolicy",
    "iam:createuser",
    "iam:createrole",
    "sts:assumerole",
    "sts:assumerolewithsaml",
    "sts:assumerolewithwebidentity",
    "lambda:createfunction",
    "lambda:updatefunctioncode",
    "lambda:updatefunctionconfiguration",
    "lambda:invokefunction",
    "lambda:addpermission",
    "lambda:createeventsourcemapping",
    "ec2:runinstances",
    "ec2:modifyinstanceattribute",
    "cloudformation:createstack",
    "cloudformation:updatestack",
    "cloudformation:setstackpolicy",
    "ssm:sendcommand",
    "ssm:startsession",
    "ssm:startautomationexecution",
    "ecs:registertaskdefinition",
    "ecs:runtask",
    "ecs:starttask",
    "ecs:updateservice",
    "glue:createdevendpoint",
    "glue:updatedevendpoint",
    "glue:createjob",
    "glue:updatejob",
    "glue:startjobrun",
    "datapipeline:createpipeline",
    "datapipeline:putpipelinedefinition",
    "datapipeline:activatepipeline",
    "codebuild:createproject",
    "codebuild:startbuild",
];

/// Membership test against the allowlist, case-insensitive.
pub fn is_priv_esc_action(action: &str) -> bool {
    let action = action.to_lowercase();
    PRIV_ESC_ACTIONS.contains(&action.as_str())
}
