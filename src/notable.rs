/// Targets the engine requests on its own behalf, for cross-targeting and IDE
/// support. A project run that asks for exactly one of these is noise.
const INTROSPECTION_TARGETS: &[&str] = &[
    "GetTargetFrameworks",
    "GetNativeManifest",
    "GetCopyToOutputDirectoryItems",
];

/// Decides whether a project run should be reported when it completes.
///
/// An empty target list is the default build request and always counts.
/// Anything other than a single introspection target is assumed to be
/// something the user asked for.
pub fn is_notable(requested_targets: &str) -> bool {
    !INTROSPECTION_TARGETS.contains(&requested_targets)
}
