//! Checks on names that become filesystem path components.

/// Returns true when `name` can be joined onto a directory as exactly one
/// new path component.
///
/// Rejects empty names, `.` and `..`, and anything containing a separator
/// or NUL, so a nickname can never escape the output root.
pub fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
