//! Dependency field parsing.

/// Extract package names from a `Depends`-style field value.
///
/// The field is a comma-separated list of OR-groups, each group a
/// pipe-separated list of alternatives, each alternative optionally followed
/// by a parenthesized version constraint. Only the first alternative of each
/// group is taken, with the constraint and surrounding whitespace stripped.
/// No check is made that the names exist anywhere; that happens during
/// closure resolution.
///
/// ```
/// use debslim_core::depends::parse_depends;
///
/// let deps = parse_depends("libc6 (>= 2.36), debconf (>= 0.5) | debconf-2.0, adduser");
/// assert_eq!(deps, vec!["libc6", "debconf", "adduser"]);
/// ```
pub fn parse_depends(dep_str: &str) -> Vec<String> {
    let mut names = Vec::new();
    for group in dep_str.split(',') {
        // First alternative only; version solving is out of scope.
        let alt = group.split('|').next().unwrap_or("").trim();
        let name = alt
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("")
            .trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    names
}
