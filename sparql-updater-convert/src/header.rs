//! Turtle header directive detection

const TURTLE_DIRECTIVES: &[&str] = &["@prefix", "@base"];
const SPARQL_DIRECTIVES: &[&str] = &["PREFIX", "BASE"];

/// Whether `line` is a namespace/base declaration.
///
/// Turtle-style `@prefix` / `@base` are case sensitive; SPARQL-style
/// `PREFIX` / `BASE` are not, and must be followed by whitespace so that a
/// prefixed name such as `base:x` is not mistaken for a directive.
pub fn is_header_line(line: &str) -> bool {
    let line = line.trim_start();
    if TURTLE_DIRECTIVES.iter().any(|d| line.starts_with(d)) {
        return true;
    }
    SPARQL_DIRECTIVES.iter().any(|d| {
        line.len() > d.len()
            && line.is_char_boundary(d.len())
            && line[..d.len()].eq_ignore_ascii_case(d)
            && line[d.len()..].starts_with(char::is_whitespace)
    })
}
