use super::Error;

pub const UNEXPECTED_TOKEN: &str = "unexpected token";
pub const UNEXPECTED_DIRECTIVE: &str = "unexpected directive";
pub const UNKNOWN_DIRECTIVE: &str = "unknown directive";
pub const UNEXPECTED_EOF: &str = "unexpected eof";
pub const INVALID_SYNTAX: &str = "invalid syntax";
pub const INVALID_FILTER: &str = "invalid filter";
pub const INCOMPATIBLE_TYPES: &str = "incompatible types";
pub const NOT_ALLOWED: &str = "not allowed";

/// Return an [`Error`] explaining that the write operation failed.
///
/// This is likely caused by a failure during a `write!` macro operation.
pub fn error_write() -> Error {
    Error::render("write failure")
        .with_help("failed to write result of render, are you low on memory?")
}

/// Return an [`Error`] describing a missing template.
pub fn error_missing_template(name: &str) -> Error {
    Error::render("missing template").with_help(format!(
        "template `{name}` not found, add it with `.add_template` \
        or provide a resolver with `.with_resolver`"
    ))
}

/// Return an [`Error`] describing a recursion depth overflow, which is
/// most likely caused by an inheritance or include cycle.
pub fn error_max_depth(name: &str) -> Error {
    Error::render("maximum template depth exceeded").with_help(format!(
        "loading `{name}` exceeds the nesting limit, do your templates \
        include or extend each other in a cycle?"
    ))
}
