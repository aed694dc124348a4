//! Masking of credential-looking values before they reach the build log
//!
//! Publish flags such as `-p:Password=...` or `--api-key ...` end up in the
//! logged command line; their values are replaced by [`MASK`] in full.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `key=value` / `key:value` pairs whose key names a secret
    static ref SECRET_ASSIGNMENT: Regex =
        Regex::new(r"(?i)^(.*(?:password|passwd|secret|token|api-?key|access-?key)[^=:]*[=:])(.+)$")
            .expect("secret assignment pattern is valid");

    /// Flags whose *next* argument is a secret
    static ref SECRET_FLAG: Regex =
        Regex::new(r"(?i)^--?(?:password|api-?key|token|secret)$")
            .expect("secret flag pattern is valid");
}

/// Replacement for every secret value
pub const MASK: &str = "****";

/// Copy of `args` with secret values masked
pub fn redact_args(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;

    for arg in args {
        if mask_next {
            redacted.push(MASK.to_string());
            mask_next = false;
            continue;
        }

        if SECRET_FLAG.is_match(arg) {
            mask_next = true;
            redacted.push(arg.clone());
        } else if let Some(caps) = SECRET_ASSIGNMENT.captures(arg) {
            redacted.push(format!("{}{}", &caps[1], MASK));
        } else {
            redacted.push(arg.clone());
        }
    }

    redacted
}
