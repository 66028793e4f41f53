//! Input grammars accepted by the Docker daemon

use std::sync::LazyLock;

use regex_lite::Regex;

/// Container names: optional leading slash, at least two characters
pub const CONTAINER_NAME_PATTERN: &str = r"^/?[a-zA-Z0-9][a-zA-Z0-9_.-]+$";

/// A single detach key: a letter or `ctrl-` followed by one of `a-z @ ^ [ , _`
pub const DETACH_KEYS_PATTERN: &str = r"^[a-zA-Z]$|^ctrl-[a-z@\^\[,_]$";

const CTRL_PREFIX: &str = "ctrl-";

static CONTAINER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CONTAINER_NAME_PATTERN).expect("container name pattern is valid"));

static DETACH_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DETACH_KEYS_PATTERN).expect("detach key pattern is valid"));

/// Whether `name` is acceptable as a container name
///
/// The empty string is valid and lets the daemon pick a name.
pub fn is_valid_container_name(name: &str) -> bool {
    name.is_empty() || CONTAINER_NAME.is_match(name)
}

/// Whether `keys` is a valid detach key sequence
///
/// The sequence is a comma separated list of keys, e.g. `ctrl-p,ctrl-q`.
/// Because `,` is itself a valid ctrl key, splitting is done key by key
/// instead of on every comma. The empty string is valid and keeps the
/// daemon default.
pub fn is_valid_detach_keys(keys: &str) -> bool {
    if keys.is_empty() {
        return true;
    }

    let mut rest = keys;
    loop {
        let key_len = if rest.starts_with(CTRL_PREFIX) {
            match rest[CTRL_PREFIX.len()..].chars().next() {
                Some(c) => CTRL_PREFIX.len() + c.len_utf8(),
                None => return false,
            }
        } else {
            match rest.chars().next() {
                Some(c) => c.len_utf8(),
                None => return false,
            }
        };

        let (key, tail) = rest.split_at(key_len);
        if !DETACH_KEY.is_match(key) {
            return false;
        }

        if tail.is_empty() {
            return true;
        }

        match tail.strip_prefix(',') {
            Some(next) if !next.is_empty() => rest = next,
            _ => return false,
        }
    }
}
