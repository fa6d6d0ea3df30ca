// LogSlicer - core/sanitize.rs
//
// Maps arbitrary URL / parameter text to a file-system-safe name component.
// Core layer: pure, no I/O.

use crate::util::constants::{
    EMPTY_KEY_FILE_STEM, FORBIDDEN_FILE_NAME_CHARS, MAX_FILE_STEM_CHARS, OUTPUT_EXTENSION,
};

/// Replace every forbidden character with `_`, strip leading and trailing
/// `_`, then cut to `MAX_FILE_STEM_CHARS` characters.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)` for every `x`.
pub fn sanitize(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if FORBIDDEN_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut stem: String = replaced
        .trim_matches('_')
        .chars()
        .take(MAX_FILE_STEM_CHARS)
        .collect();

    // Truncation can expose a trailing `_` that a second pass would strip.
    let trimmed_len = stem.trim_end_matches('_').len();
    stem.truncate(trimmed_len);
    stem
}

/// File name of the output stream for a routing key: `<sanitised key>.log`.
///
/// A key that sanitises to nothing (the bare `/` path) maps to
/// `root.log` so it never produces a hidden `.log` file.
pub fn output_file_name(key: &str) -> String {
    let stem = sanitize(key);
    if stem.is_empty() {
        format!("{EMPTY_KEY_FILE_STEM}.{OUTPUT_EXTENSION}")
    } else {
        format!("{stem}.{OUTPUT_EXTENSION}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_forbidden_characters() {
        assert_eq!(sanitize("/api/v1/users?id=3"), "api_v1_users_id=3");
        assert_eq!(sanitize(r#"a\b*c:d"e<f>g|h"#), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize("line\r\n"), "line");
    }

    #[test]
    fn test_strips_edge_underscores() {
        assert_eq!(sanitize("/a"), "a");
        assert_eq!(sanitize("__/checkout/__"), "checkout");
        assert_eq!(sanitize("/"), "");
    }

    #[test]
    fn test_truncates_to_limit() {
        let long = format!("/{}", "x".repeat(400));
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), MAX_FILE_STEM_CHARS);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let long = "ü".repeat(300);
        assert_eq!(sanitize(&long).chars().count(), MAX_FILE_STEM_CHARS);
    }

    #[test]
    fn test_idempotent_and_safe_over_samples() {
        let samples = [
            "",
            "/",
            "///",
            "/a/b/c",
            "GET /x?y=z",
            "__",
            "_a_",
            "*?:\"<>|\\/\r\n",
            "/content/dam/site/en.html",
            "plain",
        ];
        let mut inputs: Vec<String> = samples.iter().map(|s| s.to_string()).collect();
        // Truncation landing on a run of separators.
        inputs.push(format!("{}/{}", "a".repeat(250), "b".repeat(10)));
        inputs.push(format!("{}//{}", "a".repeat(249), "b".repeat(10)));

        for input in &inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
            assert!(once.chars().count() <= MAX_FILE_STEM_CHARS);
            assert!(
                !once.contains(FORBIDDEN_FILE_NAME_CHARS),
                "forbidden char left in {once:?}"
            );
        }
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("/a"), "a.log");
        assert_eq!(output_file_name("/"), "root.log");
        assert_eq!(output_file_name("/shop/cart.html"), "shop_cart.html.log");
    }
}
