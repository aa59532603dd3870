use std::sync::OnceLock;

use regex::Regex;

/// Expand `{{ env.VAR }}` placeholders in a raw TOML string
///
/// An optional fallback is supported via `{{ env.VAR | default("value") }}`;
/// when the variable is unset the fallback is substituted instead of
/// returning an error. Comment lines are passed through untouched so a
/// commented-out secret never fails the load.
pub fn expand_env(input: &str) -> Result<String, String> {
    fn placeholder_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
                .expect("must be valid regex")
        })
    }

    let mut output = String::with_capacity(input.len());

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut cursor = 0;
        for captures in placeholder_re().captures_iter(line) {
            let whole = captures.get(0).expect("capture 0 always present");
            let var_name = &captures[1];
            let fallback = captures.get(2).map(|m| m.as_str());

            output.push_str(&line[cursor..whole.start()]);

            match std::env::var(var_name) {
                Ok(value) => output.push_str(&value),
                Err(_) => match fallback {
                    Some(default) => output.push_str(default),
                    None => return Err(format!("environment variable not found: `{var_name}`")),
                },
            }

            cursor = whole.end();
        }
        output.push_str(&line[cursor..]);
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_without_placeholders() {
        let input = "model = \"deepseek-chat\"";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn substitutes_set_variable() {
        temp_env::with_var("CHORUS_TEST_KEY", Some("sk-123"), || {
            let out = expand_env("api_key = \"{{ env.CHORUS_TEST_KEY }}\"").unwrap();
            assert_eq!(out, "api_key = \"sk-123\"");
        });
    }

    #[test]
    fn missing_variable_errors() {
        temp_env::with_var_unset("CHORUS_MISSING", || {
            let err = expand_env("k = \"{{ env.CHORUS_MISSING }}\"").unwrap_err();
            assert!(err.contains("CHORUS_MISSING"));
        });
    }

    #[test]
    fn fallback_used_when_unset() {
        temp_env::with_var_unset("CHORUS_OPT", || {
            let out = expand_env("k = \"{{ env.CHORUS_OPT | default(\"none\") }}\"").unwrap();
            assert_eq!(out, "k = \"none\"");
        });
    }

    #[test]
    fn fallback_ignored_when_set() {
        temp_env::with_var("CHORUS_OPT", Some("real"), || {
            let out = expand_env("k = \"{{ env.CHORUS_OPT | default(\"none\") }}\"").unwrap();
            assert_eq!(out, "k = \"real\"");
        });
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("CHORUS_MISSING", || {
            let input = "  # k = \"{{ env.CHORUS_MISSING }}\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
