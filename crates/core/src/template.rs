//! Prompt template rendering.
//!
//! Templates use `{name}` placeholders. Rendering is a single left-to-right
//! pass, so placeholder-looking text inside substituted values (a user
//! asking about `{input}`, say) is never expanded a second time.

/// Render `template`, replacing each `{name}` with its value from `vars`.
///
/// Unknown placeholders and unmatched braces are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, close))
        });

        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let out = render("Question: {input}\nAnswer:", &[("input", "What is Git?")]);
        assert_eq!(out, "Question: What is Git?\nAnswer:");
    }

    #[test]
    fn values_are_not_re_expanded() {
        let out = render(
            "{context} / {input}",
            &[("context", "literal {input}"), ("input", "q")],
        );
        assert_eq!(out, "literal {input} / q");
    }

    #[test]
    fn unknown_and_unbalanced_braces_survive() {
        let out = render("{unknown} {input} {", &[("input", "x")]);
        assert_eq!(out, "{unknown} x {");
    }

    #[test]
    fn repeated_placeholders() {
        let out = render("{a}{a}", &[("a", "1")]);
        assert_eq!(out, "11");
    }
}
