//! Prompt templates.
//!
//! The router and every capability handler send a fixed prompt with a few
//! holes in it. Holes use `{{variable}}` syntax; single braces are left
//! alone so templates can show literal JSON examples.

use tracing::warn;

/// A named prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Template name (used in logs).
    pub name: &'static str,
    /// Template content with placeholders.
    pub content: &'static str,
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub const fn new(name: &'static str, content: &'static str) -> Self {
        Self { name, content }
    }

    /// Renders the template, substituting each `{{name}}` with its value.
    ///
    /// The template is scanned once, so placeholder syntax inside a value
    /// (a user quoting `{{message}}`, say) is copied verbatim. Placeholders
    /// without a value are left in place and logged.
    #[must_use]
    pub fn render(&self, variables: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.content.len());
        let mut missing: Vec<&str> = Vec::new();
        let mut rest = self.content;

        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                break;
            };
            let name = &after[..end];
            if !is_identifier(name) {
                out.push_str(&rest[..start + 2]);
                rest = after;
                continue;
            }

            out.push_str(&rest[..start]);
            match variables.iter().find(|(v, _)| *v == name) {
                Some((_, value)) => out.push_str(value),
                None => {
                    out.push_str(&rest[start..start + end + 4]);
                    if !missing.contains(&name) {
                        missing.push(name);
                    }
                }
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);

        if !missing.is_empty() {
            warn!(template = self.name, ?missing, "prompt placeholders without values");
        }
        out.trim().to_string()
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETING: PromptTemplate = PromptTemplate::new(
        "greeting",
        "Hello {{name}}, today is {{day}}. Reply as {\"response\": \"...\"}",
    );

    #[test]
    fn render_substitutes_variables() {
        let rendered = GREETING.render(&[("name", "Ada"), ("day", "Friday")]);
        assert_eq!(
            rendered,
            "Hello Ada, today is Friday. Reply as {\"response\": \"...\"}"
        );
    }

    #[test]
    fn render_repeats_substitution() {
        let template = PromptTemplate::new("twice", "{{x}} and {{x}}");
        assert_eq!(template.render(&[("x", "a")]), "a and a");
    }

    #[test]
    fn missing_values_leave_placeholder() {
        let template = PromptTemplate::new("t", "{{a}} {{b}} {{a}}");
        assert_eq!(template.render(&[("b", "B")]), "{{a}} B {{a}}");
    }

    #[test]
    fn literal_json_is_not_a_placeholder() {
        let template = PromptTemplate::new("json", r#"Return {{"a": 1}} or {"x": {{n}}}"#);
        assert_eq!(template.render(&[("n", "2")]), r#"Return {{"a": 1}} or {"x": 2}"#);
    }

    #[test]
    fn placeholders_inside_values_are_not_expanded() {
        let template = PromptTemplate::new("chat", "{{context}}\nUser message: {{message}}");
        let rendered = template.render(&[
            ("context", "User: what does {{message}} mean?"),
            ("message", "hello"),
        ]);
        assert_eq!(
            rendered,
            "User: what does {{message}} mean?\nUser message: hello"
        );
    }
}
