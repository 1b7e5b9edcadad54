//! Prompt templates with explicitly declared placeholders.
//!
//! Placeholders are `{name}` where `name` is an identifier. Formatting
//! substitutes every declared placeholder and fails if a value for one of
//! them is missing; extra values are ignored. Anything else in the template
//! (control tokens such as `<|eot_id|>` or `[INST]`) is emitted verbatim.

use std::borrow::Cow;

use pl_domain::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: Cow<'static, str>,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// Build a template, declaring every `{identifier}` found in it.
    pub fn from_template(template: impl Into<Cow<'static, str>>) -> Self {
        let template = template.into();
        let mut input_variables = Vec::new();
        for (_, name, _) in placeholders(&template) {
            if !input_variables.iter().any(|v| v == name) {
                input_variables.push(name.to_string());
            }
        }
        Self {
            template,
            input_variables,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    pub fn declares(&self, name: &str) -> bool {
        self.input_variables.iter().any(|v| v == name)
    }

    /// Render with `values` (`(name, value)` pairs).
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let lookup = |name: &str| values.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

        if let Some(missing) = self.input_variables.iter().find(|v| lookup(v.as_str()).is_none()) {
            return Err(Error::Template(format!("missing value for {{{missing}}}")));
        }

        let mut out = String::with_capacity(self.template.len());
        let mut cursor = 0;
        for (start, name, end) in placeholders(&self.template) {
            out.push_str(&self.template[cursor..start]);
            out.push_str(lookup(name).unwrap_or_default());
            cursor = end;
        }
        out.push_str(&self.template[cursor..]);
        Ok(out)
    }
}

/// `(start, name, end)` byte spans of every `{identifier}` in `s`.
fn placeholders(s: &str) -> Vec<(usize, &str, usize)> {
    let mut found = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(rel) = s[i + 1..].find('}') {
                let name = &s[i + 1..i + 1 + rel];
                if is_identifier(name) {
                    let end = i + rel + 2;
                    found.push((i, name, end));
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }
    found
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_placeholders_in_order() {
        let t = PromptTemplate::from_template("{chat_history}\nQ: {input} {input}");
        assert_eq!(t.input_variables(), ["chat_history", "input"]);
    }

    #[test]
    fn formats_all_occurrences() {
        let t = PromptTemplate::from_template("{a}-{b}-{a}");
        assert_eq!(t.format(&[("a", "x"), ("b", "y")]).unwrap(), "x-y-x");
    }

    #[test]
    fn missing_value_is_an_error() {
        let t = PromptTemplate::from_template("Context: {context}\n{question}");
        let err = t.format(&[("question", "q")]).unwrap_err();
        assert!(err.to_string().contains("{context}"));
    }

    #[test]
    fn extra_values_are_ignored() {
        let t = PromptTemplate::from_template("{question}");
        assert_eq!(
            t.format(&[("question", "q"), ("chat_history", "h")]).unwrap(),
            "q"
        );
    }

    #[test]
    fn control_tokens_pass_through() {
        let t = PromptTemplate::from_template("<|eot_id|>{input}<</SYS>> {not an id} {}");
        assert_eq!(t.input_variables(), ["input"]);
        assert_eq!(
            t.format(&[("input", "hi")]).unwrap(),
            "<|eot_id|>hi<</SYS>> {not an id} {}"
        );
    }

    #[test]
    fn values_are_not_reinterpreted() {
        let t = PromptTemplate::from_template("{input}");
        assert_eq!(t.format(&[("input", "{context}")]).unwrap(), "{context}");
    }

    #[test]
    fn non_ascii_text_around_placeholders() {
        let t = PromptTemplate::from_template("¿{q}? — ok");
        assert_eq!(t.format(&[("q", "qué")]).unwrap(), "¿qué? — ok");
    }
}
