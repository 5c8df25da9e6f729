//! Per-recipient substitution of campaign and automation templates.

use minijinja::{context, Environment};

#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
}

/// Render one template string with the recipient's fields. Subjects and
/// bodies come from admin-edited rows, so a broken template must not take
/// down a whole batch: on render failure the raw template is sent as-is.
pub fn render_template(
    template: &str,
    email: &str,
    name: &str,
    extra: Option<&serde_json::Value>,
) -> String {
    let env = Environment::new();
    let ctx = context! {
        email => email,
        name => name,
        data => extra,
    };
    match env.render_str(template, ctx) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!("Template render failed, sending raw template: {e}");
            template.to_string()
        }
    }
}

pub fn render_recipient_message(
    subject_template: &str,
    content_template: &str,
    email: &str,
    name: &str,
    extra: Option<&serde_json::Value>,
) -> RenderedMessage {
    RenderedMessage {
        subject: render_template(subject_template, email, name, extra),
        html: render_template(content_template, email, name, extra),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_recipient_fields() {
        let rendered = render_recipient_message(
            "Fresh picks for {{ name }}",
            "<p>Hi {{ name }}, new meals are waiting near you. ({{ email }})</p>",
            "ada@example.com",
            "Ada",
            None,
        );
        assert_eq!(rendered.subject, "Fresh picks for Ada");
        assert_eq!(
            rendered.html,
            "<p>Hi Ada, new meals are waiting near you. (ada@example.com)</p>"
        );
    }

    #[test]
    fn test_extra_data_is_available() {
        let data = serde_json::json!({"listing": "Homemade lasagna"});
        let rendered = render_template(
            "Your saved listing {{ data.listing }} is back",
            "ada@example.com",
            "Ada",
            Some(&data),
        );
        assert_eq!(rendered, "Your saved listing Homemade lasagna is back");
    }

    #[test]
    fn test_broken_template_falls_back_to_raw() {
        let rendered = render_template("Hello {{ name", "ada@example.com", "Ada", None);
        assert_eq!(rendered, "Hello {{ name");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let rendered = render_template("No placeholders here", "a@b.c", "", None);
        assert_eq!(rendered, "No placeholders here");
    }
}
