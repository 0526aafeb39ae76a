//! Notification template rendering.
//!
//! Templates use `{{key}}` placeholders resolved against a JSON variable bag.
//! Missing or null variables render as the empty string so a badly-populated
//! data bag degrades to blank text rather than a failed send. Every
//! interpolated value is HTML-escaped in both the plain and HTML bodies; the
//! plain body shares the escaping so the same rendered text is safe to embed
//! in any HTML sink downstream.

use std::collections::HashMap;

use crate::channel::NotificationKind;

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A registered notification template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Registry key. Default templates use the kind name as their id.
    pub id: String,
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
    /// Variable names that `validate_variables` reports when absent.
    pub required: Vec<String>,
}

/// The result of rendering a template against a variable bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a template against a JSON variable bag.
///
/// Never fails: unknown placeholders become empty strings.
pub fn render(template: &Template, vars: &serde_json::Value) -> Rendered {
    Rendered {
        subject: interpolate(&template.subject, vars),
        body: interpolate(&template.body, vars),
        html_body: template.html_body.as_ref().map(|h| interpolate(h, vars)),
    }
}

/// Return the names of required variables missing from the bag.
///
/// Advisory only: callers use this in admin/preview flows. The send path
/// renders regardless and lets missing variables degrade to empty text.
pub fn validate_variables(template: &Template, vars: &serde_json::Value) -> Vec<String> {
    template
        .required
        .iter()
        .filter(|name| lookup(vars, name).is_none())
        .cloned()
        .collect()
}

/// Replace every `{{key}}` placeholder with the escaped variable value.
fn interpolate(text: &str, vars: &serde_json::Value) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = lookup(vars, key) {
                    out.push_str(&escape_html(&value));
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated placeholder: emit verbatim.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolve a variable to its display string. Null and missing are both `None`.
fn lookup(vars: &serde_json::Value, key: &str) -> Option<String> {
    match vars.get(key)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// TemplateRegistry
// ---------------------------------------------------------------------------

/// Maps notification kinds and custom ids to templates.
///
/// Seeded with a default template per [`NotificationKind`]; custom templates
/// registered under an existing id replace it.
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Create an empty registry with no templates at all.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the default template per kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            templates: HashMap::new(),
        };
        for kind in NotificationKind::all() {
            registry.register(default_template(kind));
        }
        registry
    }

    /// Register a template under its id, replacing any previous entry.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Look up a template by id.
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Look up the default template for a notification kind.
    pub fn for_kind(&self, kind: NotificationKind) -> Option<&Template> {
        self.templates.get(kind.as_str())
    }
}

/// Build the built-in template for a notification kind.
fn default_template(kind: NotificationKind) -> Template {
    let (subject, body, required) = match kind {
        NotificationKind::FileUploaded => (
            "File uploaded: {{file_name}}",
            "{{file_name}} was uploaded to {{folder_name}}.",
            vec!["file_name"],
        ),
        NotificationKind::FileShared => (
            "{{shared_by}} shared a file with you",
            "{{shared_by}} shared {{file_name}} with you.",
            vec!["file_name", "shared_by"],
        ),
        NotificationKind::FileDeleted => (
            "File deleted: {{file_name}}",
            "{{file_name}} was deleted.",
            vec!["file_name"],
        ),
        NotificationKind::ProcessingCompleted => (
            "Processing finished for {{file_name}}",
            "Processing of {{file_name}} completed successfully.",
            vec!["file_name"],
        ),
        NotificationKind::ProcessingFailed => (
            "Processing failed for {{file_name}}",
            "Processing of {{file_name}} failed: {{error}}",
            vec!["file_name"],
        ),
        NotificationKind::StorageQuotaWarning => (
            "Storage quota warning",
            "You have used {{used_percent}}% of your storage quota.",
            vec!["used_percent"],
        ),
        NotificationKind::SecurityAlert => (
            "Security alert",
            "{{message}}",
            vec!["message"],
        ),
        NotificationKind::SystemAnnouncement => (
            "{{title}}",
            "{{message}}",
            vec![],
        ),
    };

    Template {
        id: kind.as_str().to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        html_body: Some(format!("<p>{body}</p>")),
        required: required.into_iter().map(String::from).collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(subject: &str, body: &str) -> Template {
        Template {
            id: "t".into(),
            subject: subject.into(),
            body: body.into(),
            html_body: None,
            required: vec![],
        }
    }

    #[test]
    fn interpolates_string_variables() {
        let t = template("Hello {{name}}", "Welcome, {{name}}!");
        let out = render(&t, &json!({"name": "alice"}));
        assert_eq!(out.subject, "Hello alice");
        assert_eq!(out.body, "Welcome, alice!");
    }

    #[test]
    fn missing_variable_renders_empty() {
        let t = template("Hi {{name}}", "{{missing}} end");
        let out = render(&t, &json!({"name": "bob"}));
        assert_eq!(out.body, " end");
    }

    #[test]
    fn null_variable_renders_empty() {
        let t = template("s", "value: {{v}}");
        let out = render(&t, &json!({"v": null}));
        assert_eq!(out.body, "value: ");
    }

    #[test]
    fn non_string_variables_are_stringified() {
        let t = template("s", "count: {{n}}, flag: {{b}}");
        let out = render(&t, &json!({"n": 7, "b": true}));
        assert_eq!(out.body, "count: 7, flag: true");
    }

    #[test]
    fn interpolated_values_are_html_escaped() {
        let t = template("s", "{{payload}}");
        let out = render(&t, &json!({"payload": "<script>&\"'</script>"}));
        assert_eq!(out.body, "&lt;script&gt;&amp;&quot;&#39;&lt;/script&gt;");
    }

    #[test]
    fn html_body_is_rendered_when_present() {
        let mut t = template("s", "b");
        t.html_body = Some("<b>{{name}}</b>".into());
        let out = render(&t, &json!({"name": "x"}));
        assert_eq!(out.html_body.as_deref(), Some("<b>x</b>"));
    }

    #[test]
    fn unterminated_placeholder_is_left_verbatim() {
        let t = template("s", "broken {{tail");
        let out = render(&t, &json!({}));
        assert_eq!(out.body, "broken {{tail");
    }

    #[test]
    fn placeholder_key_is_trimmed() {
        let t = template("s", "{{ name }}");
        let out = render(&t, &json!({"name": "spaced"}));
        assert_eq!(out.body, "spaced");
    }

    #[test]
    fn validate_reports_missing_required() {
        let mut t = template("s", "b");
        t.required = vec!["file_name".into(), "shared_by".into()];
        let missing = validate_variables(&t, &json!({"file_name": "doc.pdf"}));
        assert_eq!(missing, vec!["shared_by".to_string()]);
    }

    #[test]
    fn validate_treats_null_as_missing() {
        let mut t = template("s", "b");
        t.required = vec!["v".into()];
        assert_eq!(validate_variables(&t, &json!({"v": null})), vec!["v"]);
    }

    #[test]
    fn registry_has_default_for_every_kind() {
        let registry = TemplateRegistry::with_defaults();
        for kind in NotificationKind::all() {
            assert!(registry.for_kind(kind).is_some(), "no default for {kind}");
        }
    }

    #[test]
    fn registering_same_id_replaces() {
        let mut registry = TemplateRegistry::with_defaults();
        registry.register(Template {
            id: "file_uploaded".into(),
            subject: "custom".into(),
            body: "custom".into(),
            html_body: None,
            required: vec![],
        });
        let t = registry.for_kind(NotificationKind::FileUploaded).unwrap();
        assert_eq!(t.subject, "custom");
    }

    #[test]
    fn custom_template_retrievable_by_id() {
        let mut registry = TemplateRegistry::with_defaults();
        registry.register(Template {
            id: "weekly-report".into(),
            subject: "Report {{week}}".into(),
            body: "b".into(),
            html_body: None,
            required: vec!["week".into()],
        });
        assert!(registry.get("weekly-report").is_some());
    }
}
