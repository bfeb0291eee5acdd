//! `{{ binding }}` interpolation for component render templates.

use crate::error::RenderError;
use serde_json::{Map, Value};

/// Renders `template`, replacing each `{{ path }}` with the value found at
/// the dotted `path` in `data`. Interpolated values are HTML-escaped; the
/// surrounding markup is emitted as is.
pub(crate) fn render(template: &str, data: &Map<String, Value>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open
            .find("}}")
            .ok_or(RenderError::Unterminated(offset + open))?;

        let key = after_open[..close].trim();
        let value = lookup(data, key).ok_or_else(|| RenderError::UnknownBinding(key.to_string()))?;
        escape_into(&mut out, &display(value));

        let consumed = open + 2 + close + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn interpolates_nested_and_indexed_paths() {
        let d = data(json!({"user": {"name": "Ada", "tags": ["x", "y"]}, "n": 3, "flag": true}));
        let out = render("<p>{{ user.name }}/{{user.tags.1}}/{{ n }}/{{ flag }}</p>", &d).unwrap();
        assert_eq!(out, "<p>Ada/y/3/true</p>");
    }

    #[test]
    fn escapes_values_but_not_markup() {
        let d = data(json!({"msg": "<script>alert('x')</script> & \"q\""}));
        let out = render("<b>{{ msg }}</b>", &d).unwrap();
        assert_eq!(
            out,
            "<b>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;q&quot;</b>"
        );
    }

    #[test]
    fn null_renders_empty() {
        let d = data(json!({"missing": null}));
        assert_eq!(render("[{{ missing }}]", &d).unwrap(), "[]");
    }

    #[test]
    fn unknown_binding_is_an_error() {
        let d = data(json!({"a": {"b": 1}}));
        assert_eq!(
            render("{{ a.c }}", &d),
            Err(RenderError::UnknownBinding("a.c".into()))
        );
        assert_eq!(render("{{ }}", &d), Err(RenderError::UnknownBinding(String::new())));
    }

    #[test]
    fn unterminated_binding_reports_position() {
        let d = data(json!({"a": 1}));
        assert_eq!(render("{{ a }} and {{ a", &d), Err(RenderError::Unterminated(12)));
    }

    #[test]
    fn text_without_bindings_is_unchanged() {
        let d = Map::new();
        assert_eq!(render("<div>plain }} text</div>", &d).unwrap(), "<div>plain }} text</div>");
    }
}
