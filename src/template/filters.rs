//! Custom template filters

use minijinja::value::Value;
use minijinja::{Error, ErrorKind, State};

/// Register all custom filters with a minijinja Environment
pub fn register_filters(env: &mut minijinja::Environment) {
    env.add_filter("titlecase", filter_titlecase);
    env.add_filter("join", filter_join);
    env.add_filter("default", filter_default);
    env.add_filter("trim", filter_trim);
    env.add_filter("strftime", filter_strftime);
}

/// Upper-case the first letter of every alphabetic run and lower-case the rest
///
/// `uttar pradesh` becomes `Uttar Pradesh`, `north-east` becomes `North-East`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn filter_titlecase(_state: &State, value: Value) -> Result<Value, Error> {
    Ok(Value::from(title_case(&value.to_string())))
}

/// Join a sequence with a separator
fn filter_join(_state: &State, value: Value, sep: Option<Value>) -> Result<Value, Error> {
    let separator = sep.as_ref().and_then(|v| v.as_str()).unwrap_or(", ");

    if value.is_undefined() || value.is_none() {
        return Ok(Value::from(""));
    }

    match value.try_iter() {
        Ok(iter) => {
            let parts: Vec<String> = iter.map(|v| v.to_string()).collect();
            Ok(Value::from(parts.join(separator)))
        }
        Err(_) => Ok(Value::from(value.to_string())),
    }
}

/// Return a default value if the input is none or empty
fn filter_default(_state: &State, value: Value, default: Value) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        Ok(default)
    } else if value.as_str().is_some_and(str::is_empty) {
        Ok(default)
    } else {
        Ok(value)
    }
}

fn filter_trim(_state: &State, value: Value) -> Result<Value, Error> {
    Ok(Value::from(value.to_string().trim().to_string()))
}

/// Format a timestamp using a strftime format string
///
/// Accepts `"now"` or an RFC3339 timestamp: `{{ today | strftime("%B %Y") }}`
fn filter_strftime(_state: &State, value: Value, format: Value) -> Result<Value, Error> {
    let format_str = format.as_str().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            "strftime filter requires format string as argument",
        )
    })?;

    let datetime = match value.as_str() {
        Some("now") => chrono::Utc::now(),
        Some(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map_err(|e| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("Failed to parse datetime: {}", e),
                )
            })?
            .with_timezone(&chrono::Utc),
        None => {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "strftime filter requires string input (\"now\" or RFC3339 timestamp)",
            ));
        }
    };

    Ok(Value::from(datetime.format(format_str).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::Environment;

    fn render(template: &str, ctx: Value) -> String {
        let mut env = Environment::new();
        register_filters(&mut env);
        env.add_template("test", template).unwrap();
        env.get_template("test").unwrap().render(ctx).unwrap()
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("uttar pradesh"), "Uttar Pradesh");
        assert_eq!(title_case("DELHI"), "Delhi");
        assert_eq!(title_case("north-east"), "North-East");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_titlecase_filter() {
        let result = render(
            "{{ value | titlecase }}",
            minijinja::context! { value => "sandy loam" },
        );
        assert_eq!(result, "Sandy Loam");
    }

    #[test]
    fn test_join_filter_custom_separator() {
        let result = render(
            r"{{ items | join('\n') }}",
            minijinja::context! { items => vec!["a", "b"] },
        );
        assert_eq!(result, "a\nb");
    }

    #[test]
    fn test_join_filter_none() {
        let result = render("[{{ items | join }}]", minijinja::context! { items => () });
        assert_eq!(result, "[]");
    }

    #[test]
    fn test_default_filter() {
        let result = render(
            "{{ weather | default('Weather data unavailable') }}",
            minijinja::context! { weather => () },
        );
        assert_eq!(result, "Weather data unavailable");

        let result = render(
            "{{ weather | default('x') }}",
            minijinja::context! { weather => "sunny" },
        );
        assert_eq!(result, "sunny");
    }

    #[test]
    fn test_trim_filter() {
        let result = render("{{ q | trim }}", minijinja::context! { q => "  wheat  " });
        assert_eq!(result, "wheat");
    }

    #[test]
    fn test_strftime_filter_rfc3339() {
        let result = render(
            "{{ today | strftime('%B %Y') }}",
            minijinja::context! { today => "2025-09-14T10:00:00+00:00" },
        );
        assert_eq!(result, "September 2025");
    }

    #[test]
    fn test_strftime_filter_now() {
        let result = render("{{ 'now' | strftime('%Y') }}", minijinja::context! {});
        assert_eq!(result.len(), 4);
    }
}
