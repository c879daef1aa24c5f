//! `class` prop normalization.

use crate::reactive::Value;

/// Flatten a `class` value into one space-separated string.
///
/// Strings pass through, lists are flattened recursively, and objects
/// contribute the names of their truthy fields. Anything else contributes
/// nothing.
pub fn normalize_class(value: &Value) -> String {
    let mut out = String::new();
    push_class(value, &mut out);
    out
}

fn push_class(value: &Value, out: &mut String) {
    match value {
        Value::Str(s) => push_word(s.trim(), out),
        Value::List(items) => {
            for item in items.iter() {
                push_class(item, out);
            }
        }
        Value::Object(object) => {
            for (name, flag) in object.entries() {
                if flag.is_truthy() {
                    push_word(&name, out);
                }
            }
        }
        Value::Proxy(proxy) => {
            for name in proxy.keys() {
                if proxy.get(&name).is_truthy() {
                    push_word(&name, out);
                }
            }
        }
        Value::Ref(r) => push_class(&r.get(), out),
        _ => {}
    }
}

fn push_word(word: &str, out: &mut String) {
    if word.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(word);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Object;

    #[test]
    fn strings_pass_through() {
        assert_eq!(normalize_class(&Value::from("a b")), "a b");
        assert_eq!(normalize_class(&Value::Null), "");
    }

    #[test]
    fn lists_and_objects_flatten() {
        let flags = Object::from_iter([("active", true), ("hidden", false), ("big", true)]);
        let value = Value::from(vec![
            Value::from("btn"),
            Value::from(vec![Value::from(""), Value::from("primary")]),
            Value::from(flags),
        ]);
        assert_eq!(normalize_class(&value), "btn primary active big");
    }
}
