//! Props resolution.
//!
//! Raw vnode props are split between declared props and fallthrough
//! attributes. Declared props live in a shallow-reactive object so render
//! effects re-run when a parent passes new values; attributes are a plain
//! object read fresh on every render.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::warn;

use super::descriptor::{Component, PropOptions, PropType};
use crate::reactive::{Object, Proxy, Value};
use crate::vnode::{Props, VNode};

/// `foo-bar-baz` to `fooBarBaz`.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    if upper_next {
        out.push('-');
    }
    out
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Prop name of the handler for `event`: `item-click` to `onItemClick`.
pub fn to_handler_key(event: &str) -> String {
    format!("on{}", capitalize(&camelize(event)))
}

/// Apply defaults and boolean casting to one declared prop.
fn resolve_prop_value(options: &PropOptions, value: Option<&Value>) -> Value {
    let value = match (value, &options.default) {
        (Some(value), _) => Some(value.clone()),
        (None, Some(default)) => Some(default.resolve()),
        (None, None) => None,
    };

    if options.ty == Some(PropType::Bool) {
        return match value {
            None => Value::Bool(false),
            Some(Value::Str(s)) if s.is_empty() => Value::Bool(true),
            Some(value) => value,
        };
    }
    value.unwrap_or_default()
}

fn validate_prop(def: &Component, name: &str, options: &PropOptions, value: Option<&Value>) {
    match value {
        None if options.required => {
            warn!(component = def.name(), prop = name, "missing required prop");
        }
        Some(value) if !value.is_null() => {
            if let Some(ty) = options.ty {
                if !ty.matches(value) {
                    warn!(
                        component = def.name(),
                        prop = name,
                        expected = ty.name(),
                        got = value.type_name(),
                        "invalid prop type"
                    );
                }
            }
        }
        _ => {}
    }
}

/// Camelized raw prop name to value.
fn camelized(raw: &Props) -> IndexMap<String, (&Rc<str>, &Value)> {
    raw.iter()
        .map(|(key, value)| (camelize(key), (key, value)))
        .collect()
}

/// First resolution, before setup runs. Writes go to the raw objects so
/// nothing is triggered.
pub(crate) fn init_props(def: &Component, raw: &Props, props: &Object, attrs: &Object) {
    let Some(options) = def.props() else {
        for (key, value) in raw {
            attrs.insert(Rc::clone(key), value.clone());
        }
        return;
    };

    let by_camel = camelized(raw);
    for (camel, (key, value)) in &by_camel {
        if !options.contains_key(camel.as_str()) {
            attrs.insert(Rc::clone(key), (*value).clone());
        }
    }
    for (name, prop) in options {
        let passed = by_camel.get(name.as_ref()).map(|(_, value)| *value);
        validate_prop(def, name, prop, passed);
        props.insert(Rc::clone(name), resolve_prop_value(prop, passed));
    }
}

/// Re-resolution from a new vnode. Prop writes go through the reactive
/// proxy so dependents of changed props are triggered.
pub(crate) fn update_props(def: &Component, raw: &Props, props: &Proxy, attrs: &Object) {
    let Some(options) = def.props() else {
        sync_attrs(attrs, raw.iter().map(|(key, value)| (Rc::clone(key), value.clone())));
        return;
    };

    let by_camel = camelized(raw);
    for (name, prop) in options {
        let passed = by_camel.get(name.as_ref()).map(|(_, value)| *value);
        validate_prop(def, name, prop, passed);
        props.set(name, resolve_prop_value(prop, passed));
    }
    sync_attrs(
        attrs,
        by_camel
            .iter()
            .filter(|(camel, _)| !options.contains_key(camel.as_str()))
            .map(|(_, (key, value))| (Rc::clone(key), (*value).clone())),
    );
}

fn sync_attrs(attrs: &Object, next: impl Iterator<Item = (Rc<str>, Value)>) {
    let next: Props = next.collect();
    for key in attrs.keys() {
        if !next.contains_key(&key) {
            attrs.remove(&key);
        }
    }
    for (key, value) in next {
        attrs.insert(key, value);
    }
}

/// Whether a component vnode patch must re-render the child.
///
/// Any slot content forces an update. Otherwise props are compared with
/// value equality (identity for compound values).
pub(crate) fn should_update_component(prev: &VNode, next: &VNode) -> bool {
    if !prev.children().is_none() || !next.children().is_none() {
        return true;
    }
    let (prev, next) = (prev.props(), next.props());
    if prev.len() != next.len() {
        return true;
    }
    next.iter().any(|(key, value)| prev.get(key) != Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use crate::reactive::Runtime;
    use crate::vnode::{component, h};

    #[test]
    fn camelize_handles_dashes() {
        assert_eq!(camelize("foo-bar-baz"), "fooBarBaz");
        assert_eq!(camelize("plain"), "plain");
        assert_eq!(to_handler_key("item-click"), "onItemClick");
        assert_eq!(to_handler_key("change"), "onChange");
    }

    #[test]
    fn declared_props_and_attrs_are_split() {
        let def = Component::builder("Item")
            .props(["label"])
            .prop("is-active", PropOptions::new().ty(PropType::Bool))
            .prop("size", PropOptions::new().default_value(3))
            .build();
        let raw = props! { "label" => "hi", "id" => "x", "class" => "c" };
        let (props, attrs) = (Object::new(), Object::new());
        init_props(&def, &raw, &props, &attrs);

        assert_eq!(props.get("label"), Some(Value::from("hi")));
        assert_eq!(props.get("isActive"), Some(Value::Bool(false)));
        assert_eq!(props.get("size"), Some(Value::from(3)));
        assert_eq!(attrs.keys().len(), 2);
        assert!(attrs.contains_key("id"));
    }

    #[test]
    fn empty_string_casts_boolean_props_to_true() {
        let def = Component::builder("Toggle")
            .prop("disabled", PropOptions::new().ty(PropType::Bool))
            .build();
        let (props, attrs) = (Object::new(), Object::new());
        init_props(&def, &props! { "disabled" => "" }, &props, &attrs);
        assert_eq!(props.get("disabled"), Some(Value::Bool(true)));
    }

    #[test]
    fn without_declarations_everything_is_an_attr() {
        let def = Component::builder("Bare").build();
        let (props, attrs) = (Object::new(), Object::new());
        init_props(&def, &props! { "a" => 1 }, &props, &attrs);
        assert!(props.is_empty());
        assert_eq!(attrs.get("a"), Some(Value::from(1)));
    }

    #[test]
    fn update_resets_removed_props_and_attrs() {
        let rt = Runtime::new();
        let def = Component::builder("Item")
            .prop("size", PropOptions::new().default_value(3))
            .build();
        let (raw_props, attrs) = (Object::new(), Object::new());
        init_props(&def, &props! { "size" => 9, "title" => "t" }, &raw_props, &attrs);
        assert_eq!(raw_props.get("size"), Some(Value::from(9)));

        let props = rt.shallow_reactive(raw_props.clone());
        update_props(&def, &props! {}, &props, &attrs);
        assert_eq!(raw_props.get("size"), Some(Value::from(3)));
        assert!(attrs.is_empty());
    }

    #[test]
    fn should_update_compares_props() {
        let def = Component::builder("Item").build();
        let a = component(&def, props! { "n" => 1 }, ());
        let b = component(&def, props! { "n" => 1 }, ());
        let c = component(&def, props! { "n" => 2 }, ());
        let d = component(&def, props! {}, vec![h("p", props! {}, ())]);
        assert!(!should_update_component(&a, &b));
        assert!(should_update_component(&a, &c));
        assert!(should_update_component(&a, &d));
    }
}
