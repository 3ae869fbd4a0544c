use crate::runner::definition::types::{Accessor, RuntimeClass, Struct};

/// Name of the property a bean-style accessor exposes: `getFoo` -> `foo`.
fn property_name(method: &str, prefix: &str) -> Option<String> {
    let rest = method.strip_prefix(prefix)?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    Some(first.to_ascii_lowercase().to_string() + chars.as_str())
}

pub(crate) fn build(s: &Struct) -> RuntimeClass {
    let mut runtime = RuntimeClass {
        methods: s.methods.clone(),
        ..Default::default()
    };
    for (key, method) in &s.methods {
        match key.arity {
            0 => {
                let name = property_name(&key.name, "get").or_else(|| property_name(&key.name, "is"));
                if let Some(name) = name {
                    runtime.getters.entry(name).or_insert_with(|| Accessor::Method(method.clone()));
                }
            }
            1 => {
                if let Some(name) = property_name(&key.name, "set") {
                    runtime.setters.entry(name).or_insert_with(|| method.clone());
                }
            }
            _ => {}
        }
    }
    // Declared fields win over bean accessors of the same name.
    for (name, field) in &s.members {
        runtime.getters.insert(name.clone(), Accessor::Field(field.clone()));
    }
    runtime
}

#[cfg(test)]
mod tests {
    use super::property_name;

    #[test]
    fn derives_bean_property_names() {
        assert_eq!(property_name("getLength", "get"), Some("length".to_string()));
        assert_eq!(property_name("isEmpty", "is"), Some("empty".to_string()));
        assert_eq!(property_name("get", "get"), None);
        assert_eq!(property_name("getter", "get"), None);
    }
}
