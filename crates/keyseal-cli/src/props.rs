use std::{collections::BTreeMap, fs, path::Path};

use color_eyre::Result;
use keyseal_core::{
    properties::{decrypt_properties, Environment, PropertySource},
    EnvelopeCodec,
};

/// Leaf value of a property file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// String value; the only kind that can carry an encrypted envelope.
    Text(String),
    /// Any other scalar or array, already rendered in its file syntax.
    Literal(String),
}

/// Read a TOML or JSON property file, flattening nested tables to dotted keys.
pub fn read_properties(path: &Path) -> Result<BTreeMap<String, Property>> {
    let contents = fs::read_to_string(path)?;
    let mut out = BTreeMap::new();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => flatten_json("", serde_json::from_str(&contents)?, &mut out),
        _ => flatten_toml("", toml::Value::Table(toml::from_str(&contents)?), &mut out),
    }
    Ok(out)
}

fn join_key(prefix: &str, key: String) -> String {
    if prefix.is_empty() {
        key
    } else {
        format!("{prefix}.{key}")
    }
}

fn flatten_json(prefix: &str, value: serde_json::Value, out: &mut BTreeMap<String, Property>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                flatten_json(&join_key(prefix, key), nested, out);
            }
        }
        serde_json::Value::String(s) => {
            out.insert(prefix.to_string(), Property::Text(s));
        }
        other => {
            out.insert(prefix.to_string(), Property::Literal(other.to_string()));
        }
    }
}

fn flatten_toml(prefix: &str, value: toml::Value, out: &mut BTreeMap<String, Property>) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                flatten_toml(&join_key(prefix, key), nested, out);
            }
        }
        toml::Value::String(s) => {
            out.insert(prefix.to_string(), Property::Text(s));
        }
        other => {
            out.insert(prefix.to_string(), Property::Literal(other.to_string()));
        }
    }
}

/// Render `key = value` lines with every `{AES256}` string decrypted.
pub fn render_decrypted(path: &Path, codec: &EnvelopeCodec) -> Result<Vec<String>> {
    let properties = read_properties(path)?;

    let mut source = PropertySource::new(path.display().to_string());
    for (key, value) in &properties {
        if let Property::Text(s) = value {
            source.properties.insert(key.clone(), s.clone());
        }
    }
    let mut env = Environment::new();
    env.add_last(source);
    decrypt_properties(&mut env, codec)?;

    let lines = properties
        .iter()
        .map(|(key, value)| match (env.get(key), value) {
            (Some(text), _) => format!("{key} = {text:?}"),
            (None, Property::Literal(raw)) => format!("{key} = {raw}"),
            (None, Property::Text(raw)) => format!("{key} = {raw:?}"),
        })
        .collect();
    Ok(lines)
}
