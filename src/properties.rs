use crate::error::MapError;
use macroquad::color::Color;

/// A single typed custom property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    I64(i64),
    F32(f32),
    String(String),
    Color(Color),
    /// Id of another object in the same map
    Object(u32),
    /// A nested property set declared with a custom class
    Class {
        class_name: String,
        properties: Properties,
    },
}

/// Name-keyed property bag, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `None` when the stored integer does not fit in an `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    /// Integers widen to `f32`.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            PropertyValue::F32(v) => Some(*v),
            PropertyValue::I64(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_color(&self, name: &str) -> Option<Color> {
        match self.get(name)? {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_object(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            PropertyValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Class name and members of a class-typed property.
    pub fn get_class(&self, name: &str) -> Option<(&str, &Properties)> {
        match self.get(name)? {
            PropertyValue::Class {
                class_name,
                properties,
            } => Some((class_name, properties)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry of `other` into `self`, replacing on name clashes.
    pub fn extend(&mut self, other: Properties) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }
}

/// Parse a Tiled colour: `#AARRGGBB` or `#RRGGBB`, the `#` being optional.
pub fn parse_color(text: &str) -> Option<Color> {
    let hex = text.trim().trim_start_matches('#');
    let channel = |i: usize| -> Option<f32> {
        let byte = u8::from_str_radix(hex.get(i..i + 2)?, 16).ok()?;
        Some(byte as f32 / 255.0)
    };
    match hex.len() {
        6 => Some(Color::new(channel(0)?, channel(2)?, channel(4)?, 1.0)),
        8 => Some(Color::new(channel(2)?, channel(4)?, channel(6)?, channel(0)?)),
        _ => None,
    }
}

/// Cast a textual property value (TMX attributes) by its declared type.
pub(crate) fn cast_property(
    name: &str,
    kind: Option<&str>,
    value: &str,
) -> Result<PropertyValue, MapError> {
    let invalid = |kind: &str| MapError::InvalidPropertyValue {
        name: name.to_owned(),
        kind: kind.to_owned(),
        value: value.to_owned(),
    };

    match kind {
        None | Some("string") | Some("file") => Ok(PropertyValue::String(value.to_owned())),
        Some("int") => value
            .trim()
            .parse::<i64>()
            .map(PropertyValue::I64)
            .map_err(|_| invalid("int")),
        Some("float") => value
            .trim()
            .parse::<f32>()
            .map(PropertyValue::F32)
            .map_err(|_| invalid("float")),
        Some("bool") => match value.trim() {
            "true" => Ok(PropertyValue::Bool(true)),
            "false" => Ok(PropertyValue::Bool(false)),
            _ => Err(invalid("bool")),
        },
        Some("color") => parse_color(value)
            .map(PropertyValue::Color)
            .ok_or_else(|| invalid("color")),
        Some("object") => value
            .trim()
            .parse::<u32>()
            .map(PropertyValue::Object)
            .map_err(|_| invalid("object")),
        Some(other) => Err(MapError::UnsupportedPropertyType {
            name: name.to_owned(),
            kind: other.to_owned(),
        }),
    }
}
