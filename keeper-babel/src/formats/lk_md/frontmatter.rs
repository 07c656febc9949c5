//! YAML frontmatter of folder-markdown pages

use crate::model::{Appearance, Banner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    /// Exact display name, when the file name could not hold it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "ListField::is_empty")]
    pub tags: ListField,
    #[serde(skip_serializing_if = "ListField::is_empty")]
    pub aliases: ListField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_shape: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<BannerField>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_yaml::Value>,
    /// File names of the child pages, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerField {
    pub url: String,
    #[serde(default = "default_y_position")]
    pub y_position: f64,
}

fn default_y_position() -> f64 {
    Banner::DEFAULT_Y_POSITION
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A YAML list, or a single comma-separated string as older exports wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListField {
    List(Vec<String>),
    Joined(String),
}

impl Default for ListField {
    fn default() -> Self {
        ListField::List(Vec::new())
    }
}

impl ListField {
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn items(&self) -> Vec<String> {
        let items: Vec<&str> = match self {
            ListField::List(items) => items.iter().map(String::as_str).collect(),
            ListField::Joined(joined) => joined.split(',').collect(),
        };
        items
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Frontmatter {
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Frontmatter::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == Frontmatter::default()
    }

    pub fn set_appearance(&mut self, appearance: &Appearance) {
        self.icon_color = appearance.icon_color.clone();
        self.icon_shape = appearance.icon_shape.clone();
        self.hidden = appearance.hidden;
        self.locked = appearance.locked;
        self.banner = appearance.banner.as_ref().map(|banner| BannerField {
            url: banner.url.clone(),
            y_position: banner.y_position,
        });
    }

    pub fn appearance(&self) -> Appearance {
        Appearance {
            icon_color: self.icon_color.clone().filter(|c| !c.is_empty()),
            icon_shape: self.icon_shape.clone().filter(|s| !s.is_empty()),
            hidden: self.hidden,
            locked: self.locked,
            banner: self.banner.as_ref().map(|banner| Banner {
                url: banner.url.clone(),
                y_position: banner.y_position,
            }),
        }
    }

    /// Properties as text. Scalars keep their YAML spelling.
    pub fn property_strings(&self) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Null => String::new(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    other => serde_yaml::to_string(other)
                        .map(|s| s.trim_end().to_string())
                        .unwrap_or_default(),
                };
                (key.clone(), text)
            })
            .collect()
    }
}
