use serde::Serialize;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub attributes: Vec<(String, String)>,
}

impl Manifest {
    /// Parses the main section, which ends at the first blank line. A line
    /// starting with a single space continues the previous value.
    pub fn parse(text: &str) -> Self {
        let mut attributes: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }
            if let Some(rest) = line.strip_prefix(' ') {
                if let Some((_, value)) = attributes.last_mut() {
                    value.push_str(rest);
                }
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                attributes.push((key.trim().to_string(), value.trim_start().to_string()));
            }
        }

        Self { attributes }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn main_class(&self) -> Option<&str> {
        self.get("Main-Class")
    }

    pub fn class_path(&self) -> Vec<&str> {
        self.get("Class-Path")
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }
}
