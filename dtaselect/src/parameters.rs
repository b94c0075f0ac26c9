use std::fmt::Display;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The command line parameters of the DTASelect run, like `-p 1 -y 2 --trypstat --fp 0.01`. A token
/// starting with a dash is a key, the token following it is its value if that does not start with a
/// dash itself.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CommandLineParameters {
    parameters: IndexMap<String, Option<String>>,
}

impl CommandLineParameters {
    /// Tokenize a parameter line
    pub fn parse(line: &str) -> Self {
        let mut parameters = IndexMap::new();
        let mut pending: Option<&str> = None;
        for token in line.split_whitespace() {
            if token.starts_with('-') {
                if let Some(previous) = pending.replace(token) {
                    parameters.insert(previous.to_string(), None);
                }
            } else if let Some(key) = pending.take() {
                parameters.insert(key.to_string(), Some(token.to_string()));
            }
        }
        if let Some(key) = pending {
            parameters.insert(key.to_string(), None);
        }
        Self { parameters }
    }

    /// Get the value for a parameter. The name is first matched exactly (`--fp`), and then
    /// matched against the keys without their dashes (`fp`). A parameter without value gives
    /// `Some(None)`.
    pub fn value(&self, name: &str) -> Option<Option<&str>> {
        self.parameters
            .get(name)
            .or_else(|| {
                self.parameters
                    .iter()
                    .find(|(key, _)| key.trim_start_matches('-') == name)
                    .map(|(_, value)| value)
            })
            .map(Option::as_deref)
    }

    /// Check if a parameter is set, with the same matching rules as [`Self::value`]
    pub fn contains(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// Iterate over all parameters in order of occurrence
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.parameters
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    /// The number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if there are no parameters
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl Display for CommandLineParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.parameters
                .iter()
                .map(|(key, value)| value
                    .as_ref()
                    .map_or_else(|| key.clone(), |value| format!("{key} {value}")))
                .join(" ")
        )
    }
}

#[allow(clippy::missing_panics_doc)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize() {
        let parameters = CommandLineParameters::parse(
            " -p 1 -y 2 --trypstat --fp 0.01 --modstat --extra --pI -DM 5 --DB --dm -m 0 -S 3.5 --quiet ",
        );
        assert_eq!(parameters.len(), 13);
        assert_eq!(parameters.value("-p"), Some(Some("1")));
        assert_eq!(parameters.value("--trypstat"), Some(None));
        assert_eq!(parameters.value("fp"), Some(Some("0.01")));
        assert_eq!(parameters.value("DM"), Some(Some("5")));
        assert_eq!(parameters.value("--quiet"), Some(None));
        assert_eq!(parameters.value("t"), None);
        assert!(parameters.contains("modstat"));
        assert_eq!(
            parameters.to_string(),
            "-p 1 -y 2 --trypstat --fp 0.01 --modstat --extra --pI -DM 5 --DB --dm -m 0 -S 3.5 --quiet"
        );
    }

    #[test]
    fn trailing_value() {
        let parameters = CommandLineParameters::parse("-p 2 --trypstat -t 0");
        assert_eq!(
            parameters.iter().collect::<Vec<_>>(),
            [("-p", Some("2")), ("--trypstat", None), ("-t", Some("0"))]
        );
        assert!(CommandLineParameters::parse("").is_empty());
    }
}
