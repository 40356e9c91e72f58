use std::{collections::HashMap, str::FromStr};

use super::error::TypeError;

/// Raw `key=value` pairs in the order they appeared in the query string.
pub type FormData = Vec<(String, String)>;

/// Multi-valued view over a query string. Repeated keys keep every value.
#[derive(Debug, Clone, Default)]
pub struct Form {
    pairs: FormData,
    inner: HashMap<String, Vec<String>>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        let mut inner: HashMap<String, Vec<String>> = HashMap::new();
        data.iter()
            .for_each(|(key, value)| match inner.get_mut(key) {
                Some(v) => v.push(value.to_owned()),
                None => {
                    inner.insert(key.to_owned(), vec![value.to_owned()]);
                }
            });

        Self { pairs: data, inner }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for '{key}'"))),
            None => Ok(None),
        }
    }

    /// Accepts `1`/`0` as well as `true`/`false`. A missing key is `false`.
    pub fn get_flag(&self, key: &str) -> Result<bool, TypeError> {
        match self.get_str(key) {
            Some(value) => match value.trim().to_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(TypeError::new(&format!("Invalid flag for '{key}'"))),
            },
            None => Ok(false),
        }
    }

    /// Every value for the key, with comma separated values split apart.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .get(key)
            .map(|values| {
                values
                    .iter()
                    .flat_map(|value| value.split(','))
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Re-encodes the query string with `key` replaced by `value`.
    pub fn with_value(&self, key: &str, value: &str) -> String {
        self.pairs
            .iter()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once((key, value)))
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<String>>()
            .join("&")
    }

    /// Re-encodes the query string without `key`.
    pub fn without_value(&self, key: &str) -> String {
        self.pairs
            .iter()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<String>>()
            .join("&")
    }
}

fn encode_component(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_and_comma_separated_values_are_collected() {
        let form = form(&[("tags", "breakfast"), ("tags", "lunch,dinner"), ("page", "2")]);
        assert_eq!(form.get_all("tags"), vec!["breakfast", "lunch", "dinner"]);
        assert_eq!(form.get_all("missing"), Vec::<String>::new());
    }

    #[test]
    fn numbers_and_flags_parse_or_fail() {
        let form = form(&[("page", "3"), ("limit", "x"), ("is_favorited", "1")]);
        assert_eq!(form.get_number::<i64>("page").unwrap(), Some(3));
        assert!(form.get_number::<i64>("limit").is_err());
        assert_eq!(form.get_number::<i64>("author").unwrap(), None);
        assert!(form.get_flag("is_favorited").unwrap());
        assert!(!form.get_flag("is_in_shopping_cart").unwrap());
    }

    #[test]
    fn query_string_is_rebuilt_with_replaced_value() {
        let form = form(&[("page", "1"), ("name", "соль и перец")]);
        assert_eq!(
            form.with_value("page", "2"),
            "name=%D1%81%D0%BE%D0%BB%D1%8C%20%D0%B8%20%D0%BF%D0%B5%D1%80%D0%B5%D1%86&page=2"
        );
        assert_eq!(form.without_value("name"), "page=1");
    }
}
