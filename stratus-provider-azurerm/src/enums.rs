//! String-valued API enums
//!
//! ARM enums are open: the API may return values newer than the ones this
//! crate knows. Known values parse case-insensitively, anything else is kept
//! verbatim in `Other` so it round-trips unchanged.

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            /// Every value known to this crate, in declaration order
            pub fn possible_values() -> &'static [&'static str] {
                &[$($value),+]
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $value,)+
                    $name::Other(value) => value,
                }
            }

            pub fn parse(input: &str) -> Self {
                $(
                    if input.eq_ignore_ascii_case($value) {
                        return $name::$variant;
                    }
                )+
                $name::Other(input.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok($name::parse(&value))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    string_enum!(
        /// Example enum
        Fruit {
            Apple => "Apple",
            BloodOrange => "BloodOrange",
        }
    );

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(Fruit::parse("apple"), Fruit::Apple);
        assert_eq!(Fruit::parse("BLOODORANGE"), Fruit::BloodOrange);
        assert_eq!(Fruit::parse("Kiwi"), Fruit::Other("Kiwi".to_string()));
        assert_eq!(Fruit::parse("Kiwi").as_str(), "Kiwi");
        assert_eq!(Fruit::possible_values(), &["Apple", "BloodOrange"]);
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&Fruit::BloodOrange).unwrap();
        assert_eq!(json, "\"BloodOrange\"");
        let parsed: Fruit = serde_json::from_str("\"bloodorange\"").unwrap();
        assert_eq!(parsed, Fruit::BloodOrange);
    }
}
