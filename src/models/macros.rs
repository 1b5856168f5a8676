/// Defines a gid-style newtype identifier over `u64` and generates:
/// - derives (Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)
/// - `Display`/`FromStr` using the stable `"{tag}-{hex}"` string form
/// - `Serialize`/`Deserialize` through the string form
/// - `new`/`value` accessors
///
/// Usage:
///   define_gid_type!(ObservationId, "o");
#[macro_export]
macro_rules! define_gid_type {
    ($name:ident, $tag:literal) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl $name {
            pub const TAG: &'static str = $tag;

            pub fn new(value: u64) -> Self {
                $name(value)
            }

            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}-{:x}", $tag, self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let rest = s
                    .strip_prefix($tag)
                    .and_then(|r| r.strip_prefix('-'))
                    .ok_or_else(|| format!("'{}' is not a valid {} id", s, $tag))?;
                u64::from_str_radix(rest, 16)
                    .map($name)
                    .map_err(|_| format!("'{}' is not a valid {} id", s, $tag))
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <::std::string::String as ::serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

/// Defines a UUID-backed newtype identifier (v4) and generates:
/// - derives (Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)
/// - `Display`/`FromStr` using the hyphenated UUID form
/// - `random`/`value` accessors
///
/// Usage:
///   define_uuid_type!(VisitId);
#[macro_export]
macro_rules! define_uuid_type {
    ($name:ident) => {
        #[derive(
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub ::uuid::Uuid);

        impl $name {
            /// Mint a fresh (v4) identifier.
            pub fn random() -> Self {
                $name(::uuid::Uuid::new_v4())
            }

            pub fn value(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map($name)
            }
        }

        impl ::std::convert::From<::uuid::Uuid> for $name {
            fn from(v: ::uuid::Uuid) -> Self {
                $name(v)
            }
        }
    };
}
