//! Required-value accessors
//!
//! These fetch a key and assert its type, panicking when the key is missing,
//! its mapping fails, or the value has another type. Use them only where a
//! missing key is a programming error with no sensible default; everywhere
//! else use [`Repository::get`].

use std::any::Any;

use crate::{Key, Repository, Value};

macro_rules! must_int {
    ($($(#[$doc:meta])* $name:ident => $t:ty),* $(,)?) => {$(
        $(#[$doc])*
        pub fn $name(&self, key: &str) -> $t {
            let value = self.must(key);
            let Some(wide) = value.as_i64().map(i128::from).or_else(|| value.as_u64().map(i128::from)) else {
                mismatch(key, stringify!($t), &value)
            };
            <$t>::try_from(wide).unwrap_or_else(|_| mismatch(key, stringify!($t), &value))
        }
    )*};
}

impl Repository {
    /// Fetch `key`, panicking if it cannot be resolved.
    pub fn must(&self, key: &str) -> Value {
        match self.get(Key::new(key)) {
            Ok(Some(value)) => value,
            Ok(None) => panic!("Unregistered config key: {key:?}"),
            Err(err) => panic!("Failed to resolve config key {key:?}: {err}"),
        }
    }

    pub fn must_str(&self, key: &str) -> String {
        match self.must(key) {
            Value::Str(s) => s,
            other => mismatch(key, "string", &other),
        }
    }

    pub fn must_bool(&self, key: &str) -> bool {
        let value = self.must(key);
        value
            .as_bool()
            .unwrap_or_else(|| mismatch(key, "bool", &value))
    }

    pub fn must_f64(&self, key: &str) -> f64 {
        let value = self.must(key);
        value.as_f64().unwrap_or_else(|| mismatch(key, "f64", &value))
    }

    pub fn must_f32(&self, key: &str) -> f32 {
        self.must_f64(key) as f32
    }

    must_int! {
        must_i64 => i64,
        must_i32 => i32,
        must_i16 => i16,
        must_i8 => i8,
        must_isize => isize,
        must_u64 => u64,
        must_u32 => u32,
        must_u16 => u16,
        must_u8 => u8,
        must_usize => usize,
    }

    /// Fetch a sequence whose every element is a string.
    pub fn must_str_vec(&self, key: &str) -> Vec<String> {
        let value = self.must(key);
        value
            .as_seq()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .unwrap_or_else(|| mismatch(key, "string sequence", &value))
    }

    /// Fetch a sequence whose every element is an integer.
    pub fn must_i64_vec(&self, key: &str) -> Vec<i64> {
        let value = self.must(key);
        value
            .as_seq()
            .and_then(|items| items.iter().map(Value::as_i64).collect::<Option<Vec<_>>>())
            .unwrap_or_else(|| mismatch(key, "int sequence", &value))
    }

    /// Fetch the typed result a schema mapper produced for `key`.
    pub fn must_as<T: Any + Clone>(&self, key: &str) -> T {
        let value = self.must(key);
        value
            .downcast_ref::<T>()
            .cloned()
            .unwrap_or_else(|| mismatch(key, std::any::type_name::<T>(), &value))
    }
}

fn mismatch(key: &str, expected: &str, found: &Value) -> ! {
    panic!(
        "Config key {key:?} holds {} {found:?}, expected {expected}",
        found.kind()
    )
}
