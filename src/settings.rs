//! Persisted key/value settings with defaults

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::SettingsError,
    events::{AppEvent, EventBus},
    store::SettingsStore,
};

pub const WEB_ENABLE_DASHBOARD: &str = "WEB_ENABLE_DASHBOARD";
pub const WEB_DASHBOARD_PORT: &str = "WEB_DASHBOARD_PORT";
pub const WEB_DASHBOARD_BIND: &str = "WEB_DASHBOARD_BIND";
pub const OSC_ENABLE: &str = "OSC_ENABLE";
pub const OSC_PORT: &str = "OSC_PORT";
pub const OSC_BIND: &str = "OSC_BIND";

struct SettingDefinition {
    group: &'static str,
    key: &'static str,
    title: &'static str,
    description: &'static str,
    default: fn() -> Value,
}

const DEFINITIONS: &[SettingDefinition] = &[
    SettingDefinition {
        group: "Web",
        key: WEB_ENABLE_DASHBOARD,
        title: "Web Dashboard",
        description: "Serve a read-only dashboard of visible timers.",
        default: || Value::Bool(true),
    },
    SettingDefinition {
        group: "Web",
        key: WEB_DASHBOARD_PORT,
        title: "Dashboard Port",
        description: "TCP port the web dashboard listens on.",
        default: || Value::from(4300),
    },
    SettingDefinition {
        group: "Web",
        key: WEB_DASHBOARD_BIND,
        title: "Dashboard Bind Address",
        description: "Address the web dashboard binds to.",
        default: || Value::from("0.0.0.0"),
    },
    SettingDefinition {
        group: "OSC",
        key: OSC_ENABLE,
        title: "OSC Control",
        description: "Accept remote OSC commands.",
        default: || Value::Bool(true),
    },
    SettingDefinition {
        group: "OSC",
        key: OSC_PORT,
        title: "OSC Port",
        description: "UDP port the OSC listener receives on.",
        default: || Value::from(3333),
    },
    SettingDefinition {
        group: "OSC",
        key: OSC_BIND,
        title: "OSC Bind Address",
        description: "Address the OSC listener binds to.",
        default: || Value::from("0.0.0.0"),
    },
];

/// A setting as presented to the control surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    pub group: &'static str,
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub value: Value,
    pub default_value: Value,
    pub is_default: bool,
}

pub struct Settings {
    store: Box<dyn SettingsStore>,
    events: EventBus,
    values: HashMap<&'static str, Value>,
}

impl Settings {
    /// Load stored overrides on top of the defaults.
    ///
    /// Stored values that fail to parse or have the wrong type are ignored.
    pub fn load(store: Box<dyn SettingsStore>, events: EventBus) -> Result<Self, SettingsError> {
        let mut values = HashMap::new();
        for definition in DEFINITIONS {
            let default = (definition.default)();
            let value = match store.get_setting(definition.key)? {
                Some(raw) => match serde_json::from_str::<Value>(&raw) {
                    Ok(value) if same_type(&value, &default) => value,
                    _ => {
                        warn!("Ignoring invalid stored value for {}: {}", definition.key, raw);
                        default
                    }
                },
                None => default,
            };
            values.insert(definition.key, value);
        }
        Ok(Self {
            store,
            events,
            values,
        })
    }

    pub fn all(&self) -> Vec<Setting> {
        DEFINITIONS
            .iter()
            .map(|definition| self.describe(definition))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<Setting> {
        DEFINITIONS
            .iter()
            .find(|definition| definition.key == key)
            .map(|definition| self.describe(definition))
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn bool_value(&self, key: &str) -> bool {
        self.value(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn port_value(&self, key: &str) -> Option<u16> {
        self.value(key)
            .and_then(Value::as_u64)
            .and_then(|port| u16::try_from(port).ok())
    }

    pub fn text_value(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    /// Persist a new value and announce it; identical values are a no-op
    pub fn set(&mut self, key: &str, value: Value) -> Result<Setting, SettingsError> {
        let definition = DEFINITIONS
            .iter()
            .find(|definition| definition.key == key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

        let default = (definition.default)();
        if !same_type(&value, &default) {
            return Err(SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: type_name(&default),
            });
        }

        if self.values.get(definition.key) == Some(&value) {
            return Ok(self.describe(definition));
        }

        let raw = serde_json::to_string(&value).map_err(crate::error::StoreError::from)?;
        self.store.set_setting(definition.key, &raw)?;
        self.values.insert(definition.key, value);

        info!("Setting {} updated to {}", definition.key, raw);
        self.events.publish(AppEvent::SettingsChanged {
            key: definition.key.to_string(),
        });
        Ok(self.describe(definition))
    }

    fn describe(&self, definition: &SettingDefinition) -> Setting {
        let default_value = (definition.default)();
        let value = self
            .values
            .get(definition.key)
            .cloned()
            .unwrap_or_else(|| default_value.clone());
        Setting {
            group: definition.group,
            key: definition.key,
            title: definition.title,
            description: definition.description,
            is_default: value == default_value,
            value,
            default_value,
        }
    }
}

fn same_type(value: &Value, default: &Value) -> bool {
    match default {
        Value::Bool(_) => value.is_boolean(),
        Value::Number(_) => value.is_u64(),
        Value::String(_) => value.is_string(),
        _ => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::Number(_) => "non-negative number",
        Value::String(_) => "text",
        _ => "unknown",
    }
}
