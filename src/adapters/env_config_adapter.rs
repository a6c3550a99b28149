//! Environment variable configuration, layered over an optional INI file.
//!
//! `[section] key` is read from `STOCKDESK_<SECTION>_<KEY>` first, then from
//! the file. `ALPHA_VANTAGE_API_KEY` is accepted for `[upstream] api_key`.

use std::collections::HashMap;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::ports::config_port::ConfigPort;

const PREFIX: &str = "STOCKDESK";

/// Variable names kept for deployments that predate the prefixed scheme.
const LEGACY_KEYS: &[(&str, &str, &str)] = &[
    ("upstream", "api_key", "ALPHA_VANTAGE_API_KEY"),
    ("postgres", "connection_string", "COCKROACHDB_DSN"),
];

pub struct EnvConfigAdapter {
    vars: HashMap<String, String>,
    file: Option<FileConfigAdapter>,
}

impl EnvConfigAdapter {
    pub fn from_env(file: Option<FileConfigAdapter>) -> Self {
        Self::from_vars(std::env::vars(), file)
    }

    pub fn from_vars<I>(vars: I, file: Option<FileConfigAdapter>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            vars: vars.into_iter().collect(),
            file,
        }
    }

    fn var_name(section: &str, key: &str) -> String {
        format!("{PREFIX}_{section}_{key}").to_uppercase()
    }

    fn lookup_env(&self, section: &str, key: &str) -> Option<String> {
        if let Some(v) = self.vars.get(&Self::var_name(section, key)) {
            return Some(v.clone());
        }
        LEGACY_KEYS
            .iter()
            .find(|(s, k, _)| *s == section && *k == key)
            .and_then(|(_, _, name)| self.vars.get(*name).cloned())
    }
}

impl ConfigPort for EnvConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup_env(section, key)
            .or_else(|| self.file.as_ref().and_then(|f| f.get_string(section, key)))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup_env(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self
                .file
                .as_ref()
                .map(|f| f.get_int(section, key, default))
                .unwrap_or(default),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.lookup_env(section, key) {
            Some(v) => FileConfigAdapter::parse_bool(v.trim()).unwrap_or(default),
            None => self
                .file
                .as_ref()
                .map(|f| f.get_bool(section, key, default))
                .unwrap_or(default),
        }
    }
}
