use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use toml_edit::{value, DocumentMut, Item, Table};

trait ConfigSerializeDefault {
    fn fix_config(self, name: &str, doc: &mut DocumentMut);
}

macro_rules! impl_simple_default {
    ( $( $type:ty ),* ) => {
        $(
            impl ConfigSerializeDefault for $type {
                fn fix_config(self, name: &str, doc: &mut DocumentMut) {
                    doc.entry(name).or_insert_with(|| value(self));
                }
            }
        )*
    }
}

impl_simple_default!(String, i64, bool);

impl ConfigSerializeDefault for IndexMap<String, String> {
    fn fix_config(self, name: &str, doc: &mut DocumentMut) {
        doc.entry(name).or_insert_with(|| {
            let mut table = Table::new();
            for (key, entry) in self {
                table.insert(&key, value(entry));
            }
            Item::Table(table)
        });
    }
}

macro_rules! gen_config {
    (
        $( $(#[$doc:meta])* $name:ident: $type:ty = $default:expr),*
    ) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct CommandConfig {
            $(
                $(#[$doc])*
                pub $name: $type,
            )*
        }

        impl Default for CommandConfig {
            fn default() -> Self {
                Self {
                    $( $name: $default, )*
                }
            }
        }

        impl CommandConfig {
            /// Reads `config_file`, writing back any settings it is missing.
            pub fn load(config_file: impl AsRef<Path>) -> anyhow::Result<CommandConfig> {
                let config_file = config_file.as_ref();
                let str = fs::read_to_string(config_file).unwrap_or_default();
                let mut doc = str
                    .parse::<DocumentMut>()
                    .with_context(|| format!("{} is not valid TOML", config_file.display()))?;

                $(
                    <$type as ConfigSerializeDefault>::fix_config($default, stringify!($name), &mut doc);
                )*

                let patched = doc.to_string();
                if str != patched {
                    let mut file = fs::OpenOptions::new()
                        .create(true)
                        .write(true)
                        .truncate(true)
                        .open(config_file)
                        .with_context(|| format!("could not write {}", config_file.display()))?;
                    write!(file, "{}", patched)?;
                }

                Ok(toml::from_str(&patched)?)
            }
        }
    };
}

gen_config! {
    /// Aliases that may only be claimed by the given plugin.
    command_aliases: IndexMap<String, String> = IndexMap::new(),
    show_usage_on_error: bool = true,
    max_suggestions: i64 = 100
}

impl CommandConfig {
    /// The plugin `alias` is reserved for, if any.
    pub fn reserved_owner(&self, alias: &str) -> Option<&str> {
        self.command_aliases
            .iter()
            .find(|(reserved, _)| reserved.trim().eq_ignore_ascii_case(alias))
            .map(|(_, owner)| owner.trim())
    }

    pub fn suggestion_limit(&self) -> usize {
        usize::try_from(self.max_suggestions).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("sponge-{}-{}", std::process::id(), name));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn missing_file_gets_defaults() {
        let path = temp_file("defaults.toml");
        let config = CommandConfig::load(&path).unwrap();
        assert_eq!(config, CommandConfig::default());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("show_usage_on_error = true"));
        assert!(written.contains("max_suggestions = 100"));
        assert!(written.contains("[command_aliases]"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn keeps_existing_settings() {
        let path = temp_file("existing.toml");
        fs::write(&path, "max_suggestions = 5\n\n[command_aliases]\nFoo = \"a\"\n").unwrap();
        let config = CommandConfig::load(&path).unwrap();
        assert_eq!(config.suggestion_limit(), 5);
        assert!(config.show_usage_on_error);
        assert_eq!(config.reserved_owner("foo"), Some("a"));
        assert_eq!(config.reserved_owner("bar"), None);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_broken_toml() {
        let path = temp_file("broken.toml");
        fs::write(&path, "max_suggestions = = 5").unwrap();
        assert!(CommandConfig::load(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
