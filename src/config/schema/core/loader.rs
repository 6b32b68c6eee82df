use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Default location: `~/.alertwire/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".alertwire").join("config.toml"))
    }

    /// Resolve the config file, apply env overrides and validate.
    ///
    /// `explicit` may start with `~`.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let path = match explicit {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => Self::default_path()?,
        };
        let mut config = Self::load_or_init_at(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_init() -> Result<Self> {
        Self::load_or_init_at(&Self::default_path()?)
    }

    /// Read `path`, or write the defaults there when it does not exist yet.
    pub fn load_or_init_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        if path.exists() {
            let contents = fs::read_to_string(path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = path.to_path_buf();
            Ok(config)
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
