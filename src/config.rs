//! Configuration options

use crate::{
    core::{
        bindings::Bindings,
        decoration::{ColorScheme, SchemeSpec, Schemes},
        mode::Mode,
        tag_mask,
        TagMask,
        MAX_TAGS,
    },
    monitor::MonitorDefaults,
    rule::Rule,
    utils::{deserialize_absolute_path, deserialize_shellexpand},
    x::input::ModMask,
};
use anyhow::{anyhow, ensure, Context, Result};
use colored::Colorize;
use directories::BaseDirs;
use format_serde_error::SerdeError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use which::which;

/// Configuration file name
const CONFIG_FILE: &str = "tagwm.yml";

/// Configuration written when none exists yet
pub(crate) const DEFAULT_CONFIG: &str = include_str!("../config/default.yml");

/// Default shell to run `shell` actions with
pub(crate) static SHELL: Lazy<PathBuf> = Lazy::new(|| {
    PathBuf::from(env::var("TAGWM_SHELL").unwrap_or_else(|_| {
        env::var("SHELL").unwrap_or_else(|_| {
            if let Ok(bash) = which("bash") {
                bash.to_string_lossy().to_string()
            } else if let Ok(dash) = which("dash") {
                dash.to_string_lossy().to_string()
            } else {
                String::from("/bin/sh")
            }
        })
    }))
});

// =============== GlobalSettings ================= [[[

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GlobalSettings {
    /// The shell to use for running commands
    #[serde(deserialize_with = "deserialize_absolute_path")]
    pub(crate) shell: Option<PathBuf>,

    /// Whether logs should be written to a file
    #[serde(alias = "log-to-file")]
    pub(crate) log_to_file: bool,

    /// The directory to write the log to
    #[serde(alias = "log-dir", deserialize_with = "deserialize_shellexpand")]
    pub(crate) log_dir: Option<PathBuf>,

    // ====================== Window Manager Specific ======================
    /// Width of the border around a window
    #[serde(alias = "border-width")]
    pub(crate) border_width: i32,

    /// Distance at which a dragged window snaps to the monitor's edges
    pub(crate) snap: i32,

    /// Whether the bar is shown on new monitors
    #[serde(alias = "show-bar")]
    pub(crate) show_bar: bool,

    /// Whether the bar sits at the top of the screen
    #[serde(alias = "top-bar")]
    pub(crate) top_bar: bool,

    /// Gap between tiled windows
    #[serde(alias = "gap-size")]
    pub(crate) gap_size: i32,

    /// Width of the master column, in percent
    pub(crate) mfact: i32,

    /// Names of the tags
    pub(crate) tags: Vec<String>,

    /// X core font used for the bar
    pub(crate) font: String,

    /// Executable name of the process producing the status text
    #[serde(alias = "status-bar")]
    pub(crate) status_bar: String,

    /// Minimum interval between two handled motion events (milliseconds)
    #[serde(alias = "pointer-motion-interval")]
    pub(crate) pointer_motion_interval: u32,

    /// Modifier written as `mod` in chords
    pub(crate) modkey: ModMask,
} // ]]] === Global Settings ===

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            shell:       Some(SHELL.to_path_buf()),
            log_to_file: false,
            log_dir:     None,

            border_width:            2,
            snap:                    32,
            show_bar:                true,
            top_bar:                 true,
            gap_size:                6,
            mfact:                   55,
            tags:                    ["Main", ">_", "3", "4", "5", "6", "7", "8", "9"]
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            font:                    String::from("fixed"),
            status_bar:              String::from("spoon"),
            pointer_motion_interval: 1000 / 60,
            modkey:                  if cfg!(debug_assertions) {
                ModMask::Mod1
            } else {
                ModMask::Mod4
            },
        }
    }
}

// =============== Color Schemes ================== [[[

/// The schemes as written in the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct SchemeSet {
    /// Unfocused windows and the plain bar
    pub(crate) normal:     SchemeSpec,
    /// Focused window and selected tags
    pub(crate) selected:   SchemeSpec,
    /// Mode label
    pub(crate) app_launch: SchemeSpec,
}

impl Default for SchemeSet {
    fn default() -> Self {
        let spec = |fg: &str, bg: &str, border: &str| SchemeSpec {
            fg:     fg.to_string(),
            bg:     bg.to_string(),
            border: border.to_string(),
        };

        Self {
            normal:     spec("gray3", "gray1", "gray2"),
            selected:   spec("selected", "gray1", "cyan"),
            app_launch: spec("gray3", "app-bg", "gray2"),
        }
    }
}

/// Built-in named colors
fn default_colors() -> IndexMap<String, String> {
    [
        ("gray1", "#222222"),
        ("gray2", "#444444"),
        ("gray3", "#bbbbbb"),
        ("gray4", "#eeeeee"),
        ("cyan", "#005577"),
        ("selected", "#fa2106"),
        ("app-bg", "#11750a"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect()
}

/// Built-in rules
fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            class: Some(String::from("Gimp")),
            floating: Some(true),
            ..Rule::default()
        },
        Rule {
            class: Some(String::from("Firefox")),
            tags: 1 << 8,
            ..Rule::default()
        },
    ]
}

// ]]] === Color Schemes ===

// =================== Config ===================== [[[

/// Configuration file to parse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Global settings
    #[serde(flatten)]
    pub(crate) global: GlobalSettings,

    /// Named colors usable in the schemes
    #[serde(default = "default_colors")]
    pub(crate) colors: IndexMap<String, String>,

    /// Colors of borders and the bar
    #[serde(default)]
    pub(crate) schemes: SchemeSet,

    /// Rules applied to new clients
    #[serde(default = "default_rules")]
    pub(crate) rules: Vec<Rule>,

    /// Key bindings of every mode
    #[serde(default)]
    pub(crate) modes: IndexMap<Mode, IndexMap<String, String>>,

    /// Button bindings, keyed by `<click>:<chord>`
    #[serde(default)]
    pub(crate) buttons: IndexMap<String, String>,
}

impl Config {
    /// Create the default configuration file
    pub(crate) fn create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!("Creating configuration path: {}", path.display());
            fs::create_dir_all(path).context("unable to create configuration directory")?;
        }

        let path = path.join(CONFIG_FILE);
        log::debug!("{}: {}", "Configuration path".bright_blue(), path.display());

        if !path.is_file() {
            let mut config_file: fs::File = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .open(&path)
                .with_context(|| format!("could not create tagwm config: '{}'", path.display()))?;

            config_file
                .write_all(DEFAULT_CONFIG.as_bytes())
                .with_context(|| format!("could not create tagwm config: '{}'", path.display()))?;
            config_file.flush()?;
        }

        Self::load(path)
    }

    /// Load the configuration file from a given path
    pub(crate) fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::parse(file)
    }

    /// Parse the text of a configuration file
    pub(crate) fn parse(file: String) -> Result<Self> {
        let res = serde_yaml::from_str(&file).map_err(|e| SerdeError::new(file, e))?;
        Ok(res)
    }

    /// Load the default configuration file
    pub(crate) fn load_default() -> Result<Self> {
        let dirs = PROJECT_DIRS
            .as_ref()
            .ok_or_else(|| anyhow!("failed to determine the configuration directory"))?;
        let path = dirs.config_dir();
        log::debug!("loading default config: {}", path.display());
        Self::create_default(path)
    }

    /// Validate the configuration and resolve everything the window manager
    /// works with
    pub(crate) fn settings(&self) -> Result<Settings> {
        let global = &self.global;

        ensure!(!global.tags.is_empty(), "at least one tag has to be configured");
        ensure!(
            global.tags.len() <= MAX_TAGS,
            "{} tags configured, at most {} are supported",
            global.tags.len(),
            MAX_TAGS
        );
        ensure!(
            (5..=95).contains(&global.mfact),
            "mfact has to be between 5 and 95, found {}",
            global.mfact
        );
        ensure!(global.border_width >= 0, "border-width cannot be negative");
        ensure!(global.gap_size >= 0, "gap-size cannot be negative");

        let schemes = Schemes {
            normal:     ColorScheme::new(&self.schemes.normal, &self.colors)
                .context("invalid 'normal' scheme")?,
            selected:   ColorScheme::new(&self.schemes.selected, &self.colors)
                .context("invalid 'selected' scheme")?,
            app_launch: ColorScheme::new(&self.schemes.app_launch, &self.colors)
                .context("invalid 'app-launch' scheme")?,
        };

        let bindings = Bindings::new(&self.modes, &self.buttons, global.modkey)?;
        if bindings.keys(Mode::Normal).is_empty() {
            log::warn!("no key bindings configured for the normal mode");
        }

        let mask = tag_mask(global.tags.len());
        let rules = self
            .rules
            .iter()
            .cloned()
            .map(|mut rule| {
                rule.tags &= mask;
                rule
            })
            .collect();

        Ok(Settings {
            border_width: global.border_width,
            snap: global.snap,
            gap: global.gap_size,
            tags: global.tags.clone(),
            tag_mask: mask,
            monitor: MonitorDefaults {
                tags:     1,
                mfact:    global.mfact,
                show_bar: global.show_bar,
                top_bar:  global.top_bar,
            },
            motion_interval: global.pointer_motion_interval,
            font: global.font.clone(),
            status_program: global.status_bar.clone(),
            shell: global.shell.clone().unwrap_or_else(|| SHELL.to_path_buf()),
            schemes,
            rules,
            bindings,
        })
    }
} // ]]] === Config ===

// =================== Settings =================== [[[

/// Validated configuration, in the form the window manager uses
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    /// Border width of managed windows
    pub(crate) border_width:    i32,
    /// Snap distance for dragged windows
    pub(crate) snap:            i32,
    /// Initial gap between tiled windows
    pub(crate) gap:             i32,
    /// Names of the tags
    pub(crate) tags:            Vec<String>,
    /// One bit per tag
    pub(crate) tag_mask:        TagMask,
    /// What new monitors start out with
    pub(crate) monitor:         MonitorDefaults,
    /// Minimum milliseconds between handled motion events
    pub(crate) motion_interval: u32,
    /// Bar font
    pub(crate) font:            String,
    /// Executable name of the status text producer
    pub(crate) status_program:  String,
    /// Shell for `shell` actions
    pub(crate) shell:           PathBuf,
    /// Resolved color schemes
    pub(crate) schemes:         Schemes,
    /// Rules applied to new clients
    pub(crate) rules:           Vec<Rule>,
    /// Key and button bindings
    pub(crate) bindings:        Bindings,
}

impl Settings {
    /// Settings of the built-in configuration
    #[cfg(test)]
    pub(crate) fn builtin() -> Self {
        Config::parse(DEFAULT_CONFIG.to_string())
            .and_then(|c| c.settings())
            .expect("the built-in configuration is valid")
    }
} // ]]] === Settings ===

// ================ Project Dirs ================== [[[

/// Get the base [`TagwmDirs`]
pub(crate) static PROJECT_DIRS: Lazy<Option<TagwmDirs>> = Lazy::new(TagwmDirs::new);

/// Get the project directories relevant to [`tagwm`]
#[derive(Debug, Clone)]
pub(crate) struct TagwmDirs {
    /// User's `$XDG_CONFIG_HOME/tagwm` directory
    config_dir: PathBuf,
}

impl TagwmDirs {
    /// Create a new [`TagwmDirs`]
    fn new() -> Option<Self> {
        Some(Self {
            config_dir: Self::get_dir("TAGWM_CONFIG_DIR", "XDG_CONFIG_HOME", ".config")?,
        })
    }

    /// Use `env_var` when it is an absolute path, otherwise `var` joined with
    /// the crate name, otherwise `$HOME/join` joined with the crate name
    fn get_dir(env_var: &str, var: &str, join: &str) -> Option<PathBuf> {
        env::var_os(env_var)
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| {
                env::var_os(var)
                    .map(PathBuf::from)
                    .filter(|p| p.is_absolute())
                    .or_else(|| BaseDirs::new().map(|p| p.home_dir().join(join)))
                    .map(|p| p.join(env!("CARGO_PKG_NAME")))
            })
    }

    /// Get configuration directory
    #[must_use]
    pub(crate) fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

// ]]] === Project Dirs ===

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::Action;

    #[test]
    fn builtin_configuration_resolves() {
        let settings = Settings::builtin();
        assert_eq!(settings.tags.len(), 9);
        assert_eq!(settings.tag_mask, 0x1ff);
        assert_eq!(settings.monitor.mfact, 55);
        assert_eq!(settings.gap, 6);
        assert_eq!(settings.schemes.selected.border, 0x005577);
        assert_eq!(settings.rules[1].tags, 1 << 8);
        assert!(!settings.bindings.keys(Mode::Quit).is_empty());
        assert!(settings
            .bindings
            .keys(Mode::Normal)
            .iter()
            .any(|b| b.action == Action::PushMode(Mode::Browser)));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = Config::parse(String::from("gap-size: 0\n")).expect("parses");
        assert_eq!(config.global.gap_size, 0);
        assert_eq!(config.global.border_width, 2);
        assert_eq!(config.colors.get("cyan").map(String::as_str), Some("#005577"));
        assert_eq!(config.rules.len(), 2);

        let settings = config.settings().expect("valid");
        assert_eq!(settings.schemes, Schemes::DEFAULT);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "mfact: 99\n",
            "tags: []\n",
            "schemes:\n  normal: {fg: nope, bg: gray1, border: gray2}\n  selected: {fg: gray1, bg: \
             gray1, border: gray2}\n  app-launch: {fg: gray1, bg: gray1, border: gray2}\n",
            "modes:\n  normal:\n    mod+NoSuchKey: quit\n",
            "modes:\n  normal:\n    mod+q: explode\n",
            "buttons:\n  title:button1: quit\n",
        ] {
            let config = Config::parse(text.to_string()).expect("parses");
            assert!(config.settings().is_err(), "accepted: {}", text);
        }

        assert!(Config::parse(String::from("snap: [1, 2]\n")).is_err());
    }

    #[test]
    fn too_many_tags() {
        let tags = (0..32).map(|i| format!("\"{}\"", i)).collect::<Vec<_>>().join(", ");
        let config = Config::parse(format!("tags: [{}]\n", tags)).expect("parses");
        assert!(config.settings().is_err());
    }

    #[test]
    fn default_file_is_created() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("nested");

        let config = Config::create_default(&path).expect("created");
        assert!(path.join(CONFIG_FILE).is_file());
        assert_eq!(config.global.tags.len(), 9);

        fs::write(path.join(CONFIG_FILE), "border-width: 5\n").expect("written");
        let config = Config::create_default(&path).expect("loaded");
        assert_eq!(config.global.border_width, 5);
    }

    #[test]
    fn rule_tags_are_limited_to_configured_tags() {
        let config = Config::parse(String::from(
            "tags: [a, b]\nrules:\n  - class: x\n    tags: 0xff\n",
        ))
        .expect("parses");
        let settings = config.settings().expect("valid");
        assert_eq!(settings.rules[0].tags, 0b11);
    }
}
