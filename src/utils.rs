//! Various helper-utilities

use crate::{cli::Opts, config::Config};
use anyhow::Result;
use clap::crate_name;
use flexi_logger::{
    style,
    AdaptiveFormat,
    Age,
    Cleanup,
    Criterion,
    DeferredNow,
    Duplicate,
    FileSpec,
    Level,
    Logger,
    LoggerHandle,
    Naming,
    Record,
    WriteMode,
};
use serde::{de, Deserialize};
use std::{
    env,
    io::{self, Write},
    panic,
    path::{Path, PathBuf},
};
use which::which;

/// Environment variable overriding the log level given on the command line
const LOG_ENV: &str = "TAGWM_LOG";

/// Shorter way of testing if the user wants color for the output of `--help`
pub(crate) fn wants_color() -> bool {
    env::var_os("NO_COLOR").is_none()
}

/// Log level for the number of `-v` flags given
fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initializes logging for this crate. Logging stops once the returned handle
/// is dropped
pub(crate) fn initialize_logging(config: &Config, args: &Opts) -> Result<LoggerHandle> {
    /// Customize the format of the log (colored)
    fn colored_format(
        w: &mut dyn Write,
        _now: &mut DeferredNow,
        record: &Record,
    ) -> Result<(), io::Error> {
        let level = record.level();
        write!(
            w,
            "{:<5} [{}:{}]: {}",
            style(level, level),
            style(Level::Trace, record.file().unwrap_or("<unnamed>")),
            record.line().unwrap_or(0),
            &record.args()
        )
    }

    /// Customize the format of the log (uncolored)
    fn uncolored_format(
        w: &mut dyn Write,
        now: &mut DeferredNow,
        record: &Record,
    ) -> Result<(), io::Error> {
        // Messages may carry color from `colored`
        write!(
            w,
            "[{:>}] {:<5} [{}:{}]: {}",
            now.now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.file().unwrap_or("<unnamed>"),
            record.line().unwrap_or(0),
            String::from_utf8(strip_ansi_escapes::strip(
                &record.args().to_string().as_bytes()
            )?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        )
    }

    if cfg!(debug_assertions) {
        better_panic::install();
        panic::set_hook(Box::new(|panic_info| {
            better_panic::Settings::auto().create_panic_handler()(panic_info);
        }));
    }

    let log_dir = config
        .global
        .log_dir
        .clone()
        .unwrap_or_else(|| env::temp_dir().join(crate_name!()));

    let mut logger = Logger::try_with_str(
        env::var(LOG_ENV).unwrap_or_else(|_| level_for(args.verbose).to_string()),
    )?
    .write_mode(WriteMode::BufferAndFlush)
    .adaptive_format_for_stderr(AdaptiveFormat::Custom(uncolored_format, colored_format))
    .set_palette(String::from("9;11;14;5;13"));

    if config.global.log_to_file {
        logger = logger
            .duplicate_to_stderr(Duplicate::All)
            .rotate(
                Criterion::AgeOrSize(Age::Day, 50_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(2),
            )
            .log_to_file(
                FileSpec::default()
                    .basename(crate_name!())
                    .directory(&log_dir),
            )
            .format_for_files(uncolored_format);
    }

    let handle = logger.start()?;
    if config.global.log_to_file {
        log::debug!("writing logs to {}", log_dir.display());
    }

    Ok(handle)
}

/// Expand `~` and environment variables in a path
fn expand<E: de::Error>(value: &Path) -> Result<PathBuf, E> {
    Ok(PathBuf::from(
        shellexpand::full(&value.to_string_lossy())
            .map_err(|e| {
                de::Error::invalid_value(
                    de::Unexpected::Str(value.to_string_lossy().as_ref()),
                    &e.to_string().as_str(),
                )
            })?
            .to_string(),
    ))
}

/// [`Deserialize`] something that has a shell variable
#[allow(single_use_lifetimes)]
pub(crate) fn deserialize_shellexpand<'de, D>(d: D) -> Result<Option<PathBuf>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value = PathBuf::deserialize(d)?;
    expand(&value).map(Some)
}

/// [`Deserialize`] something that has a shell variable into an absolute path.
/// A bare program name is looked up in `$PATH`
#[allow(single_use_lifetimes)]
pub(crate) fn deserialize_absolute_path<'de, D>(d: D) -> Result<Option<PathBuf>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value = expand::<D::Error>(&PathBuf::deserialize(d)?)?;

    let canonicalize = |p: &PathBuf| -> Result<PathBuf, D::Error> {
        p.canonicalize()
            .map_err(|_| de::Error::custom(format!("failed to canonicalize path: {}", p.display())))
    };

    match canonicalize(&value) {
        Ok(path) if path.is_absolute() => Ok(Some(path)),
        _ => match which(&value) {
            Ok(found) => canonicalize(&found).map(Some),
            Err(_) => Err(de::Error::invalid_value(
                de::Unexpected::Str(value.to_string_lossy().as_ref()),
                &"an absolute path or a program in $PATH",
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Paths {
        #[serde(default, deserialize_with = "deserialize_shellexpand")]
        log: Option<PathBuf>,
        #[serde(default, deserialize_with = "deserialize_absolute_path")]
        shell: Option<PathBuf>,
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(5), "trace");
    }

    #[test]
    fn paths_are_expanded() {
        let dir = tempfile::tempdir().expect("temporary directory");
        env::set_var("TAGWM_TEST_LOG_DIR", dir.path());

        let paths: Paths =
            serde_yaml::from_str("log: $TAGWM_TEST_LOG_DIR/logs\nshell: /bin/sh\n").expect("parses");
        assert_eq!(paths.log, Some(dir.path().join("logs")));
        assert!(paths.shell.map_or(false, |p| p.is_absolute()));

        assert!(serde_yaml::from_str::<Paths>("shell: no-such-program-anywhere\n").is_err());
    }
}
