#![ allow (non_snake_case, non_upper_case_globals) ]

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use toml_edit::DocumentMut;

use tracing::metadata::LevelFilter;
use tracing::warn;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::prelude::*;

use crate::errors::ConfigError;
use crate::resolver::UnknownExePolicy;




pub const DEFAULT_CONF_STR : &str = include_str!("../fzswitch.conf.toml");
// ^^ our fzswitch.conf.toml is at root of project, the include_str macro will load the contents at compile time

static DEFAULT_CONF : Lazy <DocumentMut> = Lazy::new ( || {
    DocumentMut::from_str (DEFAULT_CONF_STR) .unwrap_or_default()
} );




# [ derive (Debug) ]
pub struct _Config {
    pub toml : Option <DocumentMut>,
    pub path : Option <PathBuf>,
}

# [ derive (Debug, Clone) ]
pub struct Config ( Arc <_Config> );

impl Deref for Config {
    type Target = _Config;
    fn deref (&self) -> &_Config { &self.0 }
}




// first some module level helper functions ..
/// Returns the directory of the currently running executable
fn get_app_dir () -> Option<PathBuf> {
    std::env::current_exe().ok() .and_then (|p| p.parent() .map (|p| p.to_path_buf()))
}

/// Checks whether a path is writeable by the current user by attempting to open/create a file in write mode
fn is_writeable (path: &Path) -> bool {
    fs::OpenOptions::new().write(true).create(true).truncate(false).open(path).is_ok()
    // note that ^^ this is similar to 'touch' and will create an empty file if it doesnt exist
}

fn parse_log_level (s:&str) -> Option<LevelFilter> {
    match s.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some (LevelFilter::TRACE),
        "DEBUG" => Some (LevelFilter::DEBUG),
        "INFO"  => Some (LevelFilter::INFO),
        "WARN"  => Some (LevelFilter::WARN),
        "ERROR" => Some (LevelFilter::ERROR),
        "OFF"   => Some (LevelFilter::OFF),
        _ => None
    }
}




impl Config {

    pub const CONF_FILE_NAME : &'static str = "fzswitch.conf.toml";
    pub const DATA_DIR_NAME  : &'static str = "fzswitch";

    pub const FZSWITCH_VERSION : &'static str = env!("CARGO_PKG_VERSION");


    fn new (toml:Option<DocumentMut>, path:Option<PathBuf>) -> Config {
        Config ( Arc::new ( _Config { toml, path } ) )
    }

    /// Config with nothing but the compiled-in defaults
    pub fn defaults () -> Config {
        Config::new (None, None)
    }

    /// Parses config text directly .. keys it doesnt have fall back to the defaults
    pub fn from_toml_str (toml:&str) -> Result<Config, toml_edit::TomlError> {
        Ok ( Config::new (Some (DocumentMut::from_str(toml)?), None) )
    }


    /// Loads the config from an explicitly specified file .. here, failing to read or parse is an error
    pub fn load_from (path:&Path) -> Result<Config, ConfigError> {
        let cfg_str = fs::read_to_string(path)
            .map_err (|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let toml = DocumentMut::from_str (&cfg_str)
            .map_err (|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        Ok ( Config::new (Some(toml), Some(path.to_path_buf())) )
    }

    /// Loads the config from its default location, (re)writing the defaults there if its missing or broken
    pub fn load () -> Config {
        let Some(conf_path) = Self::locate_config_file() else {
            return Config::defaults()
        };
        if let Ok(cfg_str) = fs::read_to_string(&conf_path) {
            if !cfg_str.trim().is_empty() {
                if let Ok(toml) = DocumentMut::from_str(&cfg_str) {
                    // successfully read and parsed a writeable non-empty toml, we'll use that
                    return Config::new (Some(toml), Some(conf_path))
        }   }   }
        // the file was empty, or we failed to read or parse it .. write back defaults and go with those
        let _ = fs::write (&conf_path, DEFAULT_CONF_STR);
        Config::new (None, Some(conf_path))
    }

    fn locate_config_file () -> Option<PathBuf> {
        let app_dir_loc = get_app_dir() .map (|p| p.join(Self::CONF_FILE_NAME));
        if app_dir_loc.as_ref() .is_some_and (|p| is_writeable(p)) {
            return app_dir_loc
        }
        let data_dir = dirs::data_local_dir() .map (|p| p.join(Self::DATA_DIR_NAME));
        if let Some(dir) = data_dir.as_ref() .filter (|p| !p.exists()) {
            let _ = fs::create_dir_all (dir);
        }
        data_dir .map (|p| p.join(Self::CONF_FILE_NAME)) .filter (|p| is_writeable(p))
    }

    pub fn get_log_loc (&self) -> Option<PathBuf> {
        self.path.as_ref() .and_then (|p| p.parent()) .map (|p| p.to_path_buf())
    }



    fn lookup <T> (&self, key:&str, f: impl Fn(&toml_edit::Item) -> Option<T>) -> Option<T> {
        self.toml.as_ref() .and_then (|t| t.get(key)) .and_then (&f)
            .or_else (|| DEFAULT_CONF.get(key) .and_then (&f))
    }

    fn check_flag (&self, flag_name:&str) -> bool {
        self.lookup (flag_name, |v| v.as_bool()) .unwrap_or_default()
    }

    fn get_string (&self, key:&str) -> String {
        self.lookup (key, |v| v.as_str().map (|s| s.to_string())) .unwrap_or_default()
    }

    fn get_string_array (&self, key:&str) -> Vec<String> {
        self.lookup (key, |v| v.as_array() .map (|a| a.iter() .filter_map (|v| v.as_str().map(|s| s.to_string())) .collect()))
            .unwrap_or_default()
    }



    // all the config flags we can check
    pub fn check_flag__logging_enabled               (&self) -> bool { self.check_flag ( "logging_enabled"               ) }
    pub fn check_flag__disambiguate_duplicate_labels (&self) -> bool { self.check_flag ( "disambiguate_duplicate_labels" ) }

    pub fn get_exe_exclusions_list (&self) -> Vec<String> { self.get_string_array ("exe_exclusions_list") }
    pub fn get_selector_options    (&self) -> Vec<String> { self.get_string_array ("selector_options") }

    pub fn get_selector_command (&self) -> String {
        let cmd = self.get_string ("selector_command");
        if cmd.trim().is_empty() { "fzf".to_string() } else { cmd }
    }

    pub fn get_unknown_exe_policy (&self) -> UnknownExePolicy {
        let s = self.get_string ("unknown_exe_policy");
        UnknownExePolicy::from_conf_str(&s) .unwrap_or_else (|| {
            warn! ("unrecognized unknown_exe_policy {s:?}, using 'reject'");
            UnknownExePolicy::Reject
        } )
    }

    pub fn get_log_level (&self) -> LevelFilter {
        if !self.check_flag__logging_enabled() {
            return LevelFilter::OFF;
        }
        parse_log_level (&self.get_string("logging_level")) .unwrap_or (LevelFilter::INFO)
    }



    /// Sets up file logging (if enabled) .. the returned guard must be kept alive for the run so pending logs get flushed
    pub fn setup_log_subscriber (&self, level_override:Option<&str>) -> Option<WorkerGuard> {

        // an explicit level (from the command line) turns logging on even if the config has it disabled
        let log_level = level_override .and_then (parse_log_level) .unwrap_or_else (|| self.get_log_level());
        if log_level == LevelFilter::OFF {
            return None
        }
        let log_loc = self.get_log_loc()?;

        let log_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("fzswitch_log")
            .filename_suffix("log")
            .max_log_files(7)
            .build(log_loc)
            .ok()?;

        let (nb_log_appender, guard) = non_blocking (log_appender);

        let timer = LocalTime::new ( time::macros::format_description! (
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        ) );

        let subscriber = tracing_subscriber::fmt::Layer::new()
            .with_writer(nb_log_appender)
            .with_timer(timer)
            .with_ansi(false)
            .with_filter(log_level);

        tracing_subscriber::registry().with(subscriber).try_init().ok()?;

        Some(guard)
    }

}



# [ cfg (test) ]
mod tests {
    use super::*;

    #[test]
    fn compiled_in_defaults_parse () {
        assert! (DocumentMut::from_str (DEFAULT_CONF_STR).is_ok());
        let conf = Config::defaults();
        assert! (conf.check_flag__logging_enabled());
        assert! (conf.check_flag__disambiguate_duplicate_labels());
        assert_eq! (conf.get_log_level(), LevelFilter::INFO);
        assert_eq! (conf.get_unknown_exe_policy(), UnknownExePolicy::Reject);
        assert_eq! (conf.get_selector_command(), "fzf");
        assert_eq! (conf.get_selector_options(), vec! ["--margin=1", "--no-mouse"]);
        assert! (conf.get_exe_exclusions_list().iter().any (|e| e == "explorer.exe"));
        assert! (conf.get_exe_exclusions_list().iter().any (|e| e == "fzf.exe"));
    }

    #[test]
    fn missing_or_mistyped_keys_fall_back_to_defaults () {
        let conf = Config::from_toml_str (r#"
            logging_level = "debug"
            unknown_exe_policy = "substitute"
            disambiguate_duplicate_labels = "yes please"
            exe_exclusions_list = [ "notepad.exe" ]
        "#).unwrap();
        assert_eq! (conf.get_log_level(), LevelFilter::DEBUG);
        assert_eq! (conf.get_unknown_exe_policy(), UnknownExePolicy::Substitute);
        assert! (conf.check_flag__disambiguate_duplicate_labels());
        assert_eq! (conf.get_exe_exclusions_list(), vec! ["notepad.exe"]);
        assert_eq! (conf.get_selector_command(), "fzf");
    }

    #[test]
    fn disabled_logging_means_level_off () {
        let conf = Config::from_toml_str ("logging_enabled = false\nlogging_level = \"TRACE\"").unwrap();
        assert_eq! (conf.get_log_level(), LevelFilter::OFF);
        assert! (conf.setup_log_subscriber(None).is_none());
    }

    #[test]
    fn bad_values_get_sane_fallbacks () {
        let conf = Config::from_toml_str ("logging_level = \"LOUD\"\nunknown_exe_policy = \"shrug\"\nselector_command = \"  \"").unwrap();
        assert_eq! (conf.get_log_level(), LevelFilter::INFO);
        assert_eq! (conf.get_unknown_exe_policy(), UnknownExePolicy::Reject);
        assert_eq! (conf.get_selector_command(), "fzf");
    }

    #[test]
    fn loads_explicit_config_file () {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join (Config::CONF_FILE_NAME);
        fs::write (&path, "selector_command = 'sk'\nselector_options = ['--ansi']\n").unwrap();

        let conf = Config::load_from(&path).unwrap();
        assert_eq! (conf.get_selector_command(), "sk");
        assert_eq! (conf.get_selector_options(), vec! ["--ansi"]);
        assert_eq! (conf.get_log_loc().as_deref(), Some (dir.path()));
    }

    #[test]
    fn explicit_config_file_errors_are_reported () {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join ("nope.toml");
        assert! (matches! (Config::load_from(&missing), Err (ConfigError::Read { .. })));

        let broken = dir.path().join ("broken.toml");
        fs::write (&broken, "selector_options = [ unterminated").unwrap();
        assert! (matches! (Config::load_from(&broken), Err (ConfigError::Parse { .. })));
    }

    #[test]
    fn log_levels_parse_case_insensitively () {
        assert_eq! (parse_log_level ("warn"),  Some (LevelFilter::WARN));
        assert_eq! (parse_log_level (" Off "), Some (LevelFilter::OFF));
        assert_eq! (parse_log_level ("loud"),  None);
    }
}
