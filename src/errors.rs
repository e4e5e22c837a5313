use std::path::PathBuf;

use thiserror::Error;



# [ derive (Debug, Clone, Error, PartialEq, Eq) ]
pub enum EnumerationError {
    /// the os call failed but left no specific error code behind
    # [ error ("window enumeration failed: invalid argument") ]
    InvalidArgument,

    # [ error ("window enumeration failed (os error {code:#x}): {message}") ]
    Os { code: i32, message: String },
}


# [ derive (Debug, Error) ]
pub enum SelectorError {
    # [ error ("failed to launch selector '{program}': {source}") ]
    Spawn { program: String, #[source] source: std::io::Error },

    # [ error ("selector i/o failed: {0}") ]
    Io (#[from] std::io::Error),

    # [ error ("selector exited with error status {code:?}") ]
    Failed { code: Option<i32> },
}


# [ derive (Debug, Error) ]
pub enum ConfigError {
    # [ error ("failed to read config file {path:?}: {source}") ]
    Read { path: PathBuf, #[source] source: std::io::Error },

    # [ error ("failed to parse config file {path:?}: {source}") ]
    Parse { path: PathBuf, #[source] source: toml_edit::TomlError },
}


/// Errors fatal to a whole run .. per-window failures never get this far
# [ derive (Debug, Error) ]
pub enum SwitchError {
    # [ error (transparent) ]
    Enumeration (#[from] EnumerationError),

    # [ error (transparent) ]
    Selector (#[from] SelectorError),

    # [ error (transparent) ]
    Config (#[from] ConfigError),

    # [ error ("fzswitch needs a Windows desktop session to run") ]
    UnsupportedPlatform,
}

impl SwitchError {
    /// process exit code for fatal errors .. matches fzf's own 'error' code
    pub const EXIT_CODE : u8 = 2;
}



# [ cfg (test) ]
mod tests {
    use super::*;

    #[test]
    fn enumeration_errors_describe_the_os_failure () {
        assert_eq! (EnumerationError::InvalidArgument.to_string(), "window enumeration failed: invalid argument");
        let e = EnumerationError::Os { code: 0x57, message: "The parameter is incorrect.".into() };
        assert! (e.to_string().contains("0x57"));
        assert! (e.to_string().contains("The parameter is incorrect."));
    }

    #[test]
    fn switch_error_wraps_transparently () {
        let e : SwitchError = EnumerationError::InvalidArgument.into();
        assert_eq! (e.to_string(), EnumerationError::InvalidArgument.to_string());
        let e : SwitchError = SelectorError::Failed { code: Some(2) }.into();
        assert! (e.to_string().contains("Some(2)"));
    }
}
