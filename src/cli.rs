use std::path::PathBuf;

use clap::Parser;



/// Fuzzy-select any open window by title or exe name, and bring it to the foreground
# [ derive (Debug, Parser) ]
# [ command (name = "fzswitch", version, about) ]
pub struct Cli {
    /// Config file to use instead of the default location
    # [ arg (long, value_name = "PATH") ]
    pub config : Option<PathBuf>,

    /// Log level for this run (TRACE, DEBUG, INFO, WARN, ERROR, OFF), overriding the config
    # [ arg (long, value_name = "LEVEL", value_parser = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "OFF"], ignore_case = true) ]
    pub log_level : Option<String>,

    /// List windows whose exe cant be resolved as 'title[(unknown)]' instead of skipping them
    # [ arg (long) ]
    pub keep_unknown : bool,

    /// Just print the switchable windows, one per line, without launching the selector
    # [ arg (long) ]
    pub list : bool,

    /// With --list, print each window as a json object
    # [ arg (long, requires = "list") ]
    pub json : bool,

    /// Extra arguments passed through to the selector (after '--')
    # [ arg (last = true, value_name = "SELECTOR_ARGS") ]
    pub selector_args : Vec<String>,
}



# [ cfg (test) ]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent () {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_full_invocation () {
        let cli = Cli::try_parse_from ([
            "fzswitch", "--config", "C:/tools/fz.toml", "--log-level", "debug", "--keep-unknown", "--", "--reverse", "--height=40%"
        ]).unwrap();
        assert_eq! (cli.config, Some (PathBuf::from ("C:/tools/fz.toml")));
        assert! (cli.log_level.is_some_and (|l| l.eq_ignore_ascii_case ("DEBUG")));
        assert! (cli.keep_unknown);
        assert! (!cli.list);
        assert_eq! (cli.selector_args, vec! ["--reverse", "--height=40%"]);
    }

    #[test]
    fn rejects_bad_options () {
        assert! (Cli::try_parse_from (["fzswitch", "--json"]).is_err());
        assert! (Cli::try_parse_from (["fzswitch", "--log-level", "loud"]).is_err());
        assert! (Cli::try_parse_from (["fzswitch", "--bogus"]).is_err());
        assert! (Cli::try_parse_from (["fzswitch", "--list", "--json"]).is_ok());
    }
}
