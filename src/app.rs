use std::io::Write;

use tracing::{error, info};

use crate::cli::Cli;
use crate::config::Config;
use crate::desktop::Desktop;
use crate::errors::SwitchError;
use crate::resolver::{Exclusions, Resolver, UnknownExePolicy};
use crate::selector::{FzfSelector, Selector};
use crate::switcher::Switcher;



/// The selector as configured, with any command-line pass-through args appended
pub fn configured_selector (conf:&Config, cli:&Cli) -> FzfSelector {
    let mut options = conf.get_selector_options();
    options.extend (cli.selector_args.iter().cloned());
    FzfSelector::new (conf.get_selector_command(), options)
}

fn build_switcher <'a, D:Desktop> (desktop:&'a D, conf:&Config, cli:&Cli) -> Switcher<'a, D> {
    let exclusions = Exclusions::new (conf.get_exe_exclusions_list()) .with_self_exe();
    let policy = if cli.keep_unknown { UnknownExePolicy::Substitute } else { conf.get_unknown_exe_policy() };
    info! ("{} excluded exes, unknown-exe policy: {}", exclusions.len(), policy.as_ref());
    Switcher::new (desktop, Resolver::new (desktop, exclusions, policy), conf.check_flag__disambiguate_duplicate_labels())
}


/// Prints the switchable windows instead of selecting one
pub fn list_windows <D:Desktop> (desktop:&D, conf:&Config, cli:&Cli, out:&mut impl Write) -> Result<u8, SwitchError> {
    let candidates = build_switcher (desktop, conf, cli) .candidates()?;
    for c in candidates.iter() {
        let line = if cli.json {
            serde_json::to_string(c) .unwrap_or_default()
        } else { c.label() };
        if writeln! (out, "{line}").is_err() { break }
    }
    Ok(0)
}

/// A full interactive run .. returns the exit code the selector's outcome maps to
pub fn switch_window <D:Desktop, S:Selector> (desktop:&D, selector:&S, conf:&Config, cli:&Cli, out:&mut impl Write) -> Result<u8, SwitchError> {
    let report = build_switcher (desktop, conf, cli) .run(selector)?;
    if let Some(act) = report.activation.as_ref() .filter (|a| !a.succeeded) {
        let _ = writeln! (out, "Failed to activate window: {}", act.label);
    }
    Ok (report.status.exit_code())
}


/// Runs fzswitch against the given desktop, mapping every outcome to a process exit code
pub fn run_fzswitch <D:Desktop> (desktop:&D, conf:&Config, cli:&Cli) -> u8 {
    let res = if cli.list {
        list_windows (desktop, conf, cli, &mut std::io::stdout())
    } else {
        switch_window (desktop, &configured_selector(conf, cli), conf, cli, &mut std::io::stdout())
    };
    match res {
        Ok(code) => code,
        Err(e) => {
            error! ("{e}");
            eprintln! ("fzswitch: {e}");
            SwitchError::EXIT_CODE
        }
    }
}


/// The entry point proper: the live desktop where there is one
pub fn run (cli:&Cli, conf:&Config) -> u8 {
    #[cfg(windows)] {
        run_fzswitch (&crate::win_apis::Win32Desktop, conf, cli)
    }
    #[cfg(not(windows))] {
        let _ = (cli, conf);
        let e = SwitchError::UnsupportedPlatform;
        error! ("{e}");
        eprintln! ("fzswitch: {e}");
        SwitchError::EXIT_CODE
    }
}



# [ cfg (test) ]
mod tests {
    use super::*;
    use std::sync::mpsc::{Receiver, SyncSender};
    use clap::Parser;
    use crate::errors::SelectorError;
    use crate::selector::SelectionStatus;
    use crate::testing::*;

    /// picks whichever label arrives first
    struct FirstPick;
    impl Selector for FirstPick {
        fn select (&self, labels:Receiver<String>, results:SyncSender<String>) -> Result<SelectionStatus, SelectorError> {
            let first = labels.recv().ok();
            drop(labels);
            match first {
                Some(l) => { let _ = results.send(l); Ok (SelectionStatus::Selected) }
                None => Ok (SelectionStatus::NoMatch)
            }
        }
    }

    fn cli (args:&[&str]) -> Cli {
        Cli::try_parse_from (std::iter::once("fzswitch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn list_mode_prints_labels () {
        let fd = FakeDesktop::new (sample_windows());
        let mut out = Vec::new();
        let code = list_windows (&fd, &Config::defaults(), &cli(&["--list"]), &mut out).unwrap();
        assert_eq! (code, 0);
        assert_eq! (String::from_utf8(out).unwrap(), "Editor[app.exe]\n");
        assert! (fd.focus_calls().is_empty());
    }

    #[test]
    fn list_mode_prints_json () {
        let fd = FakeDesktop::new (sample_windows());
        let mut out = Vec::new();
        list_windows (&fd, &Config::defaults(), &cli(&["--list", "--json"]), &mut out).unwrap();
        let v : serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq! (v["title"], "Editor");
        assert_eq! (v["process_name"], "app.exe");
        assert_eq! (v["hwnd"], 1);
    }

    #[test]
    fn keep_unknown_overrides_the_configured_policy () {
        let fd = FakeDesktop::new ( vec! [ FakeWindow::new (5, "Admin console", "cmd.exe") .no_exe_path() ] );
        let mut out = Vec::new();
        list_windows (&fd, &Config::defaults(), &cli(&["--list", "--keep-unknown"]), &mut out).unwrap();
        assert_eq! (String::from_utf8(out).unwrap(), "Admin console[(unknown)]\n");
    }

    #[test]
    fn switching_reports_failed_activation_but_keeps_selector_status () {
        let mut fd = FakeDesktop::new (sample_windows());
        fd.focus_fails = true;
        let mut out = Vec::new();
        let code = switch_window (&fd, &FirstPick, &Config::defaults(), &cli(&[]), &mut out).unwrap();
        assert_eq! (code, 0);
        assert_eq! (String::from_utf8(out).unwrap(), "Failed to activate window: Editor[app.exe]\n");
        assert_eq! (fd.activations(), vec! [1]);
    }

    #[test]
    fn switching_with_nothing_to_offer_is_a_no_match () {
        let fd = FakeDesktop::new ( vec! [ FakeWindow::new (1, "Shell", "explorer.exe") ] );
        let mut out = Vec::new();
        let code = switch_window (&fd, &FirstPick, &Config::defaults(), &cli(&[]), &mut out).unwrap();
        assert_eq! (code, 1);
        assert! (out.is_empty());
    }

    #[test]
    fn enumeration_failure_maps_to_the_error_exit_code () {
        let mut fd = FakeDesktop::new (sample_windows());
        fd.enum_error = Some (crate::errors::EnumerationError::InvalidArgument);
        assert_eq! (run_fzswitch (&fd, &Config::defaults(), &cli(&["--list"])), SwitchError::EXIT_CODE);
    }

    #[test]
    fn selector_args_are_appended_to_configured_options () {
        let conf = Config::from_toml_str ("selector_command = 'sk'").unwrap();
        let sel = configured_selector (&conf, &cli(&["--", "--reverse"]));
        let dbg = format! ("{sel:?}");
        assert! (dbg.contains ("\"sk\""));
        assert! (dbg.contains ("[\"--margin=1\", \"--no-mouse\", \"--reverse\"]"));
    }
}
