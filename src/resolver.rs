use std::collections::HashSet;

use serde::Serialize;
use strum_macros::AsRefStr;
use tracing::trace;

use crate::desktop::{Hwnd, ProcessQuery, WindowQuery};




# [ derive (Debug, Eq, PartialEq, Hash, Clone, Serialize) ]
pub struct Candidate {
    pub title        : String,
    pub process_name : String,
    pub hwnd         : Hwnd,
}

impl Candidate {
    /// the externally visible identity of a candidate, as fed to the selector
    pub fn label (&self) -> String {
        format! ("{}[{}]", self.title, self.process_name)
    }
}



/// What to do with a window whose process image path cant be queried
# [ derive (Debug, Eq, PartialEq, Hash, Default, Copy, Clone, AsRefStr) ]
# [ strum (serialize_all = "snake_case") ]
pub enum UnknownExePolicy {
    #[default]
    Reject,
    Substitute,
}

impl UnknownExePolicy {
    pub const UNKNOWN_EXE_STR : &'static str = "(unknown)";

    pub fn from_conf_str (s:&str) -> Option<UnknownExePolicy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject"     => Some (UnknownExePolicy::Reject),
            "substitute" => Some (UnknownExePolicy::Substitute),
            _ => None
        }
    }
}



# [ derive (Debug, Default, Clone) ]
/// Process names we never offer for switching .. matched case-insensitively as windows exe names are
pub struct Exclusions {
    exes : HashSet<String>,
}

impl Exclusions {
    pub fn new <I,S> (exes:I) -> Exclusions where I: IntoIterator<Item=S>, S: AsRef<str> {
        Exclusions { exes: exes .into_iter() .map (|e| e.as_ref().to_lowercase()) .collect() }
    }
    pub fn with_self_exe (mut self) -> Exclusions {
        // the switcher itself should never show up in its own list
        let self_exe = std::env::current_exe().ok() .and_then (|p| p.file_name() .map (|f| f.to_string_lossy().to_lowercase()));
        if let Some(exe) = self_exe { self.exes.insert(exe); }
        self
    }
    pub fn contains (&self, exe:&str) -> bool {
        self.exes.contains (&exe.to_lowercase())
    }
    pub fn len (&self) -> usize { self.exes.len() }
    pub fn is_empty (&self) -> bool { self.exes.is_empty() }
}



/// Takes the last component of a windows image path (we split on both separators)
pub fn parse_exe_name (exe_path:&str) -> Option<String> {
    let name = exe_path .rsplit (['\\', '/']) .next() .unwrap_or_default() .trim();
    if name.is_empty() { None } else { Some (name.to_string()) }
}



/// Turns raw window handles into switchable candidates, filtering out the noise
pub struct Resolver <'a, Q:WindowQuery> {
    query      : &'a Q,
    exclusions : Exclusions,
    policy     : UnknownExePolicy,
}

impl <'a, Q:WindowQuery> Resolver <'a, Q> {

    pub fn new (query:&'a Q, exclusions:Exclusions, policy:UnknownExePolicy) -> Resolver<'a, Q> {
        Resolver { query, exclusions, policy }
    }

    pub fn policy (&self) -> UnknownExePolicy { self.policy }

    /// Resolves a handle into a candidate, or None if the window should be skipped.<br>
    /// Nothing here is an error: one bad handle must never abort the enumeration.
    pub fn resolve (&self, hwnd:Hwnd) -> Option<Candidate> {

        if !self.query.is_visible(hwnd) {
            trace! ("skipping {hwnd:#x}: not visible");
            return None
        }

        let title = self.query.window_text(hwnd) .replace (['\r', '\n'], " ");
        // ^^ the selector takes one label per line
        if title.is_empty() {
            trace! ("skipping {hwnd:#x}: no title");
            return None
        }

        let Some(pid) = self.query.window_pid(hwnd) else {
            trace! ("skipping {hwnd:#x} ({title:?}): owning pid unresolvable");
            return None
        };

        let Some(proc) = self.query.open_process(pid) else {
            trace! ("skipping {hwnd:#x} ({title:?}): cant open process {pid}");
            return None
        };
        let exe_name = proc.image_path() .and_then (|p| parse_exe_name(&p));
        drop(proc);
        // ^^ closes the process handle, before any of the remaining exits

        let process_name = match (exe_name, self.policy) {
            (Some(name), _) => name,
            (None, UnknownExePolicy::Substitute) => UnknownExePolicy::UNKNOWN_EXE_STR.to_string(),
            (None, UnknownExePolicy::Reject) => {
                trace! ("skipping {hwnd:#x} ({title:?}): image path unresolvable for pid {pid}");
                return None
            }
        };

        if self.exclusions.contains(&process_name) {
            trace! ("skipping {hwnd:#x} ({title:?}): excluded exe {process_name}");
            return None
        }

        Some ( Candidate { title, process_name, hwnd } )
    }
}



# [ cfg (test) ]
mod tests {
    use super::*;
    use crate::testing::*;

    fn default_exclusions () -> Exclusions {
        Exclusions::new (["fzf.exe", "explorer.exe", "TextInputHost.exe"])
    }

    #[test]
    fn synthetic_list_yields_only_the_editor () {
        let fd = FakeDesktop::new (sample_windows());
        let r = Resolver::new (&fd, default_exclusions(), UnknownExePolicy::Reject);

        let found : Vec<Candidate> = fd.windows.iter() .filter_map (|w| r.resolve(w.hwnd)) .collect();
        assert_eq! (found, vec! [ Candidate { title: "Editor".into(), process_name: "app.exe".into(), hwnd: 1 } ]);
        assert_eq! (found[0].label(), "Editor[app.exe]");
    }

    #[test]
    fn each_rejection_reason_skips_the_window () {
        let fd = FakeDesktop::new ( vec! [
            FakeWindow::new (1, "Hidden",   "app.exe") .hidden(),
            FakeWindow::new (2, "",         "app.exe"),
            FakeWindow::new (3, "No pid",   "app.exe") .no_pid(),
            FakeWindow::new (4, "Locked",   "app.exe") .unopenable(),
            FakeWindow::new (5, "No path",  "app.exe") .no_exe_path(),
            FakeWindow::new (6, "Excluded", "EXPLORER.EXE"),
        ] );
        let r = Resolver::new (&fd, default_exclusions(), UnknownExePolicy::Reject);
        for w in fd.windows.iter() {
            assert_eq! (r.resolve(w.hwnd), None, "window {:?} should have been rejected", w.title);
        }
    }

    #[test]
    fn process_handles_are_released_once_per_open () {
        let fd = FakeDesktop::new ( vec! [
            FakeWindow::new (1, "Editor",  "app.exe"),
            FakeWindow::new (2, "No path", "app.exe") .no_exe_path(),
            FakeWindow::new (3, "Shell",   "explorer.exe"),
            FakeWindow::new (4, "Locked",  "app.exe") .unopenable(),
            FakeWindow::new (5, "Hidden",  "app.exe") .hidden(),
        ] );
        let r = Resolver::new (&fd, default_exclusions(), UnknownExePolicy::Reject);
        fd.windows.iter() .for_each (|w| { r.resolve(w.hwnd); });

        // visible, titled, pid-resolved and openable: Editor, No path, Shell
        assert_eq! (fd.n_opened(), 3);
        assert_eq! (fd.n_released(), 3);
    }

    #[test]
    fn substitute_policy_keeps_windows_with_unknown_exe () {
        let fd = FakeDesktop::new ( vec! [
            FakeWindow::new (1, "Elevated thing", "app.exe") .no_exe_path(),
            FakeWindow::new (2, "Locked",         "app.exe") .unopenable(),
        ] );
        let r = Resolver::new (&fd, default_exclusions(), UnknownExePolicy::Substitute);

        let c = r.resolve(1) .expect ("substituted candidate");
        assert_eq! (c.label(), "Elevated thing[(unknown)]");
        // a process that cant even be opened is still rejected
        assert_eq! (r.resolve(2), None);
        assert_eq! (fd.n_opened(), fd.n_released());
    }

    #[test]
    fn exclusions_are_case_insensitive () {
        let ex = Exclusions::new (["SystemSettings.exe"]);
        assert! (ex.contains ("systemsettings.exe"));
        assert! (ex.contains ("SYSTEMSETTINGS.EXE"));
        assert! (!ex.contains ("settings.exe"));
    }

    #[test]
    fn self_exe_is_always_excluded () {
        let ex = Exclusions::new (Vec::<String>::new()) .with_self_exe();
        let self_exe = std::env::current_exe().unwrap() .file_name().unwrap() .to_string_lossy().to_string();
        assert! (ex.contains (&self_exe));
    }

    #[test]
    fn exe_name_is_last_path_component () {
        assert_eq! (parse_exe_name (r"C:\Windows\explorer.exe"), Some ("explorer.exe".into()));
        assert_eq! (parse_exe_name (r"\\?\C:\Tools\fzf.exe"),    Some ("fzf.exe".into()));
        assert_eq! (parse_exe_name ("app.exe"),                  Some ("app.exe".into()));
        assert_eq! (parse_exe_name (r"C:\Tools\"),               None);
        assert_eq! (parse_exe_name (""),                         None);
    }

    #[test]
    fn unknown_exe_policy_parses_from_conf () {
        assert_eq! (UnknownExePolicy::from_conf_str ("reject"),       Some (UnknownExePolicy::Reject));
        assert_eq! (UnknownExePolicy::from_conf_str (" Substitute "), Some (UnknownExePolicy::Substitute));
        assert_eq! (UnknownExePolicy::from_conf_str ("ignore"),       None);
        assert_eq! (UnknownExePolicy::Substitute.as_ref(), "substitute");
    }
}
