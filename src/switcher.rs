use std::collections::HashMap;
use std::panic::resume_unwind;
use std::sync::{PoisonError, RwLock};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

use tracing::{debug, info, warn};

use crate::desktop::{Desktop, EnumControl, Hwnd};
use crate::errors::{EnumerationError, SwitchError};
use crate::forcer;
use crate::resolver::{Candidate, Resolver};
use crate::selector::{SelectionStatus, Selector};




# [ derive (Debug, Default) ]
/// Label to window-handle mapping, written by the enumeration side and read at selection time
pub struct LabelIndex {
    map : RwLock <HashMap <String, Hwnd>>,
}

impl LabelIndex {

    /// Records a candidate's label and returns the label actually used for it.<br>
    /// With disambiguation on, a label already taken gets an ordinal suffix ('.. (2)', '.. (3)' ..),
    /// otherwise the newer window takes over the label from the older one.
    pub fn insert (&self, base_label:String, hwnd:Hwnd, disambiguate:bool) -> String {
        let mut map = self.map.write() .unwrap_or_else (PoisonError::into_inner);
        let label = if !map.contains_key(&base_label) {
            base_label
        } else if disambiguate {
            (2..) .map (|n| format! ("{base_label} ({n})")) .find (|l| !map.contains_key(l)) .unwrap_or(base_label)
        } else {
            warn! ("label {base_label:?} now points to {hwnd:#x}, replacing an earlier window with the same title and exe");
            base_label
        };
        map.insert (label.clone(), hwnd);
        label
    }

    pub fn get (&self, label:&str) -> Option<Hwnd> {
        self.map.read() .unwrap_or_else (PoisonError::into_inner) .get(label) .copied()
    }
    pub fn contains (&self, label:&str) -> bool {
        self.get(label).is_some()
    }
    pub fn len (&self) -> usize {
        self.map.read() .unwrap_or_else (PoisonError::into_inner) .len()
    }
    pub fn is_empty (&self) -> bool { self.len() == 0 }
}



# [ derive (Debug, Clone, Eq, PartialEq) ]
pub struct Activation {
    pub label     : String,
    pub hwnd      : Hwnd,
    pub succeeded : bool,
}

# [ derive (Debug, Clone, Eq, PartialEq) ]
pub struct RunReport {
    pub status       : SelectionStatus,
    pub n_candidates : usize,
    pub activation   : Option<Activation>,
}



/// State for a single switcher run: enumerate, index and stream labels out, then activate the pick
pub struct Switcher <'a, D:Desktop> {
    desktop      : &'a D,
    resolver     : Resolver <'a, D>,
    index        : LabelIndex,
    disambiguate : bool,
}

impl <'a, D:Desktop> Switcher <'a, D> {

    pub fn new (desktop:&'a D, resolver:Resolver<'a, D>, disambiguate:bool) -> Switcher<'a, D> {
        Switcher { desktop, resolver, index: LabelIndex::default(), disambiguate }
    }

    pub fn index (&self) -> &LabelIndex { &self.index }


    /// Just the resolved candidates in enumeration order, nothing indexed or activated
    pub fn candidates (&self) -> Result <Vec<Candidate>, EnumerationError> {
        let mut found = Vec::new();
        self.desktop.for_each_window ( &mut |hwnd| {
            found.extend (self.resolver.resolve(hwnd));
            EnumControl::Continue
        } )?;
        Ok(found)
    }


    fn produce_labels (&self, labels:SyncSender<String>) -> Result <usize, EnumerationError> {
        let mut n_sent = 0;
        self.desktop.for_each_window ( &mut |hwnd| {
            let Some(cand) = self.resolver.resolve(hwnd) else { return EnumControl::Continue };
            // the index entry must exist before the label can be seen (and so picked) downstream
            let label = self.index.insert (cand.label(), cand.hwnd, self.disambiguate);
            if labels.send(label).is_err() {
                debug! ("label stream closed by selector after {n_sent} labels .. stopping enumeration");
                return EnumControl::Stop
            }
            n_sent += 1;
            EnumControl::Continue
        } )?;
        Ok(n_sent)
        // ^^ labels sender drops on return, which closes the label stream
    }

    fn consume_results (&self, results:Receiver<String>) -> Option<Activation> {
        for label in results.iter() {
            let Some(hwnd) = self.index.get(&label) else {
                warn! ("selected label {label:?} isnt in the index, ignoring it");
                continue
            };
            info! ("activating {label:?} ({hwnd:#x})");
            let succeeded = forcer::force_foreground (self.desktop, hwnd);
            if !succeeded { warn! ("failed to bring {label:?} ({hwnd:#x}) to foreground") }
            return Some ( Activation { label, hwnd, succeeded } )
            // ^^ at most one activation per run, any further results are dropped with the receiver
        }
        None
    }


    /// Runs the whole pipeline against the given selector.<br>
    /// Enumeration and activation each get their own thread while the selector runs on this one,
    /// and all three are joined before we return, so no pending activation is ever lost.
    pub fn run <S:Selector> (&self, selector:&S) -> Result <RunReport, SwitchError> {

        let (label_tx,  label_rx)  = sync_channel::<String>(0);
        let (result_tx, result_rx) = sync_channel::<String>(0);
        // ^^ rendezvous channels: enumeration can only run as far ahead as the selector reads

        let (enum_res, sel_res, activation) = thread::scope ( |s| {
            let producer = s.spawn (move || self.produce_labels (label_tx));
            let consumer = s.spawn (move || self.consume_results (result_rx));

            let sel_res = selector.select (label_rx, result_tx);

            let enum_res   = producer.join() .unwrap_or_else (|e| resume_unwind(e));
            let activation = consumer.join() .unwrap_or_else (|e| resume_unwind(e));
            (enum_res, sel_res, activation)
        } );

        let n_candidates = enum_res?;
        let status = sel_res?;

        info! ("run done: {} candidates streamed, selection {}, activated: {:?}",
               n_candidates, status.as_ref(), activation.as_ref().map (|a| (&a.label, a.succeeded)));
        Ok ( RunReport { status, n_candidates, activation } )
    }
}



# [ cfg (test) ]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::errors::SelectorError;
    use crate::resolver::{Exclusions, UnknownExePolicy};
    use crate::testing::*;

    /// Reads every label (checking each is already indexed when it arrives), then 'picks' the scripted labels
    struct ScriptedSelector <'i> {
        picks        : Vec <&'static str>,
        status       : SelectionStatus,
        read_limit   : Option<usize>,
        index        : Option <&'i LabelIndex>,
        seen         : Mutex <Vec<String>>,
        seen_unindexed : Mutex <Vec<String>>,
    }

    impl <'i> ScriptedSelector <'i> {
        fn picking (picks:Vec<&'static str>) -> Self {
            ScriptedSelector {
                picks, status: SelectionStatus::Selected, read_limit: None, index: None,
                seen: Mutex::default(), seen_unindexed: Mutex::default(),
            }
        }
        fn cancelling () -> Self {
            ScriptedSelector { status: SelectionStatus::Cancelled, ..Self::picking (vec![]) }
        }
        fn checking_index (mut self, index:&'i LabelIndex) -> Self { self.index = Some(index); self }
        fn reading_at_most (mut self, n:usize) -> Self { self.read_limit = Some(n); self }
        fn seen (&self) -> Vec<String> { self.seen.lock().unwrap().clone() }
    }

    impl <'i> Selector for ScriptedSelector <'i> {
        fn select (&self, labels:Receiver<String>, results:SyncSender<String>) -> Result<SelectionStatus, SelectorError> {
            for label in labels.iter() .take (self.read_limit.unwrap_or(usize::MAX)) {
                if self.index.is_some_and (|idx| !idx.contains(&label)) {
                    self.seen_unindexed.lock().unwrap().push (label.clone());
                }
                self.seen.lock().unwrap().push (label);
            }
            drop(labels);
            for p in self.picks.iter() {
                let _ = results.send (p.to_string());
            }
            Ok (self.status)
        }
    }

    struct FailingSelector;
    impl Selector for FailingSelector {
        fn select (&self, _:Receiver<String>, _:SyncSender<String>) -> Result<SelectionStatus, SelectorError> {
            Err (SelectorError::Failed { code: Some(2) })
        }
    }


    fn switcher (fd:&FakeDesktop, disambiguate:bool) -> Switcher<'_, FakeDesktop> {
        let resolver = Resolver::new (fd, Exclusions::new (["explorer.exe", "fzf.exe"]), UnknownExePolicy::Reject);
        Switcher::new (fd, resolver, disambiguate)
    }


    #[test]
    fn selecting_the_editor_activates_its_window_once () {
        let fd = FakeDesktop::new (sample_windows());
        let sw = switcher (&fd, true);
        let sel = ScriptedSelector::picking (vec! ["Editor[app.exe]"]);

        let report = sw.run(&sel).unwrap();

        assert_eq! (sel.seen(), vec! ["Editor[app.exe]".to_string()]);
        assert_eq! (fd.activations(), vec! [1]);
        assert_eq! (report, RunReport {
            status: SelectionStatus::Selected, n_candidates: 1,
            activation: Some ( Activation { label: "Editor[app.exe]".into(), hwnd: 1, succeeded: true } ),
        });
    }

    #[test]
    fn labels_are_indexed_before_they_are_streamed () {
        let mut windows = sample_windows();
        windows.extend ( (10..40) .map (|h| FakeWindow::new (h, &format! ("Doc {h}"), "word.exe")) );
        let fd = FakeDesktop::new (windows);
        let sw = switcher (&fd, true);
        let sel = ScriptedSelector::cancelling() .checking_index (sw.index());

        sw.run(&sel).unwrap();

        assert_eq! (sel.seen().len(), 31);
        assert! (sel.seen_unindexed.lock().unwrap().is_empty());
    }

    #[test]
    fn rejected_windows_never_reach_the_selector () {
        let fd = FakeDesktop::new ( vec! [
            FakeWindow::new (1, "Editor",   "app.exe"),
            FakeWindow::new (2, "Hidden",   "app.exe") .hidden(),
            FakeWindow::new (3, "Locked",   "app.exe") .unopenable(),
            FakeWindow::new (4, "No path",  "app.exe") .no_exe_path(),
            FakeWindow::new (5, "Shell",    "explorer.exe"),
            FakeWindow::new (6, "Mail",     "mail.exe"),
        ] );
        let sw = switcher (&fd, true);
        let sel = ScriptedSelector::cancelling();
        sw.run(&sel).unwrap();
        assert_eq! (sel.seen(), vec! ["Editor[app.exe]".to_string(), "Mail[mail.exe]".to_string()]);
        assert_eq! (fd.n_opened(), fd.n_released());
    }

    #[test]
    fn only_the_first_resolvable_pick_is_activated () {
        let fd = FakeDesktop::new ( vec! [ FakeWindow::new (1, "Editor", "app.exe"), FakeWindow::new (2, "Mail", "mail.exe") ] );
        let sw = switcher (&fd, true);
        let sel = ScriptedSelector::picking (vec! ["Gone[old.exe]", "Mail[mail.exe]", "Editor[app.exe]", "Mail[mail.exe]"]);

        let report = sw.run(&sel).unwrap();

        assert_eq! (fd.activations(), vec! [2]);
        assert_eq! (report.activation.map (|a| a.label), Some ("Mail[mail.exe]".to_string()));
    }

    #[test]
    fn cancelled_selection_activates_nothing () {
        let fd = FakeDesktop::new (sample_windows());
        let sw = switcher (&fd, true);
        let report = sw.run (&ScriptedSelector::cancelling()).unwrap();
        assert_eq! (report.status, SelectionStatus::Cancelled);
        assert_eq! (report.activation, None);
        assert! (fd.focus_calls().is_empty());
    }

    #[test]
    fn duplicate_labels_get_ordinals () {
        let fd = FakeDesktop::new ( vec! [
            FakeWindow::new (10, "Term", "wt.exe"),
            FakeWindow::new (11, "Term", "wt.exe"),
            FakeWindow::new (12, "Term", "wt.exe"),
        ] );
        let sw = switcher (&fd, true);
        let sel = ScriptedSelector::picking (vec! ["Term[wt.exe] (2)"]);
        sw.run(&sel).unwrap();
        assert_eq! (sel.seen(), vec! ["Term[wt.exe]", "Term[wt.exe] (2)", "Term[wt.exe] (3)"]);
        assert_eq! (fd.activations(), vec! [11]);
    }

    #[test]
    fn without_disambiguation_the_latest_duplicate_wins () {
        let fd = FakeDesktop::new ( vec! [ FakeWindow::new (10, "Term", "wt.exe"), FakeWindow::new (11, "Term", "wt.exe") ] );
        let sw = switcher (&fd, false);
        let sel = ScriptedSelector::picking (vec! ["Term[wt.exe]"]);
        sw.run(&sel).unwrap();
        assert_eq! (sel.seen(), vec! ["Term[wt.exe]", "Term[wt.exe]"]);
        assert_eq! (fd.activations(), vec! [11]);
        assert_eq! (sw.index().len(), 1);
    }

    #[test]
    fn ordinals_skip_labels_already_taken () {
        let idx = LabelIndex::default();
        assert_eq! (idx.insert ("A[a.exe] (2)".into(), 1, true), "A[a.exe] (2)");
        assert_eq! (idx.insert ("A[a.exe]".into(),     2, true), "A[a.exe]");
        assert_eq! (idx.insert ("A[a.exe]".into(),     3, true), "A[a.exe] (3)");
        assert_eq! (idx.get ("A[a.exe] (3)"), Some(3));
    }

    #[test]
    fn failed_activation_is_reported_not_fatal () {
        let mut fd = FakeDesktop::new (sample_windows());
        fd.focus_fails = true;
        let sw = switcher (&fd, true);
        let report = sw.run (&ScriptedSelector::picking (vec! ["Editor[app.exe]"])).unwrap();
        assert_eq! (report.status, SelectionStatus::Selected);
        assert_eq! (report.activation.map (|a| a.succeeded), Some(false));
    }

    #[test]
    fn enumeration_failure_is_fatal () {
        let mut fd = FakeDesktop::new (sample_windows());
        fd.enum_error = Some (EnumerationError::InvalidArgument);
        let sw = switcher (&fd, true);
        let sel = ScriptedSelector::picking (vec! ["Editor[app.exe]"]);
        let res = sw.run(&sel);
        assert! (matches! (res, Err (SwitchError::Enumeration (EnumerationError::InvalidArgument))));
        assert! (sel.seen().is_empty());
        assert! (fd.activations().is_empty());
    }

    #[test]
    fn selector_errors_propagate_and_stop_enumeration () {
        let fd = FakeDesktop::new ( (1..50) .map (|h| FakeWindow::new (h, &format! ("Win {h}"), "app.exe")) .collect() );
        let sw = switcher (&fd, true);
        let res = sw.run (&FailingSelector);
        assert! (matches! (res, Err (SwitchError::Selector (SelectorError::Failed { code: Some(2) }))));
        assert! (fd.n_visited() <= 1);
    }

    #[test]
    fn selector_leaving_early_stops_enumeration () {
        let fd = FakeDesktop::new ( (1..50) .map (|h| FakeWindow::new (h, &format! ("Win {h}"), "app.exe")) .collect() );
        let sw = switcher (&fd, true);
        let sel = ScriptedSelector::picking (vec! ["Win 2[app.exe]"]) .reading_at_most(2);

        let report = sw.run(&sel).unwrap();

        assert_eq! (sel.seen().len(), 2);
        assert_eq! (fd.n_visited(), 3);
        assert_eq! (report.n_candidates, 2);
        assert_eq! (fd.activations(), vec! [2]);
    }

    #[test]
    fn candidates_lists_without_activating () {
        let fd = FakeDesktop::new (sample_windows());
        let sw = switcher (&fd, true);
        let cands = sw.candidates().unwrap();
        assert_eq! (cands.iter().map (|c| c.label()).collect::<Vec<_>>(), vec! ["Editor[app.exe]"]);
        assert! (sw.index().is_empty());
        assert! (fd.focus_calls().is_empty());
    }
}
