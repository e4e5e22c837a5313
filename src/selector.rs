//! The interactive selection front-end, consumed as: labels stream in, selected labels stream out

use std::io::{BufRead, BufReader, LineWriter, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::mpsc::{Receiver, SyncSender};
use std::thread;

use strum_macros::AsRefStr;
use tracing::{debug, info};

use crate::errors::SelectorError;




/// How an interactive selection ended (errors are reported separately)
# [ derive (Debug, Eq, PartialEq, Hash, Copy, Clone, AsRefStr) ]
pub enum SelectionStatus { Selected, NoMatch, Cancelled }

impl SelectionStatus {
    // these follow fzf's exit codes, so scripts wrapping us see what they'd see from fzf
    pub fn exit_code (&self) -> u8 {
        match self {
            SelectionStatus::Selected  => 0,
            SelectionStatus::NoMatch   => 1,
            SelectionStatus::Cancelled => 130,
        }
    }
    pub fn from_exit_code (code:Option<i32>) -> Result<SelectionStatus, SelectorError> {
        match code {
            Some(0)   => Ok (SelectionStatus::Selected),
            Some(1)   => Ok (SelectionStatus::NoMatch),
            Some(130) => Ok (SelectionStatus::Cancelled),
            _ => Err (SelectorError::Failed { code })
        }
    }
}



pub trait Selector {
    /// Runs the interactive selection to completion.<br>
    /// The labels receiver closing means no more candidates are coming. Anything sent on results is
    /// a selected label; dropping results (by returning) closes the result stream.
    fn select (&self, labels:Receiver<String>, results:SyncSender<String>) -> Result<SelectionStatus, SelectorError>;
}



# [ derive (Debug, Clone) ]
/// Runs fzf (or anything with the same stdin/stdout/exit-code contract) as the selection front-end
pub struct FzfSelector {
    program : String,
    options : Vec<String>,
}

impl FzfSelector {

    pub fn new (program:impl Into<String>, options:Vec<String>) -> FzfSelector {
        FzfSelector { program: program.into(), options }
    }

    fn feed_labels (labels:Receiver<String>, stdin:ChildStdin) -> usize {
        let mut w = LineWriter::new(stdin);
        let mut n_fed = 0;
        for label in labels.iter() {
            if writeln! (w, "{label}").is_err() {
                // selector went away (usually because the user already picked something) ..
                // dropping the labels receiver on return is what tells enumeration to stop
                debug! ("selector stopped reading input after {n_fed} labels");
                break
            }
            n_fed += 1;
        }
        n_fed
        // ^^ and dropping the writer closes the selector's stdin, its end-of-input signal
    }

    // a line that isnt valid utf-8 cant match any label we fed, so it is passed on lossily and the coordinator skips it
    fn forward_results (mut reader:impl BufRead, results:&SyncSender<String>) -> std::io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until (b'\n', &mut buf)? == 0 { return Ok(()) }
            let line = String::from_utf8_lossy (&buf);
            let label = line.trim_end_matches (['\n', '\r']);
            if label.is_empty() { continue }
            // a failed send just means the coordinator already activated something
            let _ = results.send (label.to_string());
        }
    }
}

impl Selector for FzfSelector {

    fn select (&self, labels:Receiver<String>, results:SyncSender<String>) -> Result<SelectionStatus, SelectorError> {

        info! ("launching selector: {} {:?}", self.program, self.options);
        let mut child = Command::new (&self.program) .args (&self.options)
            .stdin (Stdio::piped()) .stdout (Stdio::piped()) .stderr (Stdio::inherit())
            .spawn()
            .map_err (|source| SelectorError::Spawn { program: self.program.clone(), source })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err (SelectorError::Io (std::io::Error::other ("selector pipes unavailable")))
        };

        let read_res = thread::scope ( |s| {
            let feeder = s.spawn (move || Self::feed_labels (labels, stdin));

            let read_res = Self::forward_results (BufReader::new(stdout), &results);
            drop(results);

            let n_fed = feeder.join() .unwrap_or_else (|e| std::panic::resume_unwind(e));
            debug! ("fed {n_fed} labels to selector");
            read_res
        } );

        let status = child.wait()?;
        read_res?;
        info! ("selector exited with {:?}", status.code());
        SelectionStatus::from_exit_code (status.code())
    }
}



# [ cfg (test) ]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;

    /// drives a selector with the given labels and collects whatever it selects
    fn drive (sel:&impl Selector, labels:Vec<&str>) -> (Result<SelectionStatus, SelectorError>, Vec<String>) {
        let (label_tx, label_rx) = sync_channel::<String>(0);
        let (result_tx, result_rx) = sync_channel::<String>(0);
        let labels : Vec<String> = labels.into_iter().map(String::from).collect();
        thread::scope (|s| {
            s.spawn (move || { for l in labels { if label_tx.send(l).is_err() { break } } });
            let collector = s.spawn (move || result_rx.iter().collect::<Vec<_>>());
            let res = sel.select (label_rx, result_tx);
            (res, collector.join().unwrap())
        })
    }

    fn sh (script:&str) -> FzfSelector {
        FzfSelector::new ("sh", vec! ["-c".into(), script.into()])
    }

    #[test]
    fn status_follows_fzf_exit_codes () {
        assert_eq! (SelectionStatus::from_exit_code (Some(0)).unwrap(),   SelectionStatus::Selected);
        assert_eq! (SelectionStatus::from_exit_code (Some(1)).unwrap(),   SelectionStatus::NoMatch);
        assert_eq! (SelectionStatus::from_exit_code (Some(130)).unwrap(), SelectionStatus::Cancelled);
        assert! (matches! (SelectionStatus::from_exit_code (Some(2)), Err (SelectorError::Failed { code: Some(2) })));
        assert! (matches! (SelectionStatus::from_exit_code (None),    Err (SelectorError::Failed { code: None })));
        assert_eq! (SelectionStatus::Cancelled.exit_code(), 130);
    }

    #[test]
    fn missing_selector_binary_is_a_spawn_error () {
        let sel = FzfSelector::new ("fzswitch-no-such-selector", vec![]);
        let (res, picked) = drive (&sel, vec! ["Editor[app.exe]"]);
        assert! (matches! (res, Err (SelectorError::Spawn { .. })));
        assert! (picked.is_empty());
    }

    # [ cfg (unix) ]
    #[test]
    fn picks_what_the_selector_prints () {
        let (res, picked) = drive (&sh ("head -n 1"), vec! ["Editor[app.exe]", "Mail[mail.exe]"]);
        assert_eq! (res.unwrap(), SelectionStatus::Selected);
        assert_eq! (picked, vec! ["Editor[app.exe]".to_string()]);
    }

    # [ cfg (unix) ]
    #[test]
    fn no_match_and_cancel_yield_no_results () {
        let (res, picked) = drive (&sh ("cat > /dev/null; exit 1"), vec! ["Editor[app.exe]"]);
        assert_eq! (res.unwrap(), SelectionStatus::NoMatch);
        assert! (picked.is_empty());

        let (res, picked) = drive (&sh ("exit 130"), vec! ["Editor[app.exe]"]);
        assert_eq! (res.unwrap(), SelectionStatus::Cancelled);
        assert! (picked.is_empty());
    }

    # [ cfg (unix) ]
    #[test]
    fn selector_errors_are_reported () {
        let (res, _) = drive (&sh ("exit 2"), vec! []);
        assert! (matches! (res, Err (SelectorError::Failed { code: Some(2) })));
    }

    #[test]
    fn garbled_output_lines_do_not_end_the_result_stream () {
        let (tx, rx) = sync_channel::<String>(8);
        let out : &[u8] = b"Editor[app.exe]\r\n\xff\xfe junk\n\nMail[mail.exe]";
        FzfSelector::forward_results (out, &tx).unwrap();
        drop(tx);
        let got : Vec<String> = rx.iter().collect();
        assert_eq! (got.len(), 3);
        assert_eq! (got[0], "Editor[app.exe]");
        assert! (got[1].ends_with (" junk"));
        assert_eq! (got[2], "Mail[mail.exe]");
    }

    # [ cfg (unix) ]
    #[test]
    fn invalid_utf8_from_the_selector_is_not_fatal () {
        let (res, picked) = drive (&sh (r"printf 'Editor[app.exe]\n\377\n'"), vec! []);
        assert_eq! (res.unwrap(), SelectionStatus::Selected);
        assert_eq! (picked.len(), 2);
        assert_eq! (picked[0], "Editor[app.exe]");
    }

    # [ cfg (unix) ]
    #[test]
    fn early_selector_exit_stops_the_label_producer () {
        let (label_tx, label_rx) = sync_channel::<String>(0);
        let (result_tx, _result_rx) = sync_channel::<String>(0);
        let n_sent = thread::scope (|s| {
            let producer = s.spawn (move || {
                let mut n = 0usize;
                while n < 1_000_000 && label_tx.send (format! ("Window {n}[app.exe]")).is_ok() { n += 1 }
                n
            });
            let res = sh ("exit 130") .select (label_rx, result_tx);
            assert_eq! (res.unwrap(), SelectionStatus::Cancelled);
            producer.join().unwrap()
        });
        assert! (n_sent < 1_000_000);
    }
}
