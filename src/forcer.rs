use tracing::debug;

use crate::desktop::{FocusControl, Hwnd};



/// Input association between our thread and the target window's thread, detached on drop
struct InputAttachment <'a, F:FocusControl> {
    fc      : &'a F,
    cur_tid : u32,
    tgt_tid : u32,
}

impl <'a, F:FocusControl> InputAttachment <'a, F> {
    fn attach (fc:&'a F, cur_tid:u32, tgt_tid:u32) -> InputAttachment<'a, F> {
        if !fc.attach_thread_input (cur_tid, tgt_tid, true) {
            debug! ("attach-thread-input {cur_tid} -> {tgt_tid} failed, continuing anyway");
        }
        InputAttachment { fc, cur_tid, tgt_tid }
    }
}

impl <'a, F:FocusControl> Drop for InputAttachment <'a, F> {
    fn drop (&mut self) {
        // detach runs whatever happened while attached, unwinds included
        let _ = self.fc.attach_thread_input (self.cur_tid, self.tgt_tid, false);
    }
}



/// Brings a window to the foreground even when foreground-lock would deny us.<br>
/// We attach our input processing to the target window's thread for the duration, which is the
/// documented way for a background thread to get a foreground change through.<br>
/// Only the final set-foreground result is reported, the rest is best effort.
pub fn force_foreground <F:FocusControl> (fc:&F, hwnd:Hwnd) -> bool {
    let tgt_tid = fc.window_thread_id(hwnd);
    let cur_tid = fc.current_thread_id();

    let _attached = InputAttachment::attach (fc, cur_tid, tgt_tid);

    fc.restore_if_minimized(hwnd);
    let _ = fc.bring_to_top(hwnd);

    let res = fc.set_foreground(hwnd);
    debug! ("set-foreground on {hwnd:#x} (thread {tgt_tid}) returned {res}");
    res
}



# [ cfg (test) ]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn runs_the_full_sequence_in_order () {
        let fd = FakeDesktop::new (sample_windows());
        assert! (force_foreground (&fd, 1));
        assert_eq! (fd.focus_calls(), vec! [
            FocusCall::WindowThreadId (1),
            FocusCall::CurrentThreadId,
            FocusCall::AttachInput { from: CUR_TID, to: 101, attach: true },
            FocusCall::Restore (1),
            FocusCall::BringToTop (1),
            FocusCall::SetForeground (1),
            FocusCall::AttachInput { from: CUR_TID, to: 101, attach: false },
        ]);
    }

    #[test]
    fn detaches_even_when_everything_fails () {
        let mut fd = FakeDesktop::new (sample_windows());
        fd.focus_fails = true;
        assert! (!force_foreground (&fd, 4));
        assert_eq! (fd.focus_calls().last(), Some (&FocusCall::AttachInput { from: CUR_TID, to: 104, attach: false }));
    }

    #[test]
    fn detaches_when_set_foreground_unwinds () {
        let mut fd = FakeDesktop::new (sample_windows());
        fd.focus_panics = true;
        let res = std::panic::catch_unwind (std::panic::AssertUnwindSafe (|| force_foreground (&fd, 1)));
        assert! (res.is_err());
        assert_eq! (fd.focus_calls().last(), Some (&FocusCall::AttachInput { from: CUR_TID, to: 101, attach: false }));
    }
}
