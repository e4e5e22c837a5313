#![ allow (non_upper_case_globals, non_snake_case) ]

use std::any::Any;
use std::ffi::c_void;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use windows::core::PWSTR;
use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE, HWND, LPARAM};
use windows::Win32::System::Threading::{
    AttachThreadInput, GetCurrentThreadId, OpenProcess, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION, QueryFullProcessImageNameW
};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindowVisible,
    SetForegroundWindow, ShowWindow, SW_RESTORE
};

use crate::desktop::{EnumControl, FocusControl, Hwnd, ProcessQuery, WindowEnumerator, WindowQuery};
use crate::errors::EnumerationError;



/// window titles longer than this (in utf-16 units, incl the terminating nul) get truncated
pub const TITLE_BUF_LEN : usize = 200;
const IMAGE_PATH_BUF_LEN : usize = 1024;


fn hwnd (h:Hwnd) -> HWND { HWND (h as *mut c_void) }



pub fn check_window_visible (h:Hwnd) -> bool { unsafe {
    IsWindowVisible (hwnd(h)) .as_bool()
} }

pub fn get_window_text (h:Hwnd) -> String { unsafe {
    let mut lpstr = [0u16; TITLE_BUF_LEN];
    let copied_len = GetWindowTextW (hwnd(h), &mut lpstr);
    String::from_utf16_lossy (&lpstr[..(copied_len.max(0) as usize)])
} }

pub fn get_window_pid (h:Hwnd) -> Option<u32> { unsafe {
    let mut pid : u32 = 0;
    let _ = GetWindowThreadProcessId (hwnd(h), Some(&mut pid));
    if pid == 0 { None } else { Some(pid) }
} }

pub fn get_window_thread_id (h:Hwnd) -> u32 { unsafe {
    GetWindowThreadProcessId (hwnd(h), None)
} }



/// An open process handle (query-limited rights only), closed on drop
pub struct ProcessHandle (HANDLE);

impl ProcessHandle {
    pub fn open (pid:u32) -> Option<ProcessHandle> { unsafe {
        OpenProcess (PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), pid) .ok() .map (ProcessHandle)
    } }
}

impl ProcessQuery for ProcessHandle {
    fn image_path (&self) -> Option<String> { unsafe {
        let mut lpstr = [0u16; IMAGE_PATH_BUF_LEN];
        let mut lpdwsize = IMAGE_PATH_BUF_LEN as u32;
        QueryFullProcessImageNameW (self.0, PROCESS_NAME_WIN32, PWSTR::from_raw(lpstr.as_mut_ptr()), &mut lpdwsize) .ok()?;
        Some ( String::from_utf16_lossy (&lpstr[..(lpdwsize as usize).min(IMAGE_PATH_BUF_LEN)]) )
    } }
}

impl Drop for ProcessHandle {
    fn drop (&mut self) { unsafe {
        let _ = CloseHandle (self.0);
    } }
}



// EnumWindows hands our visitor back to us through the lparam .. this is what it points to
struct EnumCtx <'v> {
    visitor : &'v mut dyn FnMut(Hwnd) -> EnumControl,
    stopped : bool,
    panic   : Option <Box <dyn Any + Send>>,
}

unsafe extern "system" fn enum_windows_cb (h:HWND, lparam:LPARAM) -> BOOL {
    let ctx = &mut *(lparam.0 as *mut EnumCtx);
    // unwinding across the os callback boundary would abort, so we park the panic and rethrow it once EnumWindows returns
    match catch_unwind ( AssertUnwindSafe (|| (ctx.visitor)(h.0 as Hwnd)) ) {
        Ok (EnumControl::Continue) => BOOL (true as i32),
        Ok (EnumControl::Stop)     => { ctx.stopped = true; BOOL (false as i32) }
        Err (payload)              => { ctx.panic = Some(payload); BOOL (false as i32) }
    }
}

/// Maps the EnumWindows outcome to ours .. it also reports failure when our callback asked it to stop, which isnt an error for us
fn enum_result (res: windows::core::Result<()>, stopped:bool) -> Result<(), EnumerationError> {
    match res {
        Ok(()) => Ok(()),
        Err(_) if stopped => Ok(()),
        Err(e) if e.code().is_ok() => Err (EnumerationError::InvalidArgument),
        Err(e) => Err (EnumerationError::Os { code: e.code().0, message: e.message() }),
    }
}

pub fn enum_windows (visitor: &mut dyn FnMut(Hwnd) -> EnumControl) -> Result<(), EnumerationError> {
    let mut ctx = EnumCtx { visitor, stopped: false, panic: None };
    let res = unsafe { EnumWindows ( Some(enum_windows_cb), LPARAM (&mut ctx as *mut EnumCtx as isize) ) };
    if let Some(payload) = ctx.panic.take() {
        resume_unwind (payload);
    }
    enum_result (res, ctx.stopped)
}



/// Best effort restore of minimized windows .. restoring a maximized one would un-maximize it, so we leave those be
pub fn window_restore_if_minimized (h:Hwnd) { unsafe {
    if IsIconic (hwnd(h)) .as_bool() {
        let _ = ShowWindow (hwnd(h), SW_RESTORE);
    }
} }

pub fn window_bring_to_top (h:Hwnd) -> bool { unsafe {
    BringWindowToTop (hwnd(h)) .is_ok()
} }

pub fn window_set_foreground (h:Hwnd) -> bool { unsafe {
    SetForegroundWindow (hwnd(h)) .as_bool()
} }

pub fn thread_input_attach (from_tid:u32, to_tid:u32, attach:bool) -> bool { unsafe {
    AttachThreadInput (from_tid, to_tid, BOOL::from(attach)) .as_bool()
} }

pub fn get_cur_thread_id () -> u32 { unsafe {
    GetCurrentThreadId()
} }




# [ derive (Debug, Default, Copy, Clone) ]
/// The live win32 desktop
pub struct Win32Desktop;

impl WindowEnumerator for Win32Desktop {
    fn for_each_window (&self, visitor: &mut dyn FnMut(Hwnd) -> EnumControl) -> Result<(), EnumerationError> {
        enum_windows (visitor)
    }
}

impl WindowQuery for Win32Desktop {
    type Process = ProcessHandle;

    fn is_visible   (&self, h:Hwnd) -> bool          { check_window_visible(h) }
    fn window_text  (&self, h:Hwnd) -> String        { get_window_text(h) }
    fn window_pid   (&self, h:Hwnd) -> Option<u32>   { get_window_pid(h) }
    fn open_process (&self, pid:u32) -> Option<ProcessHandle> { ProcessHandle::open(pid) }
}

impl FocusControl for Win32Desktop {
    fn window_thread_id  (&self, h:Hwnd) -> u32 { get_window_thread_id(h) }
    fn current_thread_id (&self) -> u32 { get_cur_thread_id() }

    fn attach_thread_input (&self, from_tid:u32, to_tid:u32, attach:bool) -> bool {
        thread_input_attach (from_tid, to_tid, attach)
    }

    fn restore_if_minimized (&self, h:Hwnd)         { window_restore_if_minimized(h) }
    fn bring_to_top         (&self, h:Hwnd) -> bool { window_bring_to_top(h) }
    fn set_foreground       (&self, h:Hwnd) -> bool { window_set_foreground(h) }
}



# [ cfg (test) ]
mod tests {
    use super::*;
    use windows::core::Error;
    use windows::Win32::Foundation::{E_ACCESSDENIED, S_OK};

    #[test]
    fn enumeration_outcomes_map_to_our_errors () {
        assert_eq! (enum_result (Ok(()), false), Ok(()));
        // a visitor asking to stop makes EnumWindows fail, but thats a clean finish for us
        assert_eq! (enum_result (Err (Error::empty()), true), Ok(()));
        assert_eq! (enum_result (Err (Error::empty()), false), Err (EnumerationError::InvalidArgument));
        assert_eq! (enum_result (Err (Error::from (S_OK)), false), Err (EnumerationError::InvalidArgument));
        assert! (matches! (
            enum_result (Err (Error::from (E_ACCESSDENIED)), false),
            Err (EnumerationError::Os { code, .. }) if code == E_ACCESSDENIED.0
        ));
    }

    #[test]
    fn stopping_after_the_first_window_is_not_an_error () {
        let mut n_visited = 0;
        let res = Win32Desktop.for_each_window ( &mut |_| { n_visited += 1; EnumControl::Stop } );
        assert_eq! (res, Ok(()));
        assert_eq! (n_visited, 1);
    }

    #[test]
    fn visitor_panics_propagate_out_of_enumeration () {
        let res = catch_unwind ( || {
            let _ = Win32Desktop.for_each_window ( &mut |_| panic! ("visitor blew up") );
        } );
        let payload = res.unwrap_err();
        assert_eq! (payload.downcast_ref::<&str>(), Some (&"visitor blew up"));
    }
}
