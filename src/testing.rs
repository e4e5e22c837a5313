//! In-memory desktop used by the unit tests

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::desktop::*;
use crate::errors::EnumerationError;



# [ derive (Debug, Clone) ]
pub struct FakeWindow {
    pub hwnd     : Hwnd,
    pub visible  : bool,
    pub title    : String,
    pub pid      : u32,
    pub openable : bool,
    pub exe_path : Option<String>,
}

impl FakeWindow {
    pub fn new (hwnd:Hwnd, title:&str, exe:&str) -> FakeWindow {
        FakeWindow {
            hwnd, visible: true, title: title.to_string(), pid: 1000 + hwnd as u32, openable: true,
            exe_path: Some (format! (r"C:\Program Files\Apps\{exe}")),
        }
    }
    pub fn hidden       (mut self) -> Self { self.visible = false; self }
    pub fn no_pid       (mut self) -> Self { self.pid = 0; self }
    pub fn unopenable   (mut self) -> Self { self.openable = false; self }
    pub fn no_exe_path  (mut self) -> Self { self.exe_path = None; self }
}


# [ derive (Debug, Clone, PartialEq, Eq) ]
pub enum FocusCall {
    WindowThreadId (Hwnd),
    CurrentThreadId,
    AttachInput { from: u32, to: u32, attach: bool },
    Restore (Hwnd),
    BringToTop (Hwnd),
    SetForeground (Hwnd),
}


pub struct FakeProcess {
    path     : Option<String>,
    released : Arc<AtomicUsize>,
}
impl ProcessQuery for FakeProcess {
    fn image_path (&self) -> Option<String> { self.path.clone() }
}
impl Drop for FakeProcess {
    fn drop (&mut self) { self.released.fetch_add (1, Ordering::SeqCst); }
}


# [ derive (Default) ]
pub struct FakeDesktop {
    pub windows        : Vec<FakeWindow>,
    pub enum_error     : Option<EnumerationError>,
    pub focus_fails    : bool,
    pub focus_panics   : bool,
    pub visited        : AtomicUsize,
    pub opened         : AtomicUsize,
    pub released       : Arc<AtomicUsize>,
    pub calls          : Mutex<Vec<FocusCall>>,
}

pub const CUR_TID : u32 = 7;

impl FakeDesktop {
    pub fn new (windows: Vec<FakeWindow>) -> FakeDesktop {
        FakeDesktop { windows, ..Default::default() }
    }
    fn window (&self, hwnd:Hwnd) -> Option<&FakeWindow> {
        self.windows.iter().find (|w| w.hwnd == hwnd)
    }
    fn record (&self, call:FocusCall) {
        self.calls.lock().unwrap().push(call);
    }
    pub fn focus_calls (&self) -> Vec<FocusCall> {
        self.calls.lock().unwrap().clone()
    }
    pub fn activations (&self) -> Vec<Hwnd> {
        self.focus_calls().into_iter() .filter_map (|c| match c { FocusCall::SetForeground(h) => Some(h), _ => None }) .collect()
    }
    pub fn n_visited  (&self) -> usize { self.visited.load(Ordering::SeqCst) }
    pub fn n_opened   (&self) -> usize { self.opened.load(Ordering::SeqCst) }
    pub fn n_released (&self) -> usize { self.released.load(Ordering::SeqCst) }
}


impl WindowEnumerator for FakeDesktop {
    fn for_each_window (&self, visitor: &mut dyn FnMut(Hwnd) -> EnumControl) -> Result<(), EnumerationError> {
        if let Some(e) = self.enum_error.clone() { return Err(e) }
        for w in self.windows.iter() {
            self.visited.fetch_add (1, Ordering::SeqCst);
            if visitor(w.hwnd) == EnumControl::Stop { break }
        }
        Ok(())
    }
}

impl WindowQuery for FakeDesktop {
    type Process = FakeProcess;

    fn is_visible (&self, hwnd:Hwnd) -> bool {
        self.window(hwnd) .is_some_and (|w| w.visible)
    }
    fn window_text (&self, hwnd:Hwnd) -> String {
        self.window(hwnd) .map (|w| w.title.clone()) .unwrap_or_default()
    }
    fn window_pid (&self, hwnd:Hwnd) -> Option<u32> {
        self.window(hwnd) .map (|w| w.pid) .filter (|&pid| pid != 0)
    }
    fn open_process (&self, pid:u32) -> Option<FakeProcess> {
        let w = self.windows.iter() .find (|w| w.pid == pid && w.openable)?;
        self.opened.fetch_add (1, Ordering::SeqCst);
        Some ( FakeProcess { path: w.exe_path.clone(), released: self.released.clone() } )
    }
}

impl FocusControl for FakeDesktop {
    fn window_thread_id (&self, hwnd:Hwnd) -> u32 {
        self.record (FocusCall::WindowThreadId(hwnd));
        100 + hwnd as u32
    }
    fn current_thread_id (&self) -> u32 {
        self.record (FocusCall::CurrentThreadId);
        CUR_TID
    }
    fn attach_thread_input (&self, from:u32, to:u32, attach:bool) -> bool {
        self.record (FocusCall::AttachInput { from, to, attach });
        !self.focus_fails
    }
    fn restore_if_minimized (&self, hwnd:Hwnd) {
        self.record (FocusCall::Restore(hwnd));
    }
    fn bring_to_top (&self, hwnd:Hwnd) -> bool {
        self.record (FocusCall::BringToTop(hwnd));
        !self.focus_fails
    }
    fn set_foreground (&self, hwnd:Hwnd) -> bool {
        self.record (FocusCall::SetForeground(hwnd));
        if self.focus_panics { panic! ("set_foreground blew up") }
        !self.focus_fails
    }
}


/// the synthetic window list: only the first entry should survive resolution
pub fn sample_windows () -> Vec<FakeWindow> {
    vec! [
        FakeWindow::new (1, "Editor", "app.exe"),
        FakeWindow::new (2, "Hidden", "app.exe") .hidden(),
        FakeWindow::new (3, "",       "app.exe"),
        FakeWindow::new (4, "Shell",  "explorer.exe"),
    ]
}
