//! Capability traits over the desktop's window system.
//!
//! The engine only ever talks to the OS through these, so the enumeration, resolution and
//! activation logic is the same whether it runs against Win32 or an in-memory window table.

use crate::errors::EnumerationError;


pub type Hwnd = isize;


/// What an enumeration visitor wants to happen after it has seen a window
# [ derive (Debug, Eq, PartialEq, Hash, Copy, Clone) ]
pub enum EnumControl { Continue, Stop }


/// Walks every top-level window of the desktop session
pub trait WindowEnumerator {
    /// Invokes the visitor once per top-level window, in whatever order the OS walks them.<br>
    /// Returns as soon as the visitor answers `Stop` (which is not an error).
    fn for_each_window (&self, visitor: &mut dyn FnMut(Hwnd) -> EnumControl) -> Result<(), EnumerationError>;
}


/// An opened process, released when dropped
pub trait ProcessQuery {
    fn image_path (&self) -> Option<String>;
}


/// Per-window queries used to resolve a handle into a candidate
pub trait WindowQuery {
    type Process : ProcessQuery;

    fn is_visible (&self, hwnd:Hwnd) -> bool;

    /// window title, silently truncated to what fits the query buffer
    fn window_text (&self, hwnd:Hwnd) -> String;

    /// owning process id, None if the os cant resolve it
    fn window_pid (&self, hwnd:Hwnd) -> Option<u32>;

    fn open_process (&self, pid:u32) -> Option<Self::Process>;
}


/// The focus-control calls the foreground forcer sequences
pub trait FocusControl {
    fn window_thread_id  (&self, hwnd:Hwnd) -> u32;
    fn current_thread_id (&self) -> u32;

    fn attach_thread_input (&self, from_tid:u32, to_tid:u32, attach:bool) -> bool;

    fn restore_if_minimized (&self, hwnd:Hwnd);
    fn bring_to_top         (&self, hwnd:Hwnd) -> bool;
    fn set_foreground       (&self, hwnd:Hwnd) -> bool;
}


/// Everything a full switcher run needs from the platform
pub trait Desktop : WindowEnumerator + WindowQuery + FocusControl + Sync { }

impl <T> Desktop for T where T : WindowEnumerator + WindowQuery + FocusControl + Sync { }
