//! Windows low-level keyboard hook (`WH_KEYBOARD_LL`)
//!
//! The hook lives on a dedicated thread that owns a message loop; the OS
//! calls `keyboard_hook_proc` on that thread once per keyboard event.

use crate::error::HookError;
use crate::platform::{InstalledHook, KeyDown, KeyListener, KeyboardHookProvider};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, KillTimer, PeekMessageW, PostThreadMessageW,
    SetTimer, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT,
    MSG, PM_NOREMOVE, PM_REMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_QUIT, WM_SYSKEYDOWN,
};

const INSTALL_TIMEOUT: Duration = Duration::from_secs(2);
/// Wake-up period of the hook thread's loop, bounding how long a stop takes
/// when `WM_QUIT` cannot be delivered.
const STOP_POLL_MS: u32 = 250;
const QUIT_POST_ATTEMPTS: u32 = 3;

thread_local! {
    static HOOK_LISTENER: RefCell<Option<KeyListener>> = RefCell::new(None);
}

pub struct WindowsHookProvider;

impl WindowsHookProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsHookProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardHookProvider for WindowsHookProvider {
    fn install(&self, listener: KeyListener) -> Result<Box<dyn InstalledHook>, HookError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, HookError>>();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let join = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || run_hook_thread(listener, ready_tx, thread_stop))
            .map_err(|e| HookError::PlatformRejected(format!("failed to spawn hook thread: {}", e)))?;

        match ready_rx.recv_timeout(INSTALL_TIMEOUT) {
            Ok(Ok(thread_id)) => Ok(Box::new(WindowsHookHandle {
                thread_id,
                stop,
                join: Some(join),
            })),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            // The thread unhooks itself once it notices the receiver is gone.
            Err(_) => {
                stop.store(true, Ordering::SeqCst);
                Err(HookError::PlatformRejected(
                    "keyboard hook thread did not report readiness".to_string(),
                ))
            }
        }
    }
}

/// Installed hook; dropping it stops the hook thread and unhooks.
///
/// The thread is always joined: if `WM_QUIT` cannot be posted, the stop flag
/// is picked up on the thread's next timer tick.
pub struct WindowsHookHandle {
    thread_id: u32,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl InstalledHook for WindowsHookHandle {
    fn describe(&self) -> String {
        format!("WH_KEYBOARD_LL on thread {}", self.thread_id)
    }
}

impl Drop for WindowsHookHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        let mut posted = false;
        for attempt in 1..=QUIT_POST_ATTEMPTS {
            match unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
                Ok(()) => {
                    posted = true;
                    break;
                }
                Err(e) => tracing::warn!(
                    "Posting WM_QUIT to hook thread {} failed (attempt {}): {:?}",
                    self.thread_id,
                    attempt,
                    e
                ),
            }
        }
        if !posted {
            tracing::warn!(
                "Waiting for hook thread {} to observe the stop flag",
                self.thread_id
            );
        }

        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("Keyboard hook thread {} panicked", self.thread_id);
            }
        }
    }
}

/// Run the thread's message loop until `WM_QUIT` arrives or `stop` is set.
fn run_message_loop(stop: &AtomicBool) {
    let timer = unsafe { SetTimer(None, 0, STOP_POLL_MS, None) };
    let mut msg = MSG::default();
    unsafe {
        while !stop.load(Ordering::SeqCst) && GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        if timer != 0 {
            let _ = KillTimer(None, timer);
        }
    }
}

fn run_hook_thread(
    listener: KeyListener,
    ready: mpsc::Sender<Result<u32, HookError>>,
    stop: Arc<AtomicBool>,
) {
    HOOK_LISTENER.with(|slot| *slot.borrow_mut() = Some(listener));

    let thread_id = unsafe { GetCurrentThreadId() };
    let module = unsafe { GetModuleHandleW(None) }
        .map(|m| HINSTANCE(m.0))
        .unwrap_or_default();

    let hook = match unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), module, 0)
    } {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Failed to install keyboard hook: {:?}", e);
            let err = if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                HookError::PermissionDenied(e.message().to_string())
            } else {
                HookError::PlatformRejected(e.message().to_string())
            };
            let _ = ready.send(Err(err));
            HOOK_LISTENER.with(|slot| *slot.borrow_mut() = None);
            return;
        }
    };

    // Create this thread's message queue so WM_QUIT can be posted to it.
    let mut msg = MSG::default();
    unsafe {
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
    }

    if ready.send(Ok(thread_id)).is_ok() {
        tracing::info!("Keyboard hook installed on thread {}", thread_id);
        run_message_loop(&stop);
    }

    let _ = unsafe { UnhookWindowsHookEx(hook) };
    HOOK_LISTENER.with(|slot| *slot.borrow_mut() = None);
    tracing::info!("Keyboard hook uninstalled from thread {}", thread_id);
}

/// Low-level keyboard hook procedure
unsafe extern "system" fn keyboard_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let message = wparam.0 as u32;
        if message == WM_KEYDOWN || message == WM_SYSKEYDOWN {
            let kb_struct = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            let event = KeyDown::new(kb_struct.vkCode);

            // Never unwind into the OS input pipeline.
            let _ = std::panic::catch_unwind(|| {
                HOOK_LISTENER.with(|slot| {
                    if let Some(ref listener) = *slot.borrow() {
                        listener(event);
                    }
                });
            });
        }
    }

    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

/// Drain the calling thread's message queue (needed by the tray icon).
pub fn pump_messages() {
    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_loop_exits_on_stop_flag_without_quit_message() {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let (done_tx, done_rx) = mpsc::channel();

        let join = thread::spawn(move || {
            run_message_loop(&thread_stop);
            let _ = done_tx.send(());
        });

        thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::SeqCst);

        done_rx
            .recv_timeout(Duration::from_millis(u64::from(STOP_POLL_MS) * 4))
            .expect("message loop should notice the stop flag");
        join.join().unwrap();
    }
}
