#![allow(unexpected_cfgs)]
//! macOS global key-down tap (`CGEventTap`)
//!
//! The tap lives on its own thread running a private `CFRunLoop`, so key-downs
//! arrive whatever the main thread is doing. Taps only see keyboard events once
//! the process is trusted for accessibility, so installation is refused up
//! front when it is not.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use core_foundation::base::TCFType;
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    EventField,
};

use crate::error::HookError;
use crate::platform::{InstalledHook, KeyDown, KeyListener, KeyboardHookProvider};

const READY_TIMEOUT: Duration = Duration::from_secs(2);
const RUN_SLICE: Duration = Duration::from_millis(250);

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapEnable(tap: *const std::ffi::c_void, enable: bool);
}

pub struct MacosHookProvider;

impl MacosHookProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacosHookProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardHookProvider for MacosHookProvider {
    fn install(&self, listener: KeyListener) -> Result<Box<dyn InstalledHook>, HookError> {
        if !unsafe { AXIsProcessTrusted() } {
            return Err(HookError::PermissionDenied(
                "grant Input Monitoring / Accessibility access in System Settings".to_string(),
            ));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_stop = stop.clone();

        let join = thread::Builder::new()
            .name("keyboard-tap".to_string())
            .spawn(move || run_tap_thread(listener, ready_tx, thread_stop))
            .map_err(|e| HookError::PlatformRejected(format!("cannot spawn tap thread: {}", e)))?;

        match ready_rx.recv_timeout(READY_TIMEOUT) {
            Ok(Ok(run_loop)) => {
                tracing::info!("Global key-down tap installed");
                Ok(Box::new(MacosHookHandle {
                    run_loop,
                    stop,
                    join: Some(join),
                }))
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                stop.store(true, Ordering::SeqCst);
                Err(HookError::PlatformRejected(
                    "tap thread did not report readiness".to_string(),
                ))
            }
        }
    }
}

fn run_tap_thread(
    listener: KeyListener,
    ready: mpsc::Sender<Result<CFRunLoop, HookError>>,
    stop: Arc<AtomicBool>,
) {
    // Raw mach port, published once the tap exists, for re-enabling after a timeout.
    let port = Arc::new(AtomicUsize::new(0));
    let callback_port = port.clone();

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        move |_proxy, event_type, event| {
            match event_type {
                CGEventType::KeyDown => {
                    let key_code =
                        event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u32;
                    let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        listener(KeyDown::new(key_code))
                    }));
                }
                CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                    let raw = callback_port.load(Ordering::SeqCst);
                    if raw != 0 {
                        tracing::warn!("Key-down tap was disabled by the system, re-enabling");
                        unsafe { CGEventTapEnable(raw as *const std::ffi::c_void, true) };
                    }
                }
                _ => {}
            }
            None
        },
    );

    let tap = match tap {
        Ok(tap) => tap,
        Err(()) => {
            let _ = ready.send(Err(HookError::PlatformRejected(
                "CGEventTapCreate refused the key-down tap".to_string(),
            )));
            return;
        }
    };

    let source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(HookError::PlatformRejected(
                "cannot create run loop source for the key-down tap".to_string(),
            )));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe { run_loop.add_source(&source, kCFRunLoopCommonModes) };
    port.store(tap.mach_port.as_concrete_TypeRef() as usize, Ordering::SeqCst);
    tap.enable();

    if ready.send(Ok(run_loop.clone())).is_err() {
        return;
    }

    // Sliced so a stop request issued before the loop starts is still observed.
    while !stop.load(Ordering::SeqCst) {
        unsafe { CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, RUN_SLICE, false) };
    }

    run_loop.remove_source(&source, unsafe { kCFRunLoopCommonModes });
    tracing::debug!("Key-down tap thread exited");
}

/// Installed tap; dropping it stops the run loop and joins its thread.
pub struct MacosHookHandle {
    run_loop: CFRunLoop,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl InstalledHook for MacosHookHandle {
    fn describe(&self) -> String {
        "CGEventTap (session, listen-only)".to_string()
    }
}

impl Drop for MacosHookHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.run_loop.stop();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("Key-down tap thread panicked");
            }
        }
        tracing::info!("Global key-down tap removed");
    }
}

/// Drain pending AppKit events on the calling (main) thread.
///
/// The status item and its menu are only serviced while this runs.
pub fn pump_messages() {
    use cocoa::appkit::NSEventMask;
    use cocoa::base::{id, nil, YES};
    use objc::{class, msg_send, sel, sel_impl};

    unsafe {
        let pool: id = msg_send![class!(NSAutoreleasePool), new];
        let app: id = msg_send![class!(NSApplication), sharedApplication];
        let distant_past: id = msg_send![class!(NSDate), distantPast];
        let mode = kCFRunLoopDefaultMode as id;

        loop {
            let event: id = msg_send![app,
                nextEventMatchingMask: NSEventMask::NSAnyEventMask.bits()
                untilDate: distant_past
                inMode: mode
                dequeue: YES];
            if event == nil {
                break;
            }
            let _: () = msg_send![app, sendEvent: event];
        }

        let _: () = msg_send![pool, drain];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    // Untrusted processes are refused up front; trusted ones get a tap whose
    // thread is joined promptly on drop.
    #[test]
    fn install_is_refused_or_tears_down_cleanly() {
        let listener: KeyListener = Arc::new(|_| {});
        match MacosHookProvider::new().install(listener) {
            Err(e) => assert!(matches!(
                e,
                HookError::PermissionDenied(_) | HookError::PlatformRejected(_)
            )),
            Ok(handle) => {
                let started = Instant::now();
                drop(handle);
                assert!(started.elapsed() < RUN_SLICE * 4);
            }
        }
    }
}
