//! System Tray
//!
//! Tray icon with an Enable/Disable item, a sound picker submenu and Quit.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu},
    TrayIconBuilder,
};

use crate::business::{EngineLifecycleController, EngineNotice, EngineSnapshot};
use crate::platform::PlatformFactory;

const TOOLTIP: &str = "Keyboard Sound";

fn toggle_label(snapshot: &EngineSnapshot) -> &'static str {
    if snapshot.enabled {
        "Disable"
    } else {
        "Enable"
    }
}

fn status_label(snapshot: &EngineSnapshot) -> String {
    match snapshot.active_file.as_deref() {
        Some(name) => format!("Sound: {}", name),
        None => "No sound selected".to_string(),
    }
}

/// Rebuild the sound picker, returning menu id -> file name.
fn fill_sounds_menu(
    submenu: &Submenu,
    controller: &EngineLifecycleController,
) -> Result<HashMap<MenuId, String>> {
    for item in submenu.items() {
        submenu.remove(item.as_ref())?;
    }

    let active = controller.snapshot().active_file;
    let mut ids = HashMap::new();
    let files = controller.list_sounds();

    if files.is_empty() {
        submenu.append(&MenuItem::new("(no sound files stored)", false, None))?;
    }
    for name in files {
        let checked = active.as_deref() == Some(name.as_str());
        let item = CheckMenuItem::new(&name, true, checked, None);
        ids.insert(item.id().clone(), name);
        submenu.append(&item)?;
    }

    Ok(ids)
}

/// Run the application with system tray until Quit is chosen.
pub async fn run_app(controller: Arc<EngineLifecycleController>) -> Result<()> {
    let icon = load_icon()?;
    let menu = Menu::new();

    let snapshot = controller.snapshot();
    let status_item = MenuItem::new(status_label(&snapshot), false, None);
    let toggle_item = MenuItem::new(toggle_label(&snapshot), true, None);
    let sounds_menu = Submenu::new("Sounds", true);
    let refresh_item = MenuItem::new("Refresh sound list", true, None);
    let separator = PredefinedMenuItem::separator();
    let quit_item = MenuItem::new("Exit", true, None);

    let toggle_id = toggle_item.id().clone();
    let refresh_id = refresh_item.id().clone();
    let quit_id = quit_item.id().clone();

    menu.append(&status_item)?;
    menu.append(&toggle_item)?;
    menu.append(&sounds_menu)?;
    menu.append(&refresh_item)?;
    menu.append(&separator)?;
    menu.append(&quit_item)?;

    let mut sound_ids = fill_sounds_menu(&sounds_menu, &controller)?;

    let _tray_icon = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_tooltip(TOOLTIP)
        .with_icon(icon)
        .build()?;

    tracing::info!("System tray initialized");

    // Menu widgets are not Send, so they are refreshed from this loop only.
    let dirty = Arc::new(AtomicBool::new(false));
    let dirty_notice = dirty.clone();
    controller.set_on_notice(move |notice| {
        match &notice {
            EngineNotice::NoFileConfigured => {
                tracing::warn!("No sound file configured - pick one from the tray menu")
            }
            EngineNotice::HookUnavailable(e) => {
                tracing::error!("Key sounds unavailable: {}", e)
            }
            _ => {}
        }
        dirty_notice.store(true, Ordering::SeqCst);
    });

    let menu_rx = MenuEvent::receiver();

    loop {
        PlatformFactory::pump_messages();

        while let Ok(event) = menu_rx.try_recv() {
            if event.id == toggle_id {
                tracing::info!("Toggle from menu");
                if let Err(e) = controller.toggle_enabled() {
                    tracing::error!("Failed to toggle key sounds: {}", e);
                }
            } else if event.id == refresh_id {
                controller.revalidate_active_file();
            } else if event.id == quit_id {
                tracing::info!("Quit from menu");
                controller.shutdown();
                tracing::info!("Application exiting");
                return Ok(());
            } else if let Some(name) = sound_ids.get(&event.id).cloned() {
                tracing::info!("Sound {} chosen from menu", name);
                if let Err(e) = controller.set_active_file(&name) {
                    tracing::error!("Failed to set default file: {}", e);
                }
            }
            dirty.store(true, Ordering::SeqCst);
        }

        if dirty.swap(false, Ordering::SeqCst) {
            let snapshot = controller.snapshot();
            toggle_item.set_text(toggle_label(&snapshot));
            status_item.set_text(status_label(&snapshot));
            sound_ids = fill_sounds_menu(&sounds_menu, &controller)?;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Draw the tray icon: a rounded key cap
fn load_icon() -> Result<tray_icon::Icon> {
    let size = 32u32;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);

    let cap = (72u8, 80u8, 96u8);
    let face = (236u8, 239u8, 244u8);
    let margin = 3.0f32;
    let radius = 6.0f32;

    for y in 0..size {
        for x in 0..size {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            // Distance outside a rounded rectangle inset by `margin`
            let lo = margin + radius;
            let hi = size as f32 - margin - radius;
            let dx = (lo - px).max(px - hi).max(0.0);
            let dy = (lo - py).max(py - hi).max(0.0);
            let outside = (dx * dx + dy * dy).sqrt() - radius;

            if outside > 0.0 {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }

            let alpha = if outside > -1.0 {
                ((-outside) * 255.0) as u8
            } else {
                255
            };

            // Lighter key face on the upper part of the cap
            let on_face = px > 8.0 && px < 24.0 && py > 7.0 && py < 21.0;
            let (r, g, b) = if on_face { face } else { cap };
            rgba.extend_from_slice(&[r, g, b, alpha]);
        }
    }

    let icon = tray_icon::Icon::from_rgba(rgba, size, size)?;
    Ok(icon)
}
