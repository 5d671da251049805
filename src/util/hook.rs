use tracing::error;

use crate::ui::tui;

/// Restores the terminal and records the panic before the default report.
pub fn set_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(err) = tui::Tui::restore() {
            error!(error = %err, "terminal_restore_failed");
        }
        error!(panic = %panic_info, "auralis_panicked");
        hook(panic_info);
    }));
}
