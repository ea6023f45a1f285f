use std::io::{self, Write};

use async_trait::async_trait;
use client_core::{FormAdapter, RenderAdapter};
use shared::domain::ObjectKey;

/// Prints listings and notices to the terminal.
pub struct TerminalView;

impl RenderAdapter for TerminalView {
    fn render_page(&self, keys: &[ObjectKey]) {
        for key in keys {
            println!("  {key}");
        }
    }

    fn set_can_advance(&self, enabled: bool) {
        if enabled {
            println!("  -> more posts on the (n)ext page");
        }
    }

    fn set_can_retreat(&self, enabled: bool) {
        if enabled {
            println!("  <- earlier posts on the (p)revious page");
        }
    }

    fn show_empty_page_notice(&self) {
        println!("  no posts on this page");
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn show_success(&self, message: &str) {
        println!("{message}");
    }
}

pub struct TerminalForm {
    assume_yes: bool,
}

impl TerminalForm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl FormAdapter for TerminalForm {
    fn clear(&self) {
        // One-shot argument parsing leaves nothing to clear.
    }

    async fn confirm_delete(&self, key: &ObjectKey) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = format!("delete '{key}'? [y/N] ");
        tokio::task::spawn_blocking(move || {
            let mut out = io::stdout();
            let _ = out.write_all(prompt.as_bytes());
            let _ = out.flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                return false;
            }
            matches!(line.trim(), "y" | "Y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}
