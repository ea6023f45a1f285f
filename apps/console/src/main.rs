mod config;
mod view;

use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    markdown, MutationCoordinator, ObjectStore, ObjectStoreClient, PaginationController,
    StaticTokenProvider, TokenProvider, SETTLE_DELAY,
};
use shared::domain::{ObjectKey, Page, Post};
use tokio::io::{AsyncBufReadExt, BufReader};
use view::{TerminalForm, TerminalView};

#[derive(Parser, Debug)]
#[command(name = "hugo-console", about = "Terminal client for a hugo-cms object store")]
struct Cli {
    /// Base URL of the content store API.
    #[arg(long)]
    api_url: Option<String>,
    /// Bearer token attached to every call.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the object keys on one page.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Browse pages interactively; supports deleting posts.
    Browse,
    /// Fetch one post and render its Markdown body as sanitized HTML.
    Show { key: String },
    /// Upload a new post.
    Create {
        #[arg(long)]
        title: String,
        /// ISO-8601 date; defaults to today.
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        author: String,
        /// Markdown body given inline.
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read the Markdown body from a file.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete a post by key.
    Delete {
        key: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Render a local Markdown file as sanitized HTML, without the network.
    Preview { file: PathBuf },
}

fn bearer_token(flag: &Option<String>, settings: &config::Settings) -> Result<String> {
    if let Some(token) = flag.clone().or_else(|| settings.api_token.clone()) {
        return Ok(token);
    }
    match &settings.auth {
        Some(auth) => Err(anyhow!(
            "no api token configured for tenant '{}'; supply --token or HUGO_API_TOKEN",
            auth.domain
        )),
        None => Err(anyhow!(
            "no api token configured; supply --token or HUGO_API_TOKEN"
        )),
    }
}

fn make_store(
    api_url: &Option<String>,
    token: &Option<String>,
    settings: &config::Settings,
) -> Result<Arc<ObjectStoreClient>> {
    let api_url = api_url.clone().unwrap_or_else(|| settings.api_url.clone());
    let token = bearer_token(token, settings)?;
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::new(token));
    Ok(Arc::new(ObjectStoreClient::new(&api_url, tokens)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let Cli {
        api_url,
        token,
        command,
    } = Cli::parse();
    let settings = config::load_settings();

    match command {
        Command::Preview { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            println!("{}", markdown::to_safe_html(&text));
        }
        Command::List { page } => {
            let store = make_store(&api_url, &token, &settings)?;
            let page = Page::new(page);
            let listed = store
                .list(page)
                .await
                .map_err(|err| anyhow!("{}", err.user_message()))?;
            if listed.is_empty() {
                println!("no posts on page {page}");
            } else {
                for key in &listed {
                    println!("{key}");
                }
            }
        }
        Command::Show { key } => {
            let store = make_store(&api_url, &token, &settings)?;
            let object = store
                .get(&ObjectKey::new(key))
                .await
                .map_err(|err| anyhow!("{}", err.user_message()))?;
            println!("{}", markdown::to_safe_html(object.markdown_body()));
        }
        Command::Create {
            title,
            date,
            author,
            content,
            file,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(file)) => fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, None) => return Err(anyhow!("supply --content or --file")),
            };
            let post = Post {
                title,
                date: date
                    .unwrap_or_else(|| chrono::Local::now().date_naive().to_string()),
                author,
                content,
            };

            let store = make_store(&api_url, &token, &settings)?;
            let view = Arc::new(TerminalView);
            let browser = PaginationController::new(store.clone(), view.clone());
            let coordinator = MutationCoordinator::new(
                store,
                view,
                Arc::new(TerminalForm::new(true)),
                Arc::clone(&browser),
            );
            coordinator.submit_create(&post).await;

            // Let the deferred refresh print the settled listing before exit.
            tokio::time::sleep(SETTLE_DELAY + Duration::from_millis(250)).await;
        }
        Command::Delete { key, yes } => {
            let store = make_store(&api_url, &token, &settings)?;
            let view = Arc::new(TerminalView);
            let browser = PaginationController::new(store.clone(), view.clone());
            let coordinator = MutationCoordinator::new(
                store,
                view,
                Arc::new(TerminalForm::new(yes)),
                Arc::clone(&browser),
            );
            coordinator.submit_delete(&ObjectKey::new(key)).await;

            tokio::time::sleep(SETTLE_DELAY + Duration::from_millis(250)).await;
        }
        Command::Browse => {
            let store = make_store(&api_url, &token, &settings)?;
            let view = Arc::new(TerminalView);
            // Typing the delete command is treated as the confirmation.
            let form = Arc::new(TerminalForm::new(true));
            let browser = PaginationController::new(store.clone(), view.clone());
            let coordinator =
                MutationCoordinator::new(store, view, form, Arc::clone(&browser));

            browser.render().await;
            println!("commands: n(ext) p(rev) r(efresh) d <key> q(uit)");

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                match line {
                    "q" => break,
                    "n" => browser.advance().await,
                    "p" => browser.retreat().await,
                    "r" => browser.render().await,
                    "" => {}
                    _ => {
                        if let Some(key) = line.strip_prefix("d ") {
                            coordinator.submit_delete(&ObjectKey::new(key.trim())).await;
                        } else {
                            println!("unknown command '{line}'");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
