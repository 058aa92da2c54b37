use std::{fs, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    ClientError, FileTokenStorage, ListOptions, ResponseBody, ResumeClient, TokenStore,
};
use shared::{
    domain::ResumeId,
    protocol::{Credentials, DeleteResponse, PageQuery, ResumeCreate, ResumeUpdate},
};
use tracing_subscriber::EnvFilter;

mod browse;
mod config;
mod render;

use browse::BrowseOutcome;
use config::{clamp_per_page, load_settings, Settings, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "resume", about = "Command-line client for the resume service")]
struct Cli {
    /// Base URL of the resume API.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Page size for list and history views.
    #[arg(long, global = true)]
    per_page: Option<u32>,
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(CredentialArgs),
    Register(CredentialArgs),
    Logout,
    List {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Interactive search with debounced input and paging.
    Browse {
        #[arg(long, short)]
        query: Option<String>,
    },
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        title: String,
        #[command(flatten)]
        content: ContentArgs,
    },
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
    },
    Delete {
        id: i64,
    },
    /// Runs the server-side improvement and stores the previous text as a revision.
    Improve {
        id: i64,
    },
    History {
        id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct ContentArgs {
    #[arg(long)]
    content: Option<String>,
    /// Read the content from a file.
    #[arg(long)]
    content_file: Option<PathBuf>,
}

impl ContentArgs {
    fn resolve(&self) -> Result<Option<String>> {
        if let Some(path) = &self.content_file {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            return Ok(Some(content));
        }
        Ok(self.content.clone())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings(&cli.config)?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(per_page) = cli.per_page {
        settings.per_page = clamp_per_page(per_page);
    }
    tracing::debug!(?settings, "settings loaded");

    let tokens = TokenStore::new(Arc::new(FileTokenStorage::new(&settings.token_path)))
        .context("failed to open token storage")?;
    let client = Arc::new(ResumeClient::new(settings.api_url.clone(), tokens));

    let result = execute(&client, &settings, cli.command).await;
    if let Err(err) = &result {
        if err
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::requires_reauth)
        {
            client.logout()?;
            bail!("{err}; session cleared, sign in again with `resume login`");
        }
    }
    result
}

async fn execute(client: &Arc<ResumeClient>, settings: &Settings, command: Command) -> Result<()> {
    match command {
        Command::Login(args) => {
            client.login(&args.into_credentials()).await?;
            println!("Signed in");
        }
        Command::Register(args) => {
            client.register(&args.into_credentials()).await?;
            println!("Account created and signed in");
        }
        Command::Logout => {
            client.logout()?;
            println!("Signed out");
        }
        Command::List { query, page } => {
            let query = PageQuery::new(page, settings.per_page, query.as_deref().unwrap_or(""));
            let page = client.list_resumes(&query).await?;
            println!("{}", render::resume_page(&page));
        }
        Command::Browse { query } => {
            let options = ListOptions {
                per_page: settings.per_page,
                debounce: Duration::from_millis(settings.debounce_ms),
            };
            match browse::run(Arc::clone(client), options, query).await? {
                BrowseOutcome::Quit => {}
                BrowseOutcome::ReauthRequired(message) => {
                    return Err(ClientError::Unauthenticated { message }.into());
                }
            }
        }
        Command::Show { id } => {
            let resume = client.get_resume(ResumeId(id)).await?;
            println!("{}", render::resume_detail(&resume));
        }
        Command::Create { title, content } => {
            let content = content
                .resolve()?
                .context("either --content or --content-file is required")?;
            let resume = client.create_resume(&ResumeCreate { title, content }).await?;
            println!("Created #{}", resume.id);
        }
        Command::Update { id, title, content } => {
            let update = ResumeUpdate {
                title,
                content: content.resolve()?,
            };
            if update.is_empty() {
                bail!("nothing to update; pass --title, --content or --content-file");
            }
            let resume = client.update_resume(ResumeId(id), &update).await?;
            println!("{}", render::resume_detail(&resume));
        }
        Command::Delete { id } => match client.delete_resume(ResumeId(id)).await? {
            ResponseBody::Text(text) => println!("Deleted #{id}: {text}"),
            body => {
                let DeleteResponse { ok } = body.into_json()?;
                if !ok {
                    bail!("the server did not confirm deleting #{id}");
                }
                println!("Deleted #{id}");
            }
        },
        Command::Improve { id } => {
            let resume = client.improve_resume(ResumeId(id)).await?;
            println!("{}", render::resume_detail(&resume));
        }
        Command::History { id, page } => {
            let history = client
                .resume_history(ResumeId(id), page, settings.per_page)
                .await?;
            println!("{}", render::revision_page(&history));
        }
    }
    Ok(())
}

impl CredentialArgs {
    fn into_credentials(self) -> Credentials {
        Credentials {
            email: self.email,
            password: self.password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_with_global_flags() {
        let cli = Cli::try_parse_from([
            "resume",
            "list",
            "--query",
            "rust",
            "--page",
            "2",
            "--api-url",
            "http://localhost:9000",
        ])
        .expect("valid args");
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:9000"));
        match cli.command {
            Command::List { query, page } => {
                assert_eq!(query.as_deref(), Some("rust"));
                assert_eq!(page, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn content_and_content_file_are_exclusive() {
        let result = Cli::try_parse_from([
            "resume",
            "create",
            "--title",
            "Rust engineer",
            "--content",
            "text",
            "--content-file",
            "cv.md",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn content_file_is_read_when_given() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cv.md");
        fs::write(&path, "from file").expect("write");

        let args = ContentArgs {
            content: None,
            content_file: Some(path),
        };
        assert_eq!(args.resolve().expect("resolve").as_deref(), Some("from file"));
    }
}
