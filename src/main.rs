use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use querysync::{
    ClientConfig, CreateChainPost, CreateComment, DeleteChainPost, DeleteComment, Mutation,
    QueryClient, QueryKey, VoteChainPost, VoteComment, VoteDirection,
};
use serde_json::Value;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "querysync")]
#[command(about = "Run mutations against a backend and inspect the resulting cache")]
struct Cli {
    /// Backend base URL; a token may be given as userinfo
    #[arg(long, default_value = "http://localhost:8080/api")]
    base_url: String,
    /// Bearer token, overrides one embedded in the URL
    #[arg(long)]
    token: Option<String>,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Queries to load before running the command, e.g. `comments:p1`
    #[arg(long = "preload")]
    preload: Vec<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Fetch {
        /// Query in `entity:id` form, e.g. `project:p1`
        query: String,
    },
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
    Post {
        #[command(subcommand)]
        action: PostAction,
    },
}

#[derive(Subcommand)]
enum CommentAction {
    Create {
        #[arg(long)]
        project: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        author: Option<String>,
    },
    Delete {
        #[arg(long)]
        project: String,
        #[arg(long)]
        id: String,
    },
    Vote {
        #[arg(long)]
        project: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        down: bool,
    },
}

#[derive(Subcommand)]
enum PostAction {
    Create {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    Delete {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        id: String,
    },
    Vote {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        down: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_url(&cli.base_url)?
        .timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(token) = &cli.token {
        config = config.auth_token(token);
    }
    let client = QueryClient::connect(config)?;

    for query in &cli.preload {
        let key = parse_query(query)?;
        client
            .fetch_query(&key)
            .await
            .with_context(|| format!("preloading '{}'", query))?;
    }

    let outcome = match cli.command {
        Command::Fetch { query } => {
            let key = parse_query(&query)?;
            client.fetch_query(&key).await?;
            Ok(())
        }
        Command::Comment { action } => {
            let mutation: Box<dyn Mutation> = match action {
                CommentAction::Create {
                    project,
                    content,
                    author,
                } => {
                    let mut create = CreateComment::new(project, content);
                    if let Some(author) = author {
                        create = create.author(author);
                    }
                    Box::new(create)
                }
                CommentAction::Delete { project, id } => Box::new(DeleteComment::new(project, id)),
                CommentAction::Vote { project, id, down } => {
                    Box::new(VoteComment::new(project, id, direction(down)))
                }
            };
            run(&client, mutation.as_ref()).await
        }
        Command::Post { action } => {
            let mutation: Box<dyn Mutation> = match action {
                PostAction::Create {
                    chain,
                    title,
                    content,
                } => Box::new(CreateChainPost::new(chain, title, content)),
                PostAction::Delete { chain, id } => Box::new(DeleteChainPost::new(chain, id)),
                PostAction::Vote { chain, id, down } => {
                    Box::new(VoteChainPost::new(chain, id, direction(down)))
                }
            };
            run(&client, mutation.as_ref()).await
        }
    };

    // the rolled-back cache is still worth showing before exiting non-zero
    print_cache(&client).await?;
    outcome
}

async fn run(client: &QueryClient, mutation: &dyn Mutation) -> Result<()> {
    let outcome = client
        .mutate(mutation)
        .await
        .with_context(|| format!("{} rolled back", mutation.kind()))?;
    println!(
        "{} committed ({} keys merged, {} invalidated)",
        mutation.kind(),
        outcome.settlement.reconciled.len(),
        outcome.settlement.invalidated.len()
    );
    Ok(())
}

async fn print_cache(client: &QueryClient) -> Result<()> {
    let mut cache = serde_json::Map::new();
    for (key, value) in client.store().dump().await {
        cache.insert(key.to_string(), serde_json::to_value(&value)?);
    }
    println!("{}", serde_json::to_string_pretty(&Value::Object(cache))?);
    Ok(())
}

fn direction(down: bool) -> VoteDirection {
    if down {
        VoteDirection::Down
    } else {
        VoteDirection::Up
    }
}

fn parse_query(query: &str) -> Result<QueryKey> {
    let (entity, id) = query
        .split_once(':')
        .with_context(|| format!("query '{}' must look like entity:id", query))?;
    let key = match entity {
        "comments" => QueryKey::comments(id),
        "project" => QueryKey::project(id),
        "posts" | "chain_posts" => QueryKey::chain_posts(id),
        "chain" => QueryKey::chain(id),
        "user_comments" => QueryKey::user_comments(id),
        other => anyhow::bail!("unknown query entity '{}' in '{}'", other, query),
    };
    Ok(key)
}
