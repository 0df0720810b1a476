//! nsid command - show and assign ids of named network namespaces.

use clap::{Parser, Subcommand};
use rtnl::netlink::{Message, NSID_GROUPS, Transport, groups, netns};
use tokio_stream::StreamExt;

#[derive(Parser)]
#[command(name = "nsid", version, about = "Network namespace id tool")]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List named namespaces with their ids.
    #[command(visible_alias = "ls")]
    List,

    /// Assign an id to a named namespace.
    Set {
        /// Namespace name.
        name: String,
        /// Namespace id.
        id: i32,
    },

    /// Remove the id of a named namespace.
    #[command(visible_alias = "del")]
    Unset {
        /// Namespace name.
        name: String,
    },

    /// Print namespace id events.
    #[command(visible_alias = "mon")]
    Monitor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::List => list(cli.json).await,
        Command::Set { name, id } => set(&name, id).await,
        Command::Unset { name } => unset(&name).await,
        Command::Monitor => monitor().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Socket bound to no multicast group, for plain requests.
fn request_transport() -> rtnl::Result<Transport> {
    Transport::open_groups(&[groups::NOOP])
}

async fn list(json: bool) -> anyhow::Result<()> {
    let names = netns::list_named()?;
    let mut rows = Vec::with_capacity(names.len());
    if !names.is_empty() {
        let mut transport = request_transport()?;
        for name in names {
            let id = netns::get_nsid(&mut transport, &name).await?;
            rows.push((name, id));
        }
        transport.close().await;
    }

    if json {
        let rows: Vec<_> = rows
            .iter()
            .map(|(name, id)| serde_json::json!({ "name": name, "nsid": id }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for (name, id) in &rows {
            match id {
                Some(id) => println!("{} {}", name, id),
                None => println!("{} -", name),
            }
        }
    }
    Ok(())
}

async fn set(name: &str, id: i32) -> anyhow::Result<()> {
    let mut transport = request_transport()?;
    let result = netns::set_nsid(&mut transport, name, id).await;
    transport.close().await;
    Ok(result?)
}

async fn unset(name: &str) -> anyhow::Result<()> {
    let mut transport = request_transport()?;
    let result = netns::unset_nsid(&mut transport, name).await;
    transport.close().await;
    Ok(result?)
}

async fn monitor() -> anyhow::Result<()> {
    let mut events = Transport::open_groups(NSID_GROUPS)?.into_stream();
    while let Some(msg) = events.next().await {
        if let Message::Netns(_) = &msg {
            println!("{}", msg);
        }
    }
    Ok(())
}
