use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use change_story::HierarchyGraph;
use change_story::cli::{Cli, Commands};
use change_story::config::ChangeStoryConfig;
use change_story::query::chapters::{ChapterView, PrunedStories};
use change_story::query::narrative::{Narrative, StoryCursor};
use change_story::query::{cluster, find, output, stats};
use change_story::snapshot::{load_hierarchy, write_snapshot};

fn install_tracing_subscriber(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load(file: &Path) -> Result<HierarchyGraph> {
    load_hierarchy(file).with_context(|| format!("failed to load hierarchy {}", file.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    install_tracing_subscriber(cli.verbose);

    match cli.command {
        Commands::Stats { file, format } => {
            let graph = load(&file)?;
            let narrative = Narrative::build(&graph);
            output::format_stats(&stats::hierarchy_stats(&graph, &narrative), &format);
        }

        Commands::Story { file, at, format } => {
            let graph = load(&file)?;
            let narrative = Narrative::build(&graph);
            let mut cursor = StoryCursor::new(narrative.story.clone());
            if let Some(id) = at.as_deref() {
                graph.node_by_id(id)?;
                if cursor.select(id).is_none() {
                    eprintln!("{id} is not a chapter of the story; no chapter selected");
                }
            }
            output::format_story(&narrative, cursor.position(), &format);
        }

        Commands::Chapters { file, view, format } => {
            let graph = load(&file)?;
            let narrative = Narrative::build(&graph);
            let stories = PrunedStories::build(&graph, &narrative)?;
            let selected: Vec<ChapterView> = match view {
                Some(view) => vec![view.into()],
                None => ChapterView::ALL.to_vec(),
            };
            let views: Vec<_> = selected
                .into_iter()
                .map(|v| (v, stories.view(v)))
                .collect();
            output::format_chapters(&views, &format);
        }

        Commands::Clusters { file, seed, format } => {
            let graph = load(&file)?;
            let config_path = ChangeStoryConfig::path_for(&file, cli.config.as_deref());
            let mut params = ChangeStoryConfig::load(&config_path).clustering;
            if let Some(seed) = seed {
                params.seed = seed;
            }
            let result = cluster::detect_communities(&graph, &params);
            let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
            output::format_clusters(&result, &ids, &format);
        }

        Commands::Inspect { file, id, format } => {
            let graph = load(&file)?;
            let node = graph.node_by_id(&id)?;
            let weight = graph.branch_weight(&id)?;
            let descendants = graph.descendant_hunks(&id)?;
            output::format_inspect(node, weight, &descendants, &format);
        }

        Commands::Deps { file, id, format } => {
            let graph = load(&file)?;
            let closure = graph.dependency_closure(&id)?;
            output::format_deps(&id, &closure, &format);
        }

        Commands::Find {
            file,
            pattern,
            case_insensitive,
            format,
        } => {
            let graph = load(&file)?;
            let results = find::find_nodes(&graph, &pattern, case_insensitive)?;
            if results.is_empty() {
                eprintln!("no nodes match '{pattern}'");
                std::process::exit(1);
            }
            output::format_find_results(&results, &format);
        }

        Commands::Describe {
            file,
            id,
            title,
            description,
            output: destination,
        } => {
            if title.is_none() && description.is_none() {
                anyhow::bail!("nothing to change: pass --title and/or --description");
            }
            let mut graph = load(&file)?;
            if let Some(title) = title {
                graph.set_title(&id, title)?;
            }
            if let Some(description) = description {
                graph.set_description(&id, description)?;
            }
            let destination = destination.unwrap_or_else(|| file.clone());
            write_snapshot(&destination, &graph.serialize())
                .with_context(|| format!("failed to write {}", destination.display()))?;
            tracing::info!(%id, path = %destination.display(), "updated node");
            println!("updated {} in {}", id, destination.display());
        }
    }

    Ok(())
}
